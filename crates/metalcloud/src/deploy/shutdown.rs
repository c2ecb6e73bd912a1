//! Shutdown policy applied to running servers before a deploy.

/// Default seconds to wait for a soft power off.
pub const DEFAULT_SOFT_SHUTDOWN_TIMEOUT_SECS: u32 = 180;

/// Raw shutdown flags, exactly as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownFlags {
    /// `--attempt-soft-shutdown`.
    pub attempt_soft_shutdown: bool,
    /// `--attempt-hard-shutdown`.
    pub attempt_hard_shutdown: bool,
    /// `--soft-shutdown-timeout`.
    pub soft_shutdown_timeout: u32,
    /// `--force-shutdown`.
    pub force_shutdown: bool,
}

impl Default for ShutdownFlags {
    fn default() -> Self {
        Self {
            attempt_soft_shutdown: true,
            attempt_hard_shutdown: true,
            soft_shutdown_timeout: DEFAULT_SOFT_SHUTDOWN_TIMEOUT_SECS,
            force_shutdown: false,
        }
    }
}

/// How running workloads are powered down before a deploy proceeds.
///
/// When `forced` is set the soft path is never attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Try an ACPI (graceful) power off first.
    pub attempt_soft: bool,
    /// Seconds to wait for the soft power off before escalating.
    pub soft_timeout_seconds: u32,
    /// Force a power off once the soft timeout elapses.
    pub hard_after_timeout: bool,
    /// Go straight to a hard power off.
    pub forced: bool,
}

impl ShutdownPolicy {
    /// Merge the shutdown flags into a single policy.
    ///
    /// `force_shutdown` wins over the soft-shutdown flags; otherwise the
    /// policy mirrors the flags verbatim.
    #[must_use]
    pub fn resolve(flags: ShutdownFlags) -> Self {
        if flags.force_shutdown {
            return Self {
                attempt_soft: false,
                soft_timeout_seconds: flags.soft_shutdown_timeout,
                hard_after_timeout: flags.attempt_hard_shutdown,
                forced: true,
            };
        }

        Self {
            attempt_soft: flags.attempt_soft_shutdown,
            soft_timeout_seconds: flags.soft_shutdown_timeout,
            hard_after_timeout: flags.attempt_hard_shutdown,
            forced: false,
        }
    }
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self::resolve(ShutdownFlags::default())
    }
}

impl From<ShutdownFlags> for ShutdownPolicy {
    fn from(flags: ShutdownFlags) -> Self {
        Self::resolve(flags)
    }
}
