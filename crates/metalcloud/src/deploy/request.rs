//! Deploy request.

use super::shutdown::ShutdownPolicy;

/// A fully resolved deploy request, built once per invocation.
///
/// `allow_data_loss` and `confirmed` are independent: neither implies the
/// other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Infrastructure ID or label.
    pub target: String,
    /// Resolved shutdown policy.
    pub shutdown: ShutdownPolicy,
    /// Let the deploy proceed even if data loss is expected.
    pub allow_data_loss: bool,
    /// Confirmation was given up front (`--autoconfirm`).
    pub confirmed: bool,
}
