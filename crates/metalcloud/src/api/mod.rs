//! Remote MetalCloud API: the trait seam the orchestrator depends on and
//! the REST binding used by the binary.

mod client;
mod models;
mod traits;

pub use client::MetalCloud;
pub use traits::{
    ApiError, DeployStatus, Infrastructure, InfrastructureApi, InfrastructureFilter,
    InfrastructureUpdate,
};

#[cfg(test)]
pub use traits::MockInfrastructureApi;
