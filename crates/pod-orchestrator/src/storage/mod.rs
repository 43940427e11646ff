pub mod deployment_store;
pub mod labels;
pub mod pod_store;

pub use deployment_store::{DeploymentStore, WorkloadGateway};
pub use pod_store::{PodRepository, PodStore};
