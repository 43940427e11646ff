pub mod pod;
pub mod policy;

pub use pod::{EnvSpec, PodSpec, PortSpec};
pub use policy::{PolicyTable, Protocol, PullPolicy, RestartPolicy};
