pub mod pod {
    pub mod orchestrator {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/pod.orchestrator.v1.rs"));
        }
    }
}

pub use pod::orchestrator::v1::*;
