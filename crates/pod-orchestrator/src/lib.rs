pub mod config;
pub mod error;
pub mod grpc;
pub mod http;
pub mod model;
pub mod service;
pub mod state;
pub mod storage;
pub mod workload;
