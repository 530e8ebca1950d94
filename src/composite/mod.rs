//! Composite clients built on the per-service capability traits

mod vpc;

pub use vpc::VpcClient;
