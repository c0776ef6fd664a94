pub mod client;
pub mod describe;
pub mod types;

pub use describe::ReplicateDescribeClient;
