pub mod bucket;
pub mod catalog;
pub mod engine;
pub mod persistence;

pub use bucket::{Bucket, BucketMut, BucketRef};
pub use catalog::Catalog;
pub use engine::{EngineOptions, KvEngine};
pub use persistence::DurabilityMode;
