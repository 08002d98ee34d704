pub mod batching;
pub mod shuffling;

pub use batching::SequentialBatcher;
pub use shuffling::RandomBatcher;
