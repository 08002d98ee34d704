pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;

pub use error::{Error, Result};
