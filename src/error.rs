use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The annotation file is missing, is not JSON or lacks one of the top level tables.
    #[error("could not parse annotation file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// An image referenced by the table could not be opened or decoded.
    #[error("could not load image {path}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}
