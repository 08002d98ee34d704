pub mod voc2joined;
pub mod voc_dataset_struct;

pub use voc2joined::*;
pub use voc_dataset_struct::*;
