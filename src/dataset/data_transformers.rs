pub mod img2tensor;
pub mod voc_dataset;
