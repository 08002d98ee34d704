pub mod voc_batch_loader;
