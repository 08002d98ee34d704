pub mod common_structs;

pub mod data_loaders;
pub mod data_transformers;
pub mod iterator_adapters;

/// Iterator over a table of rows that can report how far into the current pass it is
pub trait DataLoader: Iterator {
    /// Row the next batch starts at, 0 right after construction or a wrap around
    fn next_element_index(&self) -> usize;
    /// Number of rows in one pass
    fn max_elem_index(&self) -> usize;
}
