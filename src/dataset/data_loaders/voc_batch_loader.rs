use crate::dataset::common_structs::{Batch, BatchTargets, JoinedAnnotation, TargetSize, Task};
use crate::dataset::data_transformers::img2tensor::load_normalized_image;
use crate::dataset::iterator_adapters::{RandomBatcher, SequentialBatcher};
use crate::dataset::DataLoader;
use crate::error::{Error, Result};
use log::debug;
use ndarray::{Array2, Array3, Axis};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchLoaderOptions {
    pub target: TargetSize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub task: Task,
    /// Makes shuffled batches reproducible
    pub seed: Option<u64>,
}

impl Default for BatchLoaderOptions {
    fn default() -> Self {
        BatchLoaderOptions {
            target: TargetSize::default(),
            batch_size: 32,
            shuffle: true,
            task: Task::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
enum IndexSampler {
    Sequential(SequentialBatcher),
    Random { batcher: RandomBatcher, drawn: usize },
}

/// Endless source of image batches for a table of joined annotations.
///
/// Every call to [VocBatchLoader::next_batch] reads the images of the selected rows from
/// `data_dir`, resizes them to the target size and pairs them with the targets of the task.
#[derive(Debug, Clone)]
pub struct VocBatchLoader {
    data_dir: PathBuf,
    rows: Vec<JoinedAnnotation>,
    options: BatchLoaderOptions,
    sampler: IndexSampler,
}

impl VocBatchLoader {
    pub fn new<P: Into<PathBuf>>(
        data_dir: P,
        rows: Vec<JoinedAnnotation>,
        options: BatchLoaderOptions,
    ) -> Result<VocBatchLoader> {
        if rows.is_empty() {
            return Err(Error::Config(
                "cannot build batches from an empty table".to_string(),
            ));
        }
        if options.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".to_string()));
        }
        if options.target.width == 0 || options.target.height == 0 {
            return Err(Error::Config(format!(
                "target size must be non zero, got {}x{}",
                options.target.width, options.target.height
            )));
        }
        let sampler = Self::sampler(rows.len(), &options);
        Ok(VocBatchLoader {
            data_dir: data_dir.into(),
            rows,
            options,
            sampler,
        })
    }

    fn sampler(len: usize, options: &BatchLoaderOptions) -> IndexSampler {
        if options.shuffle {
            let batcher = match options.seed {
                Some(seed) => RandomBatcher::with_seed(len, options.batch_size, seed),
                None => RandomBatcher::new(len, options.batch_size),
            };
            IndexSampler::Random { batcher, drawn: 0 }
        } else {
            IndexSampler::Sequential(SequentialBatcher::new(len, options.batch_size))
        }
    }

    pub fn rows(&self) -> &[JoinedAnnotation] {
        &self.rows
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn options(&self) -> &BatchLoaderOptions {
        &self.options
    }

    /// Goes back to the state right after construction. Shuffled loaders without a seed draw a
    /// fresh random sequence.
    pub fn reset(&mut self) {
        self.sampler = Self::sampler(self.rows.len(), &self.options);
    }

    fn next_indices(&mut self) -> Vec<usize> {
        let indices = match &mut self.sampler {
            IndexSampler::Sequential(batcher) => batcher.next().map(|range| range.collect()),
            IndexSampler::Random { batcher, drawn } => batcher.next().map(|indices| {
                *drawn += indices.len();
                indices
            }),
        };
        // both samplers are endless for a non empty table and a non zero batch size
        indices.unwrap_or_default()
    }

    /// Loads the next batch. A missing or corrupt image aborts the batch with
    /// [Error::ImageLoad], the sampler still moves on.
    pub fn next_batch(&mut self) -> Result<Batch> {
        let indices = self.next_indices();
        self.load_batch(indices)
    }

    /// Builds the batch made of the given rows of the table
    pub fn load_batch(&self, indices: Vec<usize>) -> Result<Batch> {
        if let Some(&out_of_range) = indices.iter().find(|&&index| index >= self.rows.len()) {
            return Err(Error::ShapeMismatch(format!(
                "row {} requested from a table of {} rows",
                out_of_range,
                self.rows.len()
            )));
        }
        let rows = &self.rows;
        let data_dir = &self.data_dir;
        let target = self.options.target;
        // decode in parallel, but report the first failure in batch order
        let loaded: Vec<Result<Array3<f32>>> = indices
            .par_iter()
            .map(|&index| load_normalized_image(data_dir.join(&rows[index].file_name), target))
            .collect();
        let images = loaded.into_iter().collect::<Result<Vec<_>>>()?;
        let views: Vec<_> = images.iter().map(|image| image.view()).collect();
        let images = ndarray::stack(Axis(0), &views)
            .map_err(|err| Error::ShapeMismatch(err.to_string()))?;

        let batch_rows: Vec<&JoinedAnnotation> = indices.iter().map(|&index| &rows[index]).collect();
        let targets = match self.options.task {
            Task::Classification => BatchTargets::Classes(class_targets(&batch_rows)?),
            Task::Localization => BatchTargets::Boxes(box_targets(&batch_rows)?),
            Task::Both => BatchTargets::Both {
                classes: class_targets(&batch_rows)?,
                boxes: box_targets(&batch_rows)?,
            },
        };
        debug!("loaded batch of {} images", indices.len());
        Ok(Batch {
            images,
            targets,
            indices,
        })
    }
}

fn class_targets(rows: &[&JoinedAnnotation]) -> Result<Array2<f32>> {
    let classes = rows.iter().map(|row| row.class_index as f32).collect();
    Array2::from_shape_vec((rows.len(), 1), classes)
        .map_err(|err| Error::ShapeMismatch(err.to_string()))
}

fn box_targets(rows: &[&JoinedAnnotation]) -> Result<Array2<f32>> {
    let boxes = rows.iter().flat_map(|row| row.scaled_corners().to_vec()).collect();
    Array2::from_shape_vec((rows.len(), 4), boxes)
        .map_err(|err| Error::ShapeMismatch(err.to_string()))
}

impl Iterator for VocBatchLoader {
    type Item = Result<Batch>;

    /// Never returns None
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}

impl DataLoader for VocBatchLoader {
    fn next_element_index(&self) -> usize {
        match &self.sampler {
            IndexSampler::Sequential(batcher) => batcher.cursor(),
            IndexSampler::Random { drawn, .. } => drawn % self.rows.len(),
        }
    }

    fn max_elem_index(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::data_transformers::voc_dataset::{
        join_annotations, AnnotationTables, BoxRecord, CategoryRecord, ImageRecord,
    };
    use approx::assert_relative_eq;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    const TEST_TARGET: TargetSize = TargetSize {
        height: 24,
        width: 32,
    };

    /// Writes `nb_images` solid color pngs, image i has one box of category (i % 2) + 1
    fn sample_dataset(nb_images: i64) -> (TempDir, Vec<JoinedAnnotation>) {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = AnnotationTables {
            categories: vec![
                CategoryRecord {
                    id: 1,
                    name: "cat".into(),
                },
                CategoryRecord {
                    id: 2,
                    name: "dog".into(),
                },
            ],
            ..Default::default()
        };
        for id in 0..nb_images {
            let file_name = format!("{:06}.png", id);
            let color = Rgb([(id * 40) as u8, 255, 0]);
            ImageBuffer::from_pixel(40, 30, color)
                .save(dir.path().join(&file_name))
                .unwrap();
            tables.images.push(ImageRecord {
                id,
                file_name,
                height: 30,
                width: 40,
            });
            tables.boxes.push(BoxRecord {
                image_id: id,
                category_id: (id % 2) + 1,
                x_left: 10.,
                y_top: 5.,
                width: 20.,
                height: 15.,
            });
        }
        let joined = join_annotations(&tables, TEST_TARGET).unwrap();
        (dir, joined)
    }

    fn options(batch_size: usize, shuffle: bool, task: Task) -> BatchLoaderOptions {
        BatchLoaderOptions {
            target: TEST_TARGET,
            batch_size,
            shuffle,
            task,
            seed: Some(3),
        }
    }

    #[test]
    fn sequential_batches_wrap_around() {
        let (dir, rows) = sample_dataset(5);
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(2, false, Task::Classification)).unwrap();
        let indices: Vec<Vec<usize>> = (0..4)
            .map(|_| loader.next_batch().unwrap().indices)
            .collect();
        assert_eq!(indices, vec![vec![0, 1], vec![2, 3], vec![4], vec![0, 1]]);
    }

    #[test]
    fn batch_has_normalized_nhwc_images() {
        let (dir, rows) = sample_dataset(3);
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(3, false, Task::Localization)).unwrap();
        let batch = loader.next_batch().unwrap();
        assert_eq!(batch.images.dim(), (3, 24, 32, 3));
        assert!(batch.images.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_relative_eq!(batch.images[[2, 0, 0, 0]], 80. / 255.);
        assert_relative_eq!(batch.images[[1, 5, 7, 1]], 1.);
        let boxes = batch.targets.boxes().unwrap();
        assert_eq!(boxes.dim(), (3, 4));
        // [10, 5, 29, 19] in a 40x30 image mapped to 32x24
        assert_eq!(boxes.row(0).to_vec(), vec![8., 4., 23., 15.]);
        assert!(batch.targets.classes().is_none());
    }

    #[test]
    fn classification_targets_are_zero_based() {
        let (dir, rows) = sample_dataset(4);
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(4, false, Task::Both)).unwrap();
        let batch = loader.next_batch().unwrap();
        let classes = batch.targets.classes().unwrap();
        assert_eq!(classes.dim(), (4, 1));
        assert_eq!(classes.column(0).to_vec(), vec![0., 1., 0., 1.]);
        assert!(batch.targets.boxes().is_some());
    }

    #[test]
    fn independent_loaders_start_at_the_same_row() {
        let (dir, rows) = sample_dataset(5);
        let mut first =
            VocBatchLoader::new(dir.path(), rows.clone(), options(2, false, Task::Both)).unwrap();
        first.next_batch().unwrap();
        let mut second =
            VocBatchLoader::new(dir.path(), rows, options(2, false, Task::Both)).unwrap();
        assert_eq!(second.next_element_index(), 0);
        assert_eq!(second.next_batch().unwrap().indices, vec![0, 1]);
        assert_eq!(first.next_batch().unwrap().indices, vec![2, 3]);
    }

    #[test]
    fn shuffled_batches_are_full_and_reproducible() {
        let (dir, rows) = sample_dataset(5);
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(4, true, Task::Classification)).unwrap();
        let first: Vec<Vec<usize>> = loader
            .by_ref()
            .take(3)
            .map(|batch| batch.unwrap().indices)
            .collect();
        assert!(first.iter().all(|indices| indices.len() == 4));
        assert!(first.iter().flatten().all(|&index| index < 5));
        loader.reset();
        let again: Vec<Vec<usize>> = loader
            .take(3)
            .map(|batch| batch.unwrap().indices)
            .collect();
        assert_eq!(first, again);
    }

    #[test]
    fn missing_image_fails_the_batch() {
        let (dir, rows) = sample_dataset(3);
        std::fs::remove_file(dir.path().join("000001.png")).unwrap();
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(3, false, Task::Classification)).unwrap();
        match loader.next_batch() {
            Err(Error::ImageLoad { path, .. }) => {
                assert_eq!(path, dir.path().join("000001.png"))
            }
            other => panic!("unexpected result {:?}", other.map(|batch| batch.indices)),
        }
    }

    #[test]
    fn corrupt_image_fails_the_batch() {
        let (dir, rows) = sample_dataset(3);
        std::fs::write(dir.path().join("000002.png"), b"not a png at all").unwrap();
        let mut loader =
            VocBatchLoader::new(dir.path(), rows, options(3, false, Task::Localization)).unwrap();
        match loader.next_batch() {
            Err(Error::ImageLoad { path, .. }) => {
                assert_eq!(path, dir.path().join("000002.png"))
            }
            other => panic!("unexpected result {:?}", other.map(|batch| batch.indices)),
        }
    }

    #[test]
    fn rejects_empty_table_and_zero_batch() {
        assert!(matches!(
            VocBatchLoader::new("imgs", vec![], BatchLoaderOptions::default()),
            Err(Error::Config(_))
        ));
        let (dir, rows) = sample_dataset(1);
        assert!(matches!(
            VocBatchLoader::new(dir.path(), rows, options(0, false, Task::Both)),
            Err(Error::Config(_))
        ));
    }
}
