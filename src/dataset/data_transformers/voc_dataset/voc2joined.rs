use super::voc_dataset_struct::{AnnotationTables, CategoryRecord, ImageRecord};
use crate::dataset::common_structs::{JoinedAnnotation, TargetSize};
use crate::error::{Error, Result};
use log::{debug, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Maps a coordinate from a source_dim wide (or high) image to a target_dim one, rounding to the
/// closest pixel. The result is kept inside [0, target_dim].
pub fn scale_coordinate(coord: f64, source_dim: i64, target_dim: u32) -> i64 {
    let scaled = (coord / source_dim as f64 * target_dim as f64).round();
    scaled.max(0.).min(target_dim as f64) as i64
}

/// Inverse of [scale_coordinate], used to bring predictions back to the original image
pub fn unscale_coordinate(scaled: f64, source_dim: i64, target_dim: u32) -> f64 {
    scaled / target_dim as f64 * source_dim as f64
}

/// Inner joins boxes with their image and category and rescales every box to `target`.
///
/// Boxes pointing to an unknown image or category are dropped, as are boxes of images declaring
/// an empty size. Rows keep the order of the boxes table.
pub fn join_annotations(
    tables: &AnnotationTables,
    target: TargetSize,
) -> Result<Vec<JoinedAnnotation>> {
    if target.width == 0 || target.height == 0 {
        return Err(Error::Config(format!(
            "target size must be non zero, got {}x{}",
            target.width, target.height
        )));
    }
    let mut images: HashMap<i64, &ImageRecord> = HashMap::new();
    for image in &tables.images {
        images.entry(image.id).or_insert(image);
    }
    let mut categories: HashMap<i64, (usize, &CategoryRecord)> = HashMap::new();
    for (class_index, category) in tables.categories.iter().enumerate() {
        categories
            .entry(category.id)
            .or_insert((class_index, category));
    }

    let mut joined = Vec::with_capacity(tables.boxes.len());
    for bbox in &tables.boxes {
        let (image, (class_index, category)) = match (
            images.get(&bbox.image_id),
            categories.get(&bbox.category_id),
        ) {
            (Some(image), Some(category)) => (*image, *category),
            _ => continue,
        };
        if image.width <= 0 || image.height <= 0 {
            warn!(
                "image {} ({}) declares size {}x{}, dropping its box",
                image.id, image.file_name, image.width, image.height
            );
            continue;
        }
        let x_right = bbox.x_left + bbox.width - 1.;
        let y_bottom = bbox.y_top + bbox.height - 1.;
        joined.push(JoinedAnnotation {
            image_id: image.id,
            file_name: image.file_name.clone(),
            image_height: image.height,
            image_width: image.width,
            category_id: category.id,
            category_name: category.name.clone(),
            class_index,
            x_left: bbox.x_left,
            y_top: bbox.y_top,
            bbox_width: bbox.width,
            bbox_height: bbox.height,
            x_right,
            y_bottom,
            x_left_scaled: scale_coordinate(bbox.x_left, image.width, target.width),
            y_top_scaled: scale_coordinate(bbox.y_top, image.height, target.height),
            x_right_scaled: scale_coordinate(x_right, image.width, target.width),
            y_bottom_scaled: scale_coordinate(y_bottom, image.height, target.height),
            width_scaled: scale_coordinate(bbox.width, image.width, target.width),
            height_scaled: scale_coordinate(bbox.height, image.height, target.height),
        });
    }
    debug!(
        "joined {} of {} boxes",
        joined.len(),
        tables.boxes.len()
    );
    Ok(joined)
}

/// Keeps the largest (scaled) box of every image. On equal areas the first row wins. Images are
/// listed in the order they first appear in `joined`.
pub fn primary_objects(joined: &[JoinedAnnotation]) -> Vec<JoinedAnnotation> {
    let mut largest: Vec<&JoinedAnnotation> = vec![];
    let mut position_of_image: HashMap<i64, usize> = HashMap::new();
    for row in joined {
        match position_of_image.entry(row.image_id) {
            Entry::Vacant(vacant) => {
                vacant.insert(largest.len());
                largest.push(row);
            }
            Entry::Occupied(occupied) => {
                let current = &mut largest[*occupied.get()];
                if row.scaled_area() > current.scaled_area() {
                    *current = row;
                }
            }
        }
    }
    largest.into_iter().cloned().collect()
}
