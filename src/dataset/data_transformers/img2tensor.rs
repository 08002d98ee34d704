use crate::dataset::common_structs::TargetSize;
use crate::error::{Error, Result};
use image::{DynamicImage, FilterType};
use ndarray::Array3;
use std::path::Path;

pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_owned(),
        source,
    })
}

/// Resizes the image to `target` and returns it as a (H, W, 3) array with values in [0, 1]
pub fn from_img_to_array(img: &DynamicImage, target: TargetSize) -> Result<Array3<f32>> {
    let resized = img.resize_exact(target.width, target.height, FilterType::Nearest);
    let rgb = resized.to_rgb();
    let (width, height) = rgb.dimensions();
    let normalized: Vec<f32> = rgb
        .into_raw()
        .into_iter()
        .map(|channel| channel as f32 / 255.)
        .collect();
    Array3::from_shape_vec((height as usize, width as usize, 3), normalized)
        .map_err(|err| Error::ShapeMismatch(err.to_string()))
}

pub fn load_normalized_image<P: AsRef<Path>>(path: P, target: TargetSize) -> Result<Array3<f32>> {
    let img = load_image(path)?;
    from_img_to_array(&img, target)
}
