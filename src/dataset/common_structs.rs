use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};
// Frequently used structs in the provided data transformers/loaders

/// Resolution every image and bounding box is mapped to before reaching the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub height: u32,
    pub width: u32,
}

impl Default for TargetSize {
    /// Input resolution of the pretrained feature extractor
    fn default() -> Self {
        TargetSize {
            height: 224,
            width: 224,
        }
    }
}

/// One bounding box joined with its image and category, with corners in both the source image
/// resolution and the target resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedAnnotation {
    pub image_id: i64,
    pub file_name: String,
    pub image_height: i64,
    pub image_width: i64,
    pub category_id: i64,
    pub category_name: String,
    /// Zero based position of the category in the categories table
    pub class_index: usize,
    pub x_left: f64,
    pub y_top: f64,
    pub bbox_width: f64,
    pub bbox_height: f64,
    pub x_right: f64,
    pub y_bottom: f64,
    pub x_left_scaled: i64,
    pub y_top_scaled: i64,
    pub x_right_scaled: i64,
    pub y_bottom_scaled: i64,
    pub width_scaled: i64,
    pub height_scaled: i64,
}

impl JoinedAnnotation {
    pub fn scaled_area(&self) -> i64 {
        self.width_scaled * self.height_scaled
    }

    /// [x_left, y_top, x_right, y_bottom] in target resolution pixels
    pub fn scaled_corners(&self) -> [f32; 4] {
        [
            self.x_left_scaled as f32,
            self.y_top_scaled as f32,
            self.x_right_scaled as f32,
            self.y_bottom_scaled as f32,
        ]
    }
}

/// Which targets a batch carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Classification,
    Localization,
    Both,
}

impl Default for Task {
    fn default() -> Self {
        Task::Localization
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(Task::Classification),
            "localization" => Ok(Task::Localization),
            "both" => Ok(Task::Both),
            other => Err(format!(
                "unknown task '{}', expected classification, localization or both",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchTargets {
    /// (N, 1) zero based class ids
    Classes(Array2<f32>),
    /// (N, 4) boxes as [x_left, y_top, x_right, y_bottom]
    Boxes(Array2<f32>),
    Both {
        classes: Array2<f32>,
        boxes: Array2<f32>,
    },
}

impl BatchTargets {
    pub fn classes(&self) -> Option<&Array2<f32>> {
        match self {
            BatchTargets::Classes(classes) | BatchTargets::Both { classes, .. } => Some(classes),
            BatchTargets::Boxes(_) => None,
        }
    }

    pub fn boxes(&self) -> Option<&Array2<f32>> {
        match self {
            BatchTargets::Boxes(boxes) | BatchTargets::Both { boxes, .. } => Some(boxes),
            BatchTargets::Classes(_) => None,
        }
    }
}

/// Images normalized to [0, 1] in (N, H, W, 3) layout together with their targets
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Array4<f32>,
    pub targets: BatchTargets,
    /// Rows of the table this batch was built from
    pub indices: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
