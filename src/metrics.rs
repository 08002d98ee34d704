//! Intersection over union of box batches laid out as (N, 4) `[x_left, y_top, x_right, y_bottom]`.
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// What to do with the extent of two boxes that do not overlap along an axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntersectionPolicy {
    /// Negative widths/heights count as 0, disjoint boxes have IoU 0
    Clamped,
    /// Keep negative widths/heights. Disjoint boxes can score below 0 or even above 0 when they
    /// are apart on both axes.
    Unclamped,
}

impl Default for IntersectionPolicy {
    fn default() -> Self {
        IntersectionPolicy::Clamped
    }
}

fn area(bb: ArrayView1<f32>) -> f32 {
    (bb[2] - bb[0]) * (bb[3] - bb[1])
}

/// IoU of two boxes. A union that is not positive gives 0.
pub fn box_iou(
    true_box: ArrayView1<f32>,
    pred_box: ArrayView1<f32>,
    policy: IntersectionPolicy,
) -> f32 {
    let mut i_width = true_box[2].min(pred_box[2]) - true_box[0].max(pred_box[0]);
    let mut i_height = true_box[3].min(pred_box[3]) - true_box[1].max(pred_box[1]);
    if policy == IntersectionPolicy::Clamped {
        i_width = i_width.max(0.);
        i_height = i_height.max(0.);
    }
    let i_area = i_width * i_height;
    let union = area(true_box) + area(pred_box) - i_area;
    if union <= 0. {
        return 0.;
    }
    i_area / union
}

/// IoU of every pair of rows
pub fn batch_iou(
    true_boxes: ArrayView2<f32>,
    pred_boxes: ArrayView2<f32>,
    policy: IntersectionPolicy,
) -> Result<Array1<f32>> {
    if true_boxes.dim() != pred_boxes.dim() {
        return Err(Error::ShapeMismatch(format!(
            "true boxes are {:?} but predicted boxes are {:?}",
            true_boxes.dim(),
            pred_boxes.dim()
        )));
    }
    if true_boxes.ncols() != 4 {
        return Err(Error::ShapeMismatch(format!(
            "boxes must have 4 coordinates, got {}",
            true_boxes.ncols()
        )));
    }
    Ok(true_boxes
        .outer_iter()
        .zip(pred_boxes.outer_iter())
        .map(|(true_box, pred_box)| box_iou(true_box, pred_box, policy))
        .collect())
}

/// Mean IoU over the batch, 0 for an empty batch
pub fn mean_iou(
    true_boxes: ArrayView2<f32>,
    pred_boxes: ArrayView2<f32>,
    policy: IntersectionPolicy,
) -> Result<f32> {
    let ious = batch_iou(true_boxes, pred_boxes, policy)?;
    Ok(ious.mean().unwrap_or(0.))
}
