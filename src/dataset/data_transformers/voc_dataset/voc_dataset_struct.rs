use crate::error::{Error, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Layout of the annotation file. Any other top level key (info, licenses, type...) is ignored.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocDatasetJson {
    pub images: Vec<ImageRecord>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<CategoryRecord>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub file_name: String,
    pub height: i64,
    pub width: i64,
}

/// Annotation as it appears in the file, bbox is [x, y, width, height]
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub image_id: i64,
    pub category_id: i64,
    pub bbox: Vec<f64>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}

/// A validated annotation, width and height are always positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub image_id: i64,
    pub category_id: i64,
    pub x_left: f64,
    pub y_top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxRecord {
    // None if the bbox is not [x, y, w, h] or has an empty extent
    fn from_annotation(annotation: &Annotation) -> Option<BoxRecord> {
        match annotation.bbox.as_slice() {
            &[x_left, y_top, width, height] if width > 0. && height > 0. => Some(BoxRecord {
                image_id: annotation.image_id,
                category_id: annotation.category_id,
                x_left,
                y_top,
                width,
                height,
            }),
            _ => None,
        }
    }
}

/// The three flat tables of an annotation file
#[derive(Default, Debug, Clone, PartialEq)]
pub struct AnnotationTables {
    pub images: Vec<ImageRecord>,
    pub boxes: Vec<BoxRecord>,
    pub categories: Vec<CategoryRecord>,
}

impl From<VocDatasetJson> for AnnotationTables {
    fn from(json: VocDatasetJson) -> Self {
        let boxes: Vec<BoxRecord> = json
            .annotations
            .iter()
            .filter_map(|annotation| {
                let maybe_box = BoxRecord::from_annotation(annotation);
                if maybe_box.is_none() {
                    warn!(
                        "skipping annotation of image {} with invalid bbox {:?}",
                        annotation.image_id, annotation.bbox
                    );
                }
                maybe_box
            })
            .collect();
        AnnotationTables {
            images: json.images,
            boxes,
            categories: json.categories,
        }
    }
}

/// Reads the annotation file and splits it into image, box and category tables
pub fn read_annotations_file<P: AsRef<Path>>(path: P) -> Result<AnnotationTables> {
    let path = path.as_ref();
    let input_file = File::open(path).map_err(|err| Error::Parse {
        path: path.to_owned(),
        reason: err.to_string(),
    })?;
    let json: VocDatasetJson =
        serde_json::from_reader(BufReader::new(input_file)).map_err(|err| Error::Parse {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
    Ok(tables_from_json(json, path))
}

/// Same as [read_annotations_file] for a document already in memory
pub fn parse_annotations(json: &str) -> Result<AnnotationTables> {
    let json: VocDatasetJson = serde_json::from_str(json).map_err(|err| Error::Parse {
        path: "<memory>".into(),
        reason: err.to_string(),
    })?;
    Ok(tables_from_json(json, Path::new("<memory>")))
}

fn tables_from_json(json: VocDatasetJson, origin: &Path) -> AnnotationTables {
    let tables = AnnotationTables::from(json);
    info!(
        "loaded {} images, {} boxes and {} categories from {}",
        tables.images.len(),
        tables.boxes.len(),
        tables.categories.len(),
        origin.display()
    );
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "images": [{"file_name": "000012.jpg", "height": 333, "width": 500, "id": 12}],
        "type": "instances",
        "annotations": [
            {"segmentation": [], "area": 34104, "iscrowd": 0, "image_id": 12,
             "bbox": [155, 96, 196, 174], "category_id": 7, "id": 1, "ignore": 0},
            {"image_id": 12, "bbox": [10, 10, 0, 5], "category_id": 7},
            {"image_id": 12, "bbox": [10, 10, 5], "category_id": 7}
        ],
        "categories": [{"supercategory": "none", "id": 7, "name": "car"}]
    }"#;

    #[test]
    fn parses_tables_and_drops_invalid_boxes() {
        let tables = parse_annotations(SAMPLE).unwrap();
        assert_eq!(tables.images.len(), 1);
        assert_eq!(tables.images[0].file_name, "000012.jpg");
        assert_eq!(tables.categories[0].name, "car");
        assert_eq!(
            tables.boxes,
            vec![BoxRecord {
                image_id: 12,
                category_id: 7,
                x_left: 155.,
                y_top: 96.,
                width: 196.,
                height: 174.,
            }]
        );
    }

    #[test]
    fn missing_table_is_a_parse_error() {
        let err = parse_annotations(r#"{"images": [], "annotations": []}"#).unwrap_err();
        match err {
            Error::Parse { reason, .. } => assert!(reason.contains("categories")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            parse_annotations("{ not json"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        match read_annotations_file(&path) {
            Err(Error::Parse { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pascal_train2007.json");
        File::create(&path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();
        let tables = read_annotations_file(&path).unwrap();
        assert_eq!(tables.boxes.len(), 1);
        assert_eq!(tables, parse_annotations(SAMPLE).unwrap());
    }
}
