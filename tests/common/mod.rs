#![allow(dead_code)]

use std::fs;
use std::path::Path;

use polymask::geometry::Polygon;
use polymask::ir::{Annotation, Category, Dataset, Image};
use serde_json::{json, Value};

/// A blank 24-bit BMP; enough for header-only dimension reads.
pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

pub fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, serde_json::to_string_pretty(value).expect("serialize")).expect("write json");
}

/// A tagging polygon record in the web annotation shape.
pub fn polygon_record(points: &str, label: &str) -> Value {
    json!({
        "@context": "http://www.w3.org/ns/anno.jsonld",
        "id": format!("#{label}"),
        "type": "Annotation",
        "body": [{"type": "TextualBody", "value": label, "purpose": "tagging"}],
        "target": {"selector": {
            "type": "SvgSelector",
            "value": format!("<svg><polygon points=\"{points}\"></polygon></svg>")
        }}
    })
}

/// Two images with separated integer rectangles in two categories.
pub fn rectangles_dataset() -> Dataset {
    let rect = |id: u64, image: u64, cat: u64, x, y, w, h| {
        Annotation::from_segmentation(id, image, cat, vec![Polygon::rectangle(x, y, w, h)])
    };
    Dataset {
        images: vec![
            Image::new(0u64, "field_a.jpg", 32, 24),
            Image::new(1u64, "field_b.jpg", 16, 16),
        ],
        categories: vec![Category::new(1u64, "leaf"), Category::new(2u64, "stem")],
        annotations: vec![
            rect(0, 0, 1, 2.0, 2.0, 6.0, 4.0),
            rect(1, 0, 2, 12.0, 3.0, 3.0, 9.0),
            rect(2, 0, 1, 20.0, 14.0, 8.0, 8.0),
            rect(3, 1, 2, 1.0, 1.0, 5.0, 5.0),
        ],
        ..Default::default()
    }
}
