#![allow(dead_code)]

use std::collections::BTreeMap;

use polymask::geometry::{Point, Polygon};
use polymask::ir::{Annotation, Category, CategoryId, Dataset, Image, ImageId};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Canonical values are rounded to 2 decimals.
pub const EPS_ROUNDED: f64 = 1e-2;

/// Side of one grid cell in generated images. Each rectangle lives in its
/// own cell with a 1px margin so no two rectangles touch, not even at a
/// corner.
pub const CELL: u32 = 12;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// What a region means independent of annotation ids and processing order.
/// Category ids are part of the meaning: a round trip must keep them.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct RegionSem {
    pub image_file: String,
    pub category_id: u64,
    pub category: String,
    pub bbox: [f64; 4],
    pub area: f64,
}

pub fn region_semantics(dataset: &Dataset) -> Result<Vec<RegionSem>, String> {
    let image_by_id: BTreeMap<ImageId, String> = dataset
        .images
        .iter()
        .map(|img| (img.id, img.file_name.clone()))
        .collect();
    let category_by_id: BTreeMap<CategoryId, String> = dataset
        .categories
        .iter()
        .map(|cat| (cat.id, cat.name.clone()))
        .collect();

    let mut out = Vec::with_capacity(dataset.annotations.len());
    for ann in &dataset.annotations {
        let image_file = image_by_id.get(&ann.image_id).ok_or_else(|| {
            format!(
                "annotation {} references missing image_id {}",
                ann.id.as_u64(),
                ann.image_id.as_u64()
            )
        })?;
        let category = category_by_id.get(&ann.category_id).ok_or_else(|| {
            format!(
                "annotation {} references missing category_id {}",
                ann.id.as_u64(),
                ann.category_id.as_u64()
            )
        })?;
        out.push(RegionSem {
            image_file: image_file.clone(),
            category_id: ann.category_id.as_u64(),
            category: category.clone(),
            bbox: ann.bbox.to_xywh(),
            area: ann.area,
        });
    }

    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(out)
}

pub fn assert_regions_equivalent(a: &Dataset, b: &Dataset, eps: f64) -> Result<(), String> {
    let left = region_semantics(a)?;
    let right = region_semantics(b)?;

    if left.len() != right.len() {
        return Err(format!(
            "annotation count mismatch: left={} right={}",
            left.len(),
            right.len()
        ));
    }

    for (l, r) in left.iter().zip(&right) {
        let close = l.bbox.iter().zip(&r.bbox).all(|(x, y)| (x - y).abs() <= eps)
            && (l.area - r.area).abs() <= eps;
        let same_category = l.category_id == r.category_id && l.category == r.category;
        if l.image_file != r.image_file || !same_category || !close {
            return Err(format!("region mismatch: left={l:?} right={r:?}"));
        }
    }
    Ok(())
}

/// One rectangle inside grid cell `(cx, cy)`: offset and size within the
/// cell's interior.
fn arb_cell_rect() -> impl Strategy<Value = (u32, u32, u32, u32)> {
    let interior = CELL - 2;
    (2u32..=interior, 2u32..=interior).prop_flat_map(move |(w, h)| {
        (0u32..=interior - w, 0u32..=interior - h, Just(w), Just(h))
    })
}

/// Grid shape of one image plus, per cell, whether it holds a rectangle,
/// the rectangle, and a category seed.
fn arb_grid_image(
    max_cats: usize,
) -> impl Strategy<Value = ((u32, u32), Vec<(bool, (u32, u32, u32, u32), u64)>)> {
    (1u32..=4, 1u32..=3).prop_flat_map(move |(cols, rows)| {
        let cells = (cols * rows) as usize;
        (
            Just((cols, rows)),
            proptest::collection::vec(
                (any::<bool>(), arb_cell_rect(), 1u64..=max_cats as u64),
                cells..=cells,
            ),
        )
    })
}

/// Datasets of integer rectangles that never touch each other, so every
/// annotation rasterizes to exactly one connected region.
pub fn arb_rect_dataset(max_images: usize, max_cats: usize) -> BoxedStrategy<Dataset> {
    assert!(max_images > 0, "max_images must be > 0");
    assert!(max_cats > 0, "max_cats must be > 0");

    (1usize..=max_images, 1usize..=max_cats)
        .prop_flat_map(move |(image_count, category_count)| {
            (
                proptest::collection::vec(arb_grid_image(max_cats), image_count..=image_count),
                Just(category_count),
            )
        })
        .prop_map(|(images, category_count)| {
            let mut dataset = Dataset {
                categories: (1..=category_count as u64)
                    .map(|id| Category::new(id, format!("class_{id}")))
                    .collect(),
                ..Default::default()
            };

            for (index, ((cols, rows), cells)) in images.into_iter().enumerate() {
                let image_id = ImageId::new(index as u64);
                dataset.images.push(Image::new(
                    image_id,
                    format!("img_{index:03}.png"),
                    cols * CELL,
                    rows * CELL,
                ));
                for (cell, (used, (x, y, w, h), cat)) in cells.into_iter().enumerate() {
                    if !used {
                        continue;
                    }
                    let cx = (cell as u32 % cols) * CELL + 1;
                    let cy = (cell as u32 / cols) * CELL + 1;
                    let category_id = 1 + (cat - 1) % category_count as u64;
                    let id = dataset.annotations.len() as u64;
                    dataset.annotations.push(Annotation::from_segmentation(
                        id,
                        image_id,
                        category_id,
                        vec![Polygon::rectangle(
                            (cx + x) as f64,
                            (cy + y) as f64,
                            w as f64,
                            h as f64,
                        )],
                    ));
                }
            }
            dataset
        })
        .boxed()
}

/// Star-shaped polygons around (50, 50): strictly increasing angles with
/// every gap below a half turn, so they never self-intersect.
pub fn arb_simple_polygon() -> BoxedStrategy<Polygon> {
    proptest::collection::vec((0.5f64..1.0, 1.0f64..40.0), 3..12)
        .prop_map(|spokes| {
            let total: f64 = spokes.iter().map(|(step, _)| step).sum();
            let mut angle: f64 = 0.0;
            let points = spokes
                .iter()
                .map(|(step, radius)| {
                    angle += step / total * std::f64::consts::TAU;
                    Point::new(50.0 + radius * angle.cos(), 50.0 + radius * angle.sin())
                })
                .collect();
            Polygon::new(points)
        })
        .boxed()
}
