//! Area and bounding-box measurement.
//!
//! Both conversion directions (traced mask contours and parsed polygon
//! strings) go through [`area_and_bbox`], so the derived `area`/`bbox` of an
//! annotation never depends on where its polygon came from.

use super::types::{BBox, Polygon};

/// Signed shoelace area. Positive for rings that run clockwise on screen
/// (y pointing down), which is the orientation the contour tracer emits.
pub fn signed_area(polygon: &Polygon) -> f64 {
    let twice: f64 = polygon
        .edges()
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice / 2.0
}

/// Area enclosed by the ring, independent of orientation.
///
/// For a ring traced along pixel edges this equals the number of pixels
/// inside it.
pub fn area(polygon: &Polygon) -> f64 {
    signed_area(polygon).abs()
}

/// Tight axis-aligned box `(min_x, min_y, max_x - min_x, max_y - min_y)`.
///
/// An empty polygon yields the zero box at the origin.
pub fn bbox(polygon: &Polygon) -> BBox {
    let mut points = polygon.points().iter();
    let Some(first) = points.next() else {
        return BBox::default();
    };
    let (min_x, min_y, max_x, max_y) = points.fold(
        (first.x, first.y, first.x, first.y),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );
    BBox::from_corners(min_x, min_y, max_x, max_y)
}

/// Area and bounding box of one polygon.
///
/// Degenerate (zero-area) polygons are returned as-is; flagging them is the
/// caller's job.
pub fn area_and_bbox(polygon: &Polygon) -> (f64, BBox) {
    (area(polygon), bbox(polygon))
}

/// Area and bounding box of a multi-polygon segmentation.
///
/// Areas are summed and boxes unioned; overlap between parts is not
/// subtracted.
pub fn segmentation_area_and_bbox(polygons: &[Polygon]) -> (f64, BBox) {
    let mut iter = polygons.iter().map(area_and_bbox);
    let Some((first_area, first_bbox)) = iter.next() else {
        return (0.0, BBox::default());
    };
    iter.fold((first_area, first_bbox), |(total, acc), (area, bbox)| {
        (total + area, acc.union(&bbox))
    })
}
