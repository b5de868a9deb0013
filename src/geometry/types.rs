//! Point, polygon and bounding-box types shared by the geometry engine and
//! the canonical model.
//!
//! Coordinates are kept as unrounded `f64` everywhere. Rounding to two
//! decimals happens only when a value crosses a format boundary (see
//! [`round2`]).

use serde::{Deserialize, Serialize};

use crate::error::PolymaskError;

/// Rounds a coordinate to two decimal digits.
///
/// Only format writers and readers call this; geometry never does.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A 2D point in image coordinates (pixel corners sit on integers).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A closed polygon: an ordered ring of points, implicitly closed
/// (the last point connects back to the first).
///
/// Construction is permissive: a polygon with fewer than three points can
/// exist so that validation can report it instead of a parser panicking.
/// At the JSON boundary a polygon is the flat list `[x1, y1, x2, y2, ...]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Minimum number of points for a non-degenerate ring.
    pub const MIN_POINTS: usize = 3;

    /// Create a polygon from its points.
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Create a polygon from a flat `[x1, y1, x2, y2, ...]` sequence.
    ///
    /// # Errors
    /// Returns [`PolymaskError::Geometry`] if the sequence has an odd length
    /// or describes fewer than three points.
    pub fn from_flat(coords: &[f64]) -> Result<Self, PolymaskError> {
        if coords.len() % 2 != 0 {
            return Err(PolymaskError::geometry(
                "polygon",
                format!("odd coordinate count {}", coords.len()),
            ));
        }
        let polygon = Self::from_flat_unchecked(coords);
        if polygon.len() < Self::MIN_POINTS {
            return Err(PolymaskError::geometry(
                "polygon",
                format!(
                    "{} point(s), at least {} required",
                    polygon.len(),
                    Self::MIN_POINTS
                ),
            ));
        }
        Ok(polygon)
    }

    fn from_flat_unchecked(coords: &[f64]) -> Self {
        Self(
            coords
                .chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect(),
        )
    }

    /// Create an axis-aligned rectangle with top-left `(x, y)`.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self(vec![
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    /// Flatten to `[x1, y1, x2, y2, ...]`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.0.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the polygon has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a slice of all points.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Iterate over the closed ring's edges as `(start, end)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.0.len();
        (0..n).map(move |i| (self.0[i], self.0[(i + 1) % n]))
    }

    /// Returns true if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(Point::is_finite)
    }

    /// Returns a copy with every coordinate rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|p| Point::new(round2(p.x), round2(p.y)))
                .collect(),
        )
    }

    /// Translate every point by `(dx, dy)`.
    pub fn translated(mut self, dx: f64, dy: f64) -> Self {
        for point in &mut self.0 {
            point.x += dx;
            point.y += dy;
        }
        self
    }
}

impl From<Vec<Point>> for Polygon {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl Serialize for Polygon {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.0.len() * 2))?;
        for point in &self.0 {
            seq.serialize_element(&round2(point.x))?;
            seq.serialize_element(&round2(point.y))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Polygon {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let coords = Vec::<f64>::deserialize(deserializer)?;
        if coords.len() % 2 != 0 {
            return Err(serde::de::Error::custom(format!(
                "polygon has odd coordinate count {}",
                coords.len()
            )));
        }
        // Short rings are kept so validation can report them.
        Ok(Self::from_flat_unchecked(&coords))
    }
}

/// A tight axis-aligned bounding box `(x, y, width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    /// Creates a box from its top-left corner and size.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a box from min and max corners.
    #[inline]
    pub fn from_corners(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Returns `[x, y, width, height]`.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Returns the smallest box containing both boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Returns true if all fields are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Returns a copy with every field rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self::new(
            round2(self.x),
            round2(self.y),
            round2(self.width),
            round2(self.height),
        )
    }
}

impl Serialize for BBox {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rounded().to_xywh().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BBox {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, width, height] = <[f64; 4]>::deserialize(deserializer)?;
        Ok(BBox::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
        assert_eq!(round2(-3.456), -3.46);
    }

    #[test]
    fn from_flat_rejects_odd_length() {
        let err = Polygon::from_flat(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, PolymaskError::Geometry { .. }));
    }

    #[test]
    fn from_flat_rejects_two_points() {
        let err = Polygon::from_flat(&[0.0, 0.0, 1.0, 1.0]).unwrap_err();
        assert!(err.to_string().contains("at least 3"));
    }

    #[test]
    fn flat_roundtrip_keeps_order() {
        let flat = [10.0, 10.0, 20.0, 10.0, 20.0, 20.0];
        let polygon = Polygon::from_flat(&flat).unwrap();
        assert_eq!(polygon.len(), 3);
        assert_eq!(polygon.to_flat(), flat.to_vec());
    }

    #[test]
    fn polygon_serializes_flat_and_rounded() {
        let polygon = Polygon::new(vec![
            Point::new(1.234_56, 2.0),
            Point::new(3.0, 4.999),
            Point::new(5.0, 6.0),
        ]);
        let json = serde_json::to_string(&polygon).unwrap();
        assert_eq!(json, "[1.23,2.0,3.0,5.0,5.0,6.0]");
    }

    #[test]
    fn polygon_deserialize_rejects_odd_length() {
        let result: Result<Polygon, _> = serde_json::from_str("[1.0, 2.0, 3.0]");
        assert!(result.is_err());
    }

    #[test]
    fn bbox_union_and_serde() {
        let a = BBox::new(0.0, 0.0, 2.0, 2.0);
        let b = BBox::new(5.0, 1.0, 1.0, 4.0);
        let u = a.union(&b);
        assert_eq!(u, BBox::new(0.0, 0.0, 6.0, 5.0));

        let json = serde_json::to_string(&u).unwrap();
        assert_eq!(json, "[0.0,0.0,6.0,5.0]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, u);
    }
}
