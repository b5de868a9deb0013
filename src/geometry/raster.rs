//! Labeled rasters and polygon rasterization.
//!
//! A pixel `(x, y)` covers the unit square `[x, x+1) x [y, y+1)`. Polygon
//! vertices live on pixel corners, and a pixel is filled when its center
//! `(x + 0.5, y + 0.5)` lies inside the polygon (even-odd rule). This is
//! the exact inverse of the crack-following tracer in
//! [`contour`](super::contour): tracing a rasterized integer polygon gives
//! the polygon back.

use std::collections::BTreeSet;
use std::fmt;

use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};

use super::types::Polygon;

/// The value of one labeled pixel: a single-channel index or an RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelValue {
    Index(u8),
    Color([u8; 3]),
}

impl LabelValue {
    /// Returns true for the background value (index 0 or black).
    pub fn is_background(&self) -> bool {
        matches!(self, LabelValue::Index(0) | LabelValue::Color([0, 0, 0]))
    }

    /// Expands to RGB; an index `v` becomes the gray `(v, v, v)`.
    pub fn to_rgb(self) -> Rgb<u8> {
        match self {
            LabelValue::Index(v) => Rgb([v, v, v]),
            LabelValue::Color(rgb) => Rgb(rgb),
        }
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Index(v) => write!(f, "{v}"),
            LabelValue::Color([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

/// A 2-D labeled raster: single-channel values or 3-channel colors.
#[derive(Clone, Debug)]
pub enum LabelRaster {
    Index(GrayImage),
    Color(RgbImage),
}

impl LabelRaster {
    /// A blank single-channel raster (all background).
    pub fn blank_index(width: u32, height: u32) -> Self {
        LabelRaster::Index(GrayImage::new(width, height))
    }

    /// A blank 3-channel raster (all black).
    pub fn blank_color(width: u32, height: u32) -> Self {
        LabelRaster::Color(RgbImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        match self {
            LabelRaster::Index(img) => img.width(),
            LabelRaster::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            LabelRaster::Index(img) => img.height(),
            LabelRaster::Color(img) => img.height(),
        }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// The value at `(x, y)`. Panics if out of bounds, like `get_pixel`.
    pub fn value_at(&self, x: u32, y: u32) -> LabelValue {
        match self {
            LabelRaster::Index(img) => LabelValue::Index(img.get_pixel(x, y).0[0]),
            LabelRaster::Color(img) => LabelValue::Color(img.get_pixel(x, y).0),
        }
    }

    /// Distinct non-background values present, in ascending order.
    pub fn distinct_values(&self) -> BTreeSet<LabelValue> {
        let values: BTreeSet<LabelValue> = match self {
            LabelRaster::Index(img) => img.pixels().map(|p| LabelValue::Index(p.0[0])).collect(),
            LabelRaster::Color(img) => img.pixels().map(|p| LabelValue::Color(p.0)).collect(),
        };
        values.into_iter().filter(|v| !v.is_background()).collect()
    }

    /// Fill `polygon` with `value`.
    ///
    /// An index value drawn on a color raster is expanded to gray. A color
    /// value drawn on an index raster is rejected and `false` is returned.
    pub fn fill_polygon(&mut self, polygon: &Polygon, value: LabelValue) -> bool {
        match (self, value) {
            (LabelRaster::Index(img), LabelValue::Index(v)) => {
                rasterize_polygon(img, polygon, Luma([v]));
                true
            }
            (LabelRaster::Color(img), value) => {
                rasterize_polygon(img, polygon, value.to_rgb());
                true
            }
            (LabelRaster::Index(_), LabelValue::Color(_)) => false,
        }
    }
}

/// Fill the interior of `polygon` on `canvas` with `fill`, in place.
///
/// Uses the even-odd rule with pixel-center sampling. Parts of the polygon
/// outside the canvas are clipped. Calling this repeatedly composites in
/// call order: later polygons overwrite earlier pixels.
pub fn rasterize_polygon<P>(
    canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    polygon: &Polygon,
    fill: P,
) where
    P: Pixel,
{
    if polygon.len() < Polygon::MIN_POINTS || !polygon.is_finite() {
        return;
    }
    let (width, height) = canvas.dimensions();
    let bounds = super::measure::bbox(polygon);

    let row_start = (bounds.y - 0.5).ceil().max(0.0) as u32;
    let row_end = ((bounds.max_y() - 0.5).ceil().max(0.0) as u32).min(height);

    let mut crossings: Vec<f64> = Vec::with_capacity(polygon.len());
    for y in row_start..row_end {
        let yc = f64::from(y) + 0.5;
        crossings.clear();
        for (a, b) in polygon.edges() {
            // Half-open on y so a vertex shared by two edges counts once.
            if (a.y > yc) != (b.y > yc) {
                crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let x_start = (span[0] - 0.5).ceil().max(0.0) as u32;
            let x_end = ((span[1] - 0.5).ceil().max(0.0) as u32).min(width);
            for x in x_start..x_end {
                canvas.put_pixel(x, y, fill);
            }
        }
    }
}

/// Rasterize every polygon of one annotation in list order.
pub fn rasterize_annotation<P>(
    canvas: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    polygons: &[Polygon],
    fill: P,
) where
    P: Pixel,
{
    for polygon in polygons {
        rasterize_polygon(canvas, polygon, fill);
    }
}
