//! The geometry engine: polygon measurement, rasterization and contour
//! tracing.
//!
//! Everything here is pure and format-agnostic. Codecs call into this module
//! and never the other way round.

pub mod contour;
pub mod measure;
pub mod raster;
mod types;

pub use contour::{trace_contours, trace_regions, TraceOptions, TracedContour, TracedRegion};
pub use imageproc::region_labelling::Connectivity;
pub use measure::{area_and_bbox, segmentation_area_and_bbox};
pub use raster::{rasterize_polygon, rasterize_annotation, LabelRaster, LabelValue};
pub use types::{round2, BBox, Point, Polygon};
