//! The canonical hub representation.
//!
//! Codecs parse their format into a [`Dataset`] and render a [`Dataset`]
//! back out; no codec converts directly to another. Construction is
//! permissive: a polygon may have too few points and an annotation may point
//! at a missing category. [`crate::validation`] reports those.
//!
//! # Example
//!
//! ```
//! use polymask::geometry::Polygon;
//! use polymask::ir::{Annotation, Category, Dataset, Image};
//!
//! let dataset = Dataset {
//!     images: vec![Image::new(0u64, "leaf.jpg", 64, 64)],
//!     categories: vec![Category::new(1u64, "leaf")],
//!     annotations: vec![Annotation::from_segmentation(
//!         0u64,
//!         0u64,
//!         1u64,
//!         vec![Polygon::rectangle(10.0, 10.0, 10.0, 10.0)],
//!     )],
//!     ..Default::default()
//! };
//! assert_eq!(dataset.annotations[0].area, 100.0);
//! ```

mod ids;
pub mod io_json;
mod model;

pub use ids::{AnnotationId, CategoryId, ImageId, LicenseId};
pub use model::{Annotation, Category, Dataset, DatasetInfo, Image, License};
