//! Category ids, label dictionaries and render colors.

mod dictionary;
pub mod palette;
mod registry;

pub use dictionary::LabelDictionary;
pub use palette::{assign, color_for, Palette, RenderMap, RenderMode, MAX_COLOR_CATEGORIES};
pub use registry::CategoryRegistry;
