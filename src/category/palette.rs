//! Deterministic category colors and render-value assignment.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use image::Rgb;

use super::dictionary::LabelDictionary;
use crate::error::PolymaskError;
use crate::geometry::LabelValue;
use crate::ir::{Category, CategoryId};

/// Largest category count [`color_for`] can give distinct colors.
///
/// The fully saturated hue ring has exactly this many 8-bit RGB steps.
pub const MAX_COLOR_CATEGORIES: u64 = 6 * 255;

/// Matplotlib's `tab20` qualitative palette.
const TAB20: [[u8; 3]; 20] = [
    [31, 119, 180],
    [174, 199, 232],
    [255, 127, 14],
    [255, 187, 120],
    [44, 160, 44],
    [152, 223, 138],
    [214, 39, 40],
    [255, 152, 150],
    [148, 103, 189],
    [197, 176, 213],
    [140, 86, 75],
    [196, 156, 148],
    [227, 119, 194],
    [247, 182, 210],
    [127, 127, 127],
    [199, 199, 199],
    [188, 189, 34],
    [219, 219, 141],
    [23, 190, 207],
    [158, 218, 229],
];

/// Color scheme used when rendering categories as RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Palette {
    /// Evenly spaced hues at full saturation and value.
    #[default]
    Hsv,
    /// The 20 `tab20` colors; falls back to [`Palette::Hsv`] above 20 categories.
    Tab20,
    /// Evenly spaced grays, at most 255 categories.
    Grayscale,
}

impl Palette {
    pub fn as_str(&self) -> &'static str {
        match self {
            Palette::Hsv => "hsv",
            Palette::Tab20 => "tab20",
            Palette::Grayscale => "grayscale",
        }
    }

    /// Largest `total` this palette can color without collisions.
    pub fn capacity(&self) -> u64 {
        match self {
            Palette::Hsv | Palette::Tab20 => MAX_COLOR_CATEGORIES,
            Palette::Grayscale => 255,
        }
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Palette {
    type Err = PolymaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hsv" => Ok(Palette::Hsv),
            "tab20" => Ok(Palette::Tab20),
            "grayscale" | "gray" | "grey" => Ok(Palette::Grayscale),
            other => Err(PolymaskError::validation(
                "palette",
                "name",
                format!("unknown palette '{other}' (supported: hsv, tab20, grayscale)"),
            )),
        }
    }
}

/// Color for `category_id` out of `total` categories.
///
/// Pure: the same inputs always give the same color. Ids `1..=total` get
/// pairwise distinct colors and none is black.
///
/// # Errors
/// Returns [`PolymaskError::Validation`] if `total` exceeds the palette's
/// capacity, or if the id is 0 or larger than `total`.
pub fn color_for(
    category_id: CategoryId,
    palette: Palette,
    total: u64,
) -> Result<Rgb<u8>, PolymaskError> {
    let id = category_id.as_u64();
    if total > palette.capacity() {
        return Err(PolymaskError::validation(
            "palette",
            "total",
            format!(
                "{total} categories exceed the {} colors of palette '{palette}'",
                palette.capacity()
            ),
        ));
    }
    if id == 0 || id > total {
        return Err(PolymaskError::validation(
            "palette",
            "category_id",
            format!("category id {id} outside 1..={total}"),
        ));
    }

    let rgb = match palette {
        Palette::Tab20 if total <= TAB20.len() as u64 => TAB20[(id - 1) as usize],
        Palette::Hsv | Palette::Tab20 => hue_ring((id - 1) * MAX_COLOR_CATEGORIES / total),
        Palette::Grayscale => {
            let v = ((id * 255) as f64 / total as f64).round() as u8;
            [v, v, v]
        }
    };
    Ok(Rgb(rgb))
}

/// Step `k` (`0..1530`) around the saturated RGB hue ring, starting at red.
fn hue_ring(k: u64) -> [u8; 3] {
    let offset = (k % 255) as u8;
    let rising = offset;
    let falling = 255 - offset;
    match k / 255 {
        0 => [255, rising, 0],
        1 => [falling, 255, 0],
        2 => [0, 255, rising],
        3 => [0, falling, 255],
        4 => [rising, 0, 255],
        _ => [255, 0, falling],
    }
}

/// How categories are rendered into a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// RGB mask, one palette color per category.
    #[default]
    Color,
    /// Single-channel mask whose value is the category id.
    CategoryIndex,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderMode::Color => "color",
            RenderMode::CategoryIndex => "category-index",
        })
    }
}

impl FromStr for RenderMode {
    type Err = PolymaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "color" | "colour" | "rgb" => Ok(RenderMode::Color),
            "category-index" | "index" => Ok(RenderMode::CategoryIndex),
            other => Err(PolymaskError::validation(
                "render mode",
                "mode",
                format!("unknown render mode '{other}' (supported: color, category-index)"),
            )),
        }
    }
}

/// Category id to render value, built once per export.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMap {
    mode: RenderMode,
    entries: BTreeMap<CategoryId, (String, LabelValue)>,
}

impl RenderMap {
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn value_for(&self, id: CategoryId) -> Option<LabelValue> {
        self.entries.get(&id).map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The inverse mapping (value to category name), so a mask rendered
    /// with this map converts back to the same categories with the same ids.
    pub fn to_dictionary(&self) -> LabelDictionary {
        let mut dictionary = LabelDictionary::new();
        for (name, value) in self.entries.values() {
            dictionary.insert(*value, name.clone());
        }
        let order = self.entries.values().map(|(name, _)| name.clone()).collect();
        dictionary.with_category_order(order)
    }
}

/// Assign a render value to every category.
///
/// In [`RenderMode::Color`] the palette total is the largest category id,
/// so sparse ids still color deterministically. In
/// [`RenderMode::CategoryIndex`] the id itself is the pixel value.
///
/// # Errors
/// Returns [`PolymaskError::Validation`] when a category id cannot be
/// rendered (0, above 255 in index mode, or beyond the palette capacity).
pub fn assign(
    categories: &[Category],
    mode: RenderMode,
    palette: Palette,
) -> Result<RenderMap, PolymaskError> {
    let total = categories
        .iter()
        .map(|c| c.id.as_u64())
        .max()
        .unwrap_or(0);

    let mut entries = BTreeMap::new();
    for category in categories {
        let value = match mode {
            RenderMode::Color => LabelValue::Color(color_for(category.id, palette, total)?.0),
            RenderMode::CategoryIndex => {
                let id = category.id.as_u64();
                match u8::try_from(id) {
                    Ok(v) if v > 0 => LabelValue::Index(v),
                    _ => {
                        return Err(PolymaskError::validation(
                            "render mode",
                            "category_id",
                            format!("category id {id} does not fit a single-channel value 1..=255"),
                        ))
                    }
                }
            }
        };
        entries.insert(category.id, (category.name.clone(), value));
    }
    Ok(RenderMap { mode, entries })
}
