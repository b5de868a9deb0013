//! Region contour tracing for labeled rasters.
//!
//! Regions come from `imageproc`'s connected-component labelling; each
//! region's boundary is then walked along pixel edges ("crack following"),
//! so vertices land on integer pixel corners and the shoelace area of a
//! traced ring equals the pixel count it encloses. Only corners are kept:
//! straight runs collapse to their two end points.

use image::{ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use super::raster::{LabelRaster, LabelValue};
use super::types::{Point, Polygon};

type Labels = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Options for [`trace_regions`].
#[derive(Debug, Clone, Copy)]
pub struct TraceOptions {
    /// How same-valued pixels join into one region. With
    /// [`Connectivity::Eight`] diagonal neighbours belong to one region and
    /// its outline passes through the shared corner.
    pub connectivity: Connectivity,
    /// Regions with fewer pixels than this are dropped as noise.
    pub min_region_pixels: u64,
    /// Also trace the boundaries of enclosed holes.
    pub include_holes: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            min_region_pixels: 2,
            include_holes: false,
        }
    }
}

/// One connected region of a single label value.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedRegion {
    pub value: LabelValue,
    /// Outer boundary, clockwise on screen, starting at the top-left corner
    /// of the region's first pixel in raster order.
    pub outer: Polygon,
    /// Hole boundaries in raster order of their first pixel. Empty unless
    /// [`TraceOptions::include_holes`] is set.
    pub holes: Vec<Polygon>,
    pub pixel_count: u64,
}

/// One traced ring, flattened out of its [`TracedRegion`].
#[derive(Debug, Clone, PartialEq)]
pub struct TracedContour {
    pub value: LabelValue,
    pub polygon: Polygon,
    pub is_hole: bool,
    /// Index of the owning region in [`trace_regions`] output.
    pub region: usize,
}

/// Trace `raster` and flatten each region into its outer ring followed by
/// its holes.
pub fn trace_contours(raster: &LabelRaster, options: &TraceOptions) -> Vec<TracedContour> {
    trace_regions(raster, options)
        .into_iter()
        .enumerate()
        .flat_map(|(region, traced)| {
            let value = traced.value;
            std::iter::once((traced.outer, false))
                .chain(traced.holes.into_iter().map(|hole| (hole, true)))
                .map(move |(polygon, is_hole)| TracedContour {
                    value,
                    polygon,
                    is_hole,
                    region,
                })
        })
        .collect()
}

struct RegionStats {
    label: u32,
    first: (u32, u32),
    count: u64,
    min: (u32, u32),
    max: (u32, u32),
}

/// Trace every non-background region of `raster`.
///
/// Regions are returned in raster order of their first pixel, which makes
/// the output deterministic for a given raster.
pub fn trace_regions(raster: &LabelRaster, options: &TraceOptions) -> Vec<TracedRegion> {
    let labels = match raster {
        LabelRaster::Index(img) => connected_components(img, options.connectivity, Luma([0u8])),
        LabelRaster::Color(img) => {
            connected_components(img, options.connectivity, image::Rgb([0u8, 0, 0]))
        }
    };

    let diagonal_joins = options.connectivity == Connectivity::Eight;
    region_stats(&labels)
        .into_iter()
        .filter(|stats| stats.count >= options.min_region_pixels)
        .map(|stats| {
            let inside = |x: i64, y: i64| label_at(&labels, x, y) == Some(stats.label);
            let outer = trace_boundary(inside, stats.first, diagonal_joins);
            let holes = if options.include_holes {
                trace_holes(&labels, &stats, diagonal_joins)
            } else {
                Vec::new()
            };
            TracedRegion {
                value: raster.value_at(stats.first.0, stats.first.1),
                outer,
                holes,
                pixel_count: stats.count,
            }
        })
        .collect()
}

fn label_at(labels: &Labels, x: i64, y: i64) -> Option<u32> {
    if x < 0 || y < 0 || x >= i64::from(labels.width()) || y >= i64::from(labels.height()) {
        return None;
    }
    Some(labels.get_pixel(x as u32, y as u32).0[0])
}

/// Per-label first pixel, pixel count and bounds, ordered by first pixel.
fn region_stats(labels: &Labels) -> Vec<RegionStats> {
    let mut slot_of_label: Vec<Option<usize>> = Vec::new();
    let mut stats: Vec<RegionStats> = Vec::new();

    for (x, y, pixel) in labels.enumerate_pixels() {
        let label = pixel.0[0];
        if label == 0 {
            continue;
        }
        let idx = label as usize;
        if idx >= slot_of_label.len() {
            slot_of_label.resize(idx + 1, None);
        }
        match slot_of_label[idx] {
            Some(slot) => {
                let s = &mut stats[slot];
                s.count += 1;
                s.min = (s.min.0.min(x), s.min.1.min(y));
                s.max = (s.max.0.max(x), s.max.1.max(y));
            }
            None => {
                slot_of_label[idx] = Some(stats.len());
                stats.push(RegionStats {
                    label,
                    first: (x, y),
                    count: 1,
                    min: (x, y),
                    max: (x, y),
                });
            }
        }
    }
    stats
}

/// Trace the holes of one region.
///
/// Holes are the components of the region's complement, taken inside a
/// one-pixel padded box around the region, that do not touch the padding.
/// The complement uses the dual connectivity so holes and region never
/// cross each other at a saddle corner.
fn trace_holes(labels: &Labels, region: &RegionStats, region_diagonal: bool) -> Vec<Polygon> {
    let width = region.max.0 - region.min.0 + 3;
    let height = region.max.1 - region.min.1 + 3;
    let origin_x = i64::from(region.min.0) - 1;
    let origin_y = i64::from(region.min.1) - 1;

    let complement = ImageBuffer::from_fn(width, height, |x, y| {
        let in_region =
            label_at(labels, origin_x + i64::from(x), origin_y + i64::from(y)) == Some(region.label);
        Luma([if in_region { 0u8 } else { 255 }])
    });
    let hole_connectivity = if region_diagonal {
        Connectivity::Four
    } else {
        Connectivity::Eight
    };
    let hole_labels = connected_components(&complement, hole_connectivity, Luma([0u8]));

    let mut exterior: Vec<u32> = Vec::new();
    for (x, y, pixel) in hole_labels.enumerate_pixels() {
        let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
        if on_border && pixel.0[0] != 0 && !exterior.contains(&pixel.0[0]) {
            exterior.push(pixel.0[0]);
        }
    }

    region_stats(&hole_labels)
        .into_iter()
        .filter(|hole| !exterior.contains(&hole.label))
        .map(|hole| {
            let inside = |x: i64, y: i64| label_at(&hole_labels, x, y) == Some(hole.label);
            trace_boundary(inside, hole.first, !region_diagonal)
                .translated(origin_x as f64, origin_y as f64)
        })
        .collect()
}

// Headings, clockwise: east, south, west, north.
const EAST: usize = 0;
const STEP: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

fn turn_right(dir: usize) -> usize {
    (dir + 1) % 4
}

fn turn_left(dir: usize) -> usize {
    (dir + 3) % 4
}

/// The two pixels ahead of vertex `(vx, vy)` when heading `dir`, as
/// `(ahead_left, ahead_right)`.
fn pixels_ahead(vx: i64, vy: i64, dir: usize) -> ((i64, i64), (i64, i64)) {
    match dir {
        0 => ((vx, vy - 1), (vx, vy)),
        1 => ((vx, vy), (vx - 1, vy)),
        2 => ((vx - 1, vy), (vx - 1, vy - 1)),
        _ => ((vx - 1, vy - 1), (vx, vy - 1)),
    }
}

/// Walk the outer boundary of the region containing `start`, keeping the
/// region on the right-hand side.
///
/// `start` must be the region's first pixel in raster order, so its top
/// and left neighbours are outside and its top-left corner is a plain
/// convex corner the walk returns to exactly once.
fn trace_boundary<F>(inside: F, start: (u32, u32), diagonal_joins: bool) -> Polygon
where
    F: Fn(i64, i64) -> bool,
{
    let start = (i64::from(start.0), i64::from(start.1));
    let mut vertex = start;
    let mut dir = EAST;
    let mut corners = vec![start];

    loop {
        vertex = (vertex.0 + STEP[dir].0, vertex.1 + STEP[dir].1);
        let (left, right) = pixels_ahead(vertex.0, vertex.1, dir);
        let next = match (inside(left.0, left.1), inside(right.0, right.1)) {
            (true, true) => turn_left(dir),
            (false, true) => dir,
            (false, false) => turn_right(dir),
            // Saddle: only the diagonal pixel ahead-left is inside.
            (true, false) if diagonal_joins => turn_left(dir),
            (true, false) => turn_right(dir),
        };
        if vertex == start && next == EAST {
            break;
        }
        if next != dir {
            corners.push(vertex);
        }
        dir = next;
    }

    Polygon::new(
        corners
            .into_iter()
            .map(|(x, y)| Point::new(x as f64, y as f64))
            .collect(),
    )
}
