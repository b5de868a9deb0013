use image::{GrayImage, Luma};
use polymask::category::{color_for, Palette};
use polymask::codec::polygon::{format_points, parse_svg_points};
use polymask::geometry::{
    area_and_bbox, rasterize_polygon, round2, trace_regions, LabelRaster, LabelValue, Polygon,
    TraceOptions,
};
use polymask::ir::CategoryId;
use proptest::prelude::*;

mod proptest_helpers;

use proptest_helpers::EPS_ROUNDED;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn area_and_bbox_follow_translation(
        polygon in proptest_helpers::arb_simple_polygon(),
        dx in -30i32..30,
        dy in -30i32..30,
    ) {
        let (area, bbox) = area_and_bbox(&polygon);
        let (moved_area, moved_bbox) =
            area_and_bbox(&polygon.clone().translated(f64::from(dx), f64::from(dy)));

        prop_assert!((area - moved_area).abs() <= EPS_ROUNDED);
        prop_assert!((bbox.x + f64::from(dx) - moved_bbox.x).abs() <= EPS_ROUNDED);
        prop_assert!((bbox.y + f64::from(dy) - moved_bbox.y).abs() <= EPS_ROUNDED);
        prop_assert!((bbox.width - moved_bbox.width).abs() <= EPS_ROUNDED);
        prop_assert!(area <= bbox.width * bbox.height + EPS_ROUNDED);
    }

    #[test]
    fn filled_pixels_stay_inside_bbox(polygon in proptest_helpers::arb_simple_polygon()) {
        let mut canvas = GrayImage::new(100, 100);
        rasterize_polygon(&mut canvas, &polygon, Luma([1]));
        let (_, bbox) = area_and_bbox(&polygon);

        for (x, y, px) in canvas.enumerate_pixels() {
            if px.0[0] == 1 {
                let (cx, cy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
                prop_assert!(cx >= bbox.x && cx <= bbox.max_x());
                prop_assert!(cy >= bbox.y && cy <= bbox.max_y());
            }
        }
    }

    #[test]
    fn traced_rectangle_matches_rasterized_one(
        x in 0u32..20,
        y in 0u32..20,
        w in 2u32..20,
        h in 2u32..20,
    ) {
        let rect = Polygon::rectangle(f64::from(x), f64::from(y), f64::from(w), f64::from(h));
        let mut raster = LabelRaster::blank_index(42, 42);
        prop_assert!(raster.fill_polygon(&rect, LabelValue::Index(5)));

        let regions = trace_regions(&raster, &TraceOptions::default());
        prop_assert_eq!(regions.len(), 1);
        prop_assert_eq!(regions[0].pixel_count, u64::from(w * h));

        let (area, bbox) = area_and_bbox(&regions[0].outer);
        let (expected_area, expected_bbox) = area_and_bbox(&rect);
        prop_assert_eq!(area, expected_area);
        prop_assert_eq!(bbox, expected_bbox);
    }

    #[test]
    fn formatted_points_parse_to_rounded_coordinates(
        polygon in proptest_helpers::arb_simple_polygon(),
    ) {
        let parsed = parse_svg_points(&format!(
            "<svg><polygon points=\"{}\"></polygon></svg>",
            format_points(&polygon)
        ));
        let expected: Vec<f64> = polygon.to_flat().into_iter().map(round2).collect();

        prop_assert_eq!(parsed.len(), expected.len());
        for (got, want) in parsed.iter().zip(&expected) {
            prop_assert!((got - want).abs() <= EPS_ROUNDED + 1e-9);
        }
    }

    #[test]
    fn palette_colors_are_distinct(total in 1u64..=64) {
        for palette in [Palette::Hsv, Palette::Tab20, Palette::Grayscale] {
            let mut seen = std::collections::HashSet::new();
            for id in 1..=total {
                let color = color_for(CategoryId::new(id), palette, total).unwrap();
                prop_assert!(seen.insert(color.0), "{palette} repeats {:?} at id {id}", color.0);
                prop_assert_ne!(color.0, [0, 0, 0]);
            }
        }
    }
}
