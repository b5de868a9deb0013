//! Pixel class-mask codec.
//!
//! Import traces every labeled region of each mask raster into polygons;
//! export rasterizes each image's annotations onto a blank canvas and
//! writes it as a PNG. Both directions run one image per task on the
//! call's worker pool.

use std::collections::BTreeSet;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::DynamicImage;
use log::{debug, warn};
use rayon::prelude::*;

use super::{
    artifact_name, build_pool, check_exportable, is_cancelled, ArtifactSink, Codec,
    ConvertContext, ConvertOutput, ExportOptions, ExportResult, ImageOutcome, RegionPolicy,
    SourceInput,
};
use crate::category::{assign, CategoryRegistry, LabelDictionary, RenderMap, RenderMode};
use crate::conversion::{ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::PolymaskError;
use crate::geometry::{trace_regions, LabelRaster, LabelValue, Polygon, TracedRegion};
use crate::ir::{Annotation, Dataset, Image, ImageId};

pub const FORMAT_ID: &str = "mask";

const ARTIFACT_SUFFIX: &str = ".mask.png";

/// One mask raster and the source image it labels.
#[derive(Debug, Clone)]
pub struct MaskSource {
    pub file_name: String,
    pub source_width: u32,
    pub source_height: u32,
    pub label: LabelRaster,
    pub dictionary: LabelDictionary,
}

impl MaskSource {
    /// Decode a mask file. Single-channel 8-bit files become index rasters,
    /// everything else is converted to RGB.
    pub fn read(
        file_name: impl Into<String>,
        source_size: Option<(u32, u32)>,
        mask_path: &Path,
        dictionary: LabelDictionary,
    ) -> Result<Self, PolymaskError> {
        let label = match image::open(mask_path)? {
            DynamicImage::ImageLuma8(gray) => LabelRaster::Index(gray),
            other => LabelRaster::Color(other.to_rgb8()),
        };
        let (source_width, source_height) = source_size.unwrap_or_else(|| label.dimensions());
        Ok(Self {
            file_name: file_name.into(),
            source_width,
            source_height,
            label,
            dictionary,
        })
    }

    fn check(&self) -> Result<(), PolymaskError> {
        let shape = self.label.dimensions();
        if shape != (self.source_width, self.source_height) {
            return Err(PolymaskError::validation(
                FORMAT_ID,
                "label",
                format!(
                    "image '{}': mask is {}x{} but the source image is {}x{}",
                    self.file_name, shape.0, shape.1, self.source_width, self.source_height
                ),
            ));
        }
        if let Some(value) = self
            .label
            .distinct_values()
            .into_iter()
            .find(|v| !self.dictionary.contains(*v))
        {
            return Err(PolymaskError::validation(
                FORMAT_ID,
                "dictionary",
                format!(
                    "image '{}': mask value {value} is not in the label dictionary",
                    self.file_name
                ),
            ));
        }
        Ok(())
    }
}

/// Codec for class-mask rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskCodec;

fn expect_masks(input: &SourceInput) -> Result<&[MaskSource], PolymaskError> {
    match input {
        SourceInput::Mask(sources) => Ok(sources),
        other => Err(PolymaskError::validation(
            FORMAT_ID,
            "input",
            format!("expected mask rasters, got {} input", other.kind()),
        )),
    }
}

impl Codec for MaskCodec {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn validate(&self, input: &SourceInput) -> Result<(), PolymaskError> {
        expect_masks(input)?.iter().try_for_each(MaskSource::check)
    }

    fn to_canonical(
        &self,
        input: SourceInput,
        ctx: &ConvertContext<'_>,
    ) -> Result<ConvertOutput, PolymaskError> {
        let sources = expect_masks(&input)?;
        let options = ctx.options;

        // Tracing is the expensive part and independent per image. Ids are
        // allocated afterwards, in input order, so they never depend on
        // scheduling.
        let traced: Vec<Option<Vec<TracedRegion>>> = ctx.pool.install(|| {
            sources
                .par_iter()
                .map(|source| {
                    if is_cancelled(options.cancel.as_ref()) {
                        return None;
                    }
                    let regions = trace_regions(&source.label, &options.trace);
                    debug!("Traced {} region(s) in '{}'", regions.len(), source.file_name);
                    Some(regions)
                })
                .collect()
        });

        let mut report = ConversionReport::new(FORMAT_ID, "canonical");
        let mut registry = CategoryRegistry::new();
        for name in sources.iter().flat_map(|s| s.dictionary.category_order()) {
            registry.id_for(name);
        }
        let mut dataset = Dataset::default();

        for (source, regions) in sources.iter().zip(traced) {
            let Some(regions) = regions else {
                report.add(ConversionIssue::skipped(
                    ConversionIssueCode::Cancelled,
                    "cancelled before tracing",
                    format!("image '{}'", source.file_name),
                ));
                continue;
            };
            let image_id = ImageId::new(dataset.images.len() as u64);
            dataset.images.push(Image::new(
                image_id,
                source.file_name.as_str(),
                source.source_width,
                source.source_height,
            ));

            let groups = group_regions(source, regions, options.region_policy, &mut report);
            for (value, polygons) in groups {
                let context = format!("image '{}' value {value}", source.file_name);
                let Some(name) = source.dictionary.name_for(value) else {
                    let err = PolymaskError::reference(
                        context.clone(),
                        format!("value {value} is not in the label dictionary"),
                    );
                    warn!("Skipping {err}");
                    report.add(ConversionIssue::skipped_for(&err, context));
                    continue;
                };
                let category_id = registry.id_for(name);
                let annotation_id = dataset.annotations.len() as u64;
                dataset.annotations.push(Annotation::from_segmentation(
                    annotation_id,
                    image_id,
                    category_id,
                    polygons,
                ));
            }
        }

        dataset.categories = registry.categories();
        report.input = ConversionCounts {
            images: sources.len(),
            categories: sources
                .iter()
                .flat_map(|s| s.dictionary.iter().map(|(_, name)| name))
                .collect::<BTreeSet<_>>()
                .len(),
            annotations: 0,
        };
        report.output = ConversionCounts {
            images: dataset.images.len(),
            categories: dataset.categories.len(),
            annotations: dataset.annotations.len(),
        };
        Ok(ConvertOutput { dataset, report })
    }

    fn from_canonical(
        &self,
        dataset: &Dataset,
        sink: &ArtifactSink,
        options: &ExportOptions,
    ) -> Result<ExportResult, PolymaskError> {
        let render_map = assign(&dataset.categories, options.mode, options.palette)?;
        let pool = build_pool(options.workers)?;
        let by_image = dataset.annotations_by_image();

        let outcomes: Vec<ImageOutcome> = pool.install(|| {
            dataset
                .images
                .par_iter()
                .map(|image| {
                    let annotations = by_image.get(&image.id).map_or(&[][..], Vec::as_slice);
                    render_image(image, annotations, &render_map, sink, options)
                })
                .collect()
        });

        let mut result = ExportResult {
            report: ConversionReport::new("canonical", FORMAT_ID),
            ..Default::default()
        };
        result.report.input = ConversionCounts {
            images: dataset.images.len(),
            categories: dataset.categories.len(),
            annotations: dataset.annotations.len(),
        };
        let rendered = result.absorb(outcomes);
        result.report.output = ConversionCounts {
            images: result.artifacts.len(),
            categories: render_map.len(),
            annotations: rendered,
        };
        Ok(result)
    }
}

/// Turn one image's traced regions into `(value, polygons)` groups in
/// first-pixel order.
fn group_regions(
    source: &MaskSource,
    regions: Vec<TracedRegion>,
    policy: RegionPolicy,
    report: &mut ConversionReport,
) -> Vec<(LabelValue, Vec<Polygon>)> {
    for region in regions.iter().filter(|r| !r.holes.is_empty()) {
        report.add(ConversionIssue::info(
            ConversionIssueCode::HoleNotSubtracted,
            format!(
                "{} hole(s) traced; area counts the filled outline",
                region.holes.len()
            ),
            format!("image '{}' value {}", source.file_name, region.value),
        ));
    }

    match policy {
        RegionPolicy::PerComponent => regions
            .into_iter()
            .map(|region| (region.value, vec![region.outer]))
            .collect(),
        RegionPolicy::MergeByValue => {
            let mut groups: Vec<(LabelValue, Vec<Polygon>)> = Vec::new();
            for region in regions {
                match groups.iter_mut().find(|(value, _)| *value == region.value) {
                    Some((_, polygons)) => polygons.push(region.outer),
                    None => groups.push((region.value, vec![region.outer])),
                }
            }
            for (value, polygons) in groups.iter().filter(|(_, p)| p.len() > 1) {
                report.add(ConversionIssue::info(
                    ConversionIssueCode::RegionsMerged,
                    format!("{} regions merged into one annotation", polygons.len()),
                    format!("image '{}' value {value}", source.file_name),
                ));
            }
            groups
        }
    }
}

/// Rasterize and write one image. The canvas is dropped on return.
fn render_image(
    image: &Image,
    annotations: &[&Annotation],
    render_map: &RenderMap,
    sink: &ArtifactSink,
    options: &ExportOptions,
) -> ImageOutcome {
    if is_cancelled(options.cancel.as_ref()) {
        return ImageOutcome::cancelled(image);
    }
    let mut outcome = ImageOutcome::new(image);

    let mut canvas = match render_map.mode() {
        RenderMode::Color => LabelRaster::blank_color(image.width, image.height),
        RenderMode::CategoryIndex => LabelRaster::blank_index(image.width, image.height),
    };
    for ann in annotations {
        let value = render_map.value_for(ann.category_id);
        if let Err(err) = check_exportable(ann, value.is_some()) {
            outcome.skip(ann, &err);
            continue;
        }
        let Some(value) = value else { continue };
        for polygon in &ann.segmentation {
            canvas.fill_polygon(polygon, value);
        }
        outcome.exported += 1;
    }

    let name = artifact_name(image, ARTIFACT_SUFFIX);
    let written = sink.write_atomic(&name, |w| {
        let encoder = PngEncoder::new(w);
        match &canvas {
            LabelRaster::Index(img) => img.write_with_encoder(encoder)?,
            LabelRaster::Color(img) => img.write_with_encoder(encoder)?,
        }
        Ok(())
    });
    match &written {
        Ok(path) => debug!("Wrote {}", path.display()),
        Err(err) => warn!("Failed to write {name}: {err}"),
    }
    outcome.written = Some(written);
    outcome
}

/// Build the dictionary that inverts a render, for writing next to the
/// mask artifacts.
pub fn dictionary_for(
    dataset: &Dataset,
    options: &ExportOptions,
) -> Result<LabelDictionary, PolymaskError> {
    Ok(assign(&dataset.categories, options.mode, options.palette)?.to_dictionary())
}
