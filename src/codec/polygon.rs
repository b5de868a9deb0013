//! Web-annotation polygon codec.
//!
//! Each labeled region is a W3C Web Annotation record: a tagging body holds
//! the label, and an `SvgSelector` target holds the region as
//! `<svg><polygon points="x1,y1 x2,y2 …"/></svg>`.
//!
//! Reading accepts records either as JSON strings or as already-parsed JSON
//! values; both normalize through [`RawRecord::normalize`]. Record shape is
//! checked on the raw JSON so errors can name the exact field.

use std::collections::HashMap;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    artifact_name, build_pool, check_exportable, is_cancelled, ArtifactSink, Codec,
    ConvertContext, ConvertOutput, ExportOptions, ExportResult, ImageOutcome, SourceInput,
};
use crate::category::CategoryRegistry;
use crate::conversion::{ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::PolymaskError;
use crate::geometry::{area_and_bbox, round2, Polygon};
use crate::ir::{Annotation, CategoryId, Dataset, Image, ImageId};

pub const FORMAT_ID: &str = "polygon";

const ANNO_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";
const ARTIFACT_SUFFIX: &str = ".annotation.json";

/// One annotation record as received: raw JSON text or a parsed value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    Text(String),
    Json(Value),
}

impl RawRecord {
    /// Parse text records; pass parsed values through.
    pub fn normalize(&self) -> Result<Value, serde_json::Error> {
        match self {
            RawRecord::Text(text) => serde_json::from_str(text),
            RawRecord::Json(value) => Ok(value.clone()),
        }
    }
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        RawRecord::Json(value)
    }
}

impl From<String> for RawRecord {
    fn from(text: String) -> Self {
        RawRecord::Text(text)
    }
}

/// The records of one source image.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default, rename = "annotations")]
    pub records: Vec<RawRecord>,
}

/// A typed Web Annotation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAnnotation {
    #[serde(rename = "@context", default = "default_context")]
    pub context: String,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub body: Vec<TextualBody>,
    pub target: Target,
}

fn default_context() -> String {
    ANNO_CONTEXT.to_owned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextualBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub selector: Selector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl WebAnnotation {
    /// A tagged polygon record.
    pub fn polygon(id: String, label: &str, source: Option<String>, polygon: &Polygon) -> Self {
        Self {
            context: default_context(),
            id,
            kind: "Annotation".to_owned(),
            body: vec![TextualBody {
                kind: "TextualBody".to_owned(),
                value: label.to_owned(),
                purpose: "tagging".to_owned(),
            }],
            target: Target {
                source,
                selector: Selector {
                    kind: "SvgSelector".to_owned(),
                    value: format!("<svg><polygon points=\"{}\"/></svg>", format_points(polygon)),
                },
            },
        }
    }

    /// The first tagging body's value.
    pub fn label(&self) -> Option<&str> {
        self.body
            .iter()
            .find(|b| b.purpose == "tagging")
            .map(|b| b.value.as_str())
    }
}

/// `x,y x,y …` with two decimals.
pub fn format_points(polygon: &Polygon) -> String {
    polygon
        .points()
        .iter()
        .map(|p| format!("{:.2},{:.2}", round2(p.x), round2(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numeric tokens of an SVG selector value, each rounded to two decimals.
///
/// Only the `points` attribute is scanned when present, so numbers
/// elsewhere in the markup are ignored. Integers and decimals are both
/// accepted.
pub fn parse_svg_points(selector_value: &str) -> Vec<f64> {
    scan_numbers(points_attribute(selector_value).unwrap_or(selector_value))
}

fn points_attribute(svg: &str) -> Option<&str> {
    let start = svg.find("points=")? + "points=".len();
    let rest = &svg[start..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[1..];
    body.find(quote).map(|end| &body[..end])
}

fn scan_numbers(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        if bytes[i] == b'-' && digit_at(i + 1) {
            i += 1;
        }
        if !digit_at(i) {
            i = start + 1;
            continue;
        }
        while digit_at(i) {
            i += 1;
        }
        if bytes.get(i) == Some(&b'.') && digit_at(i + 1) {
            i += 1;
            while digit_at(i) {
                i += 1;
            }
        }
        if let Ok(value) = text[start..i].parse::<f64>() {
            values.push(round2(value));
        }
    }
    values
}

/// Check one normalized record against the Web Annotation contract.
pub fn validate_record(record: &Value, context: &str) -> Result<(), PolymaskError> {
    let invalid = |field: &str, message: &str| {
        PolymaskError::validation(FORMAT_ID, field, format!("{context}: {message}"))
    };

    if record.get("type").and_then(Value::as_str) != Some("Annotation") {
        return Err(invalid("type", "expected \"Annotation\""));
    }

    let body = record
        .get("body")
        .and_then(Value::as_array)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| invalid("body", "expected a non-empty array"))?;
    let tagging = body
        .iter()
        .find(|b| b.get("purpose").and_then(Value::as_str) == Some("tagging"))
        .ok_or_else(|| invalid("body", "no entry with purpose \"tagging\""))?;
    if tagging.get("value").and_then(Value::as_str).is_none() {
        return Err(invalid("body.value", "tagging entry has no string value"));
    }

    let selector = record
        .get("target")
        .and_then(|t| t.get("selector"))
        .ok_or_else(|| invalid("target.selector", "missing"))?;
    let selector_type = selector.get("type").and_then(Value::as_str);
    if selector_type != Some("SvgSelector") {
        return Err(invalid(
            "target.selector.type",
            format!(
                "expected \"SvgSelector\", found {}",
                selector_type.unwrap_or("nothing")
            )
            .as_str(),
        ));
    }
    match selector.get("value").and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(invalid("target.selector.value", "expected a non-empty SVG string")),
    }
}

fn record_context(image: &PolygonImage, index: usize) -> String {
    format!("image '{}' record {index}", image.file_name)
}

/// Normalize and validate one record, then type it.
fn parse_record(raw: &RawRecord, context: &str) -> Result<WebAnnotation, PolymaskError> {
    let record_error =
        |err: String| PolymaskError::validation(FORMAT_ID, "record", format!("{context}: {err}"));
    let value = raw.normalize().map_err(|err| record_error(err.to_string()))?;
    validate_record(&value, context)?;
    serde_json::from_value(value).map_err(|err| record_error(err.to_string()))
}

/// Codec for Web Annotation polygon records.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolygonCodec;

impl PolygonCodec {
    fn images<'a>(&self, input: &'a SourceInput) -> Result<&'a [PolygonImage], PolymaskError> {
        match input {
            SourceInput::Polygon(images) => Ok(images),
            other => Err(PolymaskError::validation(
                FORMAT_ID,
                "input",
                format!("expected polygon records, got {} input", other.kind()),
            )),
        }
    }
}

impl Codec for PolygonCodec {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn validate(&self, input: &SourceInput) -> Result<(), PolymaskError> {
        for image in self.images(input)? {
            if image.width == 0 || image.height == 0 {
                return Err(PolymaskError::validation(
                    FORMAT_ID,
                    "width/height",
                    format!(
                        "image '{}': dimensions {}x{} must be positive",
                        image.file_name, image.width, image.height
                    ),
                ));
            }
            for (index, raw) in image.records.iter().enumerate() {
                parse_record(raw, &record_context(image, index))?;
            }
        }
        Ok(())
    }

    fn to_canonical(
        &self,
        input: SourceInput,
        ctx: &ConvertContext<'_>,
    ) -> Result<ConvertOutput, PolymaskError> {
        let images = match input {
            SourceInput::Polygon(images) => images,
            other => {
                return Err(PolymaskError::validation(
                    FORMAT_ID,
                    "input",
                    format!("expected polygon records, got {} input", other.kind()),
                ))
            }
        };
        let cancel = ctx.options.cancel.as_ref();

        // Records parse independently per image; ids are allocated below in
        // input order so they never depend on scheduling.
        let parsed: Vec<Option<Vec<ParsedRecord>>> = ctx.pool.install(|| {
            images
                .par_iter()
                .map(|source| {
                    if is_cancelled(cancel) {
                        return Ok(None);
                    }
                    parse_image(source).map(Some)
                })
                .collect::<Result<_, PolymaskError>>()
        })?;

        let mut report = ConversionReport::new(FORMAT_ID, "canonical");
        let mut registry = CategoryRegistry::new();
        let mut dataset = Dataset::default();

        for (source, records) in images.iter().zip(parsed) {
            let Some(records) = records else {
                report.add(ConversionIssue::skipped(
                    ConversionIssueCode::Cancelled,
                    "cancelled before parsing",
                    format!("image '{}'", source.file_name),
                ));
                continue;
            };
            let image_id = ImageId::new(dataset.images.len() as u64);
            let mut image = Image::new(
                image_id,
                source.file_name.as_str(),
                source.width,
                source.height,
            );
            if let Some(url) = &source.source_url {
                image = image.with_source_url(url.as_str());
            }
            dataset.images.push(image);

            for record in records {
                let (label, polygon) = match record.shape {
                    Ok(shape) => shape,
                    Err(err) => {
                        warn!("Skipping {}: {err}", record.context);
                        report.add(ConversionIssue::skipped_for(&err, record.context));
                        continue;
                    }
                };
                if area_and_bbox(&polygon).0 == 0.0 {
                    report.add(ConversionIssue::warning(
                        ConversionIssueCode::ZeroArea,
                        "polygon encloses zero area",
                        record.context,
                    ));
                }

                let category_id = registry.id_for(&label);
                let annotation_id = dataset.annotations.len() as u64;
                dataset.annotations.push(Annotation::from_segmentation(
                    annotation_id,
                    image_id,
                    category_id,
                    vec![polygon],
                ));
            }
        }

        dataset.categories = registry.categories();
        report.input = ConversionCounts {
            images: images.len(),
            categories: 0,
            annotations: images.iter().map(|i| i.records.len()).sum(),
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
        let names: HashMap<CategoryId, &str> = dataset
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();
        let pool = build_pool(options.workers)?;
        let by_image = dataset.annotations_by_image();

        let outcomes: Vec<ImageOutcome> = pool.install(|| {
            dataset
                .images
                .par_iter()
                .map(|image| {
                    let annotations = by_image.get(&image.id).map_or(&[][..], Vec::as_slice);
                    write_image(image, annotations, &names, sink, options)
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
        let written = result.absorb(outcomes);
        result.report.output = ConversionCounts {
            images: result.artifacts.len(),
            categories: dataset.categories.len(),
            annotations: written,
        };
        Ok(result)
    }
}

/// One record after parsing: its label and polygon, or the geometry error
/// that gets it skipped.
struct ParsedRecord {
    context: String,
    shape: Result<(String, Polygon), PolymaskError>,
}

fn parse_image(source: &PolygonImage) -> Result<Vec<ParsedRecord>, PolymaskError> {
    let parsed = source
        .records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let context = record_context(source, index);
            let record = parse_record(raw, &context)?;
            let label = record.label().unwrap_or_default().to_owned();
            let coords = parse_svg_points(&record.target.selector.value);
            let shape = Polygon::from_flat(&coords).map(|polygon| (label, polygon));
            Ok(ParsedRecord { context, shape })
        })
        .collect::<Result<Vec<_>, PolymaskError>>()?;
    debug!("Read {} record(s) from '{}'", parsed.len(), source.file_name);
    Ok(parsed)
}

/// Build and write one image's record list.
fn write_image(
    image: &Image,
    annotations: &[&Annotation],
    names: &HashMap<CategoryId, &str>,
    sink: &ArtifactSink,
    options: &ExportOptions,
) -> ImageOutcome {
    if is_cancelled(options.cancel.as_ref()) {
        return ImageOutcome::cancelled(image);
    }
    let mut outcome = ImageOutcome::new(image);

    let mut records = Vec::new();
    for ann in annotations {
        let label = names.get(&ann.category_id).copied();
        if let Err(err) = check_exportable(ann, label.is_some()) {
            outcome.skip(ann, &err);
            continue;
        }
        let label = label.unwrap_or_default();
        for (k, polygon) in ann.segmentation.iter().enumerate() {
            records.push(WebAnnotation::polygon(
                format!("#ann-{}-{k}", ann.id),
                label,
                Some(image.file_name.clone()),
                polygon,
            ));
        }
        outcome.exported += 1;
    }

    let name = artifact_name(image, ARTIFACT_SUFFIX);
    let written = sink.write_atomic(&name, |w| {
        serde_json::to_writer_pretty(w, &records).map_err(|source| PolymaskError::JsonWrite {
            path: sink.dir().join(&name),
            source,
        })
    });
    match &written {
        Ok(path) => debug!("Wrote {} record(s) to {}", records.len(), path.display()),
        Err(err) => warn!("Failed to write {name}: {err}"),
    }
    outcome.written = Some(written);
    outcome
}
