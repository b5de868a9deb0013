//! Format codecs: the seam between an external label format and the
//! canonical [`Dataset`].
//!
//! Every codec implements [`Codec`]. The orchestrator in
//! [`crate::conversion`] always calls `validate` before either transform.

pub mod mask;
pub mod polygon;
mod sink;

pub use mask::{MaskCodec, MaskSource};
pub use polygon::{PolygonCodec, PolygonImage, RawRecord, WebAnnotation};
pub use sink::{artifact_name, ArtifactSink};

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::category::{Palette, RenderMode};
use crate::conversion::{ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::PolymaskError;
use crate::geometry::{Polygon, TraceOptions};
use crate::ir::{Annotation, Dataset, Image, ImageId};

/// Shared flag checked before each image; set it to stop a running call.
pub type CancelFlag = Arc<AtomicBool>;

pub(crate) fn is_cancelled(flag: Option<&CancelFlag>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Normalized in-memory input for [`Codec::to_canonical`].
#[derive(Debug, Clone)]
pub enum SourceInput {
    Polygon(Vec<PolygonImage>),
    Mask(Vec<MaskSource>),
}

impl SourceInput {
    /// The codec id this input belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceInput::Polygon(_) => polygon::FORMAT_ID,
            SourceInput::Mask(_) => mask::FORMAT_ID,
        }
    }

    pub fn image_count(&self) -> usize {
        match self {
            SourceInput::Polygon(images) => images.len(),
            SourceInput::Mask(sources) => sources.len(),
        }
    }
}

/// How traced mask regions become annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionPolicy {
    /// One annotation per connected component.
    #[default]
    PerComponent,
    /// One multi-polygon annotation per label value per image.
    MergeByValue,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub region_policy: RegionPolicy,
    pub trace: TraceOptions,
    /// Worker threads for per-image work; `None` uses rayon's default.
    pub workers: Option<usize>,
    pub cancel: Option<CancelFlag>,
}

/// Everything a codec needs for one `to_canonical` call.
pub struct ConvertContext<'a> {
    pub options: &'a ConvertOptions,
    pub pool: &'a rayon::ThreadPool,
}

/// Result of [`Codec::to_canonical`].
#[derive(Debug, Clone)]
pub struct ConvertOutput {
    pub dataset: Dataset,
    pub report: ConversionReport,
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub mode: RenderMode,
    pub palette: Palette,
    pub workers: Option<usize>,
    pub cancel: Option<CancelFlag>,
}

/// One image whose artifact could not be written.
#[derive(Debug, Clone)]
pub struct ArtifactFailure {
    pub image_id: ImageId,
    pub file_name: String,
    pub message: String,
}

/// Result of [`Codec::from_canonical`].
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    /// Written artifacts by image. Cancelled and failed images are absent.
    pub artifacts: BTreeMap<ImageId, PathBuf>,
    pub failures: Vec<ArtifactFailure>,
    pub report: ConversionReport,
}

impl ExportResult {
    /// Fold per-image outcomes in image order and return how many
    /// annotations reached a written artifact.
    pub(crate) fn absorb(&mut self, outcomes: Vec<ImageOutcome>) -> usize {
        let mut exported = 0;
        for outcome in outcomes {
            self.report.extend(outcome.issues);
            match outcome.written {
                Some(Ok(path)) => {
                    exported += outcome.exported;
                    self.artifacts.insert(outcome.image_id, path);
                }
                Some(Err(err)) => {
                    self.report.add(ConversionIssue::skipped(
                        ConversionIssueCode::ArtifactWriteFailed,
                        err.to_string(),
                        format!("image {} '{}'", outcome.image_id, outcome.file_name),
                    ));
                    self.failures.push(ArtifactFailure {
                        image_id: outcome.image_id,
                        file_name: outcome.file_name,
                        message: err.to_string(),
                    });
                }
                None => {}
            }
        }
        exported
    }
}

/// What exporting one image produced.
pub(crate) struct ImageOutcome {
    pub image_id: ImageId,
    pub file_name: String,
    /// `None` when cancelled.
    pub written: Option<Result<PathBuf, PolymaskError>>,
    pub exported: usize,
    pub issues: Vec<ConversionIssue>,
}

impl ImageOutcome {
    pub fn new(image: &Image) -> Self {
        Self {
            image_id: image.id,
            file_name: image.file_name.clone(),
            written: None,
            exported: 0,
            issues: Vec::new(),
        }
    }

    /// Note a skipped annotation.
    pub fn skip(&mut self, ann: &Annotation, err: &PolymaskError) {
        warn!("Skipping {err}");
        self.issues
            .push(ConversionIssue::skipped_for(err, format!("annotation {}", ann.id)));
    }

    /// The outcome of an image reached after cancellation.
    pub fn cancelled(image: &Image) -> Self {
        let mut outcome = Self::new(image);
        outcome.issues.push(ConversionIssue::skipped(
            ConversionIssueCode::Cancelled,
            "cancelled before processing",
            format!("image {} '{}'", image.id, image.file_name),
        ));
        outcome
    }
}

/// Per-annotation checks every exporter runs before using an annotation.
///
/// # Errors
/// [`PolymaskError::Reference`] when the category is unknown;
/// [`PolymaskError::Geometry`] when there are no polygons or a polygon is
/// too short or not finite.
pub(crate) fn check_exportable(
    ann: &Annotation,
    category_known: bool,
) -> Result<(), PolymaskError> {
    let context = format!("annotation {}", ann.id);
    if !category_known {
        return Err(PolymaskError::reference(
            context,
            format!("unknown category {}", ann.category_id),
        ));
    }
    if ann.segmentation.is_empty() {
        return Err(PolymaskError::geometry(context, "no polygons"));
    }
    for (k, polygon) in ann.segmentation.iter().enumerate() {
        if polygon.len() < Polygon::MIN_POINTS {
            return Err(PolymaskError::geometry(
                context,
                format!(
                    "polygon {k} has {} point(s), at least {} required",
                    polygon.len(),
                    Polygon::MIN_POINTS
                ),
            ));
        }
        if !polygon.is_finite() {
            return Err(PolymaskError::geometry(
                context,
                format!("polygon {k} has non-finite coordinates"),
            ));
        }
    }
    Ok(())
}

/// A label format that converts to and from the canonical dataset.
pub trait Codec: Send + Sync {
    /// Format id, e.g. `"polygon"`.
    fn id(&self) -> &'static str;

    /// Check that `input` meets this format's structural contract.
    ///
    /// # Errors
    /// [`PolymaskError::Validation`] naming the offending item and field.
    fn validate(&self, input: &SourceInput) -> Result<(), PolymaskError>;

    fn to_canonical(
        &self,
        input: SourceInput,
        ctx: &ConvertContext<'_>,
    ) -> Result<ConvertOutput, PolymaskError>;

    /// Write one artifact per image of `dataset` into `sink`.
    fn from_canonical(
        &self,
        dataset: &Dataset,
        sink: &ArtifactSink,
        options: &ExportOptions,
    ) -> Result<ExportResult, PolymaskError>;
}

/// Build the bounded worker pool for one call.
pub fn build_pool(workers: Option<usize>) -> Result<rayon::ThreadPool, PolymaskError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = workers {
        builder = builder.num_threads(n);
    }
    Ok(builder.build()?)
}

/// Codec lookup by format id.
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Box<dyn Codec>>,
}

impl CodecRegistry {
    /// A registry with the built-in codecs.
    pub fn new() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
        };
        registry.register(Box::new(PolygonCodec));
        registry.register(Box::new(MaskCodec));
        registry
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.insert(codec.id(), codec);
    }

    pub fn get(&self, id: &str) -> Option<&dyn Codec> {
        self.codecs.get(id).map(|c| c.as_ref())
    }

    /// Like [`get`](Self::get) but unknown ids are an error.
    pub fn require(&self, id: &str) -> Result<&dyn Codec, PolymaskError> {
        self.get(id).ok_or_else(|| {
            PolymaskError::UnsupportedFormat(format!(
                "'{id}' (supported: {})",
                self.ids().join(", ")
            ))
        })
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.codecs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
