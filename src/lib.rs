//! Polymask: translate segmentation labels between web polygon
//! annotations, pixel class-mask rasters and a canonical hub schema.
//!
//! Every format converts through the canonical [`ir::Dataset`], so adding a
//! format means writing one [`codec::Codec`].
//!
//! # Modules
//!
//! - [`geometry`]: contour tracing, rasterization, area and bbox
//! - [`category`]: category ids, palettes and label dictionaries
//! - [`codec`]: the polygon and mask codecs
//! - [`conversion`]: validated conversion entry points and reports
//! - [`validation`]: canonical dataset checks
//! - [`ir`]: the canonical data model and its JSON form

pub mod category;
pub mod codec;
pub mod config;
pub mod conversion;
pub mod error;
pub mod geometry;
pub mod ir;
pub mod manifest;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use category::{Palette, RenderMode};
use codec::{CodecRegistry, ConvertOptions, ExportOptions, RegionPolicy, SourceInput};
use config::MetadataConfig;
pub use error::PolymaskError;

/// The polymask CLI application.
#[derive(Parser)]
#[command(name = "polymask")]
#[command(version, author, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a canonical dataset, polygon manifest or mask manifest.
    Validate(ValidateArgs),
    /// Convert polygon records or mask rasters into a canonical dataset.
    ToCanonical(ToCanonicalArgs),
    /// Write per-image polygon records or mask PNGs from a canonical dataset.
    FromCanonical(FromCanonicalArgs),
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// Input file: canonical JSON or a manifest.
    input: PathBuf,

    /// Input format ('canonical', 'polygon', or 'mask').
    #[arg(long, default_value = "canonical")]
    format: String,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct ToCanonicalArgs {
    /// Polygon or mask manifest.
    input: PathBuf,

    /// Source format ('polygon' or 'mask').
    #[arg(long)]
    format: String,

    /// Canonical JSON file to write.
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file with dataset metadata.
    #[arg(long)]
    metadata: Option<PathBuf>,

    #[arg(long, env = "POLYMASK_VERSION_TAG")]
    version_tag: Option<String>,

    #[arg(long, env = "POLYMASK_CONTRIBUTOR")]
    contributor: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    url: Option<String>,

    /// One annotation per mask value per image instead of per region.
    #[arg(long)]
    merge_regions: bool,

    /// Mask regions smaller than this many pixels are dropped.
    #[arg(long, default_value_t = 2)]
    min_region_pixels: u64,

    /// Worker threads (default: one per core).
    #[arg(long, env = "POLYMASK_WORKERS")]
    workers: Option<usize>,
}

#[derive(clap::Args)]
struct FromCanonicalArgs {
    /// Canonical JSON dataset.
    input: PathBuf,

    /// Target format ('polygon' or 'mask').
    #[arg(long)]
    format: String,

    /// Output directory.
    #[arg(short, long)]
    output: PathBuf,

    /// Mask render mode ('color' or 'category-index').
    #[arg(long, default_value = "color", value_parser = parse_mode)]
    mode: RenderMode,

    /// Mask palette ('hsv', 'tab20', or 'grayscale').
    #[arg(long, default_value = "hsv", value_parser = parse_palette)]
    palette: Palette,

    /// Worker threads (default: one per core).
    #[arg(long, env = "POLYMASK_WORKERS")]
    workers: Option<usize>,
}

fn parse_mode(s: &str) -> Result<RenderMode, String> {
    s.parse().map_err(|e: PolymaskError| e.to_string())
}

fn parse_palette(s: &str) -> Result<Palette, String> {
    s.parse().map_err(|e: PolymaskError| e.to_string())
}

/// Run the polymask CLI.
///
/// This is the main entry point for the CLI, called from `main.rs` after
/// the logger is installed.
pub fn run(cli: Cli) -> Result<(), PolymaskError> {
    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::ToCanonical(args)) => run_to_canonical(args),
        Some(Commands::FromCanonical(args)) => run_from_canonical(args),
        None => {
            println!("polymask {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Polygon and mask segmentation label converter.");
            println!();
            println!("Run 'polymask --help' for usage information.");
            Ok(())
        }
    }
}

fn load_source(format: &str, input: &Path) -> Result<SourceInput, PolymaskError> {
    match format {
        codec::polygon::FORMAT_ID => Ok(SourceInput::Polygon(
            manifest::read_polygon_manifest(input)?,
        )),
        codec::mask::FORMAT_ID => Ok(SourceInput::Mask(manifest::read_mask_manifest(input)?)),
        other => Err(PolymaskError::UnsupportedFormat(format!(
            "'{other}' (supported: polygon, mask)"
        ))),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), PolymaskError> {
    if args.format != "canonical" {
        let registry = CodecRegistry::new();
        let codec = registry.require(&args.format)?;
        let input = load_source(codec.id(), &args.input)?;
        codec.validate(&input)?;
        match args.output.as_str() {
            "json" => println!(
                "{}",
                serde_json::json!({
                    "format": codec.id(),
                    "images": input.image_count(),
                    "valid": true,
                })
            ),
            _ => println!(
                "Valid {} input: {} image(s)",
                codec.id(),
                input.image_count()
            ),
        }
        return Ok(());
    }

    let dataset = ir::io_json::read_canonical_json(&args.input)?;
    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_dataset(&dataset, &opts);

    match args.output.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&report).map_err(|source| {
                PolymaskError::JsonWrite {
                    path: PathBuf::from("<stdout>"),
                    source,
                }
            })?;
            println!("{json}");
        }
        _ => print!("{report}"),
    }

    validation::check_schema(&dataset)?;
    validation::ensure_valid(report, args.strict)
}

fn run_to_canonical(args: ToCanonicalArgs) -> Result<(), PolymaskError> {
    let registry = CodecRegistry::new();
    let codec = registry.require(&args.format)?;
    let input = load_source(codec.id(), &args.input)?;

    let mut metadata = match &args.metadata {
        Some(path) => MetadataConfig::load(path)?,
        None => MetadataConfig::default(),
    };
    if let Some(version) = args.version_tag {
        metadata.version = version;
    }
    if let Some(contributor) = args.contributor {
        metadata.contributor = contributor;
    }
    if let Some(description) = args.description {
        metadata.description = description;
    }
    if let Some(url) = args.url {
        metadata.url = url;
    }

    let mut options = ConvertOptions {
        workers: args.workers,
        ..Default::default()
    };
    if args.merge_regions {
        options.region_policy = RegionPolicy::MergeByValue;
    }
    options.trace.min_region_pixels = args.min_region_pixels;

    let conversion = conversion::convert_to_canonical(codec, input, &metadata, &options)?;
    ir::io_json::write_canonical_json(&args.output, &conversion.dataset)?;

    print!("{}", conversion.report);
    println!("Wrote {}", args.output.display());
    Ok(())
}

fn run_from_canonical(args: FromCanonicalArgs) -> Result<(), PolymaskError> {
    let registry = CodecRegistry::new();
    let codec = registry.require(&args.format)?;
    let dataset = ir::io_json::read_canonical_json(&args.input)?;

    let options = ExportOptions {
        mode: args.mode,
        palette: args.palette,
        workers: args.workers,
        cancel: None,
    };
    let result = conversion::convert_from_canonical(codec, &dataset, &args.output, &options)?;

    if codec.id() == codec::mask::FORMAT_ID && !result.artifacts.is_empty() {
        let sink = codec::ArtifactSink::create(&args.output)?;
        let dictionary = codec::mask::dictionary_for(&dataset, &options)?;
        manifest::write_mask_manifest(&sink, &dictionary, &dataset, &result.artifacts)?;
    }

    print!("{}", result.report);
    println!(
        "Wrote {} artifact(s) to {}",
        result.artifacts.len(),
        args.output.display()
    );

    for failure in &result.failures {
        eprintln!(
            "Failed: image {} '{}': {}",
            failure.image_id, failure.file_name, failure.message
        );
    }
    if result.failures.is_empty() {
        Ok(())
    } else {
        Err(PolymaskError::ExportIncomplete {
            failed: result.failures.len(),
            total: dataset.images.len(),
        })
    }
}
