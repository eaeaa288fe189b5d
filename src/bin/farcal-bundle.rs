//! Offline tool that keeps the feature order and the model in one file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farcal::bundle::{BundleFile, CategoryEncoder, ModelSpec};
use farcal::model::Predictor;
use farcal::schema;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "farcal-bundle", version, about = "Build and check farcal model bundles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical feature order as JSON
    Schema {
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Combine a model and its encoders into a validated bundle
    Pack {
        /// Model JSON (`{"kind": "forest", ...}` or `{"kind": "torchscript", "path": ...}`)
        #[arg(long)]
        model: PathBuf,
        /// Encoders JSON: feature name -> {"categories": {...}, "default": x}
        #[arg(long)]
        encoders: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Load a bundle the way the service does and print a summary
    Inspect { bundle: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Schema { out } => write_schema(out.as_deref()),
        Command::Pack { model, encoders, name, out } => pack(&model, &encoders, name, &out),
        Command::Inspect { bundle } => inspect(&bundle),
    }
}

fn write_schema(out: Option<&Path>) -> Result<()> {
    let txt = serde_json::to_string_pretty(&schema::feature_names())?;
    match out {
        Some(path) => {
            fs::write(path, txt).with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote {} features to {}", schema::FEATURES.len(), path.display());
        }
        None => println!("{txt}"),
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let txt = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

fn pack(model: &Path, encoders: &Path, name: Option<String>, out: &Path) -> Result<()> {
    let model: ModelSpec = read_json(model)?;
    let encoders: BTreeMap<String, CategoryEncoder> = read_json(encoders)?;
    let bundle = BundleFile::pack(name, encoders, model);

    // Refuse to write anything the service would refuse to load.
    let base_dir = out.parent().unwrap_or_else(|| Path::new("."));
    Predictor::from_bundle(bundle.clone(), base_dir).context("bundle failed validation")?;

    bundle.write(out)?;
    println!("wrote {} bundle to {}", bundle.model.kind(), out.display());
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let p = Predictor::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    let warm = p.warmup().context("warmup forward failed")?;

    println!("bundle:  {}", p.name().unwrap_or("unnamed"));
    println!("format:  v{}", p.format_version());
    println!("model:   {}", p.model_kind());
    println!("warmup:  {warm:.1}");
    println!("features ({}):", p.features().len());
    for (i, f) in p.features().iter().enumerate() {
        println!("  {}. {}", i + 1, f);
    }
    Ok(())
}
