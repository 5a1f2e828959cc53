//! prov-expand - Instantiate a PROV template from variable bindings
//!
//! Reads a template document and a bindings file, expands the template,
//! and writes the instantiated document. Standard PROV serialisations
//! (PROV-N, PROV-XML, Turtle) are out of scope; documents are exchanged
//! in the crate's serde-JSON representation, so only `.json` output is
//! accepted.
//!
//! # Usage
//!
//! ```bash
//! # Expand with a PROV-bindings document (Format A)
//! prov-expand -i template.json -b bindings.json -o expanded.json
//!
//! # Expand with JSON v3 bindings (Format B)
//! prov-expand -i template.json -b bindings.v3.json -3 -o expanded.json
//! ```
//!
//! Exits 0 on success; any expansion or bindings-format error prints a
//! single diagnostic line and exits non-zero without writing output.

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use provtmpl::{
    expand, read_bindings_json_v3, read_bindings_provdoc, BindingsStore, Document,
};

/// Instantiate a PROV template from variable bindings
#[derive(Parser, Debug)]
#[command(name = "prov-expand")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template document (serde-JSON representation)
    #[arg(short = 'i', long = "template")]
    template: PathBuf,

    /// Bindings file
    #[arg(short = 'b', long = "bindings")]
    bindings: PathBuf,

    /// Output path (.json)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Read the bindings as JSON v3 instead of a PROV-bindings document
    #[arg(short = '3', long = "bindver3")]
    bindver3: bool,

    /// Quiet mode: suppress the success summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(summary) => {
            if !args.quiet {
                println!(
                    "{} {} ({} records, {} bundles)",
                    "expanded".green(),
                    args.output.display(),
                    summary.records,
                    summary.bundles
                );
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{}: {:#}", "error".red(), error);
            ExitCode::FAILURE
        }
    }
}

struct Summary {
    records: usize,
    bundles: usize,
}

fn run(args: &Args) -> anyhow::Result<Summary> {
    if args.output.extension().and_then(|ext| ext.to_str()) != Some("json") {
        bail!(
            "unsupported output extension for '{}': only .json is supported",
            args.output.display()
        );
    }

    let mut template = read_document(&args.template)?;
    let store = load_bindings(args, &mut template)?;

    let expanded = expand(&template, store)?;

    let rendered = serde_json::to_string_pretty(&expanded)
        .context("failed to serialise the expanded document")?;
    std::fs::write(&args.output, rendered)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;

    Ok(Summary {
        records: expanded.records.len(),
        bundles: expanded.bundles.len(),
    })
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("failed to parse document '{}'", path.display()))
}

/// Loads the bindings and merges bindings-side namespaces into the
/// template's registry.
fn load_bindings(args: &Args, template: &mut Document) -> anyhow::Result<BindingsStore> {
    let source = std::fs::read_to_string(&args.bindings)
        .with_context(|| format!("failed to read '{}'", args.bindings.display()))?;

    if args.bindver3 {
        let json: serde_json::Value = serde_json::from_str(&source)
            .with_context(|| format!("failed to parse '{}'", args.bindings.display()))?;
        let (store, merged) = read_bindings_json_v3(&json, &template.namespaces)?;
        template.namespaces = merged;
        Ok(store)
    } else {
        let doc: Document = serde_json::from_str(&source).with_context(|| {
            format!("failed to parse bindings document '{}'", args.bindings.display())
        })?;
        let store = read_bindings_provdoc(&doc)?;
        template.namespaces.merge(&doc.namespaces);
        Ok(store)
    }
}
