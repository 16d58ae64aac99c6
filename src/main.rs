//! markdoc: generate markdown pages from templated doc comments.
//!
//! Reads a `markdoc.toml` manifest, renders one page per subject and writes
//! them under the output directory (or prints them with `--stdout`).

use anyhow::{Context, Result};
use clap::Parser;
use markdoc::config::{Manifest, DEFAULT_MANIFEST};
use markdoc::sink::{DiskSink, NullSink};
use markdoc::source::FileLocator;
use markdoc::{Generator, SubjectRegistry};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "markdoc",
    about = "Generate cross-linked markdown pages from templated doc comments"
)]
struct Cli {
    /// Manifest file
    #[arg(short = 'c', long, default_value = DEFAULT_MANIFEST)]
    config: PathBuf,

    /// Output directory (overrides project.output_dir)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Worker threads (overrides project.parallelism)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Only document these members, e.g. --method 'Billing::Invoice#total'.
    /// Can be specified multiple times.
    #[arg(long = "method")]
    methods: Vec<String>,

    /// Print pages to stdout instead of writing files
    #[arg(long)]
    stdout: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let manifest = Manifest::load(&cli.config)
        .with_context(|| format!("failed to load manifest {}", cli.config.display()))?;
    let subjects = manifest.subjects().context("failed to collect subjects")?;
    let registry = SubjectRegistry::new(subjects).context("failed to register subjects")?;

    let methods = if cli.methods.is_empty() {
        &manifest.project.methods
    } else {
        &cli.methods
    };
    let generator = Generator::new(registry, FileLocator::new(manifest.root()))
        .links(manifest.links())
        .extractor(manifest.extractor()?)
        .parallelism(cli.jobs.unwrap_or(manifest.project.parallelism))
        .source_links(manifest.project.source_links)
        .methods(methods)
        .context("invalid method filter")?;

    if cli.stdout {
        let tree = generator.run(&NullSink).context("documentation run failed")?;
        for page in tree.values().flat_map(|pages| pages.values()) {
            if !page.is_empty() {
                print!("{}", page.text);
            }
        }
        return Ok(());
    }

    let output = cli.output.unwrap_or_else(|| manifest.output_dir());
    let sink = DiskSink::new(&output);
    let tree = generator.run(&sink).context("documentation run failed")?;
    let pages = tree.values().map(|pages| pages.len()).sum::<usize>();
    info!(pages, output = %output.display(), "done");
    Ok(())
}

/// Log to stderr, filtered by `MARKDOC_LOG` (default `warn`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("MARKDOC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
