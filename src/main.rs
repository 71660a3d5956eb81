//! PDF RAG Chunker CLI
//!
//! Reads fragment streams (JSON produced by a PDF extraction engine), builds
//! each document's structure tree and writes size-bounded chunks to disk.

use anyhow::{Context, Result};
use clap::Parser;
use pdf_rag_chunker::config::PipelineConfig;
use pdf_rag_chunker::input::{discover_inputs, load_document};
use pdf_rag_chunker::output::OutputWriter;
use pdf_rag_chunker::paths::document_labels;
use pdf_rag_chunker::pipeline::DocumentPipeline;
use pdf_rag_chunker::types::DocumentInput;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "pdf-rag-chunker",
    version,
    long_version = LONG_VERSION,
    about = "Structure-aware chunking of extracted PDF text for RAG",
    after_help = "EXAMPLES:\n  \
                  # Chunk one fragment stream with the default configuration\n  \
                  pdf-rag-chunker -i book.json -o chunks/\n\n  \
                  # Chunk every *.json stream below a directory\n  \
                  pdf-rag-chunker --input-dir extracted/ -c chunker.toml\n\n  \
                  # Print the default configuration as TOML\n  \
                  pdf-rag-chunker --show-config"
)]
struct Cli {
    /// Fragment stream file (JSON); may be repeated
    #[arg(short, long)]
    input: Vec<PathBuf>,

    /// Directory searched recursively for fragment streams
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Output directory (overrides the configuration file)
    #[arg(short, long, env = "PDF_RAG_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Configuration file (TOML or JSON)
    #[arg(short, long, env = "PDF_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    show_config: bool,

    /// Print the JSON schema of the fragment stream format and exit
    #[arg(long)]
    print_input_schema: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if cli.show_config {
        print!("{}", PipelineConfig::default().to_toml_string()?);
        return Ok(());
    }

    if cli.print_input_schema {
        let schema = schemars::schema_for!(DocumentInput);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    config.apply_env_overrides();
    if let Some(output) = cli.output {
        config.output.output_dir = output;
    }

    let mut paths = cli.input;
    if let Some(dir) = &cli.input_dir {
        paths.extend(discover_inputs(dir)?);
    }
    if paths.is_empty() {
        anyhow::bail!("No input given; pass --input or --input-dir");
    }

    let pipeline = DocumentPipeline::new(config)?;
    let mut inputs = Vec::with_capacity(paths.len());
    for path in &paths {
        match load_document(path) {
            Ok(input) => inputs.push(input),
            Err(e) if e.is_user_error() => tracing::error!("Skipping {}: {}", path.display(), e),
            Err(e) => return Err(e).with_context(|| format!("Failed to load {}", path.display())),
        }
    }

    let output_dir = &pipeline.config().output.output_dir;
    let writer = OutputWriter::new(&pipeline.config().output);
    let labels = document_labels(inputs.iter().map(|i| i.source.as_str()));
    let results = pipeline.process_batch(&inputs);

    let mut failed = 0;
    let mut total_chunks = 0;
    for (result, label) in results.into_iter().zip(labels) {
        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("{}", e);
                failed += 1;
                continue;
            }
        };
        let report = writer.write(&doc, &output_dir.join(&label))?;
        total_chunks += report.chunks_written;
    }

    tracing::info!(
        "Finished: {} documents, {} chunks written to {}",
        inputs.len() - failed,
        total_chunks,
        output_dir.display()
    );

    if failed > 0 {
        anyhow::bail!("{} of {} documents failed", failed, inputs.len());
    }
    Ok(())
}
