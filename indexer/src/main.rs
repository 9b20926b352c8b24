use anyhow::Result;
use clap::{Parser, Subcommand};
use kb_core::persist::{load_index, save_index, DEFAULT_INDEX_PATH, DEFAULT_SOURCE_DIR};
use kb_core::source::read_source_dir;
use kb_core::tokenizer::TokenizerConfig;
use kb_core::{build, retrieve, BuildOptions, DEFAULT_TOP_K};
use std::path::Path;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "kb-indexer")]
#[command(about = "Build and query the knowledge-base TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of .txt/.md/.json chapters
    Build {
        /// Source directory (created if missing)
        #[arg(long, env = "KB_SOURCE_DIR", default_value = DEFAULT_SOURCE_DIR)]
        source: String,
        /// Output snapshot path (.bin for bincode, JSON otherwise)
        #[arg(long, env = "KB_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
        output: String,
    },
    /// Query an existing index and print the ranked hits as JSON
    Search {
        #[arg(long, env = "KB_INDEX_PATH", default_value = DEFAULT_INDEX_PATH)]
        index: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        k: usize,
        query: Vec<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { source, output } => {
            build_index(Path::new(&source), Path::new(&output), &options_from_env())?;
            Ok(())
        }
        Commands::Search { index, k, query } => {
            let index = load_index(Path::new(&index))?;
            let hits = retrieve(&query.join(" "), &index, k);
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }
    }
}

fn options_from_env() -> BuildOptions {
    let extra_chars = std::env::var("KB_EXTRA_CHARS").unwrap_or_default();
    let label_in_terms = std::env::var("KB_LABEL_IN_TERMS")
        .map(|v| is_truthy(&v))
        .unwrap_or(false);
    BuildOptions { tokenizer: TokenizerConfig::with_extra_chars(extra_chars), label_in_terms }
}

fn is_truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Read the chapters, build and write the snapshot. Returns the number of documents written.
fn build_index(source: &Path, output: &Path, options: &BuildOptions) -> Result<u32> {
    let docs = read_source_dir(source)?;
    let index = build(docs, options);
    save_index(output, &index)?;
    tracing::info!(
        documents = index.num_docs,
        terms = index.df.len(),
        output = %output.display(),
        "wrote index"
    );
    Ok(index.num_docs)
}
