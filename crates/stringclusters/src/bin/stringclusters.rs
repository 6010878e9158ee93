use chrono::Local;
use clap::Parser;
use snafu::{ResultExt, Whatever, ensure_whatever};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stringclusters::similarity::WordVectors;
use stringclusters::strings::{Metric, StringClusters, ranking_to_json};
use stringclusters::{
    AffinityPropagationOptions, DEFAULT_CONVERGENCE_WINDOW, DEFAULT_DAMPING,
    DEFAULT_MAX_ITERATIONS, Preference,
};
use tracing::{Level, info};

/// Compare strings by Levenshtein edit distance or word-embedding similarity,
/// and cluster them with Affinity Propagation.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Input file containing a list of strings, one per line
    #[arg(short, long)]
    input_file: PathBuf,

    /// Output JSON file [default: stringclusters_output_<timestamp>.json]
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Metric::Edit)]
    distance_metric: Metric,

    /// Rank every input string by similarity to this one instead of clustering
    #[arg(short, long)]
    single_term: Option<String>,

    /// Word vectors in GloVe or word2vec text format, needed by the euclidean metric
    #[arg(long)]
    vectors: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_DAMPING)]
    damping: f64,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    #[arg(long, default_value_t = DEFAULT_CONVERGENCE_WINDOW)]
    convergence_window: usize,

    /// diagonal, median, minimum or a number
    #[arg(long, default_value_t = Preference::Median)]
    preference: Preference,

    /// Break exact ties between identical strings with tiny seeded noise
    #[arg(long)]
    degeneracy_noise: bool,

    /// More logging, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn default_output_file() -> PathBuf {
    // ISO timestamp, with colons swapped for dashes to keep the name portable
    let timestamp = Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
        .replace(':', "-");
    PathBuf::from(format!("stringclusters_output_{timestamp}.json"))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn create_parent_dirs(path: &Path) -> Result<(), Whatever> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_whatever_context(|_| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[snafu::report]
fn main() -> Result<(), Whatever> {
    let args = Args::parse();
    init_tracing(args.verbose);

    ensure_whatever!(
        args.input_file.exists(),
        "the file {} does not exist",
        args.input_file.display()
    );
    ensure_whatever!(
        args.distance_metric != Metric::Euclidean || args.vectors.is_some(),
        "the euclidean metric needs --vectors"
    );

    let output_file = args.output_file.unwrap_or_else(default_output_file);
    create_parent_dirs(&output_file)?;

    let input = std::fs::read_to_string(&args.input_file)
        .with_whatever_context(|_| format!("failed to read {}", args.input_file.display()))?;
    let lines: Vec<&str> = input.lines().collect();

    let options = AffinityPropagationOptions {
        damping: args.damping,
        max_iterations: args.max_iterations,
        convergence_window: args.convergence_window,
        degeneracy_noise: args.degeneracy_noise,
    };
    let mut clusters = StringClusters::new()
        .with_options(options)
        .with_preference(args.preference);
    if let Some(path) = &args.vectors {
        let vectors = WordVectors::from_path(path).whatever_context("failed to load word vectors")?;
        clusters = clusters.with_embeddings(Arc::new(vectors));
    }

    let json = match &args.single_term {
        Some(term) => {
            let ranking = clusters
                .similar_terms(term, &lines, args.distance_metric)
                .whatever_context("failed to rank strings")?;
            info!(term = term.as_str(), strings = ranking.len(), "ranked strings");
            ranking_to_json(&ranking).whatever_context("failed to serialize the ranking")?
        }
        None => {
            let result = clusters
                .compare_and_cluster(&lines, args.distance_metric)
                .whatever_context("failed to cluster strings")?;
            info!(
                strings = lines.len(),
                clusters = result.clusters.len(),
                iterations = result.iterations,
                converged = result.converged,
                "clustered strings"
            );
            result
                .to_json()
                .whatever_context("failed to serialize the clusters")?
        }
    };

    std::fs::write(&output_file, json)
        .with_whatever_context(|_| format!("failed to write {}", output_file.display()))?;
    info!(path = %output_file.display(), "saved output");

    Ok(())
}
