//! splmine: mine indication sections from DailyMed SPL release archives.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use splmine_cli::{print_dedup, print_explore, print_summary, ExtractOptions};
use splmine_consolidate::DedupConfig;
use splmine_core::{ClusterPolicy, SplMineConfig};

#[derive(Parser, Debug)]
#[command(name = "splmine", about = "Extract and deduplicate drug label indications", version)]
struct Cli {
    /// JSON config file (defaults apply when absent).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract indication sections from release archives, directories or files.
    Extract {
        /// Defaults to <working_dir>/download.
        #[arg(value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Output CSV (default: <working_dir>/results/indications.csv).
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Similarity threshold in 0.0..=1.0.
        #[arg(short, long)]
        threshold: Option<f64>,

        #[arg(long, value_name = "POLICY")]
        policy: Option<ClusterPolicy>,

        /// Section code to extract; repeatable.
        #[arg(long = "section-code", value_name = "CODE")]
        section_codes: Vec<String>,

        #[arg(long)]
        strip_heading: bool,

        #[arg(long)]
        no_dedup: bool,

        #[arg(long, value_name = "FILE")]
        jsonl: Option<PathBuf>,

        /// Also write records within --min-length..=--max-length here.
        #[arg(long, value_name = "FILE")]
        subset: Option<PathBuf>,

        #[arg(long, value_name = "N")]
        min_length: Option<usize>,

        #[arg(long, value_name = "N")]
        max_length: Option<usize>,

        /// Write the run summary as JSON.
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
    },
    /// Re-deduplicate an existing indications CSV.
    Dedup {
        input: PathBuf,
        threshold: f64,
        output: PathBuf,
        #[arg(long, value_name = "POLICY")]
        policy: Option<ClusterPolicy>,
    },
    /// Count section codes and term mentions across a corpus.
    Explore {
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Term list, one per line.
        #[arg(long, value_name = "FILE")]
        terms: PathBuf,

        /// Directory for code_occr.csv, code_occr_dist.csv and term_occr.csv.
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = SplMineConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Command::Extract {
            inputs,
            output,
            threshold,
            policy,
            section_codes,
            strip_heading,
            no_dedup,
            jsonl,
            subset,
            min_length,
            max_length,
            summary,
        } => {
            if let Some(t) = threshold {
                config.similarity_threshold = t;
            }
            if let Some(p) = policy {
                config.cluster_policy = p;
            }
            if !section_codes.is_empty() {
                config.section_codes = section_codes;
            }
            config.strip_heading |= strip_heading;
            config.dedup &= !no_dedup;
            config.min_length = min_length.or(config.min_length);
            config.max_length = max_length.or(config.max_length);

            info!("Working directory: {}", config.working_dir.display());
            let options = ExtractOptions {
                inputs,
                output,
                jsonl,
                subset,
                summary,
            };
            let outcome = splmine_cli::run_extract(&config, &options)?;
            print_summary(&outcome.summary, outcome.dedup.as_ref());
            info!("Indications written to {}", outcome.output.display());
        }
        Command::Dedup {
            input,
            threshold,
            output,
            policy,
        } => {
            let dedup = DedupConfig {
                threshold,
                policy: policy.unwrap_or(config.cluster_policy),
                stem_tokens: config.stem_tokens,
            };
            let outcome = splmine_cli::run_dedup(&input, &output, &dedup)
                .with_context(|| format!("Failed to dedup {}", input.display()))?;
            print_dedup(&outcome);
        }
        Command::Explore {
            inputs,
            terms,
            output,
        } => {
            let outcome = splmine_cli::run_explore(&inputs, &terms, &output)?;
            print_explore(&outcome);
        }
    }

    Ok(())
}
