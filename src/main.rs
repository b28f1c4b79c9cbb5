use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod anchors;
mod entity;
mod gpml;
mod query;
mod reaction;
mod rhea;

use anchors::AnchorIndex;
use entity::EntityGraph;
use reaction::{assemble_reactions, Reaction};
use rhea::RheaClient;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(author, version, about = "Find Rhea reactions for GPML pathway diagrams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "find_reactions")]
    FindReactions {
        /// Pathway file; stdin when omitted or `-`.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = InputFormat::Gpml)]
        format: InputFormat,
        #[arg(long, default_value = rhea::DEFAULT_ENDPOINT)]
        endpoint: String,
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,
        /// Print summaries and queries without contacting the endpoint.
        #[arg(long)]
        dry_run: bool,
        /// Print each reaction as a JSON line instead of querying.
        #[arg(long, conflicts_with = "dry_run")]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// GPML 2013a XML.
    Gpml,
    /// Pre-parsed entity graph.
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Output {
    Query,
    DryRun,
    Json,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::FindReactions {
            input,
            format,
            endpoint,
            timeout_secs,
            dry_run,
            json,
        } => {
            let output = if json {
                Output::Json
            } else if dry_run {
                Output::DryRun
            } else {
                Output::Query
            };
            find_reactions(
                input.as_deref(),
                format,
                &endpoint,
                Duration::from_secs(timeout_secs),
                output,
            )
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn find_reactions(
    input: Option<&Path>,
    format: InputFormat,
    endpoint: &str,
    timeout: Duration,
    output: Output,
) -> Result<()> {
    let text = read_input(input)?;
    let graph = load_graph(&text, format)?;
    let index = AnchorIndex::build(&graph);
    let reactions = assemble_reactions(&graph, &index);
    info!(
        interactions = index.primary().len(),
        reactions = reactions.len(),
        "resolved pathway reactions"
    );

    let client = match output {
        Output::Query => Some(RheaClient::new(endpoint, timeout)?),
        Output::DryRun | Output::Json => None,
    };

    let mut failures = 0usize;
    for reaction in &reactions {
        if output == Output::Json {
            println!(
                "{}",
                serde_json::to_string(reaction).context("Failed to serialize reaction")?
            );
            continue;
        }
        if !report_reaction(reaction, client.as_ref()) {
            failures += 1;
        }
    }
    if failures > 0 {
        warn!(failures, "some reaction queries failed");
    }
    Ok(())
}

/// Print one reaction and its matches; false when its query could not be built or run.
fn report_reaction(reaction: &Reaction, client: Option<&RheaClient>) -> bool {
    println!("{}", reaction.summary());
    let query = match query::build_query(reaction) {
        Ok(query) => query,
        Err(err) => {
            warn!(reaction = %reaction.id, "{err}");
            print!("{}", rhea::render_failure(&err));
            return false;
        }
    };
    let Some(client) = client else {
        println!("{query}");
        println!();
        return true;
    };
    match client.search(&query) {
        Ok(matches) => {
            print!("{}", rhea::render_report(&matches));
            true
        }
        Err(err) => {
            error!(reaction = %reaction.id, "{err}");
            print!("{}", rhea::render_failure(&err));
            false
        }
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_graph(text: &str, format: InputFormat) -> Result<EntityGraph> {
    let graph = match format {
        InputFormat::Gpml => gpml::parse_gpml(text)?,
        InputFormat::Json => EntityGraph::from_json(text)?,
    };
    if graph.pathway.contained_ids.is_empty() {
        return Err(anyhow!("Pathway contains no elements"));
    }
    Ok(graph)
}
