//! A small `clap`-derived smoke-test harness over `graphfed-core`'s public API (§4.5): not a
//! specified interface, just enough to compose subgraphs and plan operations from the shell while
//! developing against the library.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use graphfed_core::composition::compose;
use graphfed_core::config::QueryPlannerConfig;
use graphfed_core::error::FederationError;
use graphfed_core::query_plan::QueryPlanner;
use graphfed_core::subgraph::ingest;
use graphfed_core::supergraph;

#[derive(Parser)]
#[command(name = "graphfed", about = "Composition and query planning for a federated GraphQL gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composes subgraph SDL files into a supergraph, printing its CSDL on success or the
    /// aggregated validation errors on failure.
    Compose {
        /// One subgraph per flag, as `name=url=path-to-sdl-file`.
        #[arg(long = "subgraph", value_name = "NAME=URL=PATH", required = true)]
        subgraphs: Vec<String>,
    },
    /// Plans an operation against a composed supergraph, printing the JSON-serialized plan.
    Plan {
        /// Path to the supergraph's CSDL file.
        #[arg(long)]
        supergraph: PathBuf,
        /// Path to the GraphQL operation document to plan.
        #[arg(long)]
        operation: PathBuf,
        /// The operation to plan, if the document defines more than one.
        #[arg(long)]
        operation_name: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compose { subgraphs } => run_compose(&subgraphs),
        Command::Plan {
            supergraph,
            operation,
            operation_name,
        } => run_plan(&supergraph, &operation, operation_name.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            for error in err.into_graphql_errors() {
                eprintln!("[{}] {}", error.code, error.message);
            }
            ExitCode::FAILURE
        }
    }
}

fn run_compose(subgraph_specs: &[String]) -> Result<(), FederationError> {
    let mut subgraphs = Vec::with_capacity(subgraph_specs.len());
    for spec in subgraph_specs {
        let (name, rest) = spec
            .split_once('=')
            .ok_or_else(|| FederationError::internal(format!("malformed --subgraph \"{spec}\", expected name=url=path")))?;
        let (url, path) = rest
            .split_once('=')
            .ok_or_else(|| FederationError::internal(format!("malformed --subgraph \"{spec}\", expected name=url=path")))?;
        let sdl = fs::read_to_string(path).map_err(|err| FederationError::internal(format!("reading \"{path}\": {err}")))?;
        subgraphs.push(ingest(name, url, &sdl)?);
    }

    let composed = compose(subgraphs)?;
    println!("{}", supergraph::build(&composed));
    Ok(())
}

fn run_plan(supergraph_path: &PathBuf, operation_path: &PathBuf, operation_name: Option<&str>) -> Result<(), FederationError> {
    let csdl = fs::read_to_string(supergraph_path)
        .map_err(|err| FederationError::internal(format!("reading \"{}\": {err}", supergraph_path.display())))?;
    let operation_text = fs::read_to_string(operation_path)
        .map_err(|err| FederationError::internal(format!("reading \"{}\": {err}", operation_path.display())))?;

    let composed = supergraph::parse(&csdl)?;
    let planner = QueryPlanner::new(composed.schema, composed.join_metadata, QueryPlannerConfig::default());
    let plan = planner.plan(&operation_text, operation_name)?;

    let json = serde_json::to_string_pretty(&plan).map_err(|err| FederationError::internal(format!("serializing plan: {err}")))?;
    println!("{json}");
    Ok(())
}
