//! `graphfed-core`: composition, supergraph rendering, and query planning for a federated
//! GraphQL gateway (§1, §2).
//!
//! The pipeline a host (the `cli` binary, or an embedding gateway process) runs is:
//!
//! 1. [`subgraph::ingest`] each subgraph's SDL into a validated, federation-annotation-free
//!    [`schema::FederationSchema`] plus its normalized [`schema::TypeDef`] model (§4.1).
//! 2. [`composition::compose`] the ingested subgraphs into a [`composition::ComposedSupergraph`]
//!    (§4.2), aggregating every validation failure found rather than stopping at the first.
//! 3. [`supergraph::build`] renders that composition as portable `@core`/`@join__*` CSDL text
//!    (§4.3); [`supergraph::parse`] reads it back, and [`supergraph::api_schema`] strips the join
//!    directives down to the client-facing API shape.
//! 4. [`query_plan::QueryPlanner`] plans client operations against a composed supergraph into a
//!    [`query_plan::QueryPlan`] (§4.4).
//!
//! [`error::FederationError`] is the failure type threaded through every stage.

pub mod composition;
pub mod config;
pub mod error;
pub mod link;
pub mod query_plan;
pub mod schema;
pub mod subgraph;
pub mod supergraph;

use apollo_compiler::validation::Valid;
use apollo_compiler::Schema;

use crate::composition::ComposedSupergraph;
use crate::config::CompositionConfig;
use crate::config::QueryPlannerConfig;
use crate::error::FederationError;
use crate::query_plan::QueryPlanner;
use crate::subgraph::Subgraph;

/// Ingests and composes a set of `(name, url, sdl)` subgraphs in one call (§4.1, §4.2). A thin
/// convenience wrapper around [`subgraph::ingest`] + [`composition::compose`] for callers that
/// don't need to inspect individual ingest failures before composing.
#[tracing::instrument(skip_all, fields(subgraph_count = subgraphs.len()))]
pub fn compose_subgraphs(
    subgraphs: impl IntoIterator<Item = (String, String, String)>,
    config: &CompositionConfig,
) -> Result<ComposedSupergraph, FederationError> {
    let mut ingested: Vec<Subgraph> = Vec::new();
    let mut errors = Vec::new();
    for (name, url, sdl) in subgraphs {
        match subgraph::ingest(&name, &url, &sdl) {
            Ok(subgraph) => ingested.push(subgraph),
            Err(err) => errors.extend(err.errors().into_iter().cloned()),
        }
    }
    if !errors.is_empty() {
        return Err(FederationError::aggregate(errors));
    }
    composition::compose_with_config(ingested, config)
}

/// Builds a [`QueryPlanner`] for a supergraph that was already composed and rendered (or parsed
/// back from CSDL text via [`supergraph::parse`]).
pub fn build_planner(schema: Valid<Schema>, join_metadata: composition::join_metadata::JoinMetadata, config: QueryPlannerConfig) -> QueryPlanner {
    QueryPlanner::new(schema, join_metadata, config)
}
