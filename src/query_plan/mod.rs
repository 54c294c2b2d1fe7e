//! The query plan data model (§3, §4.4): a tree of [`PlanNode`] variants describing how a
//! gateway should decompose one client operation into subgraph fetches with entity joins.
//!
//! [`planner`] builds these trees; this module only defines the (de)serializable shape, matching
//! how `apollo-federation::query_plan` keeps its node types free of planning logic.

pub mod planner;

use serde::Serialize;

pub use planner::QueryPlanner;

/// The result of planning one operation: either a single subgraph can answer it with a single
/// fetch wrapped at the root, or there's a composite tree of fetches to run. `None` only arises
/// for an operation with no root fields we'd ever try to plan, which base GraphQL validation
/// rules out; the planner never constructs `Node: None` today but the slot exists for
/// parity with `apollo-federation::query_plan::QueryPlan`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPlan {
    pub node: Option<PlanNode>,
}

/// One node of a query plan (§3). Tagged by `kind` in its serialized form so a host can match on
/// the JSON shape without a schema, per §6 ("each node variant is tagged with its kind").
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum PlanNode {
    Fetch(FetchNode),
    Flatten(FlattenNode),
    Sequence(SequenceNode),
    Parallel(ParallelNode),
}

impl PlanNode {
    /// Every [`FetchNode`] reachable under this node, in the order the plan visits them —used by
    /// tests to assert the *coverage* property (§8.3) without caring about plan tree shape.
    pub fn fetches(&self) -> Vec<&FetchNode> {
        let mut out = Vec::new();
        self.collect_fetches(&mut out);
        out
    }

    fn collect_fetches<'a>(&'a self, out: &mut Vec<&'a FetchNode>) {
        match self {
            PlanNode::Fetch(fetch) => out.push(fetch),
            PlanNode::Flatten(flatten) => flatten.node.collect_fetches(out),
            PlanNode::Sequence(sequence) => {
                for node in &sequence.nodes {
                    node.collect_fetches(out);
                }
            }
            PlanNode::Parallel(parallel) => {
                for node in &parallel.nodes {
                    node.collect_fetches(out);
                }
            }
        }
    }
}

/// A single subgraph request (§3). `requires_path` is set exactly when this is an entity fetch:
/// `representations` then holds the `__typename` + key selection gathered at that response path,
/// and `selection_set`/`operation` are phrased against the subgraph's `_entities` field.
#[derive(Debug, Clone, Serialize)]
pub struct FetchNode {
    pub subgraph_name: String,
    /// The subgraph-local entity type name this entity fetch targets; `None` for a root fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// The representation selection (`__typename` + key fields, and any `@requires` extras)
    /// collected at `requires_path`, for entity fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representations: Option<String>,
    /// Response path, from the plan root, where this fetch's representations were gathered.
    /// Empty for a root fetch.
    pub requires_path: Vec<String>,
    /// The GraphQL selection set this fetch requests, rendered as text.
    pub selection_set: String,
    /// Names of operation variables referenced anywhere within this fetch (§4.4 "Variables").
    pub variable_usages: Vec<String>,
    /// The full operation document text sent to the subgraph.
    pub operation: String,
}

/// Applies `node` to the results found at `path` in the assembled response (§3).
#[derive(Debug, Clone, Serialize)]
pub struct FlattenNode {
    pub path: Vec<String>,
    pub node: Box<PlanNode>,
}

/// Runs `nodes` in order; a later node may depend on data an earlier one fetched (§3).
#[derive(Debug, Clone, Serialize)]
pub struct SequenceNode {
    pub nodes: Vec<PlanNode>,
}

/// Runs `nodes` concurrently; none depends on another (§3).
#[derive(Debug, Clone, Serialize)]
pub struct ParallelNode {
    pub nodes: Vec<PlanNode>,
}
