//! In-memory configuration knobs for composition and query planning (§3A, §4.5).
//!
//! Loading these from a file, environment, or CLI flags is outside the core's scope; only the
//! struct and its `Default` impl are part of the API surface, mirroring how
//! `apollo-federation::query_plan::query_planner::QueryPlannerConfig` is a plain in-memory value
//! that a host constructs however it likes.

/// Knobs the query planner consults while building a plan.
#[derive(Debug, Clone)]
pub struct QueryPlannerConfig {
    /// Whether to reuse the operation's named fragments in subgraph fetches instead of always
    /// inlining them. Reduces subgraph request size for queries that use large fragments heavily.
    ///
    /// Defaults to `true`.
    pub reuse_named_fragments: bool,

    /// Upper bound on the number of candidate plans the planner will evaluate for a single
    /// operation before settling for the best one found so far. Guards against pathological
    /// `@provides`-path enumeration blowing up planning time (§5).
    ///
    /// Defaults to `10_000`.
    pub max_evaluated_plans: u32,
}

impl Default for QueryPlannerConfig {
    fn default() -> Self {
        QueryPlannerConfig {
            reuse_named_fragments: true,
            max_evaluated_plans: 10_000,
        }
    }
}

/// Knobs composition consults while merging subgraphs.
#[derive(Debug, Clone)]
pub struct CompositionConfig {
    /// Whether `compose` should run validation passes that are unlikely to matter on hand-written
    /// test fixtures but are cheap to keep on in production (e.g. argument-signature agreement).
    /// Left as a config surface rather than hard-coded, matching the intent (if not the exact
    /// flags) of `apollo-federation`'s own composition options.
    ///
    /// Defaults to `true`.
    pub strict_argument_validation: bool,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        CompositionConfig {
            strict_argument_validation: true,
        }
    }
}
