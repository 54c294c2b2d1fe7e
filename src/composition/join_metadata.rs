//! The routing metadata composition attaches to a supergraph (§3, §4.2): a graph table, per-entity
//! ownership/keys, and per-field resolution info. This is what the supergraph builder renders as
//! `@core`/`@join__*` SDL and what the query planner consults to decide which subgraph resolves
//! which field.

use apollo_compiler::Name;
use indexmap::IndexMap;
use multimap::MultiMap;

use crate::schema::FieldSet;

/// Index into [`JoinMetadata::graphs`]; stable for the lifetime of one composition.
pub type GraphId = usize;

/// One row of the graph table (§3): a subgraph's name and URL, addressable by [`GraphId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinGraph {
    pub name: String,
    pub url: String,
}

/// Ownership and key metadata for one entity type (§3, §4.3).
#[derive(Debug, Clone)]
pub struct EntityJoinInfo {
    pub owner: GraphId,
    pub keys_by_graph: MultiMap<GraphId, FieldSet>,
}

impl EntityJoinInfo {
    /// All distinct keys declared anywhere for this entity, owner first, in graph-id order.
    pub fn all_keys(&self) -> Vec<&FieldSet> {
        let mut graph_ids: Vec<&GraphId> = self.keys_by_graph.keys().collect();
        graph_ids.sort();
        let mut seen = Vec::new();
        for graph_id in graph_ids {
            if let Some(keys) = self.keys_by_graph.get_vec(graph_id) {
                for key in keys {
                    if !seen.contains(&key) {
                        seen.push(key);
                    }
                }
            }
        }
        seen
    }
}

/// Resolution metadata for one field (§3, §4.4): which subgraphs can resolve it directly, and any
/// `@requires`/`@provides` field sets attached to a particular subgraph's declaration.
#[derive(Debug, Clone, Default)]
pub struct FieldJoinInfo {
    pub resolvable_in: Vec<GraphId>,
    pub requires: IndexMap<GraphId, FieldSet>,
    pub provides: IndexMap<GraphId, FieldSet>,
}

impl FieldJoinInfo {
    pub fn is_resolvable_in(&self, graph: GraphId) -> bool {
        self.resolvable_in.contains(&graph)
    }
}

/// The full join metadata table produced by composition (§3).
#[derive(Debug, Clone, Default)]
pub struct JoinMetadata {
    pub graphs: Vec<JoinGraph>,
    pub entities: IndexMap<Name, EntityJoinInfo>,
    pub fields: IndexMap<(Name, Name), FieldJoinInfo>,
}

impl JoinMetadata {
    pub fn graph_id(&self, name: &str) -> Option<GraphId> {
        self.graphs.iter().position(|g| g.name == name)
    }

    pub fn field(&self, type_name: &Name, field_name: &Name) -> Option<&FieldJoinInfo> {
        self.fields.get(&(type_name.clone(), field_name.clone()))
    }

    pub fn entity(&self, type_name: &Name) -> Option<&EntityJoinInfo> {
        self.entities.get(type_name)
    }
}
