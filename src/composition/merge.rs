//! Type and field merging (§4.2): combines each subgraph's normalized [`TypeDef`]s into a single
//! merged view, resolving entity ownership and building the [`JoinMetadata`] composition attaches
//! to the result.

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use multimap::MultiMap;

use crate::composition::join_metadata::EntityJoinInfo;
use crate::composition::join_metadata::FieldJoinInfo;
use crate::composition::join_metadata::GraphId;
use crate::composition::join_metadata::JoinGraph;
use crate::composition::join_metadata::JoinMetadata;
use crate::error::SingleFederationError;
use crate::schema::TypeDef;
use crate::schema::TypeKind;
use crate::subgraph::Subgraph;

/// Groups every subgraph's [`TypeDef`]s by type name, in subgraph (graph id) order.
pub(crate) fn group_by_type_name(subgraphs: &[Subgraph]) -> IndexMap<Name, Vec<(GraphId, TypeDef)>> {
    let mut by_name: IndexMap<Name, Vec<(GraphId, TypeDef)>> = IndexMap::new();
    for (graph_id, subgraph) in subgraphs.iter().enumerate() {
        for (type_name, type_def) in subgraph.schema.types.iter() {
            by_name
                .entry(type_name.clone())
                .or_default()
                .push((graph_id, type_def.clone()));
        }
    }
    by_name
}

/// Resolves the merged kind for one type name's declarations, reporting a kind-mismatch error
/// (possibly the more specific value-type/entity variant) when subgraphs disagree (§4.2).
pub(crate) fn resolve_kind(
    type_name: &Name,
    declarations: &[(GraphId, TypeDef)],
    subgraphs: &[Subgraph],
    errors: &mut Vec<SingleFederationError>,
) -> TypeKind {
    let first_kind = declarations[0].1.kind;
    let all_same = declarations.iter().all(|(_, t)| t.kind == first_kind);
    if all_same {
        return first_kind;
    }

    // A declaration that is a non-extended object with keys looks like an entity; a declaration
    // of a different kind for the same name looks like a plain value type. That's the
    // `VALUE_TYPE_NO_ENTITY` shape rather than a generic kind mismatch.
    let has_entity_declaration = declarations
        .iter()
        .any(|(_, t)| t.kind == TypeKind::Object && !t.is_extension && !t.keys.is_empty());
    if has_entity_declaration {
        for (graph_id, type_def) in declarations {
            if type_def.kind != TypeKind::Object || type_def.keys.is_empty() {
                errors.push(SingleFederationError::ValueTypeNoEntity {
                    type_name: type_name.clone(),
                    subgraph: subgraphs[*graph_id].name.clone(),
                });
            }
        }
    } else {
        for (graph_id, type_def) in declarations.iter().skip(1) {
            if type_def.kind != first_kind {
                errors.push(SingleFederationError::ValueTypeKindMismatch {
                    type_name: type_name.clone(),
                    subgraph: subgraphs[*graph_id].name.clone(),
                });
            }
        }
    }
    first_kind
}

/// Resolves entity ownership for one entity type (§3, §4.2): exactly one subgraph must declare it
/// non-extended; the rest must each declare a matching `@key` via `extend type ... @key(...)`.
pub(crate) fn resolve_owner(
    type_name: &Name,
    declarations: &[(GraphId, TypeDef)],
    subgraphs: &[Subgraph],
    errors: &mut Vec<SingleFederationError>,
) -> Option<GraphId> {
    let owners: Vec<GraphId> = declarations
        .iter()
        .filter(|(_, t)| t.kind == TypeKind::Object && !t.is_extension && !t.keys.is_empty())
        .map(|(graph_id, _)| *graph_id)
        .collect();

    match owners.len() {
        0 => {
            errors.push(SingleFederationError::NoEntityOwner {
                type_name: type_name.clone(),
            });
            None
        }
        1 => Some(owners[0]),
        _ => {
            let subgraph_names: Vec<&str> = owners
                .iter()
                .map(|graph_id| subgraphs[*graph_id].name.as_str())
                .collect();
            errors.push(SingleFederationError::MultipleEntityOwners {
                type_name: type_name.clone(),
                subgraphs: subgraph_names.join(", "),
            });
            Some(owners[0])
        }
    }
}

/// Builds the entity's key multimap: every subgraph declaration (owner included) contributes its
/// own `@key` field sets under its own graph id.
pub(crate) fn build_keys_by_graph(declarations: &[(GraphId, TypeDef)]) -> MultiMap<GraphId, crate::schema::FieldSet> {
    let mut keys_by_graph = MultiMap::new();
    for (graph_id, type_def) in declarations {
        for key in &type_def.keys {
            keys_by_graph.insert(*graph_id, key.clone());
        }
    }
    keys_by_graph
}

/// Merges every field declared anywhere for a type into the union of field names, validating that
/// shared (non-external) declarations agree on their return type (`FIELD_TYPE_MISMATCH`, §4.2) and,
/// when `strict_argument_validation` is on, on their argument signature (`FIELD_ARGUMENT_MISMATCH`).
pub(crate) fn merge_fields(
    type_name: &Name,
    declarations: &[(GraphId, TypeDef)],
    subgraphs: &[Subgraph],
    strict_argument_validation: bool,
    errors: &mut Vec<SingleFederationError>,
) -> IndexSet<Name> {
    let mut field_names: IndexSet<Name> = IndexSet::new();
    for (_, type_def) in declarations {
        field_names.extend(type_def.fields.keys().cloned());
    }

    for field_name in &field_names {
        let mut reference_type: Option<(&str, GraphId)> = None;
        let mut reference_args: Option<(Vec<(Name, String)>, GraphId)> = None;
        for (graph_id, type_def) in declarations {
            let Some(field) = type_def.fields.get(field_name) else {
                continue;
            };
            if field.external {
                continue;
            }
            match reference_type {
                None => reference_type = Some((field.type_ref.as_str(), *graph_id)),
                Some((expected, _)) if expected == field.type_ref.as_str() => {}
                Some((expected, _)) => {
                    errors.push(SingleFederationError::FieldTypeMismatch {
                        coordinate: format!("{type_name}.{field_name}"),
                        subgraph: subgraphs[*graph_id].name.clone(),
                        found: field.type_ref.clone(),
                        expected: expected.to_string(),
                    });
                }
            }

            if strict_argument_validation {
                let mut signature: Vec<(Name, String)> = field
                    .arguments
                    .iter()
                    .map(|arg| (arg.name.clone(), arg.type_ref.clone()))
                    .collect();
                signature.sort_by(|a, b| a.0.cmp(&b.0));
                match &reference_args {
                    None => reference_args = Some((signature, *graph_id)),
                    Some((expected, _)) if expected == &signature => {}
                    Some(_) => {
                        errors.push(SingleFederationError::FieldArgumentMismatch {
                            coordinate: format!("{type_name}.{field_name}"),
                            subgraph: subgraphs[*graph_id].name.clone(),
                        });
                    }
                }
            }
        }
    }

    field_names
}

/// Builds [`FieldJoinInfo`] for one field from its declarations across subgraphs.
pub(crate) fn build_field_join_info(type_name: &Name, field_name: &Name, declarations: &[(GraphId, TypeDef)]) -> FieldJoinInfo {
    let mut info = FieldJoinInfo::default();
    for (graph_id, type_def) in declarations {
        let Some(field) = type_def.fields.get(field_name) else {
            continue;
        };
        if !field.external {
            info.resolvable_in.push(*graph_id);
        }
        if let Some(requires) = &field.requires {
            info.requires.insert(*graph_id, requires.clone());
        }
        if let Some(provides) = &field.provides {
            info.provides.insert(*graph_id, provides.clone());
        }
    }
    let _ = type_name;
    info
}

/// Builds the graph table (§3): one [`JoinGraph`] row per subgraph, in subgraph order, so a
/// subgraph's position in `subgraphs` is stable as its [`GraphId`].
pub(crate) fn build_graph_table(subgraphs: &[Subgraph]) -> Vec<JoinGraph> {
    subgraphs
        .iter()
        .map(|s| JoinGraph {
            name: s.name.clone(),
            url: s.url.clone(),
        })
        .collect()
}

pub(crate) fn insert_entity(metadata: &mut JoinMetadata, type_name: Name, owner: GraphId, keys_by_graph: MultiMap<GraphId, crate::schema::FieldSet>) {
    metadata
        .entities
        .insert(type_name, EntityJoinInfo { owner, keys_by_graph });
}
