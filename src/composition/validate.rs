//! The composition validation table (§4.2): checks that run after merging, each producing a
//! [`SingleFederationError`] with a stable code. Errors are collected, never short-circuited, so a
//! single `compose` call reports every problem it finds in one pass (§7).

use apollo_compiler::Name;
use indexmap::IndexSet;

use crate::composition::join_metadata::GraphId;
use crate::composition::join_metadata::JoinMetadata;
use crate::error::SingleFederationError;
use crate::schema::TypeDef;
use crate::schema::TypeKind;
use crate::subgraph::Subgraph;

/// `EXTERNAL_UNUSED` (§4.2): every `@external` field in a subgraph must be referenced by a
/// `@key`, `@requires`, or `@provides` somewhere in that same subgraph.
pub(crate) fn validate_external_usage(subgraphs: &[Subgraph], errors: &mut Vec<SingleFederationError>) {
    for subgraph in subgraphs {
        let referenced = referenced_external_coordinates(subgraph);
        for (type_name, type_def) in subgraph.schema.types.iter() {
            for (field_name, field) in type_def.fields.iter() {
                if field.external && !referenced.contains(&(type_name.clone(), field_name.clone())) {
                    errors.push(SingleFederationError::ExternalUnused {
                        coordinate: format!("{type_name}.{field_name}"),
                        subgraph: subgraph.name.clone(),
                    });
                }
            }
        }
    }
}

/// Every field name mentioned anywhere in a `@key`, `@requires`, or `@provides` field set in
/// `subgraph`, paired with the type that field set is selected against.
fn referenced_external_coordinates(subgraph: &Subgraph) -> IndexSet<(Name, Name)> {
    let mut referenced = IndexSet::new();
    for (type_name, type_def) in subgraph.schema.types.iter() {
        for key in &type_def.keys {
            for field_name in key.all_field_names() {
                referenced.insert((type_name.clone(), field_name.clone()));
            }
        }
        for (field_name, field) in type_def.fields.iter() {
            if let Some(requires) = &field.requires {
                for name in requires.all_field_names() {
                    referenced.insert((type_name.clone(), name.clone()));
                }
            }
            if let Some(provides) = &field.provides {
                let return_type = Name::new(return_type_name(&field.type_ref))
                    .unwrap_or_else(|_| field_name.clone());
                for name in provides.all_field_names() {
                    referenced.insert((return_type.clone(), name.clone()));
                }
            }
        }
    }
    referenced
}

/// Strips GraphQL's `!`/`[...]` wrapper characters off a type reference string, leaving the bare
/// named type (e.g. `"[Review!]!"` -> `"Review"`).
fn return_type_name(type_ref: &str) -> &str {
    type_ref.trim_matches(|c| c == '!' || c == '[' || c == ']')
}

/// `EXTERNAL_MISSING_ON_BASE` / `EXTERNAL_TYPE_MISMATCH` (§4.2): an `@external` field must exist,
/// non-externally, on the entity's owning subgraph, with the same declared type.
pub(crate) fn validate_external_against_owner(subgraphs: &[Subgraph], metadata: &JoinMetadata, errors: &mut Vec<SingleFederationError>) {
    for (type_name, entity) in metadata.entities.iter() {
        let owner = &subgraphs[entity.owner];
        let Some(owner_type) = owner.schema.get_type(type_name.as_str()) else {
            continue;
        };
        for (graph_id, subgraph) in subgraphs.iter().enumerate() {
            if graph_id == entity.owner {
                continue;
            }
            let Some(type_def) = subgraph.schema.get_type(type_name.as_str()) else {
                continue;
            };
            for (field_name, field) in type_def.fields.iter() {
                if !field.external {
                    continue;
                }
                let coordinate = format!("{type_name}.{field_name}");
                match owner_type.fields.get(field_name) {
                    None => errors.push(SingleFederationError::ExternalMissingOnBase {
                        coordinate,
                        subgraph: subgraph.name.clone(),
                    }),
                    Some(owner_field) if owner_field.type_ref != field.type_ref => {
                        errors.push(SingleFederationError::ExternalTypeMismatch {
                            coordinate,
                            subgraph: subgraph.name.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

/// `KEY_FIELDS_MISSING_ON_BASE` at the composition level (§4.2): every field referenced by any
/// subgraph's `@key` for an entity must exist somewhere in the merged type.
pub(crate) fn validate_key_fields_exist(type_name: &Name, merged_field_names: &IndexSet<Name>, declarations: &[(GraphId, TypeDef)], errors: &mut Vec<SingleFederationError>) {
    for (_, type_def) in declarations {
        for key in &type_def.keys {
            for field_name in key.all_field_names() {
                if !merged_field_names.contains(field_name) {
                    errors.push(SingleFederationError::KeyFieldsMissingOnBase {
                        type_name: type_name.clone(),
                        field_name: field_name.clone(),
                    });
                }
            }
        }
    }
}

/// `PROVIDES_FIELDS_MISSING_EXTERNAL` / `REQUIRES_FIELDS_MISSING_EXTERNAL` (§4.2): fields named in
/// a `@provides`/`@requires` field set must be marked `@external` on the relevant type, in the
/// same subgraph as the annotated field.
pub(crate) fn validate_requires_provides_externality(subgraphs: &[Subgraph], errors: &mut Vec<SingleFederationError>) {
    for subgraph in subgraphs {
        for (type_name, type_def) in subgraph.schema.types.iter() {
            for (field_name, field) in type_def.fields.iter() {
                let coordinate = format!("{type_name}.{field_name}");
                if let Some(requires) = &field.requires {
                    for missing_field in requires.top_level_field_names() {
                        let is_external = type_def
                            .fields
                            .get(missing_field)
                            .map(|f| f.external)
                            .unwrap_or(false);
                        if !is_external {
                            errors.push(SingleFederationError::RequiresFieldsMissingExternal {
                                coordinate: coordinate.clone(),
                                field_set: requires.to_string(),
                                missing_field: missing_field.to_string(),
                                subgraph: subgraph.name.clone(),
                            });
                        }
                    }
                }
                if let Some(provides) = &field.provides {
                    let return_type_name = return_type_name(&field.type_ref);
                    let Some(return_type) = subgraph.schema.get_type(return_type_name) else {
                        continue;
                    };
                    for missing_field in provides.top_level_field_names() {
                        let is_external = return_type
                            .fields
                            .get(missing_field)
                            .map(|f| f.external)
                            .unwrap_or(false);
                        if !is_external {
                            errors.push(SingleFederationError::ProvidesFieldsMissingExternal {
                                coordinate: coordinate.clone(),
                                field_set: provides.to_string(),
                                missing_field: missing_field.to_string(),
                                subgraph: subgraph.name.clone(),
                            });
                        }
                    }
                }
            }
        }
    }
}

/// `PROVIDES_NOT_ON_ENTITY` (§4.2): `@provides` may only be used on a field whose return type is
/// an entity in the merged supergraph.
pub(crate) fn validate_provides_on_entity(subgraphs: &[Subgraph], metadata: &JoinMetadata, errors: &mut Vec<SingleFederationError>) {
    for subgraph in subgraphs {
        for (type_name, type_def) in subgraph.schema.types.iter() {
            for (field_name, field) in type_def.fields.iter() {
                if field.provides.is_none() {
                    continue;
                }
                let return_type_name = return_type_name(&field.type_ref);
                let Ok(return_type) = Name::new(return_type_name) else {
                    continue;
                };
                if metadata.entity(&return_type).is_none() {
                    errors.push(SingleFederationError::ProvidesNotOnEntity {
                        coordinate: format!("{type_name}.{field_name}"),
                    });
                }
            }
        }
    }
}

/// `VALUE_TYPE_UNION_TYPES_IDENTICAL` (§4.2): a union that is a value type (not an entity) must
/// have identical member lists in every subgraph that declares it.
pub(crate) fn validate_union_members(type_name: &Name, declarations: &[(GraphId, TypeDef)], errors: &mut Vec<SingleFederationError>) {
    if declarations.first().map(|(_, t)| t.kind) != Some(TypeKind::Union) {
        return;
    }
    let mut reference: Option<Vec<Name>> = None;
    for (_, type_def) in declarations {
        let mut members = type_def.union_members.clone();
        members.sort();
        match &reference {
            None => reference = Some(members),
            Some(expected) => {
                if expected != &members {
                    errors.push(SingleFederationError::ValueTypeUnionTypesIdentical {
                        type_name: type_name.clone(),
                    });
                    break;
                }
            }
        }
    }
}
