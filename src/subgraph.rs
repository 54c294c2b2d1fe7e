//! Schema ingest and normalization (§4.1): turns one subgraph's raw SDL into a [`Subgraph`] whose
//! [`FederationSchema`](crate::schema::FederationSchema) carries a validated `apollo-compiler`
//! schema plus the normalized [`TypeDef`](crate::schema::TypeDef)/[`FieldDef`](crate::schema::FieldDef)
//! model that composition consumes.

use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;

use crate::error::invalid_graphql;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::argument::directive_fields_argument;
use crate::link::federation_spec::EXTENDS_DIRECTIVE_NAME;
use crate::link::federation_spec::EXTERNAL_DIRECTIVE_NAME;
use crate::link::federation_spec::FEDERATION_DIRECTIVE_DEFINITIONS;
use crate::link::federation_spec::KEY_DIRECTIVE_NAME;
use crate::link::federation_spec::PROVIDES_DIRECTIVE_NAME;
use crate::link::federation_spec::REQUIRES_DIRECTIVE_NAME;
use crate::schema::field_set::parse_field_set;
use crate::schema::ArgumentDef;
use crate::schema::FieldDef;
use crate::schema::FederationSchema;
use crate::schema::TypeDef;
use crate::schema::TypeKind;

/// The five built-in scalars, which never get a [`TypeDef`] of their own.
const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// One subgraph: a name, its (non-federation) URL, and its ingested, validated schema.
#[derive(Debug)]
pub struct Subgraph {
    pub name: String,
    pub url: String,
    pub schema: FederationSchema,
}

/// Parses and validates `sdl` as a subgraph named `name` serving at `url` (§4.1).
///
/// The federation directive set (`@key`/`@external`/`@requires`/`@provides`/`@extends`) is always
/// available, regardless of whether the subgraph author declared it explicitly: we prepend
/// [`FEDERATION_DIRECTIVE_DEFINITIONS`] ahead of `sdl` before parsing.
pub fn ingest(name: &str, url: &str, sdl: &str) -> Result<Subgraph, FederationError> {
    let full_sdl = format!("{FEDERATION_DIRECTIVE_DEFINITIONS}\n{sdl}");
    let file_name = format!("{name}.graphql");
    let schema = Schema::parse_and_validate(full_sdl, file_name).map_err(invalid_graphql)?;

    let mut types = IndexMap::new();
    let mut errors = Vec::new();
    for (type_name, extended_type) in schema.types.iter() {
        if type_name.as_str().starts_with("__") || BUILTIN_SCALARS.contains(&type_name.as_str()) {
            continue;
        }
        // The directive definitions we prepended above introduce no types, so every remaining
        // type here is either a built-in root type or one the subgraph author declared.
        match build_type_def(&schema, type_name, extended_type) {
            Ok(type_def) => {
                types.insert(type_name.clone(), type_def);
            }
            Err(error) => errors.push(error),
        }
    }

    if !errors.is_empty() {
        return Err(FederationError::aggregate(errors));
    }

    Ok(Subgraph {
        name: name.to_string(),
        url: url.to_string(),
        schema: FederationSchema::new(schema, types),
    })
}

fn build_type_def(
    schema: &Valid<Schema>,
    type_name: &Name,
    extended_type: &ExtendedType,
) -> Result<TypeDef, SingleFederationError> {
    let kind = match extended_type {
        ExtendedType::Object(_) => TypeKind::Object,
        ExtendedType::Interface(_) => TypeKind::Interface,
        ExtendedType::Union(_) => TypeKind::Union,
        ExtendedType::Enum(_) => TypeKind::Enum,
        ExtendedType::Scalar(_) => TypeKind::Scalar,
        ExtendedType::InputObject(_) => TypeKind::Input,
    };

    let is_extension = extended_type.directives().has(&EXTENDS_DIRECTIVE_NAME)
        || has_extension_origin(extended_type);

    let keys = match extended_type {
        ExtendedType::Object(_) | ExtendedType::Interface(_) => {
            build_keys(schema, type_name, extended_type, kind)?
        }
        _ => {
            if extended_type.directives().has(&KEY_DIRECTIVE_NAME) {
                return Err(SingleFederationError::KeyOnNonObject {
                    type_name: type_name.clone(),
                });
            }
            Vec::new()
        }
    };

    let fields = build_fields(schema, type_name, extended_type, !keys.is_empty())?;

    let union_members = match extended_type {
        ExtendedType::Union(union_) => union_.members.iter().map(|m| m.name.clone()).collect(),
        _ => Vec::new(),
    };

    let enum_values = match extended_type {
        ExtendedType::Enum(enum_) => enum_.values.keys().cloned().collect(),
        _ => Vec::new(),
    };

    Ok(TypeDef {
        name: type_name.clone(),
        kind,
        fields,
        keys,
        is_extension,
        union_members,
        enum_values,
    })
}

/// Whether any of this type's definition/extension fragments was written with the `extend`
/// keyword, matching the real federation behavior of treating `extend type` as applying only to
/// the fragment it's on (unlike `@extends`, which the caller already applies to the whole type).
fn has_extension_origin(extended_type: &ExtendedType) -> bool {
    match extended_type {
        ExtendedType::Object(object) => object.directives.iter().any(|d| d.origin.extension_id().is_some())
            || object.fields.iter().any(|(_, f)| f.origin.extension_id().is_some()),
        ExtendedType::Interface(intf) => intf.directives.iter().any(|d| d.origin.extension_id().is_some())
            || intf.fields.iter().any(|(_, f)| f.origin.extension_id().is_some()),
        _ => false,
    }
}

fn build_keys(
    schema: &Valid<Schema>,
    type_name: &Name,
    extended_type: &ExtendedType,
    kind: TypeKind,
) -> Result<Vec<crate::schema::FieldSet>, SingleFederationError> {
    if kind != TypeKind::Object {
        // Interface keys (`@interfaceObject`-style federation) are out of scope (§9); treat a
        // `@key` on an interface as if it weren't on an object, i.e. reject it the same way.
        if extended_type.directives().has(&KEY_DIRECTIVE_NAME) {
            return Err(SingleFederationError::KeyOnNonObject {
                type_name: type_name.clone(),
            });
        }
        return Ok(Vec::new());
    }
    let mut keys = Vec::new();
    for application in extended_type.directives().get_all(&KEY_DIRECTIVE_NAME) {
        let fields_arg = directive_fields_argument(application, "fields").map_err(|_| {
            SingleFederationError::Internal {
                message: format!("@key on \"{type_name}\" has no \"fields\" argument"),
            }
        })?;
        let field_set = parse_field_set(schema, type_name.clone(), &fields_arg).map_err(|_| {
            SingleFederationError::Internal {
                message: format!("@key(fields: \"{fields_arg}\") on \"{type_name}\" is not a valid selection"),
            }
        })?;
        validate_key_field_kinds(schema, type_name, &field_set)?;
        keys.push(field_set);
    }
    Ok(keys)
}

/// A key field may not itself select a list, interface, or union field (§4.2): those can't be
/// used to look an entity back up by value.
fn validate_key_field_kinds(
    schema: &Valid<Schema>,
    type_name: &Name,
    field_set: &crate::schema::FieldSet,
) -> Result<(), SingleFederationError> {
    let Some(ExtendedType::Object(object)) = schema.types.get(type_name) else {
        return Ok(());
    };
    for field_name in field_set.top_level_field_names() {
        let Some(field) = object.fields.get(field_name) else {
            return Err(SingleFederationError::KeyFieldsMissingOnBase {
                type_name: type_name.clone(),
                field_name: field_name.clone(),
            });
        };
        if field.ty.is_list() {
            return Err(SingleFederationError::KeyFieldsSelectInvalidType {
                type_name: type_name.clone(),
                field_name: field_name.clone(),
                kind: "list",
            });
        }
        if let Some(inner) = schema.types.get(field.ty.inner_named_type()) {
            let kind = match inner {
                ExtendedType::Interface(_) => Some("interface"),
                ExtendedType::Union(_) => Some("union"),
                _ => None,
            };
            if let Some(kind) = kind {
                return Err(SingleFederationError::KeyFieldsSelectInvalidType {
                    type_name: type_name.clone(),
                    field_name: field_name.clone(),
                    kind,
                });
            }
        }
    }
    Ok(())
}

fn build_fields(
    schema: &Valid<Schema>,
    type_name: &Name,
    extended_type: &ExtendedType,
    is_entity: bool,
) -> Result<IndexMap<Name, FieldDef>, SingleFederationError> {
    let mut fields = IndexMap::new();
    match extended_type {
        ExtendedType::Object(object) => {
            for (field_name, field) in object.fields.iter() {
                fields.insert(
                    field_name.clone(),
                    build_field_def(schema, type_name, field_name, field, is_entity)?,
                );
            }
        }
        ExtendedType::Interface(intf) => {
            for (field_name, field) in intf.fields.iter() {
                fields.insert(
                    field_name.clone(),
                    build_field_def(schema, type_name, field_name, field, is_entity)?,
                );
            }
        }
        ExtendedType::InputObject(input) => {
            for (field_name, field) in input.fields.iter() {
                fields.insert(
                    field_name.clone(),
                    FieldDef {
                        name: field_name.clone(),
                        type_ref: field.ty.to_string(),
                        arguments: Vec::new(),
                        external: false,
                        requires: None,
                        provides: None,
                    },
                );
            }
        }
        _ => {}
    }
    Ok(fields)
}

fn build_field_def(
    schema: &Valid<Schema>,
    type_name: &Name,
    field_name: &Name,
    field: &Node<apollo_compiler::schema::FieldDefinition>,
    is_entity: bool,
) -> Result<FieldDef, SingleFederationError> {
    let external = field.directives.has(&EXTERNAL_DIRECTIVE_NAME);

    let requires = match field.directives.get(&REQUIRES_DIRECTIVE_NAME) {
        Some(application) => {
            if !is_entity {
                return Err(SingleFederationError::RequiresOnNonEntityField {
                    coordinate: format!("{type_name}.{field_name}"),
                });
            }
            let fields_arg = directive_fields_argument(application, "fields").map_err(|_| {
                SingleFederationError::Internal {
                    message: format!("@requires on \"{type_name}.{field_name}\" has no \"fields\" argument"),
                }
            })?;
            Some(
                parse_field_set(schema, type_name.clone(), &fields_arg).map_err(|_| {
                    SingleFederationError::Internal {
                        message: format!(
                            "@requires on \"{type_name}.{field_name}\" selects an invalid field set"
                        ),
                    }
                })?,
            )
        }
        None => None,
    };

    let provides = match field.directives.get(&PROVIDES_DIRECTIVE_NAME) {
        Some(application) => {
            if !is_entity {
                return Err(SingleFederationError::ProvidesOnNonEntityField {
                    coordinate: format!("{type_name}.{field_name}"),
                });
            }
            let fields_arg = directive_fields_argument(application, "fields").map_err(|_| {
                SingleFederationError::Internal {
                    message: format!("@provides on \"{type_name}.{field_name}\" has no \"fields\" argument"),
                }
            })?;
            let return_type_name = field.ty.inner_named_type().clone();
            Some(
                parse_field_set(schema, return_type_name, &fields_arg).map_err(|_| {
                    SingleFederationError::Internal {
                        message: format!(
                            "@provides on \"{type_name}.{field_name}\" selects an invalid field set"
                        ),
                    }
                })?,
            )
        }
        None => None,
    };

    let arguments = field
        .arguments
        .iter()
        .map(|arg| ArgumentDef {
            name: arg.name.clone(),
            type_ref: arg.ty.to_string(),
        })
        .collect();

    Ok(FieldDef {
        name: field_name.clone(),
        type_ref: field.ty.to_string(),
        arguments,
        external,
        requires,
        provides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingests_a_simple_entity_subgraph() {
        let sdl = r#"
            type Query {
                me: User
            }

            type User @key(fields: "id") {
                id: ID!
                name: String! @external
            }
        "#;
        let subgraph = ingest("accounts", "https://accounts", sdl).expect("should ingest");
        let user = subgraph.schema.get_type("User").expect("User type");
        assert!(user.is_entity());
        assert_eq!(user.keys.len(), 1);
        let name_field = &user.fields["name"];
        assert!(name_field.external);
    }

    #[test]
    fn rejects_key_on_non_object() {
        let sdl = r#"
            type Query {
                me: ID
            }

            scalar Foo @key(fields: "id")
        "#;
        let result = ingest("bad", "https://bad", sdl);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_requires_on_non_entity_field() {
        let sdl = r#"
            type Query {
                me: User
            }

            type User {
                id: ID!
                name: String! @requires(fields: "id")
            }
        "#;
        let result = ingest("bad", "https://bad", sdl);
        assert!(result.is_err());
    }
}
