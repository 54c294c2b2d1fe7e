//! Composition: merges a set of ingested [`Subgraph`]s into one supergraph schema plus
//! [`JoinMetadata`] (§4.2). `compose` runs every validation pass and aggregates every failure it
//! finds rather than stopping at the first one (§7).

pub mod join_metadata;
mod merge;
mod validate;

use apollo_compiler::validation::Valid;
use apollo_compiler::Schema;
use indexmap::IndexMap;

use crate::config::CompositionConfig;
use crate::error::invalid_graphql;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::schema::ArgumentDef;
use crate::schema::TypeKind;
use crate::subgraph::Subgraph;
use join_metadata::JoinMetadata;

/// The result of a successful `compose` call: a plain (federation-directive-free) merged schema,
/// and the join metadata needed to render it as portable CSDL and to drive query planning.
pub struct ComposedSupergraph {
    pub schema: Valid<Schema>,
    pub join_metadata: JoinMetadata,
}

/// Merges `subgraphs` into a supergraph (§4.2) under the default [`CompositionConfig`]. See
/// [`compose_with_config`] to customize validation behavior.
pub fn compose(subgraphs: Vec<Subgraph>) -> Result<ComposedSupergraph, FederationError> {
    compose_with_config(subgraphs, &CompositionConfig::default())
}

/// Merges `subgraphs` into a supergraph (§4.2). On success, returns the merged schema and join
/// metadata; on any validation failure, returns every failure found across the whole composition
/// as a [`FederationError::Aggregate`].
#[tracing::instrument(skip_all, fields(subgraph_count = subgraphs.len()))]
pub fn compose_with_config(subgraphs: Vec<Subgraph>, config: &CompositionConfig) -> Result<ComposedSupergraph, FederationError> {
    let mut errors: Vec<SingleFederationError> = Vec::new();

    let grouped = merge::group_by_type_name(&subgraphs);
    let mut join_metadata = JoinMetadata {
        graphs: merge::build_graph_table(&subgraphs),
        entities: IndexMap::new(),
        fields: IndexMap::new(),
    };
    let mut rendered_types: IndexMap<apollo_compiler::Name, RenderedType> = IndexMap::new();

    for (type_name, declarations) in grouped.iter() {
        let kind = merge::resolve_kind(type_name, declarations, &subgraphs, &mut errors);
        let field_names = merge::merge_fields(
            type_name,
            declarations,
            &subgraphs,
            config.strict_argument_validation,
            &mut errors,
        );

        let is_entity = kind == TypeKind::Object
            && declarations
                .iter()
                .any(|(_, t)| !t.keys.is_empty());
        if is_entity {
            let owner = merge::resolve_owner(type_name, declarations, &subgraphs, &mut errors);
            if let Some(owner) = owner {
                let keys_by_graph = merge::build_keys_by_graph(declarations);
                validate::validate_key_fields_exist(type_name, &field_names, declarations, &mut errors);
                merge::insert_entity(&mut join_metadata, type_name.clone(), owner, keys_by_graph);
            }
        }

        validate::validate_union_members(type_name, declarations, &mut errors);

        let mut fields = Vec::new();
        for field_name in &field_names {
            let join_info = merge::build_field_join_info(type_name, field_name, declarations);
            let canonical = declarations
                .iter()
                .find_map(|(_, t)| t.fields.get(field_name).filter(|f| !f.external))
                .or_else(|| declarations.iter().find_map(|(_, t)| t.fields.get(field_name)));
            if let Some(field) = canonical {
                fields.push(RenderedField {
                    name: field_name.clone(),
                    type_ref: field.type_ref.clone(),
                    arguments: field.arguments.clone(),
                });
            }
            join_metadata.fields.insert((type_name.clone(), field_name.clone()), join_info);
        }

        let mut enum_values: Vec<apollo_compiler::Name> = Vec::new();
        for (_, type_def) in declarations {
            for value in &type_def.enum_values {
                if !enum_values.contains(value) {
                    enum_values.push(value.clone());
                }
            }
        }

        rendered_types.insert(
            type_name.clone(),
            RenderedType {
                kind,
                fields,
                union_members: declarations
                    .iter()
                    .find(|(_, t)| !t.union_members.is_empty())
                    .map(|(_, t)| t.union_members.clone())
                    .unwrap_or_default(),
                enum_values,
            },
        );
    }

    validate::validate_external_usage(&subgraphs, &mut errors);
    validate::validate_external_against_owner(&subgraphs, &join_metadata, &mut errors);
    validate::validate_requires_provides_externality(&subgraphs, &mut errors);
    validate::validate_provides_on_entity(&subgraphs, &join_metadata, &mut errors);

    if !errors.is_empty() {
        for error in &errors {
            tracing::debug!(code = %error.code(), "composition validation failure: {error}");
        }
        return Err(FederationError::aggregate(errors));
    }

    let sdl = render_sdl(&rendered_types);
    let schema = Schema::parse_and_validate(sdl, "supergraph.graphql").map_err(invalid_graphql)?;

    Ok(ComposedSupergraph { schema, join_metadata })
}

struct RenderedField {
    name: apollo_compiler::Name,
    type_ref: String,
    arguments: Vec<ArgumentDef>,
}

struct RenderedType {
    kind: TypeKind,
    fields: Vec<RenderedField>,
    union_members: Vec<apollo_compiler::Name>,
    enum_values: Vec<apollo_compiler::Name>,
}

/// Renders the merged type model as plain GraphQL SDL, which is then handed to
/// `apollo-compiler` for validation — the composer never hand-builds a `Schema` value directly
/// (§9 design notes: reuse the GraphQL parser rather than construct schema internals by hand).
fn render_sdl(types: &IndexMap<apollo_compiler::Name, RenderedType>) -> String {
    let mut sdl = String::new();
    for (type_name, rendered) in types {
        match rendered.kind {
            TypeKind::Object => {
                sdl.push_str(&format!("type {type_name} {{\n"));
                for field in &rendered.fields {
                    render_field(&mut sdl, field);
                }
                sdl.push_str("}\n\n");
            }
            TypeKind::Interface => {
                sdl.push_str(&format!("interface {type_name} {{\n"));
                for field in &rendered.fields {
                    render_field(&mut sdl, field);
                }
                sdl.push_str("}\n\n");
            }
            TypeKind::Input => {
                sdl.push_str(&format!("input {type_name} {{\n"));
                for field in &rendered.fields {
                    sdl.push_str(&format!("  {}: {}\n", field.name, field.type_ref));
                }
                sdl.push_str("}\n\n");
            }
            TypeKind::Union => {
                let members: Vec<String> = rendered.union_members.iter().map(|m| m.to_string()).collect();
                sdl.push_str(&format!("union {type_name} = {}\n\n", members.join(" | ")));
            }
            TypeKind::Enum => {
                sdl.push_str(&format!("enum {type_name} {{\n"));
                for value in &rendered.enum_values {
                    sdl.push_str(&format!("  {value}\n"));
                }
                sdl.push_str("}\n\n");
            }
            TypeKind::Scalar => {
                sdl.push_str(&format!("scalar {type_name}\n\n"));
            }
        }
    }
    sdl
}

fn render_field(sdl: &mut String, field: &RenderedField) {
    if field.arguments.is_empty() {
        sdl.push_str(&format!("  {}: {}\n", field.name, field.type_ref));
    } else {
        let args: Vec<String> = field
            .arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.type_ref))
            .collect();
        sdl.push_str(&format!("  {}({}): {}\n", field.name, args.join(", "), field.type_ref));
    }
}
