//! The supergraph builder (§4.3): renders a composed schema plus [`JoinMetadata`] as portable CSDL
//! (`@core`/`@join__*`-annotated SDL), parses that CSDL back into a schema and join metadata, and
//! strips a schema down to the client-facing API schema.
//!
//! Like [`crate::composition`], this never hand-assembles an `apollo_compiler::schema::Schema`
//! value: every direction goes through rendering SDL text and handing it to `apollo-compiler` to
//! parse and validate (§9 design notes).

use apollo_compiler::ast::Value;
use apollo_compiler::schema::Directive;
use apollo_compiler::schema::DirectiveList;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::validation::Valid;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use multimap::MultiMap;

use crate::composition::join_metadata::EntityJoinInfo;
use crate::composition::join_metadata::FieldJoinInfo;
use crate::composition::join_metadata::GraphId;
use crate::composition::join_metadata::JoinGraph;
use crate::composition::join_metadata::JoinMetadata;
use crate::composition::ComposedSupergraph;
use crate::error::invalid_graphql;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::link::argument::directive_optional_string_argument;
use crate::link::argument::directive_required_string_argument;
use crate::link::join_spec::graph_enum_value;
use crate::link::join_spec::CORE_DIRECTIVE_NAME;
use crate::link::join_spec::CORE_FEATURE_URL;
use crate::link::join_spec::JOIN_FEATURE_URL;
use crate::link::join_spec::JOIN_FIELD_DIRECTIVE_NAME;
use crate::link::join_spec::JOIN_FIELD_SET_SCALAR_NAME;
use crate::link::join_spec::JOIN_GRAPH_DIRECTIVE_NAME;
use crate::link::join_spec::JOIN_GRAPH_ENUM_NAME;
use crate::link::join_spec::JOIN_OWNER_DIRECTIVE_NAME;
use crate::link::join_spec::JOIN_TYPE_DIRECTIVE_NAME;
use crate::link::spec::SpecUrl;
use crate::link::spec::CORE_VERSION;
use crate::link::spec::JOIN_VERSION;
use crate::schema::field_set::parse_field_set;
use crate::schema::FieldSet;

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

fn is_join_scaffolding(type_name: &str) -> bool {
    type_name.starts_with("__")
        || BUILTIN_SCALARS.contains(&type_name)
        || type_name == JOIN_GRAPH_ENUM_NAME.as_str()
        || type_name == JOIN_FIELD_SET_SCALAR_NAME.as_str()
}

/// Renders `composed` as portable CSDL (§4.3): the `@core` schema directive, the `join__Graph`
/// enum, and `@join__owner`/`@join__type`/`@join__field` annotations on every type and field the
/// composer recorded join metadata for.
pub fn build(composed: &ComposedSupergraph) -> String {
    let schema = &composed.schema;
    let metadata = &composed.join_metadata;

    let mut sdl = String::new();
    render_schema_block(&mut sdl, schema, true);
    render_join_preamble(&mut sdl);
    render_graph_enum(&mut sdl, metadata);

    for (type_name, extended_type) in schema.types.iter() {
        if is_join_scaffolding(type_name) {
            continue;
        }
        render_type(&mut sdl, type_name, extended_type, metadata);
    }

    sdl
}

fn render_schema_block(sdl: &mut String, schema: &Schema, with_core_directives: bool) {
    sdl.push_str("schema");
    if with_core_directives {
        sdl.push_str(&format!("\n  @{CORE_DIRECTIVE_NAME}(feature: \"{CORE_FEATURE_URL}\")"));
        sdl.push_str(&format!("\n  @{CORE_DIRECTIVE_NAME}(feature: \"{JOIN_FEATURE_URL}\")"));
    }
    sdl.push_str("\n{\n");
    if let Some(query) = schema.query_root_operation() {
        sdl.push_str(&format!("  query: {query}\n"));
    }
    if let Some(mutation) = schema.mutation_root_operation() {
        sdl.push_str(&format!("  mutation: {mutation}\n"));
    }
    if let Some(subscription) = schema.subscription_root_operation() {
        sdl.push_str(&format!("  subscription: {subscription}\n"));
    }
    sdl.push_str("}\n\n");
}

fn render_join_preamble(sdl: &mut String) {
    sdl.push_str(&format!(
        "directive @{CORE_DIRECTIVE_NAME}(feature: String!) repeatable on SCHEMA\n\
         directive @{JOIN_GRAPH_DIRECTIVE_NAME}(name: String!, url: String!) on ENUM_VALUE\n\
         directive @{JOIN_OWNER_DIRECTIVE_NAME}(graph: {JOIN_GRAPH_ENUM_NAME}!) on OBJECT | INTERFACE\n\
         directive @{JOIN_TYPE_DIRECTIVE_NAME}(graph: {JOIN_GRAPH_ENUM_NAME}!, key: {JOIN_FIELD_SET_SCALAR_NAME}!) repeatable on OBJECT | INTERFACE\n\
         directive @{JOIN_FIELD_DIRECTIVE_NAME}(graph: {JOIN_GRAPH_ENUM_NAME}, requires: {JOIN_FIELD_SET_SCALAR_NAME}, provides: {JOIN_FIELD_SET_SCALAR_NAME}) repeatable on FIELD_DEFINITION\n\
         \n\
         scalar {JOIN_FIELD_SET_SCALAR_NAME}\n\n"
    ));
}

fn render_graph_enum(sdl: &mut String, metadata: &JoinMetadata) {
    sdl.push_str(&format!("enum {JOIN_GRAPH_ENUM_NAME} {{\n"));
    for graph in &metadata.graphs {
        let value = graph_enum_value(&graph.name);
        sdl.push_str(&format!(
            "  {value} @{JOIN_GRAPH_DIRECTIVE_NAME}(name: \"{}\", url: \"{}\")\n",
            graph.name, graph.url
        ));
    }
    sdl.push_str("}\n\n");
}

fn render_type(sdl: &mut String, type_name: &Name, extended_type: &ExtendedType, metadata: &JoinMetadata) {
    let entity = metadata.entity(type_name);
    let type_directives = render_owner_and_keys(entity, metadata);
    match extended_type {
        ExtendedType::Object(object) => {
            sdl.push_str(&format!("type {type_name}{type_directives} {{\n"));
            for (field_name, field) in object.fields.iter() {
                render_field(sdl, type_name, field_name, &field.ty.to_string(), &field.arguments, metadata);
            }
            sdl.push_str("}\n\n");
        }
        ExtendedType::Interface(intf) => {
            sdl.push_str(&format!("interface {type_name}{type_directives} {{\n"));
            for (field_name, field) in intf.fields.iter() {
                render_field(sdl, type_name, field_name, &field.ty.to_string(), &field.arguments, metadata);
            }
            sdl.push_str("}\n\n");
        }
        ExtendedType::InputObject(input) => {
            sdl.push_str(&format!("input {type_name} {{\n"));
            for (field_name, field) in input.fields.iter() {
                sdl.push_str(&format!("  {field_name}: {}\n", field.ty));
            }
            sdl.push_str("}\n\n");
        }
        ExtendedType::Union(union_) => {
            let members: Vec<String> = union_.members.iter().map(|m| m.name.to_string()).collect();
            sdl.push_str(&format!("union {type_name} = {}\n\n", members.join(" | ")));
        }
        ExtendedType::Enum(enum_) => {
            sdl.push_str(&format!("enum {type_name} {{\n"));
            for value in enum_.values.keys() {
                sdl.push_str(&format!("  {value}\n"));
            }
            sdl.push_str("}\n\n");
        }
        ExtendedType::Scalar(_) => {
            sdl.push_str(&format!("scalar {type_name}\n\n"));
        }
    }
}

fn render_owner_and_keys(entity: Option<&EntityJoinInfo>, metadata: &JoinMetadata) -> String {
    let Some(entity) = entity else {
        return String::new();
    };
    let mut out = String::new();
    let owner_name = &metadata.graphs[entity.owner].name;
    out.push_str(&format!(
        "\n  @{JOIN_OWNER_DIRECTIVE_NAME}(graph: {})",
        graph_enum_value(owner_name)
    ));
    let mut graph_ids: Vec<&GraphId> = entity.keys_by_graph.keys().collect();
    graph_ids.sort();
    for graph_id in graph_ids {
        let graph_name = &metadata.graphs[*graph_id].name;
        if let Some(keys) = entity.keys_by_graph.get_vec(graph_id) {
            for key in keys {
                out.push_str(&format!(
                    "\n  @{JOIN_TYPE_DIRECTIVE_NAME}(graph: {}, key: \"{}\")",
                    graph_enum_value(graph_name),
                    key_fields_text(key)
                ));
            }
        }
    }
    out
}

/// Renders a [`FieldSet`]'s fields as the bare text a `fields:` argument expects, e.g. `upc` or
/// `organization { id }`, stripping the outer braces `FieldSet::Display` always wraps with.
fn key_fields_text(field_set: &FieldSet) -> String {
    let rendered = field_set.to_string();
    rendered
        .strip_prefix("{ ")
        .and_then(|s| s.strip_suffix(" }"))
        .unwrap_or(&rendered)
        .to_string()
}

fn render_field(
    sdl: &mut String,
    type_name: &Name,
    field_name: &Name,
    type_ref: &str,
    arguments: &[Node<apollo_compiler::schema::InputValueDefinition>],
    metadata: &JoinMetadata,
) {
    let args_text = if arguments.is_empty() {
        String::new()
    } else {
        let args: Vec<String> = arguments.iter().map(|a| format!("{}: {}", a.name, a.ty)).collect();
        format!("({})", args.join(", "))
    };

    let mut directives = String::new();
    if let Some(join_info) = metadata.field(type_name, field_name) {
        for &graph_id in &join_info.resolvable_in {
            let graph_name = &metadata.graphs[graph_id].name;
            directives.push_str(&format!(" @{JOIN_FIELD_DIRECTIVE_NAME}(graph: {}", graph_enum_value(graph_name)));
            if let Some(requires) = join_info.requires.get(&graph_id) {
                directives.push_str(&format!(", requires: \"{}\"", key_fields_text(requires)));
            }
            if let Some(provides) = join_info.provides.get(&graph_id) {
                directives.push_str(&format!(", provides: \"{}\"", key_fields_text(provides)));
            }
            directives.push(')');
        }
    }

    sdl.push_str(&format!("  {field_name}{args_text}: {type_ref}{directives}\n"));
}

/// Parses portable CSDL back into a schema and [`JoinMetadata`] (§4.3). Validates that the
/// `@core` feature URLs the document declares are ones this crate understands
/// (`UNSUPPORTED_FEATURE`, §6), then reconstructs the graph table, entity ownership/keys, and
/// per-field resolution info from the `join__Graph` enum and `@join__owner`/`@join__type`/
/// `@join__field` annotations.
pub fn parse(csdl: &str) -> Result<ComposedSupergraph, FederationError> {
    let schema = Schema::parse_and_validate(csdl, "supergraph.graphql").map_err(invalid_graphql)?;

    validate_core_features(&schema)?;

    let Some(ExtendedType::Enum(graph_enum)) = schema.types.get(JOIN_GRAPH_ENUM_NAME.as_str()) else {
        return Err(FederationError::internal(format!(
            "supergraph is missing the \"{JOIN_GRAPH_ENUM_NAME}\" enum"
        )));
    };
    let mut graphs = Vec::with_capacity(graph_enum.values.len());
    let mut graph_id_by_enum_value: IndexMap<Name, GraphId> = IndexMap::new();
    for (value_name, value) in graph_enum.values.iter() {
        let directive = value
            .directives
            .get(JOIN_GRAPH_DIRECTIVE_NAME.as_str())
            .ok_or_else(|| FederationError::internal(format!("enum value \"{value_name}\" is missing @{JOIN_GRAPH_DIRECTIVE_NAME}")))?;
        let name = directive_required_string_argument(directive, "name")?;
        let url = directive_required_string_argument(directive, "url")?;
        let graph_id = graphs.len();
        graph_id_by_enum_value.insert(value_name.clone(), graph_id);
        graphs.push(JoinGraph { name, url });
    }

    let mut join_metadata = JoinMetadata {
        graphs,
        entities: IndexMap::new(),
        fields: IndexMap::new(),
    };

    for (type_name, extended_type) in schema.types.iter() {
        if is_join_scaffolding(type_name) {
            continue;
        }
        let (directives, fields): (&DirectiveList, Vec<(&Name, &DirectiveList)>) = match extended_type {
            ExtendedType::Object(object) => (
                &object.directives,
                object.fields.iter().map(|(n, f)| (n, &f.directives)).collect(),
            ),
            ExtendedType::Interface(intf) => (
                &intf.directives,
                intf.fields.iter().map(|(n, f)| (n, &f.directives)).collect(),
            ),
            _ => continue,
        };

        if let Some(owner_directive) = directives.iter().find(|d| d.name == JOIN_OWNER_DIRECTIVE_NAME.as_str()) {
            let owner_value = directive_required_enum(owner_directive, "graph")?;
            let owner = *graph_id_by_enum_value
                .get(owner_value.as_str())
                .ok_or_else(|| FederationError::internal(format!("@{JOIN_OWNER_DIRECTIVE_NAME} references unknown graph \"{owner_value}\"")))?;

            let mut keys_by_graph: MultiMap<GraphId, FieldSet> = MultiMap::new();
            for key_directive in directives.iter().filter(|d| d.name == JOIN_TYPE_DIRECTIVE_NAME.as_str()) {
                let graph_value = directive_required_enum(key_directive, "graph")?;
                let graph_id = *graph_id_by_enum_value
                    .get(graph_value.as_str())
                    .ok_or_else(|| FederationError::internal(format!("@{JOIN_TYPE_DIRECTIVE_NAME} references unknown graph \"{graph_value}\"")))?;
                let key_text = directive_optional_string_argument(key_directive, "key")?
                    .ok_or_else(|| FederationError::internal(format!("@{JOIN_TYPE_DIRECTIVE_NAME} on \"{type_name}\" is missing \"key\"")))?;
                let key = parse_field_set(&schema, type_name.clone(), &key_text)?;
                keys_by_graph.insert(graph_id, key);
            }

            join_metadata.entities.insert(type_name.clone(), EntityJoinInfo { owner, keys_by_graph });
        }

        for (field_name, field_directives) in fields {
            let mut join_info = FieldJoinInfo::default();
            for field_directive in field_directives.iter().filter(|d| d.name == JOIN_FIELD_DIRECTIVE_NAME.as_str()) {
                let Some(graph_value) = directive_optional_enum(field_directive, "graph")? else {
                    continue;
                };
                let graph_id = *graph_id_by_enum_value
                    .get(graph_value.as_str())
                    .ok_or_else(|| FederationError::internal(format!("@{JOIN_FIELD_DIRECTIVE_NAME} references unknown graph \"{graph_value}\"")))?;
                join_info.resolvable_in.push(graph_id);
                if let Some(requires_text) = directive_optional_string_argument(field_directive, "requires")? {
                    join_info.requires.insert(graph_id, parse_field_set(&schema, type_name.clone(), &requires_text)?);
                }
                if let Some(provides_text) = directive_optional_string_argument(field_directive, "provides")? {
                    join_info.provides.insert(graph_id, parse_field_set(&schema, type_name.clone(), &provides_text)?);
                }
            }
            if join_info.resolvable_in.is_empty() {
                if let Some(entity) = join_metadata.entities.get(type_name) {
                    join_info.resolvable_in.push(entity.owner);
                }
            }
            join_metadata.fields.insert((type_name.clone(), field_name.clone()), join_info);
        }
    }

    let plain_sdl = render_plain_sdl(&schema);
    let plain_schema = Schema::parse_and_validate(plain_sdl, "supergraph.graphql").map_err(invalid_graphql)?;

    Ok(ComposedSupergraph {
        schema: plain_schema,
        join_metadata,
    })
}

/// Strips `@core`/`@join__*` scaffolding from `schema` and returns the resulting client-facing API
/// schema (§4.3's closing sentence): every type and field is kept as declared, minus the join
/// directives and the `join__Graph`/`join__FieldSet` scaffolding types themselves.
pub fn api_schema(schema: &Valid<Schema>) -> Result<Valid<Schema>, FederationError> {
    let sdl = render_plain_sdl(schema);
    Schema::parse_and_validate(sdl, "api_schema.graphql").map_err(invalid_graphql)
}

fn render_plain_sdl(schema: &Schema) -> String {
    let mut sdl = String::new();
    render_schema_block(&mut sdl, schema, false);
    for (type_name, extended_type) in schema.types.iter() {
        if is_join_scaffolding(type_name) {
            continue;
        }
        match extended_type {
            ExtendedType::Object(object) => {
                sdl.push_str(&format!("type {type_name} {{\n"));
                for (field_name, field) in object.fields.iter() {
                    render_plain_field(&mut sdl, field_name, &field.ty.to_string(), &field.arguments);
                }
                sdl.push_str("}\n\n");
            }
            ExtendedType::Interface(intf) => {
                sdl.push_str(&format!("interface {type_name} {{\n"));
                for (field_name, field) in intf.fields.iter() {
                    render_plain_field(&mut sdl, field_name, &field.ty.to_string(), &field.arguments);
                }
                sdl.push_str("}\n\n");
            }
            ExtendedType::InputObject(input) => {
                sdl.push_str(&format!("input {type_name} {{\n"));
                for (field_name, field) in input.fields.iter() {
                    sdl.push_str(&format!("  {field_name}: {}\n", field.ty));
                }
                sdl.push_str("}\n\n");
            }
            ExtendedType::Union(union_) => {
                let members: Vec<String> = union_.members.iter().map(|m| m.name.to_string()).collect();
                sdl.push_str(&format!("union {type_name} = {}\n\n", members.join(" | ")));
            }
            ExtendedType::Enum(enum_) => {
                sdl.push_str(&format!("enum {type_name} {{\n"));
                for value in enum_.values.keys() {
                    sdl.push_str(&format!("  {value}\n"));
                }
                sdl.push_str("}\n\n");
            }
            ExtendedType::Scalar(_) => {
                sdl.push_str(&format!("scalar {type_name}\n\n"));
            }
        }
    }
    sdl
}

fn render_plain_field(sdl: &mut String, field_name: &Name, type_ref: &str, arguments: &[Node<apollo_compiler::schema::InputValueDefinition>]) {
    if arguments.is_empty() {
        sdl.push_str(&format!("  {field_name}: {type_ref}\n"));
    } else {
        let args: Vec<String> = arguments.iter().map(|a| format!("{}: {}", a.name, a.ty)).collect();
        sdl.push_str(&format!("  {field_name}({}): {type_ref}\n", args.join(", ")));
    }
}

fn validate_core_features(schema: &Schema) -> Result<(), FederationError> {
    let mut saw_core = false;
    for directive in schema.schema_definition.directives.iter() {
        if directive.name != CORE_DIRECTIVE_NAME.as_str() {
            continue;
        }
        saw_core = true;
        let feature = directive_required_string_argument(directive, "feature")?;
        let url = SpecUrl::parse(&feature).map_err(|message| -> FederationError { SingleFederationError::UnsupportedFeature { message }.into() })?;
        let supported = match url.identity.name.as_str() {
            "core" => url.version.satisfies(&CORE_VERSION),
            "join" => url.version.satisfies(&JOIN_VERSION),
            _ => false,
        };
        if !supported {
            return Err(SingleFederationError::UnsupportedFeature {
                message: format!("unsupported @core feature \"{feature}\""),
            }
            .into());
        }
    }
    if !saw_core {
        return Err(SingleFederationError::UnsupportedFeature {
            message: "supergraph schema declares no @core features".to_string(),
        }
        .into());
    }
    Ok(())
}

fn directive_optional_enum(directive: &Node<Directive>, name: &str) -> Result<Option<Name>, FederationError> {
    match directive.arguments.iter().find(|a| a.name == name) {
        Some(a) => match &*a.value {
            Value::Enum(value) => Ok(Some(value.clone())),
            Value::Null => Ok(None),
            _ => Err(FederationError::internal(format!(
                "argument \"{name}\" of @{} must be an enum value",
                directive.name
            ))),
        },
        None => Ok(None),
    }
}

fn directive_required_enum(directive: &Node<Directive>, name: &str) -> Result<Name, FederationError> {
    directive_optional_enum(directive, name)?
        .ok_or_else(|| FederationError::internal(format!("argument \"{name}\" of @{} was not present", directive.name)))
}
