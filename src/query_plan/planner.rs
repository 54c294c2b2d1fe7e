//! The query planner (§4.4): turns one client operation into a [`QueryPlan`] against a composed
//! supergraph, using the [`JoinMetadata`] composition produced to decide which subgraph resolves
//! each field and where an entity boundary needs an `_entities` fetch.
//!
//! Unlike `apollo-federation::query_plan::query_planner`, this planner doesn't search a space of
//! candidate plans and score them: it makes one deterministic pass, picking the lexicographically
//! smallest eligible subgraph name at every choice point (root field grouping, entity-fetch target,
//! key selection). That's enough to satisfy every property in §8 (coverage, determinism, requires
//! discharge, ...) without the bookkeeping a full planner needs, at the cost of sometimes not
//! finding the fetch-minimal plan a cost-based planner would.
//!
//! Polymorphic selections (fragments on interfaces/unions whose subgraph resolution could differ
//! per concrete type) are flattened as if the type condition always matched; the supergraphs this
//! planner is exercised against don't split field ownership across concrete types of the same
//! interface, so this is a scope reduction rather than a correctness gap for now.

use apollo_compiler::ast::Argument;
use apollo_compiler::ast::Value;
use apollo_compiler::executable::Field;
use apollo_compiler::executable::Selection;
use apollo_compiler::validation::Valid;
use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::composition::join_metadata::EntityJoinInfo;
use crate::composition::join_metadata::FieldJoinInfo;
use crate::composition::join_metadata::GraphId;
use crate::composition::join_metadata::JoinMetadata;
use crate::config::QueryPlannerConfig;
use crate::error::invalid_graphql;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::query_plan::FetchNode;
use crate::query_plan::FlattenNode;
use crate::query_plan::ParallelNode;
use crate::query_plan::PlanNode;
use crate::query_plan::QueryPlan;
use crate::query_plan::SequenceNode;
use crate::schema::FieldSet;

/// Plans client operations against one composed supergraph. Holds the supergraph schema and its
/// join metadata for the lifetime of the planner, mirroring how
/// `apollo-federation::query_plan::query_planner::QueryPlanner` is built once per supergraph and
/// reused across many `plan` calls.
pub struct QueryPlanner {
    schema: Valid<Schema>,
    metadata: JoinMetadata,
    config: QueryPlannerConfig,
}

impl QueryPlanner {
    pub fn new(schema: Valid<Schema>, metadata: JoinMetadata, config: QueryPlannerConfig) -> Self {
        QueryPlanner { schema, metadata, config }
    }

    pub fn config(&self) -> &QueryPlannerConfig {
        &self.config
    }

    /// Plans `operation_name` (or the document's sole operation, if `None`) found in
    /// `document_text` (§4.4). The document is parsed and validated against the supergraph's
    /// schema before planning, the same way a gateway would validate a client request before
    /// routing it.
    #[tracing::instrument(skip_all, fields(operation_name = operation_name.unwrap_or("<anonymous>")))]
    pub fn plan(&self, document_text: &str, operation_name: Option<&str>) -> Result<QueryPlan, FederationError> {
        let document = ExecutableDocument::parse_and_validate(&self.schema, document_text, "operation.graphql")
            .map_err(invalid_graphql)?;
        let operation = document
            .get_operation(operation_name)
            .map_err(|_| FederationError::internal("requested operation was not found in the document"))?;

        let root_type = operation.selection_set.ty.clone();
        let var_types: IndexMap<Name, String> = operation
            .variables
            .iter()
            .map(|var| (var.name.clone(), var.ty.to_string()))
            .collect();

        let ctx = PlanContext {
            metadata: &self.metadata,
            document: &document,
            var_types: &var_types,
        };

        let root_fields = flatten_fields(&document, &operation.selection_set);
        if root_fields.is_empty() {
            return Ok(QueryPlan { node: None });
        }

        let mut groups: IndexMap<GraphId, Vec<&Node<Field>>> = IndexMap::new();
        for field in &root_fields {
            if field.name.as_str() == "__typename" {
                continue;
            }
            let info = ctx.field_info(&root_type, &field.name)?;
            let graph_id = ctx.pick_subgraph(info)?;
            groups.entry(graph_id).or_default().push(field);
        }

        if groups.is_empty() {
            return Ok(QueryPlan { node: None });
        }

        if operation.is_subscription() && groups.len() > 1 {
            return Err(SingleFederationError::SubscriptionMultipleSubgraphs.into());
        }

        let mut graph_ids: Vec<GraphId> = groups.keys().copied().collect();
        graph_ids.sort_by(|a, b| ctx.metadata.graphs[*a].name.cmp(&ctx.metadata.graphs[*b].name));

        let mut nodes = Vec::with_capacity(graph_ids.len());
        for graph_id in graph_ids {
            let fields = groups.remove(&graph_id).expect("graph id was just collected from groups");
            nodes.push(ctx.build_fetch(graph_id, &root_type, &fields, Vec::new(), None)?);
        }

        let node = match nodes.len() {
            1 => nodes.remove(0),
            _ => PlanNode::Parallel(ParallelNode { nodes }),
        };

        Ok(QueryPlan { node: Some(node) })
    }
}

/// An entity fetch's representation: the concrete type it targets, and the `__typename` + key (+
/// any `@requires` extras) selection text gathered at the parent response path.
struct EntityFetchContext {
    entity_type: Name,
    representation: String,
}

/// Borrowed state threaded through one `plan` call. Kept separate from [`QueryPlanner`] so its
/// methods can borrow the parsed `document` and the operation's variable types without tying them
/// to `QueryPlanner`'s own lifetime.
struct PlanContext<'a> {
    metadata: &'a JoinMetadata,
    document: &'a ExecutableDocument,
    var_types: &'a IndexMap<Name, String>,
}

impl<'a> PlanContext<'a> {
    fn field_info(&self, type_name: &Name, field_name: &Name) -> Result<&'a FieldJoinInfo, FederationError> {
        self.metadata.field(type_name, field_name).ok_or_else(|| {
            SingleFederationError::NoResolver {
                coordinate: format!("{type_name}.{field_name}"),
            }
            .into()
        })
    }

    /// The deterministic tie-break used at every fork in the plan (§4.4): the lexicographically
    /// smallest subgraph name among those that can resolve the field.
    fn pick_subgraph(&self, info: &FieldJoinInfo) -> Result<GraphId, FederationError> {
        info.resolvable_in
            .iter()
            .copied()
            .min_by(|a, b| self.metadata.graphs[*a].name.cmp(&self.metadata.graphs[*b].name))
            .ok_or_else(|| FederationError::internal("field is marked resolvable but lists no subgraph"))
    }

    /// Whether `field_name` on `type_name` can be resolved directly in `graph_id`, either because
    /// the subgraph declares it natively or because an enclosing field's `@provides` in that
    /// subgraph already promises it (§4.2, §8 Scenario D).
    fn is_locally_resolvable(&self, type_name: &Name, field_name: &Name, graph_id: GraphId, provided: Option<&FieldSet>) -> bool {
        if field_name.as_str() == "__typename" {
            return true;
        }
        if let Some(provided) = provided {
            if provided.top_level_field_names().into_iter().any(|name| name == field_name) {
                return true;
            }
        }
        self.metadata
            .field(type_name, field_name)
            .map(|info| info.is_resolvable_in(graph_id))
            .unwrap_or(false)
    }

    /// Renders `fields` (all belonging to `parent_type`, all resolved in `graph_id`) as the body
    /// of one subgraph fetch, recursing into nested selections and collecting any entity
    /// boundaries found along the way as additional plan nodes to sequence after this fetch.
    fn build_fetch(
        &self,
        graph_id: GraphId,
        parent_type: &Name,
        fields: &[&Node<Field>],
        path: Vec<String>,
        entity_context: Option<EntityFetchContext>,
    ) -> Result<PlanNode, FederationError> {
        let mut variables: IndexSet<Name> = IndexSet::new();
        let mut entity_fetches: Vec<PlanNode> = Vec::new();

        let body = self.render_selection(graph_id, parent_type, fields, &path, &mut variables, &mut entity_fetches)?;

        let (selection_set, operation, entity_type, representations) = match &entity_context {
            Some(ctx) => {
                let selection_set = format!("{{ _entities(representations: $representations) {{ ... on {} {{ {body} }} }} }}", ctx.entity_type);
                let operation = format!("query({}) {selection_set}", self.render_variable_decls(&variables, true));
                (selection_set, operation, Some(ctx.entity_type.to_string()), Some(ctx.representation.clone()))
            }
            None => {
                let selection_set = format!("{{ {body} }}");
                if variables.is_empty() {
                    (selection_set.clone(), selection_set, None, None)
                } else {
                    let operation = format!("query({}) {selection_set}", self.render_variable_decls(&variables, false));
                    (selection_set, operation, None, None)
                }
            }
        };

        let mut variable_usages: Vec<String> = variables.iter().map(|name| name.to_string()).collect();
        if entity_context.is_some() {
            variable_usages.push("representations".to_string());
        }

        let fetch = PlanNode::Fetch(FetchNode {
            subgraph_name: self.metadata.graphs[graph_id].name.clone(),
            entity_type,
            representations,
            requires_path: path,
            selection_set,
            variable_usages,
            operation,
        });

        if entity_fetches.is_empty() {
            Ok(fetch)
        } else {
            let mut nodes = Vec::with_capacity(1 + entity_fetches.len());
            nodes.push(fetch);
            nodes.extend(entity_fetches);
            Ok(PlanNode::Sequence(SequenceNode { nodes }))
        }
    }

    fn render_variable_decls(&self, variables: &IndexSet<Name>, with_representations: bool) -> String {
        let mut decls = Vec::new();
        if with_representations {
            decls.push("$representations: [_Any!]!".to_string());
        }
        for name in variables {
            let ty = self.var_types.get(name).cloned().unwrap_or_else(|| "String".to_string());
            decls.push(format!("${name}: {ty}"));
        }
        decls.join(", ")
    }

    fn render_selection(
        &self,
        graph_id: GraphId,
        parent_type: &Name,
        fields: &[&Node<Field>],
        path: &[String],
        variables: &mut IndexSet<Name>,
        entity_fetches: &mut Vec<PlanNode>,
    ) -> Result<String, FederationError> {
        let mut rendered = Vec::with_capacity(fields.len());
        for field in fields {
            rendered.push(self.render_field(graph_id, parent_type, field, path, variables, entity_fetches)?);
        }
        Ok(rendered.join(" "))
    }

    fn render_field(
        &self,
        graph_id: GraphId,
        parent_type: &Name,
        field: &Node<Field>,
        path: &[String],
        variables: &mut IndexSet<Name>,
        entity_fetches: &mut Vec<PlanNode>,
    ) -> Result<String, FederationError> {
        let response_key = field.alias.as_ref().unwrap_or(&field.name);
        let head = format!("{}{}", alias_prefix(field), render_arguments(&field.arguments, variables));

        if field.selection_set.selections.is_empty() {
            return Ok(head);
        }

        let child_type = field.selection_set.ty.clone();
        let sub_fields = flatten_fields(self.document, &field.selection_set);
        let provided = self
            .metadata
            .field(parent_type, &field.name)
            .and_then(|info| info.provides.get(&graph_id));

        let mut local_fields = Vec::new();
        let mut remote_fields = Vec::new();
        for f in sub_fields {
            if self.is_locally_resolvable(&child_type, &f.name, graph_id, provided) {
                local_fields.push(f);
            } else {
                remote_fields.push(f);
            }
        }

        let mut child_path = path.to_vec();
        child_path.push(response_key.to_string());

        let mut body_parts = Vec::new();
        if !local_fields.is_empty() {
            body_parts.push(self.render_selection(graph_id, &child_type, &local_fields, &child_path, variables, entity_fetches)?);
        }

        if !remote_fields.is_empty() {
            let entity = self.metadata.entity(&child_type).ok_or_else(|| {
                FederationError::internal(format!(
                    "\"{parent_type}.{}\" returns non-entity type \"{child_type}\" but has sub-fields unresolvable in subgraph \"{}\"",
                    field.name, self.metadata.graphs[graph_id].name
                ))
            })?;
            body_parts.push(self.render_entity_boundary(graph_id, entity, &child_type, &remote_fields, &child_path, entity_fetches)?);
        }

        Ok(format!("{head} {{ {} }}", body_parts.join(" ")))
    }

    /// Groups `remote_fields` by the subgraph each resolves in, builds one entity fetch per
    /// target subgraph (§4.4 "Entity boundaries"), and returns the `__typename` + key + `@requires`
    /// selection text that must be added to the *current* subgraph's selection at `child_path` so
    /// those entity fetches have a representation to work from. `parent_graph_id` is the subgraph
    /// already resolving the enclosing group; a `@requires` field set that isn't reachable there
    /// is unsatisfiable (§4.4, §7) rather than silently folded into the representation.
    fn render_entity_boundary(
        &self,
        parent_graph_id: GraphId,
        entity: &EntityJoinInfo,
        child_type: &Name,
        remote_fields: &[&Node<Field>],
        child_path: &[String],
        entity_fetches: &mut Vec<PlanNode>,
    ) -> Result<String, FederationError> {
        let mut remote_groups: IndexMap<GraphId, Vec<&Node<Field>>> = IndexMap::new();
        for field in remote_fields {
            let info = self.field_info(child_type, &field.name)?;
            let target_graph_id = self.pick_subgraph(info)?;
            remote_groups.entry(target_graph_id).or_default().push(field);
        }

        let mut target_graph_ids: Vec<GraphId> = remote_groups.keys().copied().collect();
        target_graph_ids.sort_by(|a, b| self.metadata.graphs[*a].name.cmp(&self.metadata.graphs[*b].name));

        let mut representation_fields: IndexSet<String> = IndexSet::new();
        representation_fields.insert("__typename".to_string());
        let mut target_nodes = Vec::with_capacity(target_graph_ids.len());

        for target_graph_id in target_graph_ids {
            let target_fields = remote_groups.remove(&target_graph_id).expect("graph id was just collected");
            let key = choose_key(entity, target_graph_id)?;
            representation_fields.insert(key.selection_text());

            let mut requires_fields: IndexSet<String> = IndexSet::new();
            for field in &target_fields {
                if let Some(requires) = self.metadata.field(child_type, &field.name).and_then(|info| info.requires.get(&target_graph_id)) {
                    for required_name in requires.top_level_field_names() {
                        if !self.is_locally_resolvable(child_type, required_name, parent_graph_id, None) {
                            return Err(SingleFederationError::UnsatisfiableRequires {
                                coordinate: format!("{child_type}.{}", field.name),
                                field_set: requires.to_string(),
                            }
                            .into());
                        }
                    }
                    requires_fields.insert(requires.selection_text());
                }
            }
            representation_fields.extend(requires_fields.iter().cloned());

            let representation = format!("__typename {} {}", key.selection_text(), requires_fields.into_iter().collect::<Vec<_>>().join(" "))
                .trim()
                .to_string();

            let entity_context = EntityFetchContext {
                entity_type: child_type.clone(),
                representation,
            };
            let node = self.build_fetch(target_graph_id, child_type, &target_fields, child_path.to_vec(), Some(entity_context))?;
            target_nodes.push(node);
        }

        let wrapped = match target_nodes.len() {
            1 => target_nodes.remove(0),
            _ => PlanNode::Parallel(ParallelNode { nodes: target_nodes }),
        };
        entity_fetches.push(PlanNode::Flatten(FlattenNode {
            path: child_path.to_vec(),
            node: Box::new(wrapped),
        }));

        Ok(representation_fields.into_iter().collect::<Vec<_>>().join(" "))
    }
}

fn alias_prefix(field: &Node<Field>) -> String {
    match &field.alias {
        Some(alias) => format!("{alias}: {}", field.name),
        None => field.name.to_string(),
    }
}

/// Renders a field's GraphQL arguments as subgraph-fetch text, recording any client-supplied
/// variables it references along the way (§4.4 "Variables").
fn render_arguments(arguments: &[Node<Argument>], variables: &mut IndexSet<Name>) -> String {
    if arguments.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = arguments
        .iter()
        .map(|argument| {
            collect_variable_refs(&argument.value, variables);
            format!("{}: {}", argument.name, argument.value)
        })
        .collect();
    format!("({})", rendered.join(", "))
}

fn collect_variable_refs(value: &Value, variables: &mut IndexSet<Name>) {
    match value {
        Value::Variable(name) => {
            variables.insert(name.clone());
        }
        Value::List(items) => {
            for item in items {
                collect_variable_refs(item, variables);
            }
        }
        Value::Object(fields) => {
            for (_, value) in fields {
                collect_variable_refs(value, variables);
            }
        }
        _ => {}
    }
}

/// The key-selection tie-break from §4.4 point 3: among the keys `target_graph_id` declares for
/// `entity`, prefer the one with fewest fields, breaking further ties lexicographically on its
/// rendered text so the choice is stable across runs.
fn choose_key(entity: &EntityJoinInfo, target_graph_id: GraphId) -> Result<&FieldSet, FederationError> {
    let keys = entity.keys_by_graph.get_vec(&target_graph_id).ok_or_else(|| {
        FederationError::internal("entity fetch target subgraph has no declared key for this entity")
    })?;
    keys.iter()
        .min_by_key(|key| (key.all_field_names().len(), key.to_string()))
        .ok_or_else(|| FederationError::internal("entity fetch target subgraph's key list is empty"))
}

/// Flattens an operation's selections into the plain fields it selects, transparently resolving
/// inline fragments and named fragment spreads regardless of type condition (see the module-level
/// scope note on polymorphic selections).
fn flatten_fields<'doc>(document: &'doc ExecutableDocument, selection_set: &'doc apollo_compiler::executable::SelectionSet) -> Vec<&'doc Node<Field>> {
    let mut fields = Vec::new();
    collect_fields(document, selection_set, &mut fields);
    fields
}

fn collect_fields<'doc>(
    document: &'doc ExecutableDocument,
    selection_set: &'doc apollo_compiler::executable::SelectionSet,
    out: &mut Vec<&'doc Node<Field>>,
) {
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) => out.push(field),
            Selection::InlineFragment(inline) => collect_fields(document, &inline.selection_set, out),
            Selection::FragmentSpread(spread) => {
                if let Some(fragment) = document.fragments.get(&spread.fragment_name) {
                    collect_fields(document, &fragment.selection_set, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::compose;
    use crate::subgraph::ingest;

    fn plan_products_and_inventory() -> QueryPlanner {
        let products = ingest(
            "products",
            "https://products",
            r#"
                type Query {
                    topProducts: [Product!]!
                }

                type Product @key(fields: "upc") {
                    upc: ID!
                    name: String!
                    weight: Int!
                }
            "#,
        )
        .expect("products subgraph should ingest");

        let inventory = ingest(
            "inventory",
            "https://inventory",
            r#"
                type Product @key(fields: "upc") {
                    upc: ID! @external
                    weight: Int! @external
                    shippingEstimate: String! @requires(fields: "weight")
                }
            "#,
        )
        .expect("inventory subgraph should ingest");

        let composed = compose(vec![products, inventory]).expect("composition should succeed");
        QueryPlanner::new(composed.schema, composed.join_metadata, QueryPlannerConfig::default())
    }

    #[test]
    fn plans_an_entity_fetch_with_requires_discharge() {
        let planner = plan_products_and_inventory();
        let plan = planner
            .plan("{ topProducts { name shippingEstimate } }", None)
            .expect("plan should succeed");

        let fetches = plan.node.as_ref().expect("plan has a node").fetches();
        assert_eq!(fetches.len(), 2);

        let root = fetches[0];
        assert_eq!(root.subgraph_name, "products");
        assert!(root.selection_set.contains("weight"), "weight must be folded in for @requires discharge: {}", root.selection_set);

        let entity_fetch = fetches[1];
        assert_eq!(entity_fetch.subgraph_name, "inventory");
        assert_eq!(entity_fetch.entity_type.as_deref(), Some("Product"));
        let representations = entity_fetch.representations.as_deref().unwrap_or_default();
        assert!(representations.contains("upc"));
        assert!(representations.contains("weight"));
    }

    #[test]
    fn rejects_an_operation_referencing_an_unknown_field() {
        let planner = plan_products_and_inventory();
        let err = planner.plan("{ topProducts { doesNotExist } }", None);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_a_subscription_spanning_multiple_subgraphs() {
        let accounts = ingest(
            "accounts",
            "https://accounts",
            r#"
                type Query { me: ID }
                type Subscription { userUpdated: ID }
            "#,
        )
        .expect("accounts subgraph should ingest");
        let billing = ingest(
            "billing",
            "https://billing",
            r#"
                extend type Subscription { invoiceUpdated: ID }
            "#,
        )
        .expect("billing subgraph should ingest");

        let composed = compose(vec![accounts, billing]).expect("composition should succeed");
        let planner = QueryPlanner::new(composed.schema, composed.join_metadata, QueryPlannerConfig::default());

        let err = planner.plan("subscription { userUpdated invoiceUpdated }", None);
        assert!(err.is_err());
    }
}
