//! Query planner end-to-end scenarios (spec §8): entity fan-out, `@requires` discharge,
//! `@provides` short-circuiting, and the determinism/coverage/key-soundness properties.

use graphfed_core::composition::compose;
use graphfed_core::config::QueryPlannerConfig;
use graphfed_core::query_plan::PlanNode;
use graphfed_core::query_plan::QueryPlanner;
use graphfed_core::subgraph::ingest;

fn planner_for(subgraphs: Vec<graphfed_core::subgraph::Subgraph>) -> QueryPlanner {
    let composed = compose(subgraphs).expect("composition should succeed");
    QueryPlanner::new(composed.schema, composed.join_metadata, QueryPlannerConfig::default())
}

/// Scenario B (entity fan-out): a query spanning an owning subgraph and one entity-extending
/// subgraph plans as a root fetch followed by a `Flatten`-wrapped entity fetch.
#[test]
fn scenario_b_entity_fan_out_plans_a_root_fetch_then_an_entity_fetch() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") {
                upc: ID!
                name: String
            }
        "#,
    )
    .expect("products subgraph should ingest");

    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Review { body: String }
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                reviews: [Review!]!
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let planner = planner_for(vec![products, reviews]);
    let plan = planner
        .plan("{ topProducts { upc name reviews { body } } }", None)
        .expect("plan should succeed");

    let node = plan.node.expect("plan has a node");
    let PlanNode::Sequence(sequence) = &node else {
        panic!("expected a Sequence node, got {node:?}");
    };
    assert_eq!(sequence.nodes.len(), 2);

    let PlanNode::Fetch(root_fetch) = &sequence.nodes[0] else {
        panic!("first node should be the root fetch, got {:?}", sequence.nodes[0]);
    };
    assert_eq!(root_fetch.subgraph_name, "products");
    assert!(root_fetch.requires_path.is_empty());
    assert!(root_fetch.selection_set.contains("__typename"));
    assert!(root_fetch.selection_set.contains("upc"));
    assert!(root_fetch.selection_set.contains("name"));

    let PlanNode::Flatten(flatten) = &sequence.nodes[1] else {
        panic!("second node should be a Flatten, got {:?}", sequence.nodes[1]);
    };
    assert_eq!(flatten.path, vec!["topProducts".to_string()]);

    let PlanNode::Fetch(entity_fetch) = flatten.node.as_ref() else {
        panic!("flattened node should be a Fetch, got {:?}", flatten.node);
    };
    assert_eq!(entity_fetch.subgraph_name, "reviews");
    assert_eq!(entity_fetch.entity_type.as_deref(), Some("Product"));
    assert!(entity_fetch.selection_set.contains("_entities"));
    assert!(entity_fetch.representations.as_deref().unwrap_or_default().contains("upc"));
}

/// Scenario C (requires): `shippingEstimate`'s `@requires(fields: "weight")` is discharged by
/// folding `weight` into the owning subgraph's fetch ahead of the dependent entity fetch.
#[test]
fn scenario_c_requires_discharge_orders_the_dependency_first() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") {
                upc: ID!
                weight: Int!
            }
        "#,
    )
    .expect("products subgraph should ingest");

    let inventory = ingest(
        "inventory",
        "https://inventory",
        r#"
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                weight: Int! @external
                shippingEstimate: Int! @requires(fields: "weight")
            }
        "#,
    )
    .expect("inventory subgraph should ingest");

    let planner = planner_for(vec![products, inventory]);
    let plan = planner
        .plan("{ topProducts { upc shippingEstimate } }", None)
        .expect("plan should succeed");

    let fetches = plan.node.as_ref().expect("plan has a node").fetches();
    let products_index = fetches.iter().position(|f| f.subgraph_name == "products").expect("products fetch present");
    let inventory_index = fetches.iter().position(|f| f.subgraph_name == "inventory").expect("inventory fetch present");
    assert!(products_index < inventory_index, "weight must be fetched before shippingEstimate is requested");
    assert!(fetches[products_index].selection_set.contains("weight"));
    assert!(fetches[inventory_index].representations.as_deref().unwrap_or_default().contains("weight"));
}

/// Scenario D (provides): following a `@provides`-annotated field for exactly the provided
/// sub-selection stays in the parent's subgraph, with no entity round-trip.
#[test]
fn scenario_d_provides_avoids_an_entity_round_trip() {
    let accounts = ingest(
        "accounts",
        "https://accounts",
        r#"
            type Query { me: User }
            type User @key(fields: "id") {
                id: ID!
                username: String!
                age: Int!
            }
        "#,
    )
    .expect("accounts subgraph should ingest");

    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Query { reviews: [Review!]! }
            type Review {
                body: String
                author: User! @provides(fields: "username")
            }
            extend type User @key(fields: "id") {
                id: ID! @external
                username: String! @external
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let planner = planner_for(vec![accounts, reviews]);
    let plan = planner
        .plan("{ reviews { author { username } } }", None)
        .expect("plan should succeed");

    let fetches = plan.node.as_ref().expect("plan has a node").fetches();
    assert_eq!(fetches.len(), 1, "a fully-@provides-covered selection needs no entity fetch");
    assert_eq!(fetches[0].subgraph_name, "reviews");
    assert!(fetches[0].selection_set.contains("username"));
}

/// `@provides` only covers the fields it names: asking for a field it doesn't provide still
/// requires an entity fetch to the owning subgraph.
#[test]
fn provides_falls_back_to_an_entity_fetch_for_fields_it_does_not_cover() {
    let accounts = ingest(
        "accounts",
        "https://accounts",
        r#"
            type Query { me: User }
            type User @key(fields: "id") {
                id: ID!
                username: String!
                age: Int!
            }
        "#,
    )
    .expect("accounts subgraph should ingest");

    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Query { reviews: [Review!]! }
            type Review {
                body: String
                author: User! @provides(fields: "username")
            }
            extend type User @key(fields: "id") {
                id: ID! @external
                username: String! @external
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let planner = planner_for(vec![accounts, reviews]);
    let plan = planner
        .plan("{ reviews { author { username age } } }", None)
        .expect("plan should succeed");

    let fetches = plan.node.as_ref().expect("plan has a node").fetches();
    assert!(
        fetches.iter().any(|f| f.subgraph_name == "accounts"),
        "age is not @provides-covered so an entity fetch to accounts is required"
    );
}

/// Property 2 (determinism): planning the same operation against the same supergraph twice
/// yields a byte-identical JSON plan.
#[test]
fn plans_are_deterministic() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") { upc: ID! name: String }
        "#,
    )
    .expect("products subgraph should ingest");
    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Review { body: String }
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                reviews: [Review!]!
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let planner = planner_for(vec![products, reviews]);
    let operation = "{ topProducts { upc name reviews { body } } }";

    let first = planner.plan(operation, None).expect("first plan should succeed");
    let second = planner.plan(operation, None).expect("second plan should succeed");

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}

/// Property 3 (coverage): every leaf field requested appears in exactly one fetch's selection
/// text.
#[test]
fn every_requested_leaf_field_is_covered_exactly_once() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") { upc: ID! name: String }
        "#,
    )
    .expect("products subgraph should ingest");
    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Review { body: String }
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                reviews: [Review!]!
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let planner = planner_for(vec![products, reviews]);
    let plan = planner
        .plan("{ topProducts { name reviews { body } } }", None)
        .expect("plan should succeed");

    let fetches = plan.node.as_ref().expect("plan has a node").fetches();
    let name_occurrences = fetches.iter().filter(|f| f.selection_set.contains("name")).count();
    let body_occurrences = fetches.iter().filter(|f| f.selection_set.contains("body")).count();
    assert_eq!(name_occurrences, 1, "name should be resolved by exactly one fetch");
    assert_eq!(body_occurrences, 1, "body should be resolved by exactly one fetch");
}

/// Property 4 (key soundness): an entity fetch's representation selection is always a superset
/// of some key the target subgraph declared for that entity.
#[test]
fn entity_fetch_representations_are_a_superset_of_a_declared_key() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") { upc: ID! name: String }
        "#,
    )
    .expect("products subgraph should ingest");
    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Review { body: String }
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                reviews: [Review!]!
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let composed = compose(vec![products, reviews]).expect("composition should succeed");
    let declared_key_fields: Vec<String> = {
        let entity = composed
            .join_metadata
            .entity(&apollo_compiler::Name::new("Product").unwrap())
            .expect("Product is an entity");
        let reviews_graph_id = composed.join_metadata.graph_id("reviews").unwrap();
        let declared_key = entity
            .keys_by_graph
            .get_vec(&reviews_graph_id)
            .and_then(|keys| keys.first())
            .expect("reviews declares a key for Product");
        declared_key.top_level_field_names().into_iter().map(|name| name.to_string()).collect()
    };

    let planner = QueryPlanner::new(composed.schema, composed.join_metadata, QueryPlannerConfig::default());
    let plan = planner
        .plan("{ topProducts { name reviews { body } } }", None)
        .expect("plan should succeed");

    let entity_fetch = plan
        .node
        .as_ref()
        .expect("plan has a node")
        .fetches()
        .into_iter()
        .find(|f| f.subgraph_name == "reviews")
        .expect("reviews entity fetch should exist");

    for field_name in declared_key_fields {
        assert!(
            entity_fetch.representations.as_deref().unwrap_or_default().contains(field_name.as_str()),
            "representation must contain declared key field \"{field_name}\""
        );
    }
}

/// Subscriptions spanning more than one subgraph are rejected at plan time.
#[test]
fn subscriptions_across_multiple_subgraphs_are_rejected() {
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

    let planner = planner_for(vec![accounts, billing]);
    let err = planner
        .plan("subscription { userUpdated invoiceUpdated }", None)
        .expect_err("a multi-subgraph subscription must be rejected");
    let codes: Vec<graphfed_core::error::ErrorCode> = err.errors().iter().map(|e| e.code()).collect();
    assert!(codes.contains(&graphfed_core::error::ErrorCode::SubscriptionMultipleSubgraphs));
}

/// A `@requires` field set that the parent fetch group can't supply (because the field it needs
/// lives in a third, unrelated subgraph) is rejected at plan time rather than silently omitted
/// from the representation.
#[test]
fn requires_discharge_fails_when_the_required_field_is_unreachable_from_the_parent_group() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") { upc: ID! }
        "#,
    )
    .expect("products subgraph should ingest");

    let inventory = ingest(
        "inventory",
        "https://inventory",
        r#"
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                weight: Int!
            }
        "#,
    )
    .expect("inventory subgraph should ingest");

    let shipping = ingest(
        "shipping",
        "https://shipping",
        r#"
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                weight: Int! @external
                shippingEstimate: Int! @requires(fields: "weight")
            }
        "#,
    )
    .expect("shipping subgraph should ingest");

    let planner = planner_for(vec![products, inventory, shipping]);
    let err = planner
        .plan("{ topProducts { shippingEstimate } }", None)
        .expect_err("weight is only resolvable in inventory, not in the products root group");
    let codes: Vec<graphfed_core::error::ErrorCode> = err.errors().iter().map(|e| e.code()).collect();
    assert!(
        codes.contains(&graphfed_core::error::ErrorCode::UnsatisfiableRequires),
        "expected UNSATISFIABLE_REQUIRES, got {codes:?}"
    );
}
