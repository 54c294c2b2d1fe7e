//! End-to-end composition scenarios (spec §8): value types, invalid keys, unused `@external`
//! fields, and the external-liveness property.

use graphfed_core::composition::compose;
use graphfed_core::error::ErrorCode;
use graphfed_core::subgraph::ingest;
use apollo_compiler::Name;

/// Scenario A: two subgraphs declare an identical, unkeyed shape. Composition succeeds and the
/// type carries no entity/owner metadata.
#[test]
fn scenario_a_identical_shape_composes_as_a_value_type() {
    let a = ingest(
        "a",
        "https://a",
        r#"
            type Query { pointA: Position }
            type Position { x: Int y: Int }
        "#,
    )
    .expect("subgraph a should ingest");
    let b = ingest(
        "b",
        "https://b",
        r#"
            type Query { pointB: Position }
            type Position { x: Int y: Int }
        "#,
    )
    .expect("subgraph b should ingest");

    let composed = compose(vec![a, b]).expect("composition should succeed");
    assert!(
        composed.join_metadata.entity(&Name::new("Position").unwrap()).is_none(),
        "Position has no @key anywhere, so it must not be recorded as an entity"
    );
}

/// Scenario E: a key that selects a union field is rejected outright at ingest, before
/// composition even groups subgraphs together.
#[test]
fn scenario_e_key_selecting_a_union_field_is_rejected() {
    let result = ingest(
        "bad",
        "https://bad",
        r#"
            type Query { product: Product }

            union Category = Electronics | Clothing

            type Electronics { name: String }
            type Clothing { name: String }

            type Product @key(fields: "category") {
                category: Category
            }
        "#,
    );

    let err = result.expect_err("a key selecting a union field must be rejected");
    let codes: Vec<ErrorCode> = err.errors().iter().map(|e| e.code()).collect();
    assert!(
        codes.contains(&ErrorCode::KeyFieldsSelectInvalidType),
        "expected KEY_FIELDS_SELECT_INVALID_TYPE, got {codes:?}"
    );
}

/// Scenario F / property 6 (external-liveness): an `@external` field never referenced by any
/// key/requires/provides in its own subgraph makes composition fail with `EXTERNAL_UNUSED`.
#[test]
fn scenario_f_unused_external_field_is_rejected() {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query { topProducts: [Product!]! }
            type Product @key(fields: "upc") {
                upc: ID!
                name: String
                weight: Int
            }
        "#,
    )
    .expect("products subgraph should ingest");

    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                weight: Int @external
                reviews: [String]
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    let err = compose(vec![products, reviews]).expect_err("an unused @external field must be rejected");
    let codes: Vec<ErrorCode> = err.errors().iter().map(|e| e.code()).collect();
    assert!(
        codes.contains(&ErrorCode::ExternalUnused),
        "expected EXTERNAL_UNUSED, got {codes:?}"
    );
}

/// Composition aggregates every failure found in one pass (§7) rather than stopping at the
/// first: a document with two independent, unrelated problems reports both.
#[test]
fn composition_aggregates_every_failure_in_one_pass() {
    let reviews = ingest(
        "reviews",
        "https://reviews",
        r#"
            type Query { topReviews: [Review!]! }
            type Review {
                id: ID!
                body: String
            }

            extend type Product @key(fields: "upc") {
                upc: ID! @external
                unused: Int @external
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

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

    let err = compose(vec![reviews, products]).expect_err("both problems should surface");
    assert!(err.errors().len() >= 1, "aggregate should report at least the unused @external field");
}

/// An entity's owner is the one subgraph that declares it without `extend`; every other subgraph
/// must match it with its own `@key`.
#[test]
fn entity_ownership_resolves_to_the_sole_non_extended_declaration() {
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

    let inventory = ingest(
        "inventory",
        "https://inventory",
        r#"
            extend type Product @key(fields: "upc") {
                upc: ID! @external
                inStock: Boolean
            }
        "#,
    )
    .expect("inventory subgraph should ingest");

    let composed = compose(vec![products, inventory]).expect("composition should succeed");
    let entity = composed
        .join_metadata
        .entity(&Name::new("Product").unwrap())
        .expect("Product should be recorded as an entity");
    assert_eq!(composed.join_metadata.graphs[entity.owner].name, "products");
    assert_eq!(entity.all_keys().len(), 1, "both subgraphs declare the identical upc key");
}
