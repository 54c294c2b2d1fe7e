//! Supergraph builder round-trip and API-schema stripping (spec §4.3, §8 property 1).

use graphfed_core::composition::compose;
use graphfed_core::error::ErrorCode;
use graphfed_core::subgraph::ingest;
use graphfed_core::supergraph;

fn products_and_reviews() -> (graphfed_core::subgraph::Subgraph, graphfed_core::subgraph::Subgraph) {
    let products = ingest(
        "products",
        "https://products",
        r#"
            type Query {
                topProducts: [Product!]!
            }

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
            type Review {
                body: String
            }

            extend type Product @key(fields: "upc") {
                upc: ID! @external
                reviews: [Review!]!
            }
        "#,
    )
    .expect("reviews subgraph should ingest");

    (products, reviews)
}

/// Property 1 (round-trip): `parse(build(compose(S)))` recovers the same join metadata compose
/// produced, field for field and key for key.
#[test]
fn build_then_parse_round_trips_join_metadata() {
    let (products, reviews) = products_and_reviews();
    let composed = compose(vec![products, reviews]).expect("composition should succeed");

    let csdl = supergraph::build(&composed);
    assert!(csdl.contains("@core(feature: \"https://specs.apollo.dev/core/v0.1\")"));
    assert!(csdl.contains("@core(feature: \"https://specs.apollo.dev/join/v0.1\")"));
    assert!(csdl.contains("join__owner"));

    let round_tripped = supergraph::parse(&csdl).expect("rendered CSDL should parse back");

    let original_entity = composed
        .join_metadata
        .entity(&apollo_compiler::Name::new("Product").unwrap())
        .expect("Product is an entity");
    let round_tripped_entity = round_tripped
        .join_metadata
        .entity(&apollo_compiler::Name::new("Product").unwrap())
        .expect("Product is still an entity after round-tripping");

    assert_eq!(
        composed.join_metadata.graphs[original_entity.owner].name,
        round_tripped.join_metadata.graphs[round_tripped_entity.owner].name,
    );
    assert_eq!(original_entity.all_keys().len(), round_tripped_entity.all_keys().len());

    let reviews_field = round_tripped
        .join_metadata
        .field(&apollo_compiler::Name::new("Product").unwrap(), &apollo_compiler::Name::new("reviews").unwrap())
        .expect("reviews field join info should survive the round trip");
    let reviews_graph = round_tripped.join_metadata.graph_id("reviews").unwrap();
    assert!(reviews_field.is_resolvable_in(reviews_graph));
}

/// Building twice from the same composition produces byte-identical CSDL: the renderer has no
/// hidden nondeterminism (hash-map iteration order, etc.).
#[test]
fn build_is_deterministic() {
    let (products, reviews) = products_and_reviews();
    let composed = compose(vec![products, reviews]).expect("composition should succeed");
    assert_eq!(supergraph::build(&composed), supergraph::build(&composed));
}

/// The client-facing API schema strips every `@core`/`@join__*` directive and scaffolding type.
#[test]
fn api_schema_strips_join_scaffolding() {
    let (products, reviews) = products_and_reviews();
    let composed = compose(vec![products, reviews]).expect("composition should succeed");
    let api_schema = supergraph::api_schema(&composed.schema).expect("api schema should be derivable");

    assert!(api_schema.types.get("join__Graph").is_none());
    assert!(api_schema.types.get("join__FieldSet").is_none());
    let product = api_schema.types.get("Product").expect("Product type survives");
    assert!(!format!("{product}").contains("join__"));
}

/// Parsing a supergraph declaring an unrecognized `@core` feature version fails with
/// `UNSUPPORTED_FEATURE` (§6).
#[test]
fn parse_rejects_unsupported_core_feature_version() {
    let csdl = r#"
schema
  @core(feature: "https://specs.apollo.dev/core/v99.0")
{
  query: Query
}

directive @core(feature: String!) repeatable on SCHEMA

type Query {
  hello: String
}
"#;

    let err = supergraph::parse(csdl).expect_err("an unknown core version must be rejected");
    let codes: Vec<ErrorCode> = err.errors().iter().map(|e| e.code()).collect();
    assert!(codes.contains(&ErrorCode::UnsupportedFeature), "expected UNSUPPORTED_FEATURE, got {codes:?}");
}
