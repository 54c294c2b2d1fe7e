//! Names of the federation directive set recognized by schema ingest (§4.1): `@key`,
//! `@external`, `@requires`, `@provides`, `@extends`. We assume the canonical directive names
//! (no `@link(..., import: [...])` renaming), which is a deliberate scope reduction from the
//! full `@link` import-aliasing machinery a production federation implementation supports (see
//! DESIGN.md).

use apollo_compiler::name;
use apollo_compiler::Name;

pub const KEY_DIRECTIVE_NAME: Name = name!("key");
pub const EXTERNAL_DIRECTIVE_NAME: Name = name!("external");
pub const REQUIRES_DIRECTIVE_NAME: Name = name!("requires");
pub const PROVIDES_DIRECTIVE_NAME: Name = name!("provides");
pub const EXTENDS_DIRECTIVE_NAME: Name = name!("extends");

pub fn federation_directive_names() -> [&'static Name; 5] {
    [
        &KEY_DIRECTIVE_NAME,
        &EXTERNAL_DIRECTIVE_NAME,
        &REQUIRES_DIRECTIVE_NAME,
        &PROVIDES_DIRECTIVE_NAME,
        &EXTENDS_DIRECTIVE_NAME,
    ]
}

/// The directive definitions injected ahead of every subgraph SDL before it's handed to
/// `apollo-compiler`, so that `@key`/`@external`/`@requires`/`@provides`/`@extends` usages
/// validate regardless of whether the subgraph author declared them explicitly (mirroring what
/// `buildSubgraphSchema`-style tooling does in a production federation gateway).
pub const FEDERATION_DIRECTIVE_DEFINITIONS: &str = r#"
directive @key(fields: String!, resolvable: Boolean = true) repeatable on OBJECT | INTERFACE
directive @external on FIELD_DEFINITION | OBJECT
directive @requires(fields: String!) on FIELD_DEFINITION
directive @provides(fields: String!) on FIELD_DEFINITION
directive @extends on OBJECT | INTERFACE
"#;
