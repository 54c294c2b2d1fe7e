//! Names used by the portable supergraph SDL (§4.3): the `@core` schema directive, the
//! `join__Graph` enum, and the `@join__graph`/`@join__owner`/`@join__type`/`@join__field`
//! directives that encode join metadata on the composed schema.

use apollo_compiler::name;
use apollo_compiler::Name;

pub const CORE_FEATURE_URL: &str = "https://specs.apollo.dev/core/v0.1";
pub const JOIN_FEATURE_URL: &str = "https://specs.apollo.dev/join/v0.1";

pub const CORE_DIRECTIVE_NAME: Name = name!("core");
pub const JOIN_GRAPH_ENUM_NAME: Name = name!("join__Graph");
pub const JOIN_GRAPH_DIRECTIVE_NAME: Name = name!("join__graph");
pub const JOIN_OWNER_DIRECTIVE_NAME: Name = name!("join__owner");
pub const JOIN_TYPE_DIRECTIVE_NAME: Name = name!("join__type");
pub const JOIN_FIELD_DIRECTIVE_NAME: Name = name!("join__field");
pub const JOIN_FIELD_SET_SCALAR_NAME: Name = name!("join__FieldSet");

/// Converts a subgraph name into a valid GraphQL enum value for `join__Graph`, matching the
/// convention real supergraphs use (upper-snake-case).
pub fn graph_enum_value(subgraph_name: &str) -> String {
    let mut value = String::with_capacity(subgraph_name.len());
    for ch in subgraph_name.chars() {
        if ch.is_ascii_alphanumeric() {
            value.push(ch.to_ascii_uppercase());
        } else {
            value.push('_');
        }
    }
    match value.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => value,
        _ => format!("_{value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_values_are_upper_snake_case() {
        assert_eq!(graph_enum_value("products"), "PRODUCTS");
        assert_eq!(graph_enum_value("my-service"), "MY_SERVICE");
        assert_eq!(graph_enum_value("2nd-service"), "_2ND_SERVICE");
    }
}
