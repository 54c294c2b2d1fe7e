//! The `@link`-adjacent machinery: spec identities/versions (§4.3, §6), the federation directive
//! names recognized by schema ingest (§4.1), and the `join` spec names used to render and parse
//! portable supergraph SDL (§4.3).

pub mod argument;
pub mod federation_spec;
pub mod join_spec;
pub mod spec;
