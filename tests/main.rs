//! Integration tests are modules of this file, mirroring how the teacher crate organizes
//! `tests/main.rs` around sibling test modules rather than one file per `cargo test` binary.

mod composition;
mod query_plan;
mod supergraph;
