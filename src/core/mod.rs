// petribench - core/mod.rs
//
// Core layer: data model, input discovery, importers, soundness,
// alignments, metrics and result tables.
// Must NOT depend on: app or platform.

pub mod alignment;
pub mod discovery;
pub mod import;
pub mod metrics;
pub mod model;
pub mod results;
pub mod soundness;
