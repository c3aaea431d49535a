// petribench - app/mod.rs
//
// Application layer: backend seam, per-unit analysis and the batch driver.
// Dependencies: core layer, validated configuration.

pub mod analyzer;
pub mod backend;
pub mod driver;
