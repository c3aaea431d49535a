// petribench - lib.rs
//
// Library entry point, exposing all modules to the binary and to the
// end-to-end tests.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
