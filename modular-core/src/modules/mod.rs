// src/modules/mod.rs
// Small built-in modules, registered by default.

pub mod iteration_log;
pub mod scaling;
pub mod sum;

// Re-export the modules
pub use iteration_log::IterationLog;
pub use scaling::Scaling;
pub use sum::Sum;
