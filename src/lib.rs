pub mod core;
pub mod error;
pub mod instruction;
pub mod interpreter;
pub mod loader;
pub mod metrics;
pub mod scheduler;
pub mod warriors;
