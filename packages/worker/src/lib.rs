// Goose Parser Worker - Core
//
// A queue worker that executes parsing jobs under a wall-clock deadline
// and a process memory ceiling, reporting exactly one outcome per job.
// The parsing engine and the queue backend are collaborators behind
// traits; the supervisor only bounds their lifetimes.

pub mod config;
pub mod engine;
pub mod error;
pub mod queue;
pub mod supervisor;
pub mod testing;
pub mod worker;

pub use config::Config;
pub use error::WorkerError;
