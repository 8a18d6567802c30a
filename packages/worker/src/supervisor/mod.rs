//! Job execution supervision.
//!
//! Wraps one parse job with a wall-clock deadline, exactly-once outcome
//! reporting, and fault isolation, plus the memory-pressure shutdown
//! decision for the worker loop.
//!
//! ```text
//! queue delivers a job
//!     │
//!     ├─► ExecutionContext (merge options, normalize URL, build environment)
//!     ├─► DeadlineGuard armed
//!     ├─► FaultBarrier runs the parse on its own task
//!     │
//!     └─► first signal {success, error, timeout, fault}
//!             └─► CompletionGate (teardown on error, report once)
//! ```

mod context;
mod deadline;
mod fault;
mod gate;
mod memory;
mod supervise;

pub use context::ExecutionContext;
pub use deadline::DeadlineGuard;
pub use fault::{FaultBarrier, FaultHandle};
pub use gate::CompletionGate;
pub use memory::{should_shutdown, MemoryMonitor, MemorySampler, ProcSampler};
pub use supervise::JobSupervisor;
