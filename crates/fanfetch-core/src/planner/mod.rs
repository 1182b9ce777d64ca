//! Range math and chunk planning.
//!
//! Splits the resource into inclusive byte ranges and assigns them to workers
//! round-robin, subdividing for workers whose storage cannot hold a full set of
//! concurrent base-size chunks.

mod error;
mod plan;
mod range;

pub use error::PlanningError;
pub use plan::{plan_chunks, ChunkPlan, WorkerAssignment, LARGE_PLAN_JOBS};
pub use range::ByteRange;
