//! Round-robin chunk planning under per-worker capacity.

use crate::worker::{CapacityModel, WorkerId};

use super::{ByteRange, PlanningError};

/// Plans with more jobs than this start one ssh session per tiny range; worth a warning.
pub const LARGE_PLAN_JOBS: usize = 10_000;

/// Ranges assigned to one worker, in ascending offset order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    pub worker: WorkerId,
    pub ranges: Vec<ByteRange>,
}

/// Output of [`plan_chunks`]: one assignment per worker, in worker table order.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    total_size: u64,
    base_chunk_size: u64,
    assignments: Vec<WorkerAssignment>,
}

impl ChunkPlan {
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn base_chunk_size(&self) -> u64 {
        self.base_chunk_size
    }

    pub fn assignments(&self) -> &[WorkerAssignment] {
        &self.assignments
    }

    pub fn ranges_for(&self, worker: WorkerId) -> &[ByteRange] {
        self.assignments
            .iter()
            .find(|a| a.worker == worker)
            .map(|a| a.ranges.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of ranges across all workers.
    pub fn len(&self) -> usize {
        self.assignments.iter().map(|a| a.ranges.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// More than [`LARGE_PLAN_JOBS`] ranges, usually from a worker with almost no free space.
    pub fn is_large(&self) -> bool {
        self.len() > LARGE_PLAN_JOBS
    }

    /// Every range with its worker, sorted by start offset.
    pub fn sorted_ranges(&self) -> Vec<(WorkerId, ByteRange)> {
        let mut all: Vec<(WorkerId, ByteRange)> = self
            .assignments
            .iter()
            .flat_map(|a| a.ranges.iter().map(move |r| (a.worker, *r)))
            .collect();
        all.sort_by_key(|(_, r)| *r);
        all
    }
}

/// Partitions `[0, total_size)` into inclusive ranges assigned round-robin to the
/// workers of `model`.
///
/// Each visit hands a fitting worker one base chunk (`total_size / target_chunks`,
/// at least 1 byte). A worker that cannot hold `concurrency` base chunks instead
/// receives sub-chunks of `budget / concurrency` bytes until one base chunk's
/// worth of the resource is covered. The range reaching the end of the resource
/// is open-ended; a fitting worker absorbs a tail shorter than one base chunk
/// rather than leaving a sliver. Workers without capacity are skipped.
pub fn plan_chunks(
    total_size: u64,
    target_chunks: usize,
    model: &CapacityModel,
) -> Result<ChunkPlan, PlanningError> {
    if model.is_empty() {
        return Err(PlanningError::NoWorkers);
    }
    if total_size == 0 {
        return Err(PlanningError::EmptyResource);
    }
    if target_chunks == 0 {
        return Err(PlanningError::ZeroChunks);
    }
    if model.ids().all(|id| model.subchunk_size(id) == 0) {
        return Err(PlanningError::NoCapacity);
    }

    let base = (total_size / target_chunks as u64).max(1);
    let mut assignments: Vec<WorkerAssignment> = model
        .ids()
        .map(|worker| WorkerAssignment {
            worker,
            ranges: Vec::new(),
        })
        .collect();
    let mut warned = vec![false; assignments.len()];

    let mut offset = 0u64;
    while offset < total_size {
        for (slot, assignment) in assignments.iter_mut().enumerate() {
            if offset >= total_size {
                break;
            }
            let worker = assignment.worker;
            let sub = model.subchunk_size(worker);
            if sub == 0 {
                continue;
            }

            if model.fits(worker, base) {
                let remaining = total_size - offset;
                let take_tail =
                    remaining <= base || (remaining - base < base && model.fits(worker, remaining));
                if take_tail {
                    assignment.ranges.push(ByteRange::open(offset));
                    offset = total_size;
                } else {
                    assignment
                        .ranges
                        .push(ByteRange::closed(offset, offset + base - 1));
                    offset += base;
                }
                continue;
            }

            if !warned[slot] {
                tracing::warn!(
                    target = %model.worker(worker).target,
                    base,
                    subchunk = sub,
                    "chunk too large for worker budget at full concurrency, splitting into smaller ones"
                );
                warned[slot] = true;
            }
            let mut share = base;
            while share > 0 && offset < total_size {
                let size = sub.min(share);
                if total_size - offset <= size {
                    assignment.ranges.push(ByteRange::open(offset));
                    offset = total_size;
                    break;
                }
                assignment
                    .ranges
                    .push(ByteRange::closed(offset, offset + size - 1));
                offset += size;
                share -= size;
            }
        }
    }

    let plan = ChunkPlan {
        total_size,
        base_chunk_size: base,
        assignments,
    };
    if plan.is_large() {
        tracing::warn!(
            jobs = plan.len(),
            "plan has a very large number of chunks; free space on constrained workers or lower concurrency"
        );
    }
    Ok(plan)
}
