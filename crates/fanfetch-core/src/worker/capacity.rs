//! Read-only table of workers answering storage-capacity questions.

use super::{RemoteWorker, WorkerId};

/// Worker table built once from probe results.
#[derive(Debug, Clone, Default)]
pub struct CapacityModel {
    workers: Vec<RemoteWorker>,
}

impl CapacityModel {
    pub fn new(workers: Vec<RemoteWorker>) -> Self {
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Worker ids in table order (the planner's round-robin order).
    pub fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        (0..self.workers.len()).map(WorkerId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, &RemoteWorker)> + '_ {
        self.workers.iter().enumerate().map(|(i, w)| (WorkerId(i), w))
    }

    /// Panics if `id` did not come from this model.
    pub fn worker(&self, id: WorkerId) -> &RemoteWorker {
        &self.workers[id.0]
    }

    pub fn concurrency(&self, id: WorkerId) -> usize {
        self.worker(id).concurrency
    }

    pub fn budget(&self, id: WorkerId) -> u64 {
        self.worker(id).budget_bytes
    }

    /// True iff the worker can hold a full set of concurrently running chunks of
    /// `size` bytes: `size * concurrency <= budget`.
    pub fn fits(&self, id: WorkerId, size: u64) -> bool {
        let w = self.worker(id);
        size.checked_mul(w.concurrency as u64)
            .is_some_and(|need| need <= w.budget_bytes)
    }

    /// Largest chunk the worker can run at full concurrency: `budget / concurrency`.
    /// Zero means the worker has no usable capacity.
    pub fn subchunk_size(&self, id: WorkerId) -> u64 {
        let w = self.worker(id);
        w.budget_bytes / w.concurrency as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::FetchTool;

    fn model() -> CapacityModel {
        CapacityModel::new(vec![
            RemoteWorker::new("a", FetchTool::Curl, 100, 2),
            RemoteWorker::new("b", FetchTool::Wget, u64::MAX, 4),
            RemoteWorker::new("c", FetchTool::Curl, 1, 2),
        ])
    }

    #[test]
    fn fits_accounts_for_concurrency() {
        let m = model();
        let a = WorkerId(0);
        assert!(m.fits(a, 50));
        assert!(!m.fits(a, 51));
        assert!(m.fits(a, 0));
    }

    #[test]
    fn fits_does_not_overflow() {
        let m = model();
        assert!(!m.fits(WorkerId(1), u64::MAX));
        assert!(m.fits(WorkerId(1), u64::MAX / 4));
    }

    #[test]
    fn subchunk_size_is_budget_over_concurrency() {
        let m = model();
        assert_eq!(m.subchunk_size(WorkerId(0)), 50);
        assert_eq!(m.subchunk_size(WorkerId(2)), 0);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let w = RemoteWorker::new("x", FetchTool::Curl, 10, 0);
        assert_eq!(w.concurrency, 1);
    }

    #[test]
    fn ids_follow_table_order() {
        let m = model();
        let ids: Vec<_> = m.ids().map(WorkerId::index).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(m.worker(WorkerId(1)).target, "b");
    }
}
