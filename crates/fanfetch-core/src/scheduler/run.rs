//! The scheduler proper: job registry, admission and the event loop.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobError, JobId, JobState};
use crate::planner::ChunkPlan;
use crate::remote::{CommandOutcome, FetchRequest, RemoteExecutor};
use crate::url_model::worker_slug;
use crate::worker::{CapacityModel, WorkerId};

use super::event::JobEvent;
use super::progress::ProgressStats;
use super::report::{FailedJob, RunReport};
use super::slots::WorkerSlots;

/// Owns every job of a run and drives them to a terminal state.
///
/// Jobs live in a registry indexed by [`JobId`]; worker data stays in the shared
/// read-only [`CapacityModel`]. Each external operation runs as a task in a
/// `JoinSet` and reports back with a [`JobEvent`], so the loop never blocks on a
/// single worker.
pub struct JobScheduler<E: RemoteExecutor> {
    executor: Arc<E>,
    model: Arc<CapacityModel>,
    request: Arc<FetchRequest>,
    local_dir: PathBuf,
    total_size: u64,
    jobs: Vec<Job>,
    /// Queued jobs per worker, FIFO.
    queues: Vec<VecDeque<JobId>>,
    slots: Vec<WorkerSlots>,
    /// Worker the next admission scan starts from.
    next_worker: usize,
    tasks: JoinSet<JobEvent>,
    progress_tx: Option<watch::Sender<ProgressStats>>,
    cancel: CancellationToken,
    started: Instant,
    cleaned: usize,
    bytes_cleaned: u64,
}

impl<E: RemoteExecutor> JobScheduler<E> {
    /// Creates one queued job per planned range. Artifacts land in `local_dir`.
    pub fn new(
        executor: Arc<E>,
        model: Arc<CapacityModel>,
        plan: &ChunkPlan,
        request: FetchRequest,
        local_dir: impl Into<PathBuf>,
    ) -> Self {
        let mut jobs = Vec::with_capacity(plan.len());
        let mut queues: Vec<VecDeque<JobId>> = vec![VecDeque::new(); model.len()];
        for assignment in plan.assignments() {
            let slug = worker_slug(&model.worker(assignment.worker).target);
            for range in &assignment.ranges {
                let id = JobId(jobs.len());
                jobs.push(Job::new(id, assignment.worker, &slug, *range));
                queues[assignment.worker.index()].push_back(id);
            }
        }
        let slots = model
            .iter()
            .map(|(_, w)| WorkerSlots::new(w.concurrency))
            .collect();

        Self {
            executor,
            model,
            request: Arc::new(request),
            local_dir: local_dir.into(),
            total_size: plan.total_size(),
            jobs,
            queues,
            slots,
            next_worker: 0,
            tasks: JoinSet::new(),
            progress_tx: None,
            cancel: CancellationToken::new(),
            started: Instant::now(),
            cleaned: 0,
            bytes_cleaned: 0,
        }
    }

    /// Publish a [`ProgressStats`] snapshot whenever a job finishes. Receivers
    /// always see the latest snapshot, including the final one.
    pub fn with_progress(mut self, tx: watch::Sender<ProgressStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Stop the run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id.0]
    }

    /// Jobs of `worker` currently in `RemoteRunning`.
    pub fn running_on(&self, worker: WorkerId) -> usize {
        self.slots[worker.index()].in_use()
    }

    /// True when every job is terminal.
    pub fn is_done(&self) -> bool {
        self.jobs.iter().all(|j| j.state().is_terminal())
    }

    pub fn progress(&self) -> ProgressStats {
        ProgressStats {
            jobs_cleaned: self.cleaned,
            jobs_failed: self.count(JobState::Failed),
            job_count: self.jobs.len(),
            bytes_done: self.bytes_cleaned,
            total_bytes: self.total_size,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            total: self.jobs.len(),
            cleaned: self.cleaned,
            failed: self
                .jobs
                .iter()
                .filter(|j| j.state() == JobState::Failed)
                .map(|j| FailedJob {
                    job: j.id(),
                    artifact: j.artifact().to_string(),
                    error: j
                        .error()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "unknown".to_string()),
                })
                .collect(),
            cancelled: self.count(JobState::Cancelled),
            elapsed: self.started.elapsed(),
        }
    }

    fn count(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|j| j.state() == state).count()
    }

    /// Admits one queued job whose worker has a free slot, starting its remote
    /// fetch. Workers are scanned round-robin from the one after the last
    /// admission and each worker's queue is FIFO, so no job waits forever while
    /// its worker frees slots.
    pub fn admit(&mut self) -> Option<JobId> {
        let n = self.queues.len();
        for step in 0..n {
            let w = (self.next_worker + step) % n;
            if self.queues[w].is_empty() || !self.slots[w].try_reserve() {
                continue;
            }
            let Some(id) = self.queues[w].pop_front() else {
                self.slots[w].release();
                continue;
            };
            self.next_worker = (w + 1) % n;
            self.start_remote(id);
            return Some(id);
        }
        None
    }

    /// Admits until no worker has both a queued job and a free slot.
    pub fn admit_all(&mut self) -> usize {
        let mut admitted = 0;
        while self.admit().is_some() {
            admitted += 1;
        }
        admitted
    }

    /// Runs until every job is terminal and leftover remote deletes have
    /// finished, or the cancellation token fires.
    pub async fn run(&mut self) -> RunReport {
        let cancel = self.cancel.clone();
        tracing::info!(jobs = self.jobs.len(), "starting download");
        loop {
            self.admit_all();
            if self.is_done() && self.tasks.is_empty() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = self.tasks.join_next() => Some(next),
            };
            let Some(next) = next else {
                self.cancel_all();
                break;
            };

            match next {
                Some(Ok(event)) => self.handle_event(event),
                Some(Err(err)) => {
                    tracing::error!(error = %err, "job task ended without reporting");
                }
                None => {
                    self.fail_stalled();
                    break;
                }
            }
        }

        let report = self.report();
        tracing::info!(
            cleaned = report.cleaned,
            failed = report.failed.len(),
            cancelled = report.cancelled,
            total = report.total,
            "download finished"
        );
        report
    }

    pub(crate) fn handle_event(&mut self, event: JobEvent) {
        match event {
            JobEvent::RemoteFinished { job, outcome } => self.on_remote_finished(job, outcome),
            JobEvent::TransferFinished { job, outcome } => self.on_transfer_finished(job, outcome),
            JobEvent::CleanupFinished { job, outcome } => self.on_cleanup_finished(job, outcome),
            JobEvent::DiscardFinished { job, outcome } => self.on_discard_finished(job, outcome),
        }
    }

    fn on_remote_finished(&mut self, id: JobId, outcome: anyhow::Result<CommandOutcome>) {
        let worker = self.jobs[id.0].worker();
        self.jobs[id.0].clear_in_flight();
        self.slots[worker.index()].release();

        match outcome {
            Ok(o) if o.is_success() => {
                tracing::info!(job = %id, "remote job done, starting transfer");
                if self.transition(id, JobState::RemoteDone) {
                    self.start_transfer(id);
                }
            }
            Ok(o) => {
                self.fail(
                    id,
                    JobError::RemoteExecution {
                        code: o.code,
                        stderr: o.stderr,
                    },
                );
                // The fetch tool may have left a partial output file behind.
                self.start_discard(id);
            }
            Err(e) => self.fail(id, JobError::Spawn(format!("{:#}", e))),
        }
    }

    fn on_transfer_finished(&mut self, id: JobId, outcome: anyhow::Result<CommandOutcome>) {
        self.jobs[id.0].clear_in_flight();
        match outcome {
            Ok(o) if o.is_success() => {
                tracing::info!(job = %id, "transfer done, deleting remote file");
                if self.transition(id, JobState::TransferDone) {
                    self.start_cleanup(id);
                }
            }
            Ok(o) => {
                self.remove_partial_local(id);
                self.fail(
                    id,
                    JobError::Transfer {
                        code: o.code,
                        stderr: o.stderr,
                    },
                );
            }
            Err(e) => {
                self.remove_partial_local(id);
                self.fail(id, JobError::Spawn(format!("{:#}", e)));
            }
        }
    }

    /// A transfer that died mid-copy leaves a truncated local artifact; drop it
    /// so only complete chunks remain in the chunk directory.
    fn remove_partial_local(&self, id: JobId) {
        let path = self.local_dir.join(self.jobs[id.0].artifact());
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::warn!(job = %id, path = %path.display(), "removed partial chunk"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                job = %id,
                path = %path.display(),
                error = %e,
                "could not remove partial chunk"
            ),
        }
    }

    fn on_discard_finished(&mut self, id: JobId, outcome: anyhow::Result<CommandOutcome>) {
        let target = &self.model.worker(self.jobs[id.0].worker()).target;
        match outcome {
            Ok(o) if o.is_success() => {
                tracing::debug!(job = %id, target = %target, "removed failed fetch output")
            }
            Ok(o) => tracing::warn!(
                job = %id,
                target = %target,
                code = ?o.code,
                stderr = %o.stderr,
                "could not remove failed fetch output from worker"
            ),
            Err(e) => tracing::warn!(
                job = %id,
                target = %target,
                error = %format!("{:#}", e),
                "could not remove failed fetch output from worker"
            ),
        }
    }

    fn on_cleanup_finished(&mut self, id: JobId, outcome: anyhow::Result<CommandOutcome>) {
        self.jobs[id.0].clear_in_flight();
        let target = &self.model.worker(self.jobs[id.0].worker()).target;
        match outcome {
            Ok(o) if o.is_success() => {}
            Ok(o) => tracing::warn!(
                job = %id,
                target = %target,
                code = ?o.code,
                stderr = %o.stderr,
                "remote delete failed, artifact left on worker"
            ),
            Err(e) => tracing::warn!(
                job = %id,
                target = %target,
                error = %format!("{:#}", e),
                "remote delete could not run, artifact left on worker"
            ),
        }
        if self.transition(id, JobState::Cleaned) {
            self.cleaned += 1;
            self.bytes_cleaned += self.jobs[id.0].range().len_within(self.total_size);
            let stats = self.progress();
            tracing::info!(
                cleaned = stats.jobs_cleaned,
                total = stats.job_count,
                "TOTAL PROGRESS: {:.2}%",
                stats.fraction() * 100.0
            );
            self.publish(stats);
        }
    }

    fn start_remote(&mut self, id: JobId) {
        if !self.transition(id, JobState::RemoteRunning) {
            self.slots[self.jobs[id.0].worker().index()].release();
            return;
        }
        let job = &self.jobs[id.0];
        let worker = self.model.worker(job.worker());
        let executor = Arc::clone(&self.executor);
        let request = Arc::clone(&self.request);
        let target = worker.target.clone();
        let tool = worker.tool;
        let range = job.range();
        let artifact = job.artifact().to_string();
        tracing::info!(job = %id, target = %target, range = %range, "starting remote fetch");

        let handle = self.tasks.spawn(async move {
            let outcome = executor
                .fetch_range(&target, tool, &request, range, &artifact)
                .await;
            JobEvent::RemoteFinished { job: id, outcome }
        });
        self.jobs[id.0].set_in_flight(handle);
    }

    fn start_transfer(&mut self, id: JobId) {
        if !self.transition(id, JobState::TransferRunning) {
            return;
        }
        let job = &self.jobs[id.0];
        let executor = Arc::clone(&self.executor);
        let target = self.model.worker(job.worker()).target.clone();
        let artifact = job.artifact().to_string();
        let local_dir = self.local_dir.clone();

        let handle = self.tasks.spawn(async move {
            let outcome = executor.transfer_back(&target, &artifact, &local_dir).await;
            JobEvent::TransferFinished { job: id, outcome }
        });
        self.jobs[id.0].set_in_flight(handle);
    }

    fn start_cleanup(&mut self, id: JobId) {
        let job = &self.jobs[id.0];
        let executor = Arc::clone(&self.executor);
        let target = self.model.worker(job.worker()).target.clone();
        let artifact = job.artifact().to_string();

        let handle = self.tasks.spawn(async move {
            let outcome = executor.remote_delete(&target, &artifact).await;
            JobEvent::CleanupFinished { job: id, outcome }
        });
        self.jobs[id.0].set_in_flight(handle);
    }

    /// Best-effort delete of a failed job's remote artifact. The job stays `Failed`.
    fn start_discard(&mut self, id: JobId) {
        let job = &self.jobs[id.0];
        let executor = Arc::clone(&self.executor);
        let target = self.model.worker(job.worker()).target.clone();
        let artifact = job.artifact().to_string();

        self.tasks.spawn(async move {
            let outcome = executor.remote_delete(&target, &artifact).await;
            JobEvent::DiscardFinished { job: id, outcome }
        });
    }

    fn transition(&mut self, id: JobId, to: JobState) -> bool {
        match self.jobs[id.0].advance(to) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "job state machine violation");
                false
            }
        }
    }

    fn fail(&mut self, id: JobId, error: JobError) {
        tracing::warn!(
            job = %id,
            artifact = %self.jobs[id.0].artifact(),
            error = %error,
            "job failed"
        );
        if let Err(e) = self.jobs[id.0].fail(error) {
            tracing::error!(error = %e, "job state machine violation");
            return;
        }
        self.publish(self.progress());
    }

    /// Nothing is in flight but some jobs are not terminal (their task was
    /// lost); mark them failed so the run ends.
    fn fail_stalled(&mut self) {
        let stalled: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|j| !j.state().is_terminal())
            .map(Job::id)
            .collect();
        for id in stalled {
            let state = self.jobs[id.0].state();
            if state == JobState::RemoteRunning {
                self.slots[self.jobs[id.0].worker().index()].release();
            }
            self.fail(
                id,
                JobError::Stalled(format!("no task left while {}", state.as_str())),
            );
        }
    }

    /// Aborts all in-flight tasks (killing their child processes) and marks every
    /// non-terminal job `Cancelled`.
    fn cancel_all(&mut self) {
        tracing::warn!("cancellation requested, aborting in-flight jobs");
        self.tasks.abort_all();
        for job in &mut self.jobs {
            if job.state().is_terminal() {
                continue;
            }
            if job.state() == JobState::RemoteRunning {
                self.slots[job.worker().index()].release();
            }
            job.abort_in_flight();
            if let Err(e) = job.advance(JobState::Cancelled) {
                tracing::error!(error = %e, "job state machine violation");
            }
        }
        for q in &mut self.queues {
            q.clear();
        }
    }

    fn publish(&self, stats: ProgressStats) {
        if let Some(tx) = &self.progress_tx {
            tx.send_replace(stats);
        }
    }
}
