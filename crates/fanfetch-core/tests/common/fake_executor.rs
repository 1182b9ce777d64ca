//! In-process [`RemoteExecutor`] serving one byte buffer.
//!
//! Each target behaves like a worker host: fetched ranges are kept in a
//! per-target "remote disk" map, transfers copy them into the local directory,
//! and deletes remove them. Per-target running fetch counts are tracked so
//! tests can check the admission bound. Delays are drawn from a seeded RNG.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use fanfetch_core::merge::artifact_start;
use fanfetch_core::planner::ByteRange;
use fanfetch_core::remote::{CommandOutcome, FetchRequest, RemoteExecutor};
use fanfetch_core::worker::FetchTool;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
struct HostSpec {
    tool: Option<FetchTool>,
    /// `None` makes `free_space` fail.
    free_space: Option<u64>,
}

#[derive(Debug, Default)]
struct State {
    remote_files: HashMap<(String, String), Vec<u8>>,
    running: HashMap<String, usize>,
    max_running: HashMap<String, usize>,
    fetched: Vec<(String, ByteRange)>,
    requests: Vec<FetchRequest>,
    deletes: usize,
}

pub struct FakeExecutor {
    body: Vec<u8>,
    hosts: HashMap<String, HostSpec>,
    fail_remote_starts: HashSet<u64>,
    fail_transfer_starts: HashSet<u64>,
    partial_transfer_starts: HashSet<u64>,
    hang_fetches: bool,
    max_delay_ms: u64,
    rng: Mutex<StdRng>,
    state: Mutex<State>,
}

impl FakeExecutor {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body,
            hosts: HashMap::new(),
            fail_remote_starts: HashSet::new(),
            fail_transfer_starts: HashSet::new(),
            partial_transfer_starts: HashSet::new(),
            hang_fetches: false,
            max_delay_ms: 0,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            state: Mutex::new(State::default()),
        }
    }

    /// Adds a curl host with plenty of disk.
    pub fn host(self, target: &str) -> Self {
        self.host_with(target, Some(FetchTool::Curl), Some(u64::MAX / 4))
    }

    pub fn host_with(mut self, target: &str, tool: Option<FetchTool>, free_space: Option<u64>) -> Self {
        self.hosts
            .insert(target.to_string(), HostSpec { tool, free_space });
        self
    }

    /// Random per-operation delay in `0..=max_ms`, reproducible from `seed`.
    pub fn with_delays(mut self, seed: u64, max_ms: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self.max_delay_ms = max_ms;
        self
    }

    pub fn fail_remote_at(mut self, start: u64) -> Self {
        self.fail_remote_starts.insert(start);
        self
    }

    pub fn fail_transfer_at(mut self, start: u64) -> Self {
        self.fail_transfer_starts.insert(start);
        self
    }

    /// The transfer writes the first 10 bytes locally, then fails like a dropped scp.
    pub fn partial_transfer_at(mut self, start: u64) -> Self {
        self.partial_transfer_starts.insert(start);
        self
    }

    /// Remote fetches never finish (for cancellation tests).
    pub fn hang_fetches(mut self) -> Self {
        self.hang_fetches = true;
        self
    }

    pub fn max_running(&self, target: &str) -> usize {
        let st = self.state.lock().unwrap();
        st.max_running.get(target).copied().unwrap_or(0)
    }

    pub fn fetched(&self) -> Vec<(String, ByteRange)> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn remote_file_count(&self) -> usize {
        self.state.lock().unwrap().remote_files.len()
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().unwrap().deletes
    }

    async fn delay(&self) {
        if self.max_delay_ms == 0 {
            tokio::task::yield_now().await;
            return;
        }
        let ms = self.rng.lock().unwrap().random_range(0..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn lookup(&self, target: &str) -> Result<&HostSpec> {
        self.hosts
            .get(target)
            .ok_or_else(|| anyhow::anyhow!("ssh: Could not resolve hostname {}", target))
    }
}

impl RemoteExecutor for FakeExecutor {
    async fn probe_tool(&self, target: &str) -> Result<Option<FetchTool>> {
        Ok(self.lookup(target)?.tool)
    }

    async fn free_space(&self, target: &str) -> Result<u64> {
        self.lookup(target)?
            .free_space
            .ok_or_else(|| anyhow::anyhow!("df: unrecognized output"))
    }

    async fn resource_size(&self, target: &str, _tool: FetchTool, request: &FetchRequest) -> Result<u64> {
        self.lookup(target)?;
        self.state.lock().unwrap().requests.push(request.clone());
        Ok(self.body.len() as u64)
    }

    async fn fetch_range(
        &self,
        target: &str,
        _tool: FetchTool,
        request: &FetchRequest,
        range: ByteRange,
        artifact: &str,
    ) -> Result<CommandOutcome> {
        {
            let mut st = self.state.lock().unwrap();
            let running = st.running.entry(target.to_string()).or_insert(0);
            *running += 1;
            let now = *running;
            let max = st.max_running.entry(target.to_string()).or_insert(0);
            *max = (*max).max(now);
            st.fetched.push((target.to_string(), range));
            st.requests.push(request.clone());
        }
        if self.hang_fetches {
            std::future::pending::<()>().await;
        }
        self.delay().await;

        let mut st = self.state.lock().unwrap();
        if let Some(running) = st.running.get_mut(target) {
            *running -= 1;
        }
        let total = self.body.len() as u64;
        let start = range.start() as usize;
        let end = range.last_byte(total) as usize;
        if self.fail_remote_starts.contains(&range.start()) {
            // curl -o leaves whatever arrived before the error.
            let partial = self.body[start..=start.min(end)].to_vec();
            st.remote_files
                .insert((target.to_string(), artifact.to_string()), partial);
            return Ok(CommandOutcome::failure(22, "curl: (22) The requested URL returned error: 503"));
        }
        let bytes = self.body[start..=end].to_vec();
        st.remote_files
            .insert((target.to_string(), artifact.to_string()), bytes);
        Ok(CommandOutcome::success())
    }

    async fn transfer_back(&self, target: &str, artifact: &str, local_dir: &Path) -> Result<CommandOutcome> {
        self.delay().await;
        let start = artifact_start(artifact).unwrap_or(u64::MAX);
        if self.fail_transfer_starts.contains(&start) {
            return Ok(CommandOutcome::failure(1, "scp: Connection closed"));
        }
        let bytes = {
            let st = self.state.lock().unwrap();
            st.remote_files
                .get(&(target.to_string(), artifact.to_string()))
                .cloned()
        };
        match bytes {
            Some(bytes) if self.partial_transfer_starts.contains(&start) => {
                std::fs::write(local_dir.join(artifact), &bytes[..bytes.len().min(10)])?;
                Ok(CommandOutcome::failure(1, "scp: Connection closed"))
            }
            Some(bytes) => {
                std::fs::write(local_dir.join(artifact), bytes)?;
                Ok(CommandOutcome::success())
            }
            None => Ok(CommandOutcome::failure(1, format!("scp: {}: No such file or directory", artifact))),
        }
    }

    async fn remote_delete(&self, target: &str, artifact: &str) -> Result<CommandOutcome> {
        self.delay().await;
        let mut st = self.state.lock().unwrap();
        st.remote_files
            .remove(&(target.to_string(), artifact.to_string()));
        st.deletes += 1;
        Ok(CommandOutcome::success())
    }
}
