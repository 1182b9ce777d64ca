//! [`RemoteExecutor`] over the system `ssh` and `scp` binaries.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::config::SshConfig;
use crate::planner::ByteRange;
use crate::worker::FetchTool;

use super::command;
use super::parse;
use super::{CommandOutcome, FetchRequest, RemoteExecutor};

/// ssh exits 255 when the connection itself failed.
const SSH_CONNECTION_FAILED: i32 = 255;

/// Runs worker-side commands through `ssh <target> <command>` and copies
/// artifacts back with `scp`. Child processes are killed if their future is
/// dropped (cancellation).
#[derive(Debug, Clone, Default)]
pub struct SshExecutor {
    cfg: SshConfig,
}

struct Captured {
    outcome: CommandOutcome,
    stdout: String,
}

impl SshExecutor {
    pub fn new(cfg: SshConfig) -> Self {
        Self { cfg }
    }

    fn base_command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        for opt in &self.cfg.options {
            cmd.arg("-o").arg(opt);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn capture(mut cmd: Command, what: &str) -> Result<Captured> {
        let out = cmd
            .output()
            .await
            .with_context(|| format!("failed to run {}", what))?;
        Ok(Captured {
            outcome: CommandOutcome {
                code: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            },
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        })
    }

    async fn run_remote(&self, target: &str, remote_cmd: &str) -> Result<Captured> {
        let mut cmd = self.base_command(&self.cfg.ssh_program);
        cmd.arg("--").arg(target).arg(remote_cmd);
        tracing::debug!(target = %target, command = %remote_cmd, "ssh");
        Self::capture(cmd, &self.cfg.ssh_program).await
    }
}

impl RemoteExecutor for SshExecutor {
    async fn probe_tool(&self, target: &str) -> Result<Option<FetchTool>> {
        let res = self.run_remote(target, &command::probe_tool_command()).await?;
        if res.outcome.code == Some(SSH_CONNECTION_FAILED) {
            anyhow::bail!("ssh connection failed: {}", res.outcome.stderr);
        }
        Ok(parse::parse_tool_probe(&res.stdout))
    }

    async fn free_space(&self, target: &str) -> Result<u64> {
        let res = self.run_remote(target, &command::free_space_command()).await?;
        if !res.outcome.is_success() {
            anyhow::bail!(
                "df exited with {:?}: {}",
                res.outcome.code,
                res.outcome.stderr
            );
        }
        parse::parse_df_available(&res.stdout)
            .with_context(|| format!("unrecognized df output: {:?}", res.stdout.trim()))
    }

    async fn resource_size(
        &self,
        target: &str,
        tool: FetchTool,
        request: &FetchRequest,
    ) -> Result<u64> {
        let res = self
            .run_remote(target, &command::head_command(tool, request))
            .await?;
        // wget --spider may exit non-zero on servers that reject HEAD yet still print headers.
        match parse::parse_content_length(&res.stdout) {
            Some(size) => Ok(size),
            None => anyhow::bail!(
                "no Content-Length from {} on {} (exit {:?}): {}",
                tool,
                target,
                res.outcome.code,
                res.outcome.stderr
            ),
        }
    }

    async fn fetch_range(
        &self,
        target: &str,
        tool: FetchTool,
        request: &FetchRequest,
        range: ByteRange,
        artifact: &str,
    ) -> Result<CommandOutcome> {
        let remote_cmd = command::fetch_command(tool, request, range, artifact);
        Ok(self.run_remote(target, &remote_cmd).await?.outcome)
    }

    async fn transfer_back(
        &self,
        target: &str,
        artifact: &str,
        local_dir: &Path,
    ) -> Result<CommandOutcome> {
        let mut cmd = self.base_command(&self.cfg.scp_program);
        cmd.arg("-q")
            .arg("--")
            .arg(format!("{}:{}", target, artifact))
            .arg(local_dir.join(artifact));
        tracing::debug!(target = %target, artifact = %artifact, "scp");
        Ok(Self::capture(cmd, &self.cfg.scp_program).await?.outcome)
    }

    async fn remote_delete(&self, target: &str, artifact: &str) -> Result<CommandOutcome> {
        Ok(self
            .run_remote(target, &command::delete_command(artifact))
            .await?
            .outcome)
    }
}
