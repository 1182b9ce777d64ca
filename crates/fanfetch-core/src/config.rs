use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// SSH/scp invocation settings (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Program used for remote execution.
    pub ssh_program: String,
    /// Program used for transfer-back.
    pub scp_program: String,
    /// Extra `-o` options passed to both programs (e.g. `BatchMode=yes`).
    #[serde(default)]
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
            options: vec!["BatchMode=yes".to_string()],
        }
    }
}

/// Global configuration loaded from `~/.config/fanfetch/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanfetchConfig {
    /// Target number of main chunks the resource is split into.
    pub chunks: usize,
    /// Maximum simultaneous remote fetches per worker.
    pub concurrency_per_worker: usize,
    /// Free space assumed for a worker whose `df` output cannot be read.
    pub assumed_free_bytes: u64,
    /// Bytes kept free on every worker so chunk files never fill its disk.
    #[serde(default = "default_reserve")]
    pub free_space_reserve_bytes: u64,
    /// Optional SSH settings; if missing, built-in defaults are used.
    #[serde(default)]
    pub ssh: Option<SshConfig>,
}

/// Free space assumed when a worker cannot report it (200 MB).
pub const DEFAULT_ASSUMED_FREE_BYTES: u64 = 200_000_000;

fn default_reserve() -> u64 {
    5_000_000
}

impl Default for FanfetchConfig {
    fn default() -> Self {
        Self {
            chunks: 10,
            concurrency_per_worker: 2,
            assumed_free_bytes: DEFAULT_ASSUMED_FREE_BYTES,
            free_space_reserve_bytes: default_reserve(),
            ssh: None,
        }
    }
}

impl FanfetchConfig {
    /// SSH settings, falling back to defaults when the section is absent.
    pub fn ssh_or_default(&self) -> SshConfig {
        self.ssh.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fanfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FanfetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FanfetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FanfetchConfig = toml::from_str(&data)?;
    Ok(cfg)
}
