use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config/data roots
const APP_DIR: &str = "sliceline";

/// Files whose presence in the working directory makes it the config dir
const LOCAL_FILES: [&str; 2] = ["sliceline.json", "sliceline.log"];

/// Overrides for default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI args → ENV var (SLICELINE_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("SLICELINE_CONFIG_DIR").ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Path to a configuration file.
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. SLICELINE_CONFIG_DIR environment variable
/// 3. Working directory, if it already holds sliceline.json or sliceline.log
/// 4. Platform config directory from dirs-next (~/.config/sliceline on Linux)
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir).join(name)
}

/// Path to a data file (logs). Same priority as `config_file`, with the
/// platform data directory (~/.local/share/sliceline on Linux) as default.
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir).join(name)
}

/// Create the config and data directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = resolve_dir(config, dirs_next::config_dir);
    let data_dir = resolve_dir(config, dirs_next::data_dir);

    for dir in [&config_dir, &data_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
    }
    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    LOCAL_FILES.iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform_root: fn() -> Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(cwd) = std::env::current_dir() {
        if has_local_files(&cwd) {
            return cwd;
        }
    }
    platform_root()
        .map(|root| root.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}
