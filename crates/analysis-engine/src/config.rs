//! Engine configuration from environment variables

use std::env;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::EngineError;

/// Locations checked when `STOCKFISH_PATH` is not set, before falling back to `PATH`
const STOCKFISH_CANDIDATES: &[&str] = &[
    "/opt/homebrew/bin/stockfish",
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
];

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Explicit path to the engine binary, if configured
    pub stockfish_path: Option<PathBuf>,

    /// Search threads per engine process
    pub threads: usize,

    /// Transposition table size per engine process
    pub hash_mb: u32,

    /// Depth for coordinator engine evaluations
    pub analysis_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stockfish_path: None,
            threads: num_cpus::get().clamp(1, 4),
            hash_mb: 512,
            analysis_depth: 20,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, defaulting anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let stockfish_path = env::var("STOCKFISH_PATH").ok().map(PathBuf::from);

        let threads = env::var("ENGINE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&t: &usize| t > 0)
            .unwrap_or(defaults.threads);

        let hash_mb = env::var("ENGINE_HASH_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.hash_mb);

        let analysis_depth = env::var("ANALYSIS_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.analysis_depth);

        Self {
            stockfish_path,
            threads,
            hash_mb,
            analysis_depth,
        }
    }

    /// Resolve the engine binary: explicit path, well-known locations, then `PATH`.
    pub fn discover_stockfish(&self) -> Result<PathBuf, EngineError> {
        if let Some(path) = &self.stockfish_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(EngineError::Unavailable(format!(
                "STOCKFISH_PATH points to a missing file: {}",
                path.display()
            )));
        }

        if let Some(found) = STOCKFISH_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
        {
            info!(path = %found.display(), "Found Stockfish");
            return Ok(found.to_path_buf());
        }

        find_on_path("stockfish").ok_or_else(|| {
            EngineError::Unavailable(
                "Stockfish not found; install it or set STOCKFISH_PATH".to_string(),
            )
        })
    }
}

fn find_on_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}
