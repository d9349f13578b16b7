//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evaluator::{EngineEvaluation, EngineSource, PositionEvaluator, Score};

/// One running Stockfish process, exclusively owned by its holder.
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &Path, threads: usize, hash_mb: u32) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Failure(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Failure("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| EngineError::Failure("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
        };

        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        engine
            .send(&format!("setoption name Threads value {threads}"))
            .await?;
        engine
            .send(&format!("setoption name Hash value {hash_mb}"))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Failure(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Failure(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one trimmed line; EOF means the process died.
    async fn read_line(&mut self, line: &mut String) -> Result<(), EngineError> {
        line.clear();
        let read = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| EngineError::Failure(format!("Failed to read from Stockfish: {e}")))?;
        if read == 0 {
            return Err(EngineError::Failure("Stockfish closed its output".into()));
        }
        debug!(line = line.trim(), "SF >");
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            if line.trim() == expected {
                return Ok(());
            }
        }
    }

    /// Search `fen` to `depth` plies and report the final score, best move and PV.
    pub async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut score = None;
        let mut best_line = Vec::new();
        let mut reached_depth = 0;

        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" score ") {
                if let Some(mate) = parse_mate(trimmed) {
                    score = Some(Score::Mate { mate_in: mate });
                } else if let Some(cp) = parse_cp(trimmed) {
                    score = Some(Score::Cp { centipawn_eval: cp });
                }
                if let Some(d) = parse_depth(trimmed) {
                    reached_depth = d;
                }
                let pv = parse_pv(trimmed);
                if !pv.is_empty() {
                    best_line = pv;
                }
            } else if trimmed.starts_with("bestmove") {
                let best_move = trimmed
                    .split_whitespace()
                    .nth(1)
                    .filter(|m| *m != "(none)")
                    .map(str::to_string);

                if best_move.is_none() {
                    best_line.clear();
                }

                let score = score.ok_or_else(|| {
                    EngineError::Failure(format!("No score reported for {fen}"))
                })?;

                return Ok(EngineEvaluation {
                    score,
                    best_move,
                    best_line,
                    depth: reached_depth,
                });
            }
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

#[async_trait]
impl PositionEvaluator for StockfishEngine {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EngineEvaluation, EngineError> {
        StockfishEngine::evaluate(self, fen, depth).await
    }
}

/// Starts one Stockfish process per analysis scope.
#[derive(Clone, Debug)]
pub struct StockfishLauncher {
    path: PathBuf,
    threads: usize,
    hash_mb: u32,
}

impl StockfishLauncher {
    /// Locate the engine binary; fails with `Unavailable` when none is found.
    pub fn discover(config: &EngineConfig) -> Result<Self, EngineError> {
        let path = config.discover_stockfish()?;
        Ok(Self::with_path(path, config))
    }

    pub fn with_path(path: PathBuf, config: &EngineConfig) -> Self {
        Self {
            path,
            threads: config.threads,
            hash_mb: config.hash_mb,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EngineSource for StockfishLauncher {
    type Session = StockfishEngine;

    async fn acquire(&self) -> Result<StockfishEngine, EngineError> {
        StockfishEngine::new(&self.path, self.threads, self.hash_mb).await
    }

    async fn release(&self, mut session: StockfishEngine) {
        session.quit().await;
    }
}

/// Value following `key` in a whitespace-separated UCI line
fn parse_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let mut parts = line.split_whitespace();
    while let Some(part) = parts.next() {
        if part == key {
            return parts.next()?.parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

fn parse_depth(line: &str) -> Option<u32> {
    parse_after(line, "depth")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|part| *part != "pv")
        .skip(1)
        .take_while(|part| !part.starts_with("bmc") && *part != "string")
        .map(str::to_string)
        .collect()
}
