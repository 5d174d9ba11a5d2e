//! Mesh generation boundary
//!
//! Generated code is untrusted. It only ever runs in a separate process
//! behind the `{code} -> {success, files, error}` contract; isolating that
//! process is the deployment's job.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Mesh generation errors
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Failed to start mesh generator: {0}")]
    Spawn(std::io::Error),

    #[error("Mesh generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Mesh generator I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mesh generator output: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// One file produced by the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub filename: String,
    pub url: String,
}

/// Generator result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshOutput {
    pub success: bool,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MeshOutput {
    /// Usable only when it reports success and produced at least one file
    pub fn is_usable(&self) -> bool {
        self.success && !self.files.is_empty()
    }
}

/// Turns source code into mesh files
#[async_trait]
pub trait MeshGenerator: Send + Sync {
    async fn generate(&self, code: &str) -> Result<MeshOutput, MeshError>;
}

/// Runs an external command per request.
///
/// The code is written to the command's stdin and its stdout is decoded as a
/// [`MeshOutput`]. The child is killed if the timeout elapses.
#[derive(Debug, Clone)]
pub struct ProcessMeshGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessMeshGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from an argv list; `None` when the list is empty
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), timeout))
    }

    async fn run(&self, code: &str) -> Result<MeshOutput, MeshError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(MeshError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.stderr.is_empty() {
            log::debug!(
                "Mesh generator stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        if !output.status.success() {
            log::warn!("Mesh generator exited with {}", output.status);
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl MeshGenerator for ProcessMeshGenerator {
    async fn generate(&self, code: &str) -> Result<MeshOutput, MeshError> {
        log::info!("Running mesh generator '{}'", self.program);
        match tokio::time::timeout(self.timeout, self.run(code)).await {
            Ok(result) => result,
            Err(_) => Err(MeshError::Timeout(self.timeout)),
        }
    }
}

/// Used when no generator command is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMeshGenerator;

#[async_trait]
impl MeshGenerator for DisabledMeshGenerator {
    async fn generate(&self, _code: &str) -> Result<MeshOutput, MeshError> {
        Err(MeshError::Unavailable(
            "mesh generation is not configured".to_string(),
        ))
    }
}
