//! Orchestration of the external `bb` proving executable.
//!
//! Proving happens entirely inside a version-pinned Barretenberg binary; this
//! crate stages circuit and witness blobs into a throwaway directory, runs
//! `bb prove_ultra_honk`, and collects the proof together with the child's
//! output and timing.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    process::ExitStatus,
    time::{Duration, Instant},
};

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

const BB_DIR_ENV: &str = "HONKD_BB_DIR";
const BB_MANIFEST_ENV: &str = "HONKD_BB_MANIFEST_PATH";

/// Versions with a pinned binary shipped alongside the service.
const DEFAULT_BINARIES: &[(&str, &str)] = &[
    ("0.69.0", "bb_0.69.0"),
    ("0.72.1", "bb_0.72.1"),
    ("0.73.0", "bb_0.73.0"),
    ("0.74.0", "bb_0.74.0"),
];

const CIRCUIT_FILE: &str = "circuit.json";
const WITNESS_FILE: &str = "witness.gz";
const PROOF_FILE: &str = "output.proof";
const TIME_BINARY: &str = "/bin/time";

#[derive(Clone, Debug, Deserialize)]
struct BinaryManifestEntry {
    version: String,
    path: PathBuf,
}

/// Mapping from supported `bb` release versions to binary paths.
#[derive(Clone, Debug)]
pub struct BinaryRegistry {
    binaries: HashMap<String, PathBuf>,
}

impl BinaryRegistry {
    /// Build the registry from the environment.
    ///
    /// A manifest at `HONKD_BB_MANIFEST_PATH` replaces the built-in version
    /// table entirely; otherwise the defaults are used, prefixed with
    /// `HONKD_BB_DIR` when set. Malformed configuration aborts startup.
    pub fn from_env() -> Self {
        if let Ok(path) = env::var(BB_MANIFEST_ENV) {
            return Self::from_manifest_path(&path);
        }

        let dir = env::var(BB_DIR_ENV).ok().map(PathBuf::from);
        Self::from_entries(DEFAULT_BINARIES.iter().map(|(version, binary)| {
            let path = match &dir {
                Some(dir) => dir.join(binary),
                None => PathBuf::from(binary),
            };
            (version.to_string(), path)
        }))
    }

    pub fn from_manifest_path(path: &str) -> Self {
        let bytes = fs::read(path)
            .unwrap_or_else(|err| panic!("failed to read bb manifest from {}: {}", path, err));
        let entries: Vec<BinaryManifestEntry> = serde_json::from_slice(&bytes)
            .unwrap_or_else(|err| panic!("failed to parse bb manifest from {}: {}", path, err));
        Self::from_entries(entries.into_iter().map(|entry| (entry.version, entry.path)))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        let mut binaries = HashMap::new();
        for (version, path) in entries {
            if binaries.insert(version.clone(), path).is_some() {
                panic!("duplicate bb version {} in binary registry", version);
            }
        }
        BinaryRegistry { binaries }
    }

    /// Resolve a requested version to its binary path.
    pub fn resolve(&self, version: &str) -> Option<&Path> {
        self.binaries.get(version).map(PathBuf::as_path)
    }

    /// Supported versions, sorted for stable error payloads.
    pub fn supported_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.binaries.keys().cloned().collect();
        versions.sort();
        versions
    }
}

/// Knobs forwarded to the `bb` invocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProveOptions {
    /// Pin the prover's thread count.
    pub threads: Option<u32>,
    /// Wrap the invocation in `/bin/time -v` for resource statistics.
    pub stats: bool,
    /// Log the child's stdout/stderr at debug level.
    pub logging: bool,
}

/// Result of a successful `bb prove_ultra_honk` run.
#[derive(Debug)]
pub struct ProveOutcome {
    pub proof: Vec<u8>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("threads must be a positive number")]
    InvalidThreads,

    #[error("prover io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bb exited with {status}: {stderr}")]
    ExecutionFailed { status: ExitStatus, stderr: String },

    #[error("proof file was not created")]
    ProofMissing,
}

impl ProverError {
    /// Stable machine-readable code, used by the HTTP layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProverError::InvalidThreads => "INVALID_THREADS",
            ProverError::Io(_) => "PROVER_IO_ERROR",
            ProverError::ExecutionFailed { .. } => "PROVER_FAILED",
            ProverError::ProofMissing => "PROOF_MISSING",
        }
    }
}

/// Stage the circuit and witness into a fresh temp directory and run
/// `bb prove_ultra_honk` there. The directory is removed when the call
/// returns, on success or failure.
pub async fn prove_ultra_honk(
    binary: &Path,
    circuit: &[u8],
    witness: &[u8],
    options: &ProveOptions,
) -> Result<ProveOutcome, ProverError> {
    if options.threads == Some(0) {
        return Err(ProverError::InvalidThreads);
    }

    let staging = tempfile::Builder::new().prefix("prover-").tempdir()?;
    let circuit_path = staging.path().join(CIRCUIT_FILE);
    let witness_path = staging.path().join(WITNESS_FILE);
    let proof_path = staging.path().join(PROOF_FILE);

    tokio::fs::write(&circuit_path, circuit).await?;
    tokio::fs::write(&witness_path, witness).await?;

    let mut command = if options.stats {
        let mut command = Command::new(TIME_BINARY);
        command.arg("-v").arg(binary);
        command
    } else {
        Command::new(binary)
    };
    command.arg("prove_ultra_honk");
    if let Some(threads) = options.threads {
        command.arg("--threads").arg(threads.to_string());
    }
    command
        .arg("-v")
        .arg("-b")
        .arg(&circuit_path)
        .arg("-w")
        .arg(&witness_path)
        .arg("-o")
        .arg(&proof_path)
        .current_dir(staging.path());

    tracing::info!("executing {} prove_ultra_honk", binary.display());
    let started = Instant::now();
    let output = command.output().await?;
    let elapsed = started.elapsed();
    tracing::info!("bb prove_ultra_honk finished in {:.2}s", elapsed.as_secs_f64());

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if options.logging {
        tracing::debug!("bb stdout: {}", stdout);
        tracing::debug!("bb stderr: {}", stderr);
    }

    if !output.status.success() {
        return Err(ProverError::ExecutionFailed {
            status: output.status,
            stderr,
        });
    }

    let proof = match tokio::fs::read(&proof_path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProverError::ProofMissing)
        }
        Err(err) => return Err(err.into()),
    };

    Ok(ProveOutcome {
        proof,
        stdout,
        stderr,
        elapsed,
    })
}
