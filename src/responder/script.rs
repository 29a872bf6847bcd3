use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ResponderConfig;
use crate::error::ResponderError;
use crate::responder::Responder;

/// Record of one subprocess call, kept for logging.
#[derive(Debug)]
pub struct ResponderInvocation {
    pub query: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: Option<i32>,
    pub elapsed: Duration,
}

/// Where the script lives.
#[derive(Debug, Clone)]
enum ScriptLocation {
    Fixed(PathBuf),
    /// Probed on every call so a script deployed after startup is picked up.
    Probe {
        root: PathBuf,
        candidates: Vec<PathBuf>,
    },
}

impl ScriptLocation {
    fn resolve(&self) -> PathBuf {
        match self {
            ScriptLocation::Fixed(path) => path.clone(),
            ScriptLocation::Probe { root, candidates } => probe_script(root, candidates),
        }
    }
}

/// Runs `<interpreter> <script> <query>` and reads the reply from stdout.
pub struct ScriptResponder {
    interpreter: String,
    script: ScriptLocation,
    timeout: Duration,
}

/// First candidate that exists under `root`, or the first candidate when none do.
pub fn probe_script(root: &Path, candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.is_file())
        .or_else(|| candidates.first().map(|c| root.join(c)))
        .unwrap_or_else(|| root.join("neuro/main.py"))
}

impl ScriptResponder {
    pub fn new(
        interpreter: impl Into<String>,
        script: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: ScriptLocation::Fixed(script.into()),
            timeout,
        }
    }

    /// Look the script up under `root` before each call.
    pub fn probing(
        interpreter: impl Into<String>,
        root: impl Into<PathBuf>,
        candidates: Vec<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: ScriptLocation::Probe {
                root: root.into(),
                candidates,
            },
            timeout,
        }
    }

    pub fn from_config(config: &ResponderConfig) -> Self {
        let responder = match &config.script {
            Some(path) => Self::new(config.interpreter.clone(), path.clone(), config.timeout()),
            None => Self::probing(
                config.interpreter.clone(),
                "",
                config.candidates.clone(),
                config.timeout(),
            ),
        };

        let script = responder.script.resolve();
        if script.is_file() {
            info!("Using responder script: {}", script.display());
        } else {
            warn!(
                "Responder script not found at {}; queries use the fallback reply until it appears",
                script.display()
            );
        }
        responder
    }

    async fn invoke(&self, query: &str) -> Result<ResponderInvocation, ResponderError> {
        let started = Instant::now();
        let script = self.script.resolve();
        debug!("Using responder script: {}", script.display());

        let child = Command::new(&self.interpreter)
            .arg(&script)
            .arg(query)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResponderError::Spawn {
                program: self.interpreter.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ResponderError::Timeout(self.timeout))??;

        Ok(ResponderInvocation {
            query: query.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit: output.status.code(),
            elapsed: started.elapsed(),
        })
    }
}

#[async_trait]
impl Responder for ScriptResponder {
    async fn respond(&self, query: &str) -> Result<String, ResponderError> {
        info!("Calling responder script with query: '{}'", query);

        let invocation = self.invoke(query).await?;
        let stdout = String::from_utf8_lossy(&invocation.stdout);
        let stderr = String::from_utf8_lossy(&invocation.stderr);
        debug!(
            "Responder finished in {:?} (exit {:?}) for '{}'\nSTDOUT: {}\nSTDERR: {}",
            invocation.elapsed, invocation.exit, invocation.query, stdout, stderr
        );

        if invocation.exit != Some(0) {
            return Err(ResponderError::Exit {
                code: invocation.exit,
                stderr: stderr.trim().to_string(),
            });
        }

        let reply = stdout.trim();
        if reply.is_empty() {
            return Err(ResponderError::EmptyReply);
        }
        Ok(reply.to_string())
    }
}
