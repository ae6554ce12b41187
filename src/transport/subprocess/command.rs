//! Binary discovery and command construction

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::VERSION;
use crate::error::{BridgeError, Result};

use super::config::DANGEROUS_ENV_VARS;

/// Find an agent CLI binary
///
/// Tries `PATH` first, then the usual per-user install locations.
///
/// # Errors
/// Returns `BridgeError::CliNotFound` if the binary is nowhere to be found
pub fn find_binary(binary: &str) -> Result<PathBuf> {
    if let Ok(path) = which::which(binary) {
        return Ok(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
    let home = PathBuf::from(home);
    let locations = [
        home.join(".npm-global/bin").join(binary),
        PathBuf::from("/usr/local/bin").join(binary),
        PathBuf::from("/opt/homebrew/bin").join(binary),
        home.join(".local/bin").join(binary),
        home.join(".cargo/bin").join(binary),
        home.join(".opencode/bin").join(binary),
        home.join("node_modules/.bin").join(binary),
        home.join(".yarn/bin").join(binary),
    ];

    locations
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| BridgeError::cli_not_found(binary))
}

/// Resolve a request's program: explicit paths are used as-is
pub(super) fn resolve_program(program: &str) -> Result<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
        return Ok(PathBuf::from(program));
    }
    find_binary(program)
}

/// Command builder for agent subprocesses
pub(super) struct CommandBuilder<'a> {
    program: &'a Path,
    args: &'a [String],
    cwd: Option<&'a Path>,
    env: &'a HashMap<String, String>,
    pipe_stdin: bool,
}

impl<'a> CommandBuilder<'a> {
    pub(super) fn new(
        program: &'a Path,
        args: &'a [String],
        env: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            program,
            args,
            cwd: None,
            env,
            pipe_stdin: false,
        }
    }

    pub(super) fn cwd(mut self, cwd: Option<&'a Path>) -> Self {
        self.cwd = cwd;
        self
    }

    pub(super) fn pipe_stdin(mut self, pipe: bool) -> Self {
        self.pipe_stdin = pipe;
        self
    }

    /// Build the command with filtered environment and piped output
    pub(super) fn build(&self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(self.args);

        // Only add caller-provided env vars that are not in the dangerous list
        let mut process_env = env::vars().collect::<HashMap<_, _>>();
        for (key, value) in self.env {
            if DANGEROUS_ENV_VARS.contains(&key.as_str()) {
                log::warn!("Ignoring dangerous environment variable {key}");
                continue;
            }
            process_env.insert(key.clone(), value.clone());
        }
        process_env.insert("AGENT_BRIDGE_VERSION".to_string(), VERSION.to_string());

        if let Some(cwd) = self.cwd {
            process_env.insert("PWD".to_string(), cwd.to_string_lossy().to_string());
            cmd.current_dir(cwd);
        }
        cmd.envs(process_env);

        // Pipe stderr instead of inheriting so the child cannot manipulate
        // the parent terminal
        cmd.stdin(if self.pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        cmd
    }

    /// Describe a spawn failure, pointing at a missing working directory
    pub(super) fn spawn_error(&self, error: &std::io::Error) -> String {
        if let Some(cwd) = self.cwd
            && !cwd.exists()
        {
            return format!("Working directory does not exist: {}", cwd.display());
        }
        format!("Failed to start {}: {error}", self.program.display())
    }
}
