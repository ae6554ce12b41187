//! Configuration constants and types for the subprocess control plane

use std::collections::HashMap;
use std::time::Duration;

/// Dangerous environment variables that should not be passed to subprocess
///
/// These variables can affect how the subprocess loads and executes code,
/// potentially creating security vulnerabilities.
pub const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

/// How long a killed process may take to exit before it is force-killed
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// How long `--version` may take during an installation probe
pub const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read size for stderr pumps (4KB)
pub const STDERR_CHUNK_SIZE: usize = 4096;

/// Upper bound on stderr kept for an execute outcome (64KB)
pub const MAX_CAPTURED_STDERR: usize = 64 * 1024;

/// Command used to start a long-lived agent process for a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Program name or path; bare names are resolved like agent binaries
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl LaunchCommand {
    /// Launch `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}
