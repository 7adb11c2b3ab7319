use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the sandboxed code runner.
///
/// Each execution spawns a fresh interpreter subprocess against a scratch
/// file; the wall-clock timeout is the only resource bound.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Hard wall-clock limit for one execution
    pub timeout: Duration,
    /// Interpreter binary for `python` fragments
    pub python_bin: String,
    /// Interpreter binary for `javascript` fragments
    pub node_bin: String,
    /// Interpreter binary for `bash` fragments
    pub bash_bin: String,
    /// Directory for scratch files. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            python_bin: "python3".to_string(),
            node_bin: "node".to_string(),
            bash_bin: "bash".to_string(),
            scratch_dir: None,
        }
    }
}

/// Configuration for an executor node.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub listen_addr: SocketAddr,
    /// Display name, also used when self-registering with a coordinator
    pub name: String,
    /// How long the consumption loop sleeps when the queue is empty
    pub poll_interval: Duration,
    /// Coordinator base URL to register with on startup (optional)
    pub coordinator_url: Option<String>,
    /// Externally reachable base URL advertised during self-registration.
    /// Defaults to `http://{listen_addr}` when unset.
    pub advertise_url: Option<String>,
    pub runner: RunnerConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:8080"
                .parse()
                .expect("default listen address is valid"),
            name: "worker".to_string(),
            poll_interval: Duration::from_secs(1),
            coordinator_url: None,
            advertise_url: None,
            runner: RunnerConfig::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn new(name: impl Into<String>, listen_addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            listen_addr,
            ..Default::default()
        }
    }
}

/// Configuration for the coordinator node.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub listen_addr: SocketAddr,
    /// Pause between heartbeat cycles
    pub heartbeat_interval: Duration,
    /// Per-probe timeout for health checks (registration and heartbeat)
    pub probe_timeout: Duration,
    /// Request timeout for forwarding a task to an executor
    pub dispatch_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:5000"
                .parse()
                .expect("default listen address is valid"),
            heartbeat_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            dispatch_timeout: Duration::from_secs(10),
        }
    }
}

impl CoordinatorConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }
}
