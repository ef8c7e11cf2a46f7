//! Collaborator contracts the console calls but does not implement.
//!
//! Every collaborator is an object-safe trait shared as `Arc<dyn ...>`.
//! Failures come back as a [`UserMessage`] with the error flag set so the
//! console can surface them verbatim.

pub mod memory;
mod module;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bus::UserMessage;

pub use module::Module;

/// Option name → value, ordered by name for stable display.
pub type OptionMap = BTreeMap<String, String>;

/// Liveness of an agent as judged by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStatus {
    Active,
    Delayed,
    Dead,
    Other(String),
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "Active"),
            AgentStatus::Delayed => write!(f, "Delayed"),
            AgentStatus::Dead => write!(f, "Dead"),
            AgentStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// Registry snapshot of one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: Uuid,
    #[serde(default)]
    pub note: String,
    pub platform: String,
    pub architecture: String,
    pub hostname: String,
    pub username: String,
    /// Full path of the agent's process image
    pub process: String,
    pub pid: u32,
    /// Transport code (`http`, `https`, `h2c`, `h2`, `http3`, ...)
    pub transport: String,
    #[serde(default = "Utc::now")]
    pub last_checkin: DateTime<Utc>,
}

/// Row of the listener list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerSummary {
    pub name: String,
    pub interface: String,
    pub port: u16,
    pub protocol: String,
    pub status: String,
    pub description: String,
}

pub trait AgentRegistry: Send + Sync {
    fn get(&self, id: Uuid) -> Option<AgentInfo>;

    fn list(&self) -> Vec<AgentInfo>;

    /// Known agent ids, for completion
    fn ids(&self) -> Vec<Uuid> {
        self.list().into_iter().map(|agent| agent.id).collect()
    }

    fn remove(&self, id: Uuid) -> Result<(), UserMessage>;

    fn status(&self, id: Uuid) -> AgentStatus;

    fn set_note(&self, id: Uuid, note: &str) -> Result<(), UserMessage>;

    /// Key/value details shown by the agent `info` command
    fn info(&self, id: Uuid) -> Result<Vec<(String, String)>, UserMessage>;

    /// Forward a tasking command (`command[0]` is the verb) for `id`.
    fn task(&self, id: Uuid, command: &[String]) -> UserMessage;
}

pub trait ListenerApi: Send + Sync {
    /// Create a listener from a filled-in option map.
    fn create(&self, options: &OptionMap) -> Result<(Uuid, UserMessage), UserMessage>;

    fn start(&self, name: &str) -> UserMessage;

    fn stop(&self, name: &str) -> UserMessage;

    fn restart(&self, id: Uuid) -> UserMessage;

    fn remove(&self, name: &str) -> UserMessage;

    /// Status of a listener; the message text is the status string.
    fn status(&self, id: Uuid) -> UserMessage;

    fn configured_options(&self, id: Uuid) -> Result<OptionMap, UserMessage>;

    /// `args` is the full command line, `set <option> <value...>`.
    fn set_option(&self, id: Uuid, args: &[String]) -> UserMessage;

    /// Error-flagged message when no listener has this name.
    fn exists(&self, name: &str) -> UserMessage;

    fn by_name(&self, name: &str) -> Result<Uuid, UserMessage>;

    fn list(&self) -> Vec<ListenerSummary>;

    /// Protocols a listener can be created for
    fn types(&self) -> Vec<String>;

    fn names(&self) -> Vec<String>;

    /// Blank option map for a protocol, used by listener setup
    fn default_options(&self, protocol: &str) -> OptionMap;
}

pub trait ModuleApi: Send + Sync {
    fn load(&self, path: &Path) -> Result<Module, UserMessage>;

    fn run(&self, module: &Module) -> Vec<UserMessage>;

    /// Names accepted by `use module <name>`
    fn names(&self) -> Vec<String>;

    /// Definition path for a module name. Names that would leave the
    /// module directory are rejected.
    fn path_for(&self, name: &str) -> Result<std::path::PathBuf, UserMessage>;
}

pub trait JobQueue: Send + Sync {
    /// Jobs not yet handed to an agent, rendered as text
    fn list_unassigned(&self) -> String;

    fn clear_unassigned(&self);

    fn list_jobs(&self, agent: Uuid) -> Result<Vec<String>, UserMessage>;

    fn clear_jobs(&self, agent: Uuid) -> Result<(), UserMessage>;

    fn enqueue(&self, agent: Uuid, command: &[String]) -> Result<Uuid, UserMessage>;
}

/// Handles to every collaborator, cloned into the shell at startup.
#[derive(Clone)]
pub struct Backend {
    pub agents: Arc<dyn AgentRegistry>,
    pub listeners: Arc<dyn ListenerApi>,
    pub modules: Arc<dyn ModuleApi>,
    pub jobs: Arc<dyn JobQueue>,
}

impl Backend {
    /// Reference backend keeping everything in memory, with module
    /// definitions read from `modules_dir`.
    pub fn in_memory(modules_dir: impl Into<std::path::PathBuf>) -> Self {
        memory::MemoryBackend::new(modules_dir, None).backend()
    }
}
