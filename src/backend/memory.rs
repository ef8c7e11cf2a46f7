// In-memory collaborators
//
// Reference backend used by the binary and the tests. State lives in
// DashMaps so the dispatch task and out-of-line callers can share it
// without a global lock.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use uuid::Uuid;
use walkdir::WalkDir;

use super::{
    AgentInfo, AgentRegistry, AgentStatus, Backend, JobQueue, ListenerApi, ListenerSummary,
    Module, ModuleApi, OptionMap,
};
use crate::bus::{MessageBus, UserMessage};
use crate::config::constants::BROADCAST_AGENT_ID;

/// Agents that checked in within this window are Active
const ACTIVE_WINDOW_SECS: i64 = 60;
/// ...and within this one Delayed; anything older is Dead
const DELAYED_WINDOW_SECS: i64 = 300;

/// Protocols the in-memory listener service accepts
const LISTENER_TYPES: &[&str] = &["http", "https", "h2c", "http2", "http3"];

/// The in-memory collaborators wired together, with concrete handles kept
/// for callers that feed them (agent check-ins, tests).
pub struct MemoryBackend {
    pub agents: Arc<MemoryAgents>,
    pub listeners: Arc<MemoryListeners>,
    pub modules: Arc<ModuleDirectory>,
    pub jobs: Arc<MemoryJobs>,
}

impl MemoryBackend {
    /// With `events`, out-of-line events such as agent check-ins are
    /// published to the message bus.
    pub fn new(modules_dir: impl Into<PathBuf>, events: Option<MessageBus>) -> Self {
        let jobs = Arc::new(MemoryJobs::new());
        let mut agents = MemoryAgents::new(Arc::clone(&jobs));
        if let Some(bus) = events {
            agents = agents.with_events(bus);
        }
        Self {
            agents: Arc::new(agents),
            listeners: Arc::new(MemoryListeners::new()),
            modules: Arc::new(ModuleDirectory::new(modules_dir, jobs.clone())),
            jobs,
        }
    }

    /// Trait-object handles for the shell
    pub fn backend(&self) -> Backend {
        Backend {
            agents: self.agents.clone(),
            listeners: self.listeners.clone(),
            modules: self.modules.clone(),
            jobs: self.jobs.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct JobRecord {
    id: Uuid,
    command: Vec<String>,
    created: DateTime<Utc>,
}

/// Pending jobs keyed by agent id
#[derive(Debug, Default)]
pub struct MemoryJobs {
    pending: DashMap<Uuid, Vec<JobRecord>>,
}

impl MemoryJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending jobs for an agent
    pub fn pending_for(&self, agent: Uuid) -> usize {
        self.pending.get(&agent).map(|jobs| jobs.len()).unwrap_or(0)
    }
}

impl JobQueue for MemoryJobs {
    fn list_unassigned(&self) -> String {
        let mut rows: Vec<(Uuid, JobRecord)> = self
            .pending
            .iter()
            .flat_map(|entry| {
                let agent = *entry.key();
                entry
                    .value()
                    .iter()
                    .cloned()
                    .map(move |job| (agent, job))
                    .collect::<Vec<_>>()
            })
            .collect();

        if rows.is_empty() {
            return "There are no unassigned jobs".to_string();
        }

        rows.sort_by_key(|(_, job)| job.created);
        rows.iter()
            .map(|(agent, job)| format!("{}  {}  {}", agent, job.id, job.command.join(" ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn clear_unassigned(&self) {
        self.pending.clear();
    }

    fn list_jobs(&self, agent: Uuid) -> Result<Vec<String>, UserMessage> {
        Ok(self
            .pending
            .get(&agent)
            .map(|jobs| {
                jobs.iter()
                    .map(|job| format!("{}  {}", job.id, job.command.join(" ")))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear_jobs(&self, agent: Uuid) -> Result<(), UserMessage> {
        self.pending.remove(&agent);
        Ok(())
    }

    fn enqueue(&self, agent: Uuid, command: &[String]) -> Result<Uuid, UserMessage> {
        if command.is_empty() {
            return Err(UserMessage::failure("a job needs a command"));
        }
        let job = JobRecord {
            id: Uuid::new_v4(),
            command: command.to_vec(),
            created: Utc::now(),
        };
        let id = job.id;
        self.pending.entry(agent).or_default().push(job);
        tracing::debug!(%agent, %id, "Job queued");
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Agent registry; tasking only queues a job, even for agents that have
/// not checked in yet.
pub struct MemoryAgents {
    agents: DashMap<Uuid, AgentInfo>,
    jobs: Arc<MemoryJobs>,
    events: Option<MessageBus>,
}

impl MemoryAgents {
    pub fn new(jobs: Arc<MemoryJobs>) -> Self {
        Self {
            agents: DashMap::new(),
            jobs,
            events: None,
        }
    }

    /// Announce first check-ins on `bus`.
    pub fn with_events(mut self, bus: MessageBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Record an agent check-in, replacing any previous snapshot.
    ///
    /// Publishes to the bus when one is attached, so this must run on a
    /// blocking thread rather than inside an async task.
    pub fn check_in(&self, agent: AgentInfo) {
        let id = agent.id;
        let first = self.agents.insert(id, agent).is_none();
        if !first {
            return;
        }
        tracing::info!(agent = %id, "Agent checked in");
        if let Some(bus) = &self.events {
            let msg = UserMessage::success(format!("New authenticated agent checkin for {}", id));
            if let Err(e) = bus.publish_blocking(msg) {
                tracing::warn!(agent = %id, "Check-in not announced: {}", e);
            }
        }
    }

    /// Check in every agent listed in a JSON array file. Returns how many
    /// were read.
    pub fn check_in_from_file(&self, path: &Path) -> anyhow::Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read agents file {}", path.display()))?;
        let agents: Vec<AgentInfo> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse agents file {}", path.display()))?;

        let count = agents.len();
        for agent in agents {
            self.check_in(agent);
        }
        Ok(count)
    }

    fn missing(id: Uuid) -> UserMessage {
        UserMessage::failure(format!("{} is not a valid agent", id))
    }
}

impl AgentRegistry for MemoryAgents {
    fn get(&self, id: Uuid) -> Option<AgentInfo> {
        self.agents.get(&id).map(|agent| agent.clone())
    }

    fn list(&self) -> Vec<AgentInfo> {
        let mut agents: Vec<AgentInfo> = self.agents.iter().map(|a| a.value().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    fn remove(&self, id: Uuid) -> Result<(), UserMessage> {
        self.agents
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::missing(id))
    }

    fn status(&self, id: Uuid) -> AgentStatus {
        let Some(agent) = self.agents.get(&id) else {
            return AgentStatus::Other("Unknown".to_string());
        };
        let age = Utc::now() - agent.last_checkin;
        if age < ChronoDuration::seconds(ACTIVE_WINDOW_SECS) {
            AgentStatus::Active
        } else if age < ChronoDuration::seconds(DELAYED_WINDOW_SECS) {
            AgentStatus::Delayed
        } else {
            AgentStatus::Dead
        }
    }

    fn set_note(&self, id: Uuid, note: &str) -> Result<(), UserMessage> {
        let mut agent = self.agents.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        agent.note = note.to_string();
        Ok(())
    }

    fn info(&self, id: Uuid) -> Result<Vec<(String, String)>, UserMessage> {
        let agent = self.get(id).ok_or_else(|| Self::missing(id))?;
        Ok(vec![
            ("Status".to_string(), self.status(id).to_string()),
            ("ID".to_string(), agent.id.to_string()),
            ("Platform".to_string(), format!("{}/{}", agent.platform, agent.architecture)),
            ("User Name".to_string(), agent.username),
            ("Hostname".to_string(), agent.hostname),
            ("Process Name".to_string(), agent.process),
            ("Process ID".to_string(), agent.pid.to_string()),
            ("Transport".to_string(), agent.transport),
            ("Note".to_string(), agent.note),
            ("Last Check In".to_string(), agent.last_checkin.to_rfc3339()),
            ("Pending Jobs".to_string(), self.jobs.pending_for(id).to_string()),
        ])
    }

    fn task(&self, id: Uuid, command: &[String]) -> UserMessage {
        if id != BROADCAST_AGENT_ID && !self.agents.contains_key(&id) {
            tracing::debug!(agent = %id, "Queueing job for an agent that has not checked in");
        }
        let verb = command.first().map(String::as_str).unwrap_or("");
        match self.jobs.enqueue(id, command) {
            Ok(job) => UserMessage::note(format!(
                "Created job {} for agent {} ({})",
                job, id, verb
            )),
            Err(msg) => msg,
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ListenerRecord {
    options: OptionMap,
    status: String,
}

impl ListenerRecord {
    fn option(&self, key: &str) -> String {
        self.options.get(key).cloned().unwrap_or_default()
    }

    fn name(&self) -> String {
        self.option("Name")
    }
}

/// Listener service that tracks configuration and state only
#[derive(Debug, Default)]
pub struct MemoryListeners {
    listeners: DashMap<Uuid, ListenerRecord>,
}

impl MemoryListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<Uuid> {
        self.listeners
            .iter()
            .find(|entry| entry.value().name() == name)
            .map(|entry| *entry.key())
    }

    fn not_found(name: &str) -> UserMessage {
        UserMessage::failure(format!("{} is not a valid listener", name))
    }

    fn set_status(&self, name: &str, status: &str, verb: &str) -> UserMessage {
        let Some(id) = self.find(name) else {
            return Self::not_found(name);
        };
        match self.listeners.get_mut(&id) {
            Some(mut record) => {
                record.status = status.to_string();
                UserMessage::success(format!(
                    "{} {} listener {} on {}:{}",
                    verb,
                    record.option("Protocol"),
                    name,
                    record.option("Interface"),
                    record.option("Port")
                ))
            }
            None => Self::not_found(name),
        }
    }
}

impl ListenerApi for MemoryListeners {
    fn create(&self, options: &OptionMap) -> Result<(Uuid, UserMessage), UserMessage> {
        let name = options.get("Name").cloned().unwrap_or_default();
        if name.is_empty() {
            return Err(UserMessage::failure("a listener Name is required"));
        }
        if self.find(&name).is_some() {
            return Err(UserMessage::failure(format!(
                "a listener named {} already exists",
                name
            )));
        }

        let protocol = options.get("Protocol").cloned().unwrap_or_default();
        if !LISTENER_TYPES.contains(&protocol.to_lowercase().as_str()) {
            return Err(UserMessage::failure(format!(
                "invalid listener protocol: {}",
                protocol
            )));
        }
        if let Some(port) = options.get("Port") {
            if port.parse::<u16>().is_err() {
                return Err(UserMessage::failure(format!("invalid port: {}", port)));
            }
        }

        let id = Uuid::new_v4();
        self.listeners.insert(
            id,
            ListenerRecord {
                options: options.clone(),
                status: "Created".to_string(),
            },
        );
        tracing::info!(%id, name = %name, "Listener created");
        Ok((
            id,
            UserMessage::success(format!("Created {} listener named {}", protocol, name)),
        ))
    }

    fn start(&self, name: &str) -> UserMessage {
        self.set_status(name, "Running", "Started")
    }

    fn stop(&self, name: &str) -> UserMessage {
        self.set_status(name, "Stopped", "Stopped")
    }

    fn restart(&self, id: Uuid) -> UserMessage {
        match self.listeners.get_mut(&id) {
            Some(mut record) => {
                record.status = "Running".to_string();
                UserMessage::success(format!("Restarted listener {}", record.name()))
            }
            None => Self::not_found(&id.to_string()),
        }
    }

    fn remove(&self, name: &str) -> UserMessage {
        match self.find(name) {
            Some(id) => {
                self.listeners.remove(&id);
                UserMessage::success(format!("Listener {} was removed", name))
            }
            None => Self::not_found(name),
        }
    }

    fn status(&self, id: Uuid) -> UserMessage {
        match self.listeners.get(&id) {
            Some(record) => UserMessage::plain(record.status.clone()),
            None => Self::not_found(&id.to_string()),
        }
    }

    fn configured_options(&self, id: Uuid) -> Result<OptionMap, UserMessage> {
        self.listeners
            .get(&id)
            .map(|record| record.options.clone())
            .ok_or_else(|| Self::not_found(&id.to_string()))
    }

    fn set_option(&self, id: Uuid, args: &[String]) -> UserMessage {
        if args.len() < 3 {
            return UserMessage::failure("usage: set <option> <value>");
        }
        let Some(mut record) = self.listeners.get_mut(&id) else {
            return Self::not_found(&id.to_string());
        };
        let Some(key) = record
            .options
            .keys()
            .find(|key| key.eq_ignore_ascii_case(&args[1]))
            .cloned()
        else {
            return UserMessage::failure(format!("invalid listener option: {}", args[1]));
        };
        let value = args[2..].join(" ");
        record.options.insert(key.clone(), value.clone());
        UserMessage::success(format!("set {} to: {}", key, value))
    }

    fn exists(&self, name: &str) -> UserMessage {
        match self.find(name) {
            Some(_) => UserMessage::plain(name),
            None => Self::not_found(name),
        }
    }

    fn by_name(&self, name: &str) -> Result<Uuid, UserMessage> {
        self.find(name).ok_or_else(|| Self::not_found(name))
    }

    fn list(&self) -> Vec<ListenerSummary> {
        let mut rows: Vec<ListenerSummary> = self
            .listeners
            .iter()
            .map(|entry| {
                let record = entry.value();
                ListenerSummary {
                    name: record.name(),
                    interface: record.option("Interface"),
                    port: record.option("Port").parse().unwrap_or(0),
                    protocol: record.option("Protocol"),
                    status: record.status.clone(),
                    description: record.option("Description"),
                }
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    fn types(&self) -> Vec<String> {
        LISTENER_TYPES.iter().map(|t| t.to_string()).collect()
    }

    fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|row| row.name).collect()
    }

    fn default_options(&self, protocol: &str) -> OptionMap {
        let protocol = protocol.to_lowercase();
        let port = match protocol.as_str() {
            "http" | "h2c" => "80",
            _ => "443",
        };

        let mut options = OptionMap::new();
        options.insert("Name".to_string(), format!("My {} Listener", protocol.to_uppercase()));
        options.insert("Description".to_string(), "Default listener".to_string());
        options.insert("Interface".to_string(), "127.0.0.1".to_string());
        options.insert("Port".to_string(), port.to_string());
        options.insert("Protocol".to_string(), protocol.clone());
        options.insert("PSK".to_string(), "cairn".to_string());
        options.insert("URLS".to_string(), "/".to_string());
        if protocol != "http" && protocol != "h2c" {
            options.insert("X509Cert".to_string(), String::new());
            options.insert("X509Key".to_string(), String::new());
        }
        options
    }
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// Module definitions stored as `<root>/<name>.json`
pub struct ModuleDirectory {
    root: PathBuf,
    jobs: Arc<dyn JobQueue>,
}

impl ModuleDirectory {
    pub fn new(root: impl Into<PathBuf>, jobs: Arc<dyn JobQueue>) -> Self {
        Self {
            root: root.into(),
            jobs,
        }
    }

    /// Definition names relative to the root, `/`-separated, without `.json`
    fn collect_names(&self) -> Vec<String> {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping module path: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|entry| {
                let stem = entry.path().with_extension("");
                let relative = stem.strip_prefix(&self.root).ok()?;
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                Some(parts.join("/"))
            })
            .collect()
    }
}

impl ModuleApi for ModuleDirectory {
    fn load(&self, path: &Path) -> Result<Module, UserMessage> {
        let content = fs::read_to_string(path).map_err(|e| {
            UserMessage::failure(format!("failed to read module {}: {}", path.display(), e))
        })?;
        let mut module: Module = serde_json::from_str(&content).map_err(|e| {
            UserMessage::failure(format!("failed to parse module {}: {}", path.display(), e))
        })?;
        module.path = path.to_path_buf();
        tracing::debug!(module = %module.name, "Module loaded");
        Ok(module)
    }

    fn run(&self, module: &Module) -> Vec<UserMessage> {
        let Some(agent) = module.agent() else {
            return vec![UserMessage::failure(format!(
                "set the Agent option before running module {}",
                module.name
            ))];
        };

        let commands = module.render_commands();
        if commands.is_empty() {
            return vec![UserMessage::failure(format!(
                "module {} has no commands",
                module.name
            ))];
        }

        commands
            .iter()
            .map(|command| {
                let words: Vec<String> = command.split_whitespace().map(String::from).collect();
                match self.jobs.enqueue(agent, &words) {
                    Ok(job) => UserMessage::note(format!(
                        "Created job {} for agent {} from module {}",
                        job, agent, module.name
                    )),
                    Err(msg) => msg,
                }
            })
            .collect()
    }

    fn names(&self) -> Vec<String> {
        let mut names = self.collect_names();
        names.sort();
        names
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, UserMessage> {
        let relative = Path::new(name);
        let inside = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !inside {
            return Err(UserMessage::failure(format!("invalid module name: {}", name)));
        }
        Ok(self.root.join(format!("{}.json", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn agent(id: Uuid, age_secs: i64) -> AgentInfo {
        AgentInfo {
            id,
            note: String::new(),
            platform: "linux".to_string(),
            architecture: "amd64".to_string(),
            hostname: "web01".to_string(),
            username: "svc".to_string(),
            process: "/usr/bin/agent".to_string(),
            pid: 4242,
            transport: "h2".to_string(),
            last_checkin: Utc::now() - ChronoDuration::seconds(age_secs),
        }
    }

    #[test]
    fn test_agent_status_from_checkin_age() {
        let agents = MemoryAgents::new(Arc::new(MemoryJobs::new()));
        let fresh = Uuid::new_v4();
        let slow = Uuid::new_v4();
        let gone = Uuid::new_v4();
        agents.check_in(agent(fresh, 5));
        agents.check_in(agent(slow, 120));
        agents.check_in(agent(gone, 3600));

        assert_eq!(agents.status(fresh), AgentStatus::Active);
        assert_eq!(agents.status(slow), AgentStatus::Delayed);
        assert_eq!(agents.status(gone), AgentStatus::Dead);
    }

    #[test]
    fn test_task_queues_job() {
        let jobs = Arc::new(MemoryJobs::new());
        let agents = MemoryAgents::new(jobs.clone());
        let id = Uuid::new_v4();
        agents.check_in(agent(id, 1));

        let msg = agents.task(id, &["ls".to_string(), "/tmp".to_string()]);
        assert!(!msg.is_error());
        assert_eq!(jobs.pending_for(id), 1);
        assert_eq!(jobs.list_jobs(id).unwrap().len(), 1);
    }

    #[test]
    fn test_task_for_unregistered_agent_is_queued() {
        let jobs = Arc::new(MemoryJobs::new());
        let agents = MemoryAgents::new(jobs.clone());
        let id = Uuid::new_v4();
        let msg = agents.task(id, &["ls".to_string()]);
        assert!(!msg.is_error());
        assert_eq!(jobs.pending_for(id), 1);
    }

    #[test]
    fn test_task_broadcast_accepted_without_registration() {
        let jobs = Arc::new(MemoryJobs::new());
        let agents = MemoryAgents::new(jobs.clone());
        let msg = agents.task(BROADCAST_AGENT_ID, &["ps".to_string()]);
        assert!(!msg.is_error());
        assert_eq!(jobs.pending_for(BROADCAST_AGENT_ID), 1);
    }

    #[test]
    fn test_listener_lifecycle() {
        let listeners = MemoryListeners::new();
        let mut options = listeners.default_options("https");
        options.insert("Name".to_string(), "edge".to_string());

        let (id, msg) = listeners.create(&options).unwrap();
        assert!(msg.text().contains("edge"));
        assert_eq!(listeners.status(id).text(), "Created");

        assert!(!listeners.start("edge").is_error());
        assert_eq!(listeners.status(id).text(), "Running");

        assert!(!listeners.stop("edge").is_error());
        assert_eq!(listeners.status(id).text(), "Stopped");

        assert_eq!(listeners.by_name("edge").unwrap(), id);
        assert_eq!(listeners.names(), vec!["edge"]);

        assert!(!listeners.remove("edge").is_error());
        assert!(listeners.exists("edge").is_error());
    }

    #[test]
    fn test_listener_create_rejects_duplicate_name() {
        let listeners = MemoryListeners::new();
        let options = listeners.default_options("http");
        listeners.create(&options).unwrap();
        assert!(listeners.create(&options).is_err());
    }

    #[test]
    fn test_listener_set_option() {
        let listeners = MemoryListeners::new();
        let (id, _) = listeners.create(&listeners.default_options("http")).unwrap();

        let args: Vec<String> = ["set", "port", "8080"].iter().map(|s| s.to_string()).collect();
        let msg = listeners.set_option(id, &args);
        assert_eq!(msg.text(), "set Port to: 8080");
        assert_eq!(listeners.configured_options(id).unwrap()["Port"], "8080");

        let bad: Vec<String> = ["set", "nope", "1"].iter().map(|s| s.to_string()).collect();
        assert!(listeners.set_option(id, &bad).is_error());
    }

    #[test]
    fn test_unassigned_jobs_cleared() {
        let jobs = MemoryJobs::new();
        assert_eq!(jobs.list_unassigned(), "There are no unassigned jobs");
        jobs.enqueue(Uuid::new_v4(), &["pwd".to_string()]).unwrap();
        assert!(jobs.list_unassigned().contains("pwd"));
        jobs.clear_unassigned();
        assert_eq!(jobs.list_unassigned(), "There are no unassigned jobs");
    }

    #[test]
    fn test_module_directory_loads_and_runs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("linux")).unwrap();
        fs::write(
            dir.path().join("linux/whoami.json"),
            r#"{
                "name": "whoami",
                "description": "Print the current user",
                "options": { "Agent": "", "Flags": "" },
                "commands": ["whoami {{Flags}}"]
            }"#,
        )
        .unwrap();

        let jobs = Arc::new(MemoryJobs::new());
        let modules = ModuleDirectory::new(dir.path(), jobs.clone());
        assert_eq!(modules.names(), vec!["linux/whoami"]);

        let mut module = modules.load(&modules.path_for("linux/whoami").unwrap()).unwrap();
        assert_eq!(module.name, "whoami");

        let unset = modules.run(&module);
        assert!(unset[0].is_error());

        let target = Uuid::new_v4();
        module.set_agent(&target.to_string()).unwrap();
        let results = modules.run(&module);
        assert_eq!(results.len(), 1);
        assert!(!results[0].is_error());
        assert_eq!(jobs.pending_for(target), 1);
    }

    #[test]
    fn test_module_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let modules = ModuleDirectory::new(dir.path(), Arc::new(MemoryJobs::new()));
        assert!(modules.load(&modules.path_for("nope").unwrap()).is_err());
    }

    #[test]
    fn test_module_names_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let modules = ModuleDirectory::new(dir.path(), Arc::new(MemoryJobs::new()));

        for name in ["../../etc/x", "linux/../../x", "/etc/x", "", "./x"] {
            assert!(modules.path_for(name).unwrap_err().is_error(), "{}", name);
        }
        assert_eq!(
            modules.path_for("linux/whoami").unwrap(),
            dir.path().join("linux/whoami.json")
        );
    }

    #[test]
    fn test_first_check_in_is_announced_once() {
        use crate::bus::ClientId;
        use std::time::Duration;

        let bus = MessageBus::new(8, Duration::from_millis(20));
        bus.register(ClientId::new()).unwrap();
        let agents = MemoryAgents::new(Arc::new(MemoryJobs::new())).with_events(bus.clone());

        let id = Uuid::new_v4();
        agents.check_in(agent(id, 0));
        agents.check_in(agent(id, 0));

        // Capacity 8 leaves room for 7 more; a second announcement would use one.
        for n in 0..7 {
            assert!(bus.publish_blocking(UserMessage::plain(n.to_string())).is_ok());
        }
        assert!(bus.publish_blocking(UserMessage::plain("full")).is_err());
    }

    #[test]
    fn test_check_in_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.json");
        let id = Uuid::new_v4();
        fs::write(
            &path,
            format!(
                r#"[{{"id": "{}", "platform": "linux", "architecture": "amd64",
                    "hostname": "db01", "username": "svc", "process": "/opt/agent",
                    "pid": 7, "transport": "https"}}]"#,
                id
            ),
        )
        .unwrap();

        let agents = MemoryAgents::new(Arc::new(MemoryJobs::new()));
        assert_eq!(agents.check_in_from_file(&path).unwrap(), 1);
        assert_eq!(agents.get(id).unwrap().hostname, "db01");
        assert_eq!(agents.status(id), AgentStatus::Active);

        assert!(agents.check_in_from_file(&dir.path().join("absent.json")).is_err());
    }
}
