// Loaded module definition and its editable options

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::OptionMap;
use crate::config::constants::BROADCAST_AGENT_ID;
use crate::errors::ModuleError;

/// Name of the option holding the target agent
const AGENT_OPTION: &str = "Agent";

/// A module selected with `use module <name>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,

    /// Definition file this module was loaded from
    #[serde(default)]
    pub path: PathBuf,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub platform: String,

    #[serde(default)]
    pub options: OptionMap,

    /// Command templates; `{{Name}}` expands to the value of option `Name`.
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Module {
    /// Declared option names, in display order
    pub fn option_names(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    /// Set a declared option; the value is the remaining words joined by spaces.
    pub fn set_option(&mut self, name: &str, values: &[String]) -> Result<String, ModuleError> {
        if values.is_empty() {
            return Err(ModuleError::MissingValue(name.to_string()));
        }
        let key = self.resolve_option(name)?;
        let value = values.join(" ");
        self.options.insert(key.clone(), value.clone());
        Ok(format!("{} set to {}", key, value))
    }

    /// Reset a declared option to empty.
    pub fn unset_option(&mut self, name: &str) -> Result<String, ModuleError> {
        let key = self.resolve_option(name)?;
        self.options.insert(key.clone(), String::new());
        Ok(format!("{} set to ", key))
    }

    /// Point the module at an agent id, or at every agent with `all`.
    pub fn set_agent(&mut self, value: &str) -> Result<String, ModuleError> {
        let id = if value.eq_ignore_ascii_case("all") {
            BROADCAST_AGENT_ID
        } else {
            Uuid::parse_str(value).map_err(|_| ModuleError::InvalidAgent(value.to_string()))?
        };
        self.options.insert(AGENT_OPTION.to_string(), id.to_string());
        Ok(format!("{} set to {}", AGENT_OPTION, id))
    }

    /// Summary rows for `info`
    pub fn info_rows(&self) -> Vec<(String, String)> {
        vec![
            ("Name".to_string(), self.name.clone()),
            ("Platform".to_string(), self.platform.clone()),
            ("Authors".to_string(), self.authors.join(", ")),
            ("Path".to_string(), self.path.display().to_string()),
            ("Description".to_string(), self.description.clone()),
        ]
    }

    /// Command templates with every option placeholder filled in.
    pub fn render_commands(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|template| {
                self.options.iter().fold(template.clone(), |acc, (name, value)| {
                    acc.replace(&format!("{{{{{}}}}}", name), value)
                })
            })
            .collect()
    }

    /// Target agent, if one has been set
    pub fn agent(&self) -> Option<Uuid> {
        self.options
            .get(AGENT_OPTION)
            .and_then(|value| Uuid::parse_str(value).ok())
    }

    fn resolve_option(&self, name: &str) -> Result<String, ModuleError> {
        self.options
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| ModuleError::UnknownOption(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> Module {
        let mut options = OptionMap::new();
        options.insert("Agent".to_string(), String::new());
        options.insert("Command".to_string(), "whoami".to_string());
        Module {
            name: "runner".to_string(),
            path: PathBuf::from("data/modules/runner.json"),
            description: "Runs a command".to_string(),
            authors: vec!["ops".to_string()],
            platform: "linux".to_string(),
            options,
            commands: vec!["sh -c {{Command}}".to_string()],
        }
    }

    #[test]
    fn test_set_option_joins_values() {
        let mut m = module();
        let words = vec!["id".to_string(), "-a".to_string()];
        assert_eq!(m.set_option("command", &words).unwrap(), "Command set to id -a");
        assert_eq!(m.options["Command"], "id -a");
    }

    #[test]
    fn test_set_unknown_option_leaves_map_unchanged() {
        let mut m = module();
        let before = m.options.clone();
        let err = m.set_option("Bogus", &["x".to_string()]).unwrap_err();
        assert_eq!(err, ModuleError::UnknownOption("Bogus".to_string()));
        assert_eq!(m.options, before);
    }

    #[test]
    fn test_unset_option() {
        let mut m = module();
        m.unset_option("Command").unwrap();
        assert_eq!(m.options["Command"], "");
    }

    #[test]
    fn test_set_agent_all_uses_broadcast_id() {
        let mut m = module();
        m.set_agent("all").unwrap();
        assert_eq!(m.options["Agent"], "ffffffff-ffff-ffff-ffff-ffffffffffff");
    }

    #[test]
    fn test_render_commands_fills_placeholders() {
        let mut m = module();
        m.set_option("Command", &["uname".to_string(), "-a".to_string()])
            .unwrap();
        assert_eq!(m.render_commands(), vec!["sh -c uname -a"]);
    }

    #[test]
    fn test_agent_unset_until_assigned() {
        let mut m = module();
        assert_eq!(m.agent(), None);
        m.set_agent("all").unwrap();
        assert_eq!(m.agent(), Some(BROADCAST_AGENT_ID));
    }

    #[test]
    fn test_set_agent_rejects_garbage() {
        let mut m = module();
        assert!(matches!(
            m.set_agent("not-a-uuid"),
            Err(ModuleError::InvalidAgent(_))
        ));
    }
}
