// Per-menu help tables

use super::context::MenuContext;
use super::table::Table;

/// One row of a help table
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Command name (e.g., "interact")
    pub name: &'static str,

    /// Human-readable description
    pub description: &'static str,

    /// Sub-commands, parameter syntax, or an example
    pub options: &'static str,
}

const fn spec(name: &'static str, description: &'static str, options: &'static str) -> CommandSpec {
    CommandSpec {
        name,
        description,
        options,
    }
}

const MAIN: &[CommandSpec] = &[
    spec("agent", "Interact with agents or list agents", "interact, list, remove"),
    spec("banner", "Print the banner", ""),
    spec("clearqueue", "Clear all jobs that have not been sent to an agent", "-y"),
    spec("interact", "Interact with an agent", "interact <agent_id>"),
    spec("listeners", "Move to the listeners menu", ""),
    spec("listqueue", "List all jobs that have not been sent to an agent", ""),
    spec("queue", "Queue a job for an agent that may not be registered yet", "queue <agent_id|all> ipconfig"),
    spec("quit", "Exit and close the console", "-y"),
    spec("remove", "Remove a DEAD agent from the server", "remove <agent_id>"),
    spec("sessions", "List all agents session information", ""),
    spec("set", "Toggle console output", "verbose|debug true|false"),
    spec("use", "Use a function of the console", "module <name>"),
    spec("version", "Print the console version", ""),
];

const MODULE: &[CommandSpec] = &[
    spec("back", "Return to the main menu", ""),
    spec("info", "Show information about a module", ""),
    spec("main", "Return to the main menu", ""),
    spec("reload", "Reload the module to a fresh clean state", ""),
    spec("run", "Run or execute the module", ""),
    spec("set", "Set the value for one of the module's options", "<option name> <option value>"),
    spec("show", "Show information about a module or its options", "info, options"),
    spec("unset", "Clear a module option to empty", "<option name>"),
];

const AGENT: &[CommandSpec] = &[
    spec("back", "Return to the main menu", ""),
    spec("batchcommands", "Tell an agent to run all queued jobs on checkin", ""),
    spec("cd", "Change directories", "cd ../../ OR cd c:\\\\Users"),
    spec("clear", "Clear all queued commands", "-y"),
    spec("download", "Download a file from the agent", "download <remote_file>"),
    spec("exec", "Execute a command on the agent", "exec ping -c 3 8.8.8.8"),
    spec("exit", "Instruct the agent to die or quit", "-y"),
    spec("help", "Display this message", ""),
    spec("inactivemultiplier", "Multiply sleep values by this number each time threshold is reached", "inactivemultiplier 10"),
    spec("inactivethreshold", "Go inactive if operator is idle for this many check ins", "inactivethreshold 3"),
    spec("info", "Display all information about the agent", ""),
    spec("interact", "Interact with an agent", "interact <agent_id>"),
    spec("ipconfig", "Display network adapter(s) information", ""),
    spec("ja3", "Change agent's TLS fingerprint", "ja3 <string>"),
    spec("jobs", "List queued commands", ""),
    spec("kill", "Kill a process", "kill <pid>"),
    spec("killdate", "Set agent's killdate (UNIX epoch timestamp)", "killdate 1609480800"),
    spec("ls", "List directory contents", "ls /etc OR ls C:\\\\Users"),
    spec("main", "Return to the main menu", ""),
    spec("maxretry", "Set number of failed check in attempts before the agent exits", "maxretry 30"),
    spec("note", "Set a custom note for this agent", "note Help This callback dead"),
    spec("padding", "Set maximum number of random bytes to pad messages", "padding 4096"),
    spec("ps", "Display running processes", ""),
    spec("pwd", "Display the current working directory", ""),
    spec("quit", "Exit and close the console", "-y"),
    spec("sessions", "List all agents session information", ""),
    spec("sdelete", "Secure delete a file", "sdelete C:\\\\agent.exe"),
    spec("shinject", "Execute shellcode", "self, remote <pid>, RtlCreateUserThread <pid>"),
    spec("sleep", "<min> <max> (in seconds)", "sleep 15 30"),
    spec("status", "Print the current status of the agent", ""),
    spec("touch", "<source> <destination>", "touch C:\\\\old.txt C:\\\\agent.exe"),
    spec("upload", "Upload a file to the agent", "upload <local_file> <remote_file>"),
    spec("winexec", "Execute a program using Windows API calls", "winexec [-ppid 500] ping -c 3 8.8.8.8"),
];

const LISTENERS_MAIN: &[CommandSpec] = &[
    spec("back", "Return to the main menu", ""),
    spec("delete", "Delete a named listener", "delete <listener_name>"),
    spec("info", "Display all information about a listener", "info <listener_name>"),
    spec("interact", "Interact with a named listener to modify it", "interact <listener_name>"),
    spec("list", "List all created listeners", ""),
    spec("main", "Return to the main menu", ""),
    spec("start", "Start a named listener", "start <listener_name>"),
    spec("stop", "Stop a named listener", "stop <listener_name>"),
    spec("use", "Create a new listener by protocol type", "use [http,https,http2,http3,h2c]"),
];

const LISTENER_SETUP: &[CommandSpec] = &[
    spec("back", "Return to the listeners menu", ""),
    spec("execute", "Create and start the listener (alias)", ""),
    spec("info", "Display all configurable information about a listener", ""),
    spec("main", "Return to the main menu", ""),
    spec("run", "Create and start the listener (alias)", ""),
    spec("set", "Set a configurable option", "set <option_name> <value>"),
    spec("show", "Display all configurable information about a listener", ""),
    spec("start", "Create and start the listener", ""),
    spec("stop", "Stop the listener", ""),
];

const LISTENER: &[CommandSpec] = &[
    spec("back", "Return to the listeners menu", ""),
    spec("delete", "Delete this listener", "-y"),
    spec("info", "Display all configurable information the current listener", ""),
    spec("main", "Return to the main menu", ""),
    spec("restart", "Restart this listener", ""),
    spec("set", "Set a configurable option", "set <option_name> <value>"),
    spec("show", "Display all configurable information about a listener", ""),
    spec("start", "Start this listener", ""),
    spec("status", "Get the server's current status", ""),
    spec("stop", "Stop the listener", ""),
];

/// Command reference for a menu
pub fn commands_for(context: MenuContext) -> &'static [CommandSpec] {
    match context {
        MenuContext::Main => MAIN,
        MenuContext::Module => MODULE,
        MenuContext::Agent => AGENT,
        MenuContext::ListenersMain => LISTENERS_MAIN,
        MenuContext::ListenerSetup => LISTENER_SETUP,
        MenuContext::Listener => LISTENER,
    }
}

fn caption(context: MenuContext) -> &'static str {
    match context {
        MenuContext::Main => "Main Menu Help",
        MenuContext::Module => "Module Menu Help",
        MenuContext::Agent => "Agent Help Menu",
        MenuContext::ListenersMain => "Listeners Help Menu",
        MenuContext::ListenerSetup => "Listener Setup Help Menu",
        MenuContext::Listener => "Listener Help Menu",
    }
}

/// Rendered help table for a menu
pub fn help_table(context: MenuContext) -> String {
    let header = match context {
        MenuContext::Agent => "Examples",
        _ => "Options",
    };
    let mut table = Table::new(["Command", "Description", header]).with_caption(caption(context));
    for spec in commands_for(context) {
        table.push_row([spec.name, spec.description, spec.options]);
    }
    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MenuContext; 6] = [
        MenuContext::Main,
        MenuContext::Module,
        MenuContext::Agent,
        MenuContext::ListenersMain,
        MenuContext::ListenerSetup,
        MenuContext::Listener,
    ];

    #[test]
    fn test_every_menu_has_help() {
        for context in ALL {
            let table = help_table(context);
            assert!(table.starts_with("COMMAND"));
            assert!(table.ends_with(caption(context)));
        }
    }

    #[test]
    fn test_help_lists_commands_in_order() {
        let names: Vec<&str> = commands_for(MenuContext::Main).iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
