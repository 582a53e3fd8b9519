use std::env;
use std::path::PathBuf;

use mux_core::{load_agents, AgentRoster, Defaults, ExternalId, Validate, ValidationLevel};
use muxd::{
    detect_delegation, Dispatcher, QueryExecutor, RunningQueryStore, SessionStore, StorageLayout,
    Supervisor,
};

const DEFAULT_EXTERNAL_ID: &str = "default";
const DEFAULT_AGENTS_CONFIG: &str = "agents.json";

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error("{0}")]
    Args(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Help(String),
    Run(RunArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RunArgs {
    prompt: String,
    external_id: String,
    agents_config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        eprintln!("promptmux startup failed: {err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), MainError> {
    let mut argv = env::args();
    let program = argv.next().unwrap_or_else(|| "promptmux".to_string());
    let command = parse_cli_args(argv.collect::<Vec<_>>(), &program)?;

    match command {
        CliCommand::Help(text) => {
            println!("{text}");
            Ok(())
        }
        CliCommand::Run(args) => {
            let output = run_invocation(&args);
            println!("{output}");
            Ok(())
        }
    }
}

fn run_invocation(args: &RunArgs) -> String {
    let defaults = Defaults::from_env();
    let roster = load_roster(args, &defaults);

    let layout = StorageLayout::from_home();
    let sessions = SessionStore::new(layout.clone(), defaults);
    let tracker = RunningQueryStore::new(layout);
    let supervisor = Supervisor::new(&roster, &sessions, &tracker);
    let dispatcher = Dispatcher {
        roster: &roster,
        sessions: &sessions,
        tracker: &tracker,
    };

    let external_id = ExternalId::new(args.external_id.clone());
    respond(&args.prompt, &external_id, &roster, &dispatcher, &supervisor)
}

/// One invocation, one string: slash commands go to the dispatcher, prompts
/// mentioning another agent are delegated one-off, everything else runs
/// against the session's current runtime/model/agent.
fn respond(
    prompt: &str,
    external_id: &ExternalId,
    roster: &AgentRoster,
    dispatcher: &Dispatcher<'_>,
    supervisor: &Supervisor<'_>,
) -> String {
    if let Some(handled) = dispatcher.dispatch(external_id, prompt, supervisor) {
        return handled;
    }

    if let Some((agent_name, cleaned)) = detect_delegation(prompt, roster) {
        if let Some(agent) = roster.get(&agent_name) {
            log::info!("auto-delegating to '{agent_name}'");
            let record = dispatcher.sessions.load(external_id);
            return supervisor.execute_detached(&record, agent, &cleaned);
        }
    }

    supervisor.run_prompt(external_id, prompt)
}

/// Loads the agent roster, degrading to an empty roster on any failure so
/// the invocation itself never aborts over configuration trouble.
fn load_roster(args: &RunArgs, defaults: &Defaults) -> AgentRoster {
    let path = args
        .agents_config
        .clone()
        .or_else(|| defaults.agents_config_override.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_AGENTS_CONFIG));

    let roster = match load_agents(&path) {
        Ok(roster) => roster,
        Err(err) => {
            log::error!("{err}; continuing with no agents");
            AgentRoster::default()
        }
    };

    for issue in roster.validate() {
        match issue.level {
            ValidationLevel::Error => log::error!("{} [{}]", issue.message, issue.code),
            ValidationLevel::Warning => log::warn!("{} [{}]", issue.message, issue.code),
        }
    }
    roster
}

fn parse_cli_args(args: Vec<String>, program: &str) -> Result<CliCommand, MainError> {
    let mut positional = Vec::new();
    for arg in &args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(CliCommand::Help(usage(program))),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.is_empty() {
        return Err(MainError::Args(format!(
            "missing required <prompt> argument\n\n{}",
            usage(program)
        )));
    }
    if positional.len() > 3 {
        return Err(MainError::Args(format!(
            "too many arguments\n\n{}",
            usage(program)
        )));
    }

    Ok(CliCommand::Run(RunArgs {
        prompt: positional[0].clone(),
        external_id: positional
            .get(1)
            .cloned()
            .unwrap_or_else(|| DEFAULT_EXTERNAL_ID.to_string()),
        agents_config: positional.get(2).map(PathBuf::from),
    }))
}

fn usage(program: &str) -> String {
    format!(
        "{program} - multiplex prompts across AI CLI runtimes\n\n\
         Usage: {program} \"<prompt>\" [external_session_id] [agents_config_path]\n\n\
         Arguments:\n\
         \x20 <prompt>               Prompt text or slash command (see /help)\n\
         \x20 [external_session_id]  Caller-supplied conversation key (default: \"default\")\n\
         \x20 [agents_config_path]   Agents JSON config (default: ./{DEFAULT_AGENTS_CONFIG},\n\
         \x20                        or $PROMPTMUX_AGENTS_CONFIG)\n\n\
         Environment:\n\
         \x20 PROMPTMUX_DEFAULT_RUNTIME  copilot|opencode|claude|gemini|codex\n\
         \x20 PROMPTMUX_DEFAULT_MODEL    Default model for new conversations\n\
         \x20 PROMPTMUX_DEFAULT_AGENT    Default agent for new conversations\n\
         \x20 PROMPTMUX_AGENTS_CONFIG    Agents config path override"
    )
}
