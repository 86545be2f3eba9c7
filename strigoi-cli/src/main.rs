//! # Strigoi CLI
//!
//! Builds one agent from the configuration, registers it, and sends a single
//! user message through its LLM.
//!
//! Usage:
//!   strigoi <prompt>
//!   strigoi ask [--config FILE] [--name NAME] [--id ID] <prompt>
//!   strigoi config [--config FILE]
//!
//! Without `--config`, the model and key come from `STRIGOI_LLM` and
//! `STRIGOI_LLM_API_KEY`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strigoi_agents::{AgentConfig, AgentState, BaseAgent};
use strigoi_llm::config::{ENV_API_KEY, ENV_API_KEY_FALLBACK};
use strigoi_llm::{ChatMessage, Error, LlmConfig, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "strigoi")]
#[command(author, version, about = "Strigoi - LLM-backed agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Prompt to send (when not using subcommands)
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,

    /// TOML file with an [llm] table
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the reply as JSON with usage figures
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent one question
    Ask {
        /// Agent name used in the identity preamble
        #[arg(short, long, default_value = "Strigoi")]
        name: String,

        /// Agent id (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// Show the resolved LLM configuration
    Config,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<LlmConfig> {
    let Some(path) = path else {
        return LlmConfig::from_env();
    };

    let config = LlmConfig::load(path)?;
    if !config.api_key().is_empty() {
        return Ok(config);
    }

    // keys usually live in the environment rather than the file
    let env_key = [ENV_API_KEY, ENV_API_KEY_FALLBACK]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
    Ok(match env_key {
        Some(key) => config.with_api_key(key),
        None => config,
    })
}

async fn ask(config: LlmConfig, name: &str, id: Option<String>, prompt: &str, json: bool) -> Result<()> {
    let state = match id {
        Some(id) => AgentState::new(id, name),
        None => AgentState::generated(name),
    };

    let agent = BaseAgent::new(AgentConfig::new(config, state))?;
    let llm = agent.llm()?;

    tracing::info!(agent_id = agent.agent_id(), model = llm.config().model(), "asking agent");

    let reply = llm.generate(&[ChatMessage::user(prompt)]).await?;
    let usage = llm.usage_stats();

    if json {
        let out = serde_json::json!({
            "agent_id": agent.agent_id(),
            "agent_name": agent.agent_name(),
            "model": reply.model,
            "content": reply.content,
            "usage": usage,
        });
        let rendered = serde_json::to_string_pretty(&out).map_err(|e| {
            Error::unexpected(format!("failed to render reply: {}", e)).set_source(e)
        })?;
        println!("{}", rendered);
    } else {
        println!("{}", reply.content);
        eprintln!(
            "\n[{}] {} input / {} output tokens",
            agent.agent_name(),
            usage.input_tokens,
            usage.output_tokens
        );
    }

    Ok(())
}

fn show_config(config: &LlmConfig) {
    println!("model:    {}", config.model());
    println!("api_key:  {}", config.masked_api_key());
    println!("timeout:  {}s", config.timeout().as_secs());
    if let Some(base_url) = config.base_url() {
        println!("base_url: {}", base_url);
    }
    for (key, value) in config.extra() {
        println!("param:    {} = {}", key, value);
    }
}

fn exit_with(err: Error) -> ! {
    tracing::debug!(error = ?err, "command failed");
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

/// What the parsed command line asks for
#[derive(Debug, PartialEq)]
enum Action {
    ShowConfig,
    Ask {
        name: String,
        id: Option<String>,
        prompt: String,
    },
}

/// Resolve the command line without touching configuration.
///
/// Returns `None` when no prompt was given.
fn resolve_action(command: Option<Commands>, prompt: Vec<String>) -> Option<Action> {
    match command {
        Some(Commands::Config) => Some(Action::ShowConfig),
        Some(Commands::Ask { name, id, prompt }) => Some(Action::Ask {
            name,
            id,
            prompt: prompt.join(" "),
        }),
        None if prompt.is_empty() => None,
        None => Some(Action::Ask {
            name: "Strigoi".to_string(),
            id: None,
            prompt: prompt.join(" "),
        }),
    }
}

fn print_usage() {
    eprintln!("Error: No prompt provided.");
    eprintln!("Usage: strigoi [OPTIONS] <PROMPT>...");
    eprintln!("       strigoi ask --name Scout <PROMPT>...");
    eprintln!("       strigoi config");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(action) = resolve_action(cli.command, cli.prompt) else {
        print_usage();
        std::process::exit(1);
    };

    let config = load_config(cli.config.as_ref()).unwrap_or_else(|e| exit_with(e));

    match action {
        Action::ShowConfig => show_config(&config),
        Action::Ask { name, id, prompt } => {
            if let Err(e) = ask(config, &name, id, &prompt, cli.json).await {
                exit_with(e);
            }
        }
    }
}
