//! `deep-research` - draft a research plan, confirm it, compile the report

mod console;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use research_core::{
    HumanChannel, ResearchConfig, ResearchWorkflow, StructuredGenerator, TextGenerator,
};
use research_openai::{OpenAiBackend, OpenAiConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleChannel;

fn cli() -> Command {
    Command::new("deep-research")
        .version(research_core::VERSION)
        .about("Plan, confirm and compile deep web research")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("What to research; asked interactively when omitted"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("Path to a TOML configuration file"),
        )
        .arg(
            Arg::new("max-revisions")
                .long("max-revisions")
                .value_parser(value_parser!(usize))
                .help("Maximum revision rounds before giving up"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_parser(value_parser!(u64).range(1..))
                .help("Abort if any single wait exceeds this many seconds"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Model for drafting and revising the plan"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("OpenAI-compatible API base URL"),
        )
}

fn load_config(args: &ArgMatches) -> Result<ResearchConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => ResearchConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ResearchConfig::default(),
    };

    if let Some(max) = args.get_one::<usize>("max-revisions") {
        config = config.with_max_revisions(*max);
    }
    if let Some(secs) = args.get_one::<u64>("timeout-secs") {
        config = config.with_suspension_timeout(Some(Duration::from_secs(*secs)));
    }
    if let Some(model) = args.get_one::<String>("model") {
        config.backend.model.clone_from(model);
    }
    if let Some(url) = args.get_one::<String>("base-url") {
        config.backend.base_url.clone_from(url);
    }
    Ok(config)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = cli().get_matches();
    let config = load_config(&args)?;

    let openai = OpenAiConfig::from_settings(&config.backend).map_err(anyhow::Error::msg)?;
    let backend = Arc::new(OpenAiBackend::new(openai));
    let console = ConsoleChannel::stdio().context("failed to start terminal input")?;
    let channel: Arc<dyn HumanChannel> = Arc::new(console);

    let input = match args.get_one::<String>("input") {
        Some(input) => input.clone(),
        None => channel
            .ask_free_text("What would you like to research?")
            .await
            .context("no research request given")?,
    };

    let workflow = ResearchWorkflow::new(
        &config,
        Arc::clone(&backend) as Arc<dyn StructuredGenerator>,
        backend as Arc<dyn TextGenerator>,
        Arc::clone(&channel),
    );

    let token = workflow.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });

    let report = workflow.run(&input).await?;
    println!("{report}");
    Ok(())
}
