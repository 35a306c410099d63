//! `toolloop` - answer one query with a tool-using agent.
//!
//! ```bash
//! toolloop "What is 2+2?"
//! echo "Remember that Ada wrote the first program" | toolloop --config toolloop.toml
//! RUST_LOG=toolloop=debug toolloop -v "Open example.com"
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use toolloop::providers::OpenAiCompletions;
use toolloop::{Config, LoggingHooks, MalformedActionPolicy, ToolRouter, builder};

#[derive(Parser, Debug)]
#[command(name = "toolloop", version, about = "Tool-using agent over JSON-RPC tool servers")]
struct Cli {
    /// Query to answer. Read from stdin when omitted.
    query: Vec<String>,

    /// TOML configuration file.
    #[arg(short, long, env = "TOOLLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum reasoning steps before giving up.
    #[arg(long)]
    max_steps: Option<usize>,

    /// Base URL of the OpenAI-compatible completion server.
    #[arg(long)]
    model_url: Option<String>,

    /// Model name sent to the completion server.
    #[arg(long)]
    model: Option<String>,

    /// What to do with an undecodable action: respond or retry.
    #[arg(long)]
    malformed_action: Option<MalformedActionPolicy>,

    /// Per-call tool server timeout in seconds.
    #[arg(long, value_name = "SECS")]
    rpc_timeout: Option<u64>,

    /// Log loop progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(max_steps) = self.max_steps {
            config.agent.max_steps = max_steps;
        }
        if let Some(url) = &self.model_url {
            config.model.base_url.clone_from(url);
        }
        if let Some(model) = &self.model {
            config.model.model.clone_from(model);
        }
        if let Some(policy) = self.malformed_action {
            config.agent.malformed_action = policy;
        }
        if let Some(secs) = self.rpc_timeout {
            config.agent.rpc_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "toolloop=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config =
        Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    let registry = config.validate().context("invalid configuration")?;

    let query = read_query(&cli.query).await?;

    let backend = OpenAiCompletions::with_base_url(
        config.model.model.clone(),
        config.model.base_url.clone(),
        Duration::from_secs(config.model.timeout_secs),
    )?
    .with_api_key(config.model.api_key());

    let agent = builder()
        .backend(backend)
        .hooks(LoggingHooks)
        .router(ToolRouter::new(config.router.clone()))
        .registry(registry)
        .settings(config.agent.clone())
        .build()?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let response = agent.run_with_cancel(&query, &cancel).await?;
    if response.hit_step_limit() {
        eprintln!(
            "note: stopped after {} steps without a final answer; showing the last completion",
            response.steps
        );
    }
    println!("{}", response.text);
    Ok(())
}

async fn read_query(args: &[String]) -> Result<String> {
    let query = if args.is_empty() {
        if std::io::stdin().is_terminal() {
            bail!("no query given; pass it as arguments or on stdin");
        }
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read query from stdin")?;
        input
    } else {
        args.join(" ")
    };

    let query = query.trim();
    if query.is_empty() {
        bail!("query is empty");
    }
    Ok(query.to_string())
}
