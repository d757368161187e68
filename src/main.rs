use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use browser_adapter::{detect_chrome_executable, BrowserAdapter, ChromiumAdapter, StubAdapter};
use clap::{Args, Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;
use webflow_cli::{
    config::{default_config_path, load_config, AppConfig, PolicyKind},
    driver::{run_and_close, Policy, RandomPolicy, RunReport, ScriptedPolicy},
    metrics::spawn_metrics_server,
    output::{emit, episode_line, report_lines, OutputFormat},
};
use webflow_env::{Persona, WebFlowEnv};

/// WebFlow - drive agents through a browser login flow
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Metrics server port (set to 0 to disable)
    #[arg(long, default_value_t = 0)]
    metrics_port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run episodes against the environment
    Run(RunArgs),

    /// Show the effective configuration
    Config,

    /// Show version, build and browser information
    Info,
}

#[derive(Args)]
struct RunArgs {
    /// Number of episodes
    #[arg(short = 'n', long)]
    episodes: Option<u32>,

    /// Reward persona
    #[arg(long)]
    persona: Option<Persona>,

    /// Policy driving the environment
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,

    /// Base seed; episode i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Use the in-process simulated application instead of a browser
    #[arg(long)]
    stub: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Base URL of the target application
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    let _metrics_server = spawn_metrics_server(cli.metrics_port);

    info!("Starting WebFlow v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(cli.config.as_deref()).await?;
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args, config, cli.output).await,
        Commands::Config => cmd_config(&config, cli.output),
        Commands::Info => cmd_info(cli.output),
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn apply_run_args(config: &mut AppConfig, args: &RunArgs) {
    if let Some(episodes) = args.episodes {
        config.driver.episodes = episodes;
    }
    if let Some(persona) = args.persona {
        config.env.persona = persona;
    }
    if let Some(policy) = args.policy {
        config.driver.policy = policy;
    }
    if args.seed.is_some() {
        config.driver.seed = args.seed;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(url) = &args.base_url {
        config.env.base_url = url.to_string();
    }
}

async fn cmd_run(args: RunArgs, mut config: AppConfig, output: OutputFormat) -> Result<()> {
    apply_run_args(&mut config, &args);
    if config.driver.episodes == 0 {
        bail!("--episodes must be at least 1");
    }

    let mut policy: Box<dyn Policy> = match config.driver.policy {
        PolicyKind::Scripted => Box::new(ScriptedPolicy),
        PolicyKind::Random => Box::new(RandomPolicy::new(config.driver.seed)),
    };

    info!(
        episodes = config.driver.episodes,
        persona = %config.env.persona,
        policy = policy.name(),
        stub = args.stub,
        base_url = %config.env.base_url,
        "starting run"
    );

    let report = if args.stub {
        let adapter = StubAdapter::new(&config.env.base_url).context("Invalid base URL")?;
        let env = WebFlowEnv::new(adapter, config.env.clone()).context("Invalid environment configuration")?;
        drive(env, policy.as_mut(), &config, output).await?
    } else {
        config.env.validate().context("Invalid environment configuration")?;
        let adapter = ChromiumAdapter::launch(config.browser.clone())
            .await
            .context("Failed to launch browser")?;
        let env = WebFlowEnv::new(adapter, config.env.clone()).context("Invalid environment configuration")?;
        drive(env, policy.as_mut(), &config, output).await?
    };

    emit(&report, output, || {
        for line in report_lines(&report) {
            println!("{}", line);
        }
    })
}

/// Run the configured episodes; Ctrl-C stops the run after the current step.
async fn drive<A: BrowserAdapter>(
    mut env: WebFlowEnv<A>,
    policy: &mut dyn Policy,
    config: &AppConfig,
    output: OutputFormat,
) -> Result<RunReport> {
    let cancel = CancellationToken::new();
    let listener = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("shutdown signal received; stopping after the current step");
                cancel.cancel();
            }
        })
    };

    let result = run_and_close(
        &mut env,
        policy,
        config.driver.episodes,
        config.driver.seed,
        &cancel,
        |summary| {
            if output == OutputFormat::Human {
                println!("{}", episode_line(summary));
            }
        },
    )
    .await;

    listener.abort();
    result
}

fn cmd_config(config: &AppConfig, output: OutputFormat) -> Result<()> {
    let human = match output {
        OutputFormat::Human => serde_yaml::to_string(config)?,
        _ => String::new(),
    };
    emit(config, output, || print!("{}", human))
}

fn cmd_info(output: OutputFormat) -> Result<()> {
    let chrome = detect_chrome_executable().map(|p| p.display().to_string());
    let config_path = default_config_path().map(|p| p.display().to_string());
    let info = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "build_date": env!("WEBFLOW_BUILD_DATE"),
        "git_hash": env!("WEBFLOW_GIT_HASH"),
        "chrome_executable": chrome,
        "config_path": config_path,
    });
    emit(&info, output, || {
        println!("WebFlow v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "  built {} ({})",
            env!("WEBFLOW_BUILD_DATE"),
            env!("WEBFLOW_GIT_HASH")
        );
        println!(
            "  browser: {}",
            chrome.as_deref().unwrap_or("not found (set WEBFLOW_CHROME)")
        );
        println!(
            "  config: {}",
            config_path.as_deref().unwrap_or("no config directory")
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "webflow",
            "run",
            "--episodes",
            "3",
            "--persona",
            "explorer",
            "--policy",
            "random",
            "--seed",
            "9",
            "--headed",
            "--base-url",
            "http://localhost:8000",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = AppConfig::default();
        apply_run_args(&mut config, &args);
        assert_eq!(config.driver.episodes, 3);
        assert_eq!(config.env.persona, Persona::Explorer);
        assert_eq!(config.driver.policy, PolicyKind::Random);
        assert_eq!(config.driver.seed, Some(9));
        assert!(!config.browser.headless);
        assert_eq!(config.env.base_url, "http://localhost:8000/");
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["webflow", "run", "--policy", "greedy"]).is_err());
    }
}
