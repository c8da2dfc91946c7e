mod demo;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{CommandFactory, Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchyard_core::config::AppConfig;
use switchyard_core::context::Context;
use switchyard_core::event::{EventBus, EventSink, NullSink};
use switchyard_core::types::value_text;
use switchyard_engine::{Plan, PlanLoader, RunLogger, Runner, StepRegistry};

#[derive(Parser)]
#[command(name = "switchyard", version, about = "Route conversational input through a plan of steps")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "switchyard.toml")]
    config: PathBuf,

    /// Plan file to use instead of the configured one (.json or .toml)
    #[arg(short, long)]
    plan: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat,
    /// Run a single input through the plan and exit
    Run {
        /// The input text (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        input: Vec<String>,
        /// Print the execution records as JSON
        #[arg(long)]
        trace: bool,
    },
    /// Print the loaded plan in normalized form
    Show,
    /// Load the plan and report whether it is valid
    Validate,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Where run events go for the lifetime of the process.
struct Events {
    bus: Option<EventBus>,
    cancel: CancellationToken,
    logger: Option<JoinHandle<()>>,
}

impl Events {
    fn start(config: &AppConfig, base: &Path) -> Self {
        let cancel = CancellationToken::new();
        if !config.log.enabled {
            return Self {
                bus: None,
                cancel,
                logger: None,
            };
        }

        let bus = EventBus::default();
        let logger = RunLogger::new(&config.log_dir(base), &bus);
        info!(path = %logger.log_path().display(), "Writing run log");
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = logger.run(token).await {
                warn!(error = %e, "Run logger stopped");
            }
        });

        Self {
            bus: Some(bus),
            cancel,
            logger: Some(handle),
        }
    }

    fn sink(&self) -> &dyn EventSink {
        match self.bus {
            Some(ref bus) => bus as &dyn EventSink,
            None => &NullSink,
        }
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        if let Some(handle) = self.logger {
            handle.await.ok();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("switchyard=info,warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    // Completions need neither config nor plan
    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "switchyard", &mut io::stdout());
        return Ok(());
    }

    // Load config
    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
        AppConfig::default()
    };
    let base = cli
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let registry = demo::registry();
    let plan = load_plan(cli.plan.as_deref(), &config, &base, &registry)?;

    if let Commands::Run { input, trace } = command {
        let mut text = input.join(" ");
        if text.is_empty() {
            // Read from stdin
            text = io::stdin()
                .lock()
                .lines()
                .map_while(|l| l.ok())
                .collect::<Vec<_>>()
                .join("\n");
        }

        let events = Events::start(&config, &base);
        let mut ctx = Context::new(text)?.with_cancellation(events.cancel.clone());
        let result = Runner::new().execute(&mut ctx, &plan, events.sink()).await;

        if trace {
            println!("{}", serde_json::to_string_pretty(ctx.records())?);
        }
        events.shutdown().await;
        result?;

        if let Some(output) = ctx.output() {
            println!("{}", value_text(output));
        }
    } else if let Commands::Show = command {
        println!("{}", plan.to_json()?);
    } else if let Commands::Validate = command {
        println!(
            "Plan OK: {} nodes, root {}",
            plan.node_count(),
            plan.root().key()
        );
    } else {
        let events = Events::start(&config, &base);
        let result = run_chat(&plan, &config, &events).await;
        events.shutdown().await;
        result?;
    }

    Ok(())
}

fn load_plan(
    plan: Option<&Path>,
    config: &AppConfig,
    base: &Path,
    registry: &StepRegistry,
) -> anyhow::Result<Plan> {
    let path = plan.map(Path::to_path_buf).or_else(|| config.plan_path(base));
    match path {
        Some(path) => PlanLoader::from_path(&path, registry)
            .with_context(|| format!("failed to load plan from {}", path.display())),
        None => Ok(PlanLoader::from_json(demo::DEFAULT_PLAN_JSON, registry)?),
    }
}

/// Interactive loop: every line is one run, and each turn carries the
/// conversation so far. A blank line or EOF ends the chat.
async fn run_chat(plan: &Plan, config: &AppConfig, events: &Events) -> anyhow::Result<()> {
    println!("Switchyard v{}", env!("CARGO_PKG_VERSION"));
    println!("Type /quit to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let runner = Runner::new();
    let mut previous: Option<Context> = None;

    loop {
        print!("{}", config.chat.prompt);
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break; // EOF
        }

        let input = input.trim();
        if input.is_empty() || matches!(input, "/quit" | "/exit" | "/q") {
            break;
        }

        let mut ctx = match previous {
            Some(ref prev) => prev.next_turn(input, config.chat.history_limit)?,
            None => Context::new(input)?.with_cancellation(events.cancel.clone()),
        };

        match runner.execute(&mut ctx, plan, events.sink()).await {
            Ok(()) => {
                let reply = ctx.output().map(value_text).unwrap_or_default();
                println!("Assistant > {}", reply);
            }
            Err(e) => eprintln!("Error: {}", e),
        }

        previous = Some(ctx);
    }

    Ok(())
}
