mod config_commands;
mod pre_checkin;
mod project_commands;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    realay_common::{Localizer, NoopLocalizer, TracingLogger},
    realay_config::{LocalizeMode, RealayConfig},
    realay_projects::{SyncContext, UserPathLocalizer},
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "realay", about = "Realay: checkout/checkin for shared project folders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to `debug` when
    /// the config sets `debug = true`, `warn` otherwise.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, env = "REALAY_CONFIG")]
    config: Option<PathBuf>,

    /// Identity to check out / check in as (overrides config value).
    #[arg(long, global = true, env = "REALAY_USER")]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects and candidate directories in the shared location.
    List,
    /// Turn a candidate directory into a project.
    Create {
        /// Directory name under the shared location.
        name: String,
    },
    /// Take the lock and replace the local working copy.
    Checkout {
        name: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Publish the local working copy and release the lock.
    Checkin {
        name: String,
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Append a note to a project.
    Note { name: String, text: String },
    /// Show a project's metadata.
    Show {
        name: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and report problems.
    Doctor {
        /// Show informational diagnostics too.
        #[arg(long)]
        verbose: bool,
    },
}

/// Initialise tracing. `RUST_LOG` wins over the flag and the config.
fn init_telemetry(cli: &Cli, config: &RealayConfig) {
    let default_level = if config.debug { "debug" } else { "warn" };
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_level.to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RealayConfig> {
    let mut config = match &cli.config {
        Some(path) => realay_config::load_config(path)?,
        None => realay_config::discover_and_load(),
    };
    if let Some(user) = &cli.user {
        config.user = Some(user.clone());
    }
    Ok(config)
}

fn localizer_for(mode: LocalizeMode) -> Arc<dyn Localizer> {
    match mode {
        LocalizeMode::None => Arc::new(NoopLocalizer),
        LocalizeMode::UserPaths => Arc::new(UserPathLocalizer::new()),
    }
}

/// Everything a project command needs, resolved from config once.
pub(crate) struct Session {
    pub config: RealayConfig,
    pub ctx: SyncContext,
}

impl Session {
    fn new(config: RealayConfig) -> Self {
        let ctx = SyncContext::default()
            .with_logger(Arc::new(TracingLogger))
            .with_localizer(localizer_for(config.hooks.localize))
            .with_project_extension(config.project_extension.clone())
            .with_skip_hidden(config.skip_hidden);
        debug!(?ctx, "built sync context");
        Self { config, ctx }
    }

    pub fn remote_root(&self) -> anyhow::Result<&Path> {
        self.config
            .remote_root
            .as_deref()
            .context("remote_root is not configured (run `realay doctor`)")
    }

    pub fn local_path(&self, project: &str) -> anyhow::Result<PathBuf> {
        self.config
            .local_path_for(project)
            .context("local_root is not configured (run `realay doctor`)")
    }

    pub fn user(&self) -> anyhow::Result<String> {
        self.config
            .resolved_user()
            .context("no user configured; set `user` or pass --user")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_telemetry(&cli, &config);

    info!(version = env!("CARGO_PKG_VERSION"), "realay starting");

    let session = Session::new(config);
    match cli.command {
        Commands::List => project_commands::list(&session),
        Commands::Create { name } => project_commands::create(&session, &name),
        Commands::Checkout { name, yes } => project_commands::checkout(&session, &name, yes),
        Commands::Checkin { name, yes } => project_commands::checkin(&session, &name, yes),
        Commands::Note { name, text } => project_commands::note(&session, &name, &text),
        Commands::Show { name, json } => project_commands::show(&session, &name, json),
        Commands::Doctor { verbose } => {
            config_commands::doctor(&session.config, cli.config.as_deref(), verbose)
        },
    }
}
