use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nexaflow_services::{HttpTransport, RuntimeMode, Services, ServicesConfig};
use serde::Serialize;
use shared::{Channel, NotificationPayload, Priority, ProjectSnapshot, ProjectStatus, Severity};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod check;
mod commands;
mod config;

use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "nexaflow")]
#[command(about = "NexaFlow integrations from the command line")]
#[command(version)]
struct Cli {
    /// Server URL (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Simulate every provider
    #[arg(long, global = true, conflicts_with = "live")]
    demo: bool,

    /// Call the server's provider routes
    #[arg(long, global = true)]
    live: bool,

    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the local environment is ready to run NexaFlow
    Check,
    /// Send a notification on one or more channels
    Notify(NotifyArgs),
    /// Generate an AI status report for a project
    Report(ProjectArgs),
    /// Generate a one-line AI insight for a project
    Insight(ProjectArgs),
    /// Import a file from a cloud provider or URL
    Import {
        #[command(subcommand)]
        source: ImportCommand,
    },
    /// Extract the approval token and intent from a reply
    ParseReply {
        /// Reply text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show the admin dashboard
    Dashboard,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct NotifyArgs {
    /// Recipient user id (random if omitted)
    #[arg(long)]
    user_id: Option<Uuid>,
    /// Recipient email address
    #[arg(long)]
    email: Option<String>,
    /// Recipient WhatsApp number
    #[arg(long)]
    whatsapp: Option<String>,
    #[arg(long)]
    title: String,
    #[arg(long)]
    message: String,
    /// info, success, warning or error
    #[arg(long, default_value = "info")]
    severity: Severity,
    /// Channels in delivery order: in-app, email, whatsapp
    #[arg(long = "channel", value_delimiter = ',', default_value = "in-app")]
    channels: Vec<Channel>,
    #[arg(long)]
    action_url: Option<String>,
}

#[derive(Args)]
struct ProjectArgs {
    /// Project name
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "active")]
    status: ProjectStatus,
    #[arg(long, default_value = "medium")]
    priority: Priority,
    /// Percent complete
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    progress: u8,
    #[arg(long)]
    budget: Option<f64>,
    #[arg(long)]
    spent: Option<f64>,
    #[arg(long, default_value_t = 0)]
    open_tasks: u32,
    #[arg(long, default_value_t = 0)]
    overdue_tasks: u32,
    #[arg(long, default_value_t = 1)]
    team_size: u32,
    #[arg(long)]
    notes: Option<String>,
}

impl ProjectArgs {
    fn snapshot(self) -> ProjectSnapshot {
        ProjectSnapshot {
            name: self.name,
            status: self.status,
            priority: self.priority,
            progress: self.progress,
            budget: self.budget,
            spent: self.spent,
            due_date: None,
            open_tasks: self.open_tasks,
            overdue_tasks: self.overdue_tasks,
            team_size: self.team_size,
            notes: self.notes,
        }
    }
}

#[derive(Subcommand)]
enum ImportCommand {
    /// Import a Google Drive file by id
    Drive {
        file_id: String,
        /// OAuth access token
        #[arg(long)]
        token: String,
        /// Save the downloaded content here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a Dropbox file by path
    Dropbox {
        path: String,
        #[arg(long)]
        token: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download a file from a URL
    Url {
        url: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, demo_mode, import_latency_ms)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexaflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let overrides = Overrides {
        api_url: cli.api_url.clone(),
        mode: if cli.live {
            Some(RuntimeMode::Live)
        } else if cli.demo {
            Some(RuntimeMode::Demo)
        } else {
            None
        },
    };

    let json = cli.json;
    match cli.command {
        Commands::Check => {
            let root = std::env::current_dir()?;
            let report = check::run_checks(&root);
            println!("{}", report.render());
            if !report.passed() {
                std::process::exit(report.exit_code());
            }
        }
        Commands::Config { action } => handle_config_command(action)?,
        Commands::ParseReply { text } => {
            let reply = shared::parse_approval_reply(&text.join(" "));
            print_result(json, &reply, commands::render_reply)?;
        }
        Commands::Notify(args) => {
            let payload = NotificationPayload {
                user_id: args.user_id.unwrap_or_else(Uuid::new_v4),
                email: args.email,
                whatsapp: args.whatsapp,
                title: args.title,
                message: args.message,
                severity: args.severity,
                channels: args.channels,
                action_url: args.action_url,
                kind: "general".to_string(),
            };
            let result = Runtime::new(&overrides).services.notifications.dispatch(&payload).await;
            print_result(json, &result, commands::render_dispatch)?;
        }
        Commands::Report(args) => {
            let result = Runtime::new(&overrides)
                .services
                .ai
                .generate_report(&args.snapshot())
                .await;
            print_result(json, &result, commands::render_report)?;
        }
        Commands::Insight(args) => {
            let result = Runtime::new(&overrides)
                .services
                .ai
                .generate_insight(&args.snapshot())
                .await;
            print_result(json, &result, commands::render_insight)?;
        }
        Commands::Import { source } => {
            let import = Runtime::new(&overrides).services.import;
            let (result, output) = match source {
                ImportCommand::Drive {
                    file_id,
                    token,
                    output,
                } => (import.import_from_drive(&file_id, &token).await, output),
                ImportCommand::Dropbox {
                    path,
                    token,
                    output,
                } => (import.import_from_dropbox(&path, &token).await, output),
                ImportCommand::Url { url, output } => (import.import_from_url(&url).await, output),
            };
            if let Some(output) = output.filter(|_| result.success) {
                commands::save_import(&result, &output)?;
                tracing::info!("Saved to {}", output.display());
            }
            print_result(json, &result, commands::render_import)?;
        }
        Commands::Dashboard => {
            let runtime = Runtime::new(&overrides);
            let dashboard = commands::dashboard(&runtime.config, &runtime.transport).await?;
            print_result(json, &dashboard, commands::render_dashboard)?;
        }
    }

    Ok(())
}

/// Services built from the config file and command-line overrides.
struct Runtime {
    config: ServicesConfig,
    transport: HttpTransport,
    services: Services,
}

impl Runtime {
    fn new(overrides: &Overrides) -> Self {
        let file = Config::load().unwrap_or_default();
        let config = file.services_config(overrides);
        tracing::debug!("Using {:?} mode against {}", config.mode, config.api_base_url);

        let transport = HttpTransport::new();
        let services = Services::new(&config, Arc::new(transport.clone()));
        Self {
            config,
            transport,
            services,
        }
    }
}

fn print_result<T: Serialize>(json: bool, value: &T, render: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", render(value));
    }
    Ok(())
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            config.set(&key, &value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            for key in ["api_url", "demo_mode", "import_latency_ms"] {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
