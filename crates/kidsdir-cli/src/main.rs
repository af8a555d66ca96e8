//! kidsdir - command line client for the kids activities directory.
//!
//! Signs in through the hosted OAuth UI, then reads and writes directory
//! records through the mode-scoped REST API. Results are printed as JSON
//! on stdout; logs go to stderr.

mod commands;
mod context;
mod output;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kidsdir_core::models::{PricingType, ReviewAction};
use kidsdir_core::{ApiMode, Config, Resource};

use context::AppContext;

/// Default log file name when `--log-file` points at a directory
const DEFAULT_LOG_FILE: &str = "kidsdir.log";

#[derive(Parser)]
#[command(name = "kidsdir")]
#[command(about = "Kids activities directory client", long_about = None, version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API mode (admin, manager, owner, user); defaults to config, then the signed-in role
    #[arg(short, long, global = true)]
    mode: Option<ApiMode>,

    /// Also write logs to a daily rolling file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in. Without --code prints the URL to open; with --code finishes the login
    Login {
        /// Authorization code from the redirect
        #[arg(long, requires = "state")]
        code: Option<String>,

        /// `state` parameter from the redirect
        #[arg(long, requires = "code")]
        state: Option<String>,
    },

    /// Sign out and print the hosted logout URL
    Logout,

    /// Show the signed-in user, role and token expiry
    Whoami,

    /// List a collection
    List {
        resource: Resource,

        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,

        /// Cursor from a previous page's next_cursor
        #[arg(long)]
        cursor: Option<String>,

        /// Follow next_cursor until the last page
        #[arg(long)]
        all: bool,

        /// Extra query filter, repeatable
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// One summary line per record instead of JSON
        #[arg(short, long)]
        brief: bool,
    },

    /// Fetch one record
    Get { resource: Resource, id: String },

    /// Create a record from a JSON file ("-" for stdin)
    Create {
        resource: Resource,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Replace a record from a JSON file
    Update {
        resource: Resource,
        id: String,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Change selected fields of a record from a JSON file
    Patch {
        resource: Resource,
        id: String,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete a record
    Delete { resource: Resource, id: String },

    /// Search public activities
    Search {
        #[arg(long)]
        age: Option<i32>,
        #[arg(long)]
        area: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        pricing_type: Option<PricingType>,
        /// Day of week (0 = Sunday), UTC
        #[arg(long)]
        day: Option<u8>,
        #[arg(long)]
        language: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
        #[arg(long)]
        cursor: Option<String>,
        /// Skip the cache
        #[arg(long)]
        fresh: bool,
    },

    /// Print the category or area tree
    Tree {
        resource: Resource,

        /// Only categories whose name contains this text, with their path
        #[arg(long)]
        find: Option<String>,
    },

    /// Export a collection as CSV (admin)
    Export { resource: Resource },

    /// Import a CSV file into a collection (admin)
    Import {
        resource: Resource,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Approve or reject a ticket (admin)
    Review {
        ticket: String,
        action: ReviewAction,
        #[arg(long)]
        notes: Option<String>,
        /// Create the suggested organization on approval
        #[arg(long)]
        create_organization: bool,
    },

    /// Submit a ticket from a JSON file
    SubmitTicket {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Manage user group membership (admin)
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Request a presigned media upload URL for an organization
    UploadUrl {
        org: String,
        file_name: String,
        content_type: String,
    },

    /// Remove cached responses
    ClearCache,
}

#[derive(Subcommand)]
enum GroupAction {
    Add { username: String, group: String },
    Remove { username: String, group: String },
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=kidsdir_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (dir, name) = if path.is_dir() {
                (path.to_path_buf(), PathBuf::from(DEFAULT_LOG_FILE))
            } else {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                let name = path
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
                (dir, name)
            };
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    info!("kidsdir starting");

    let config = Config::load()?;
    debug!(api = %config.api_base_url, "Configuration loaded");
    let ctx = AppContext::open(config, cli.mode)?;

    match cli.command {
        Commands::Login { code, state } => commands::login(&ctx, code, state).await,
        Commands::Logout => commands::logout(&ctx).await,
        Commands::Whoami => commands::whoami(&ctx).await,
        Commands::List {
            resource,
            limit,
            cursor,
            all,
            filters,
            brief,
        } => {
            let options = commands::ListOptions {
                limit,
                cursor,
                all,
                brief,
            };
            commands::list(&ctx, resource, options, &filters).await
        }
        Commands::Get { resource, id } => commands::get(&ctx, resource, &id).await,
        Commands::Create { resource, file } => commands::create(&ctx, resource, &file).await,
        Commands::Update { resource, id, file } => {
            commands::update(&ctx, resource, &id, &file, false).await
        }
        Commands::Patch { resource, id, file } => {
            commands::update(&ctx, resource, &id, &file, true).await
        }
        Commands::Delete { resource, id } => commands::delete(&ctx, resource, &id).await,
        Commands::Search {
            age,
            area,
            category,
            pricing_type,
            day,
            language,
            limit,
            cursor,
            fresh,
        } => {
            let search = kidsdir_core::models::ActivitySearch {
                age,
                area_id: area,
                category_id: category,
                pricing_type,
                day_of_week_utc: day,
                language,
                limit,
                cursor,
            };
            commands::search(&ctx, search, fresh).await
        }
        Commands::Tree { resource, find } => commands::tree(&ctx, resource, find).await,
        Commands::Export { resource } => commands::export(&ctx, resource).await,
        Commands::Import { resource, file } => commands::import(&ctx, resource, &file).await,
        Commands::Review {
            ticket,
            action,
            notes,
            create_organization,
        } => commands::review(&ctx, &ticket, action, notes, create_organization).await,
        Commands::SubmitTicket { file } => commands::submit_ticket(&ctx, &file).await,
        Commands::Group { action } => match action {
            GroupAction::Add { username, group } => {
                commands::group(&ctx, &username, &group, true).await
            }
            GroupAction::Remove { username, group } => {
                commands::group(&ctx, &username, &group, false).await
            }
        },
        Commands::UploadUrl {
            org,
            file_name,
            content_type,
        } => commands::upload_url(&ctx, &org, &file_name, &content_type).await,
        Commands::ClearCache => commands::clear_cache(&ctx),
    }
}
