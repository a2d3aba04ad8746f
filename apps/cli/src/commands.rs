//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::info;

use docbridge_capability::CapabilityDetector;
use docbridge_core::{IntegrationDocumentService, ListSourceOptions};
use docbridge_markdown::render_page;
use docbridge_provider::{InMemoryConnectionStore, Provider, ReplayBundle, StaticRegistry};
use docbridge_shared::{
    AppConfig, BrowseOptions, ConnectionId, IntegrationFile, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocBridge — normalize third-party document sources for import.
#[derive(Parser)]
#[command(
    name = "docbridge",
    version,
    about = "Detect provider capabilities and normalize document access through replay bundles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: pretty (default) or json.
    #[arg(long, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Pretty,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Detect a bundle provider's document capability.
    Detect {
        /// Path to a replay bundle (JSON).
        bundle: PathBuf,

        /// Print the capability as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Browse (or search) one page of a bundle's content.
    Browse {
        /// Path to a replay bundle (JSON).
        bundle: PathBuf,

        /// Folder to enumerate (defaults to the provider root).
        #[arg(short, long)]
        folder: Option<String>,

        /// Continuation token from a previous page.
        #[arg(long)]
        page_token: Option<String>,

        /// Search instead of browsing, with this query text.
        #[arg(short, long)]
        query: Option<String>,

        /// Print the page as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List every importable file reachable from a folder.
    ListFiles {
        /// Path to a replay bundle (JSON).
        bundle: PathBuf,

        /// Folder to start from (defaults to the provider root).
        #[arg(short, long)]
        folder: Option<String>,

        /// Descend into subfolders.
        #[arg(short, long)]
        recursive: bool,
    },

    /// Download (or convert) one file from a bundle.
    Download {
        /// Path to a replay bundle (JSON).
        bundle: PathBuf,

        /// Identifier of the file to download.
        file_id: String,

        /// MIME type hint for the downloaded content.
        #[arg(long)]
        mime: Option<String>,

        /// Write the content here instead of printing a summary.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a page document (page record + blocks) to markdown.
    Convert {
        /// Path to a page document (JSON with `page` and `blocks`).
        page: PathBuf,
    },

    /// Pre-flight check a bundle's connection for document import.
    Validate {
        /// Path to a replay bundle (JSON).
        bundle: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docbridge=info",
        1 => "docbridge=debug",
        _ => "docbridge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Pretty => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Detect { bundle, json } => cmd_detect(&bundle, json).await,
        Command::Browse {
            bundle,
            folder,
            page_token,
            query,
            json,
        } => cmd_browse(&bundle, folder, page_token, query.as_deref(), json).await,
        Command::ListFiles {
            bundle,
            folder,
            recursive,
        } => cmd_list_files(&bundle, folder, recursive).await,
        Command::Download {
            bundle,
            file_id,
            mime,
            output,
        } => cmd_download(&bundle, &file_id, mime.as_deref(), output.as_deref()).await,
        Command::Convert { page } => cmd_convert(&page).await,
        Command::Validate { bundle } => cmd_validate(&bundle).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Bundle session assembly
// ---------------------------------------------------------------------------

/// Everything a bundle-backed command needs: the service wired over the
/// scripted provider, plus the scripted connection's identity.
struct BundleSession {
    service: IntegrationDocumentService,
    connection_id: ConnectionId,
    provider_name: String,
}

/// Build a full service stack around one replay bundle.
fn load_session(bundle_path: &Path) -> Result<BundleSession> {
    let bundle = ReplayBundle::from_path(bundle_path)?;
    let provider = bundle.build_provider();
    let connection = bundle.build_connection();
    let provider_name = connection.provider_name.clone();

    let mut registry = StaticRegistry::new();
    registry.register(Arc::new(provider));

    let store = Arc::new(InMemoryConnectionStore::new());
    store.insert(connection.clone());

    let config = load_config()?;
    let service = IntegrationDocumentService::with_config(Arc::new(registry), store, config);

    Ok(BundleSession {
        service,
        connection_id: connection.id,
        provider_name,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_detect(bundle_path: &Path, json: bool) -> Result<()> {
    let bundle = ReplayBundle::from_path(bundle_path)?;
    let provider = bundle.build_provider();

    let config = load_config()?;
    let detector =
        CapabilityDetector::new(Arc::new(StaticRegistry::new())).with_config(&config);

    match detector.detect(&provider) {
        Some(capability) if json => {
            println!("{}", serde_json::to_string_pretty(&capability)?);
        }
        Some(capability) => {
            println!();
            println!("  Provider:  {} ({})", provider.name(), provider.display_name());
            println!("  Content:   {}", capability.content_type);
            println!(
                "  Browse:    {}",
                describe_support(capability.supports_browsing, capability.list_operation.as_deref())
            );
            println!(
                "  Search:    {}",
                describe_support(capability.supports_search, capability.search_operation.as_deref())
            );
            if let Some(op) = &capability.download_operation {
                println!("  Download:  {op}");
            }
            if let Some(op) = &capability.get_content_operation {
                println!("  Pages:     {op}");
            }
            println!();
        }
        None if json => println!("null"),
        None => println!("{}: not capable of document import", provider.name()),
    }

    Ok(())
}

fn describe_support(supported: bool, operation: Option<&str>) -> String {
    match (supported, operation) {
        (true, Some(op)) => format!("yes ({op})"),
        (true, None) => "yes".into(),
        _ => "no".into(),
    }
}

async fn cmd_browse(
    bundle_path: &Path,
    folder: Option<String>,
    page_token: Option<String>,
    query: Option<&str>,
    json: bool,
) -> Result<()> {
    let session = load_session(bundle_path)?;

    let options = BrowseOptions {
        folder_id: folder,
        page_token,
        page_size: None,
    };

    let result = match query {
        Some(text) => {
            session
                .service
                .search_connection(&session.connection_id, text, &options)
                .await?
        }
        None => {
            session
                .service
                .browse_connection(&session.connection_id, &options)
                .await?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if !result.breadcrumbs.is_empty() {
        let path: Vec<&str> = result.breadcrumbs.iter().map(|c| c.name.as_str()).collect();
        println!("  Path: {}", path.join(" / "));
        println!();
    }

    print_file_table(&result.files);

    if let Some(total) = result.total_count {
        println!("  Total matches: {total}");
    }
    if let Some(token) = &result.next_page_token {
        println!("  Next page token: {token}");
    }

    Ok(())
}

async fn cmd_list_files(
    bundle_path: &Path,
    folder: Option<String>,
    recursive: bool,
) -> Result<()> {
    let session = load_session(bundle_path)?;

    let options = ListSourceOptions {
        folder_id: folder,
        recursive,
    };

    info!(
        provider = %session.provider_name,
        recursive,
        "listing importable files"
    );

    let spinner = make_spinner("Listing files...");
    let listed = session
        .service
        .list_source_files(&session.connection_id, &options)
        .await;
    spinner.finish_and_clear();

    let files = listed?;
    print_file_table(&files);
    println!("  {} importable file(s)", files.len());

    Ok(())
}

async fn cmd_download(
    bundle_path: &Path,
    file_id: &str,
    mime: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let session = load_session(bundle_path)?;

    let result = session
        .service
        .download_file(&session.connection_id, file_id, mime)
        .await?;

    match output {
        Some(path) => {
            std::fs::write(path, &result.buffer)
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            println!("  Wrote {} bytes to {}", result.size, path.display());
        }
        None => {
            println!();
            println!("  File:  {}", result.filename);
            println!("  Type:  {}", result.content_type);
            println!("  Size:  {} bytes", result.size);
            if let Some(hash) = &result.content_hash {
                println!("  Hash:  {hash}");
            }
            println!();
        }
    }

    Ok(())
}

async fn cmd_convert(page_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(page_path)
        .map_err(|e| eyre!("cannot read '{}': {e}", page_path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .map_err(|e| eyre!("'{}' is not valid JSON: {e}", page_path.display()))?;

    // Either a {page, blocks} document or a bare page record.
    let page = document
        .get("page")
        .cloned()
        .unwrap_or_else(|| document.clone());
    let block_list: Vec<Value> = document
        .get("blocks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let rendered = render_page(&page, &block_list);
    println!("{}", rendered.markdown);

    Ok(())
}

async fn cmd_validate(bundle_path: &Path) -> Result<()> {
    let session = load_session(bundle_path)?;

    let validation = session
        .service
        .validate_connection(&session.connection_id)
        .await;
    println!("{}", serde_json::to_string_pretty(&validation)?);

    if validation.valid {
        Ok(())
    } else {
        Err(eyre!(
            "connection for '{}' is not valid for document import",
            session.provider_name
        ))
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Spinner for long-running listings; a no-op off a TTY.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(message.to_string());
    spinner
}

/// Fixed-width listing: kind, name, size, MIME type.
fn print_file_table(files: &[IntegrationFile]) {
    if files.is_empty() {
        println!("  (no files)");
        return;
    }

    let width = files
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    for file in files {
        let kind = if file.is_folder { "dir " } else { "file" };
        let size = file
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        let mime = file.mime_type.as_deref().unwrap_or("-");
        println!("  {kind}  {:<width$}  {size:>10}  {mime}", file.name);
    }
    println!();
}
