//! Pholife Vault - CLI
//!
//! End-to-end demo of the vault against local backends: a directory
//! content store and a SQLite registry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pholife_vault::gallery::TileSource;
use pholife_vault::local::{LocalRegistry, LocalStore};
use pholife_vault::upload::{BatchReport, UploadItem};
use pholife_vault::{FolderState, OwnerId, PhotoLibrary, SortOrder, Visibility};

#[derive(Parser)]
#[command(name = "pholife")]
#[command(version = pholife_vault::VERSION)]
#[command(about = "Pholife Vault - password-gated private photo vault")]
struct Cli {
    /// Data directory for the local store and registry
    #[arg(short, long, default_value = "./pholife-data")]
    data: PathBuf,

    /// Owner identity
    #[arg(short, long, default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the private folder password
    Setup {
        /// Folder password (min 6 characters)
        #[arg(short, long)]
        password: String,

        /// Password confirmation
        #[arg(short, long)]
        confirm: String,
    },

    /// Upload public photos
    Upload {
        /// Photo paths
        files: Vec<PathBuf>,
    },

    /// Encrypt and upload private photos
    UploadPrivate {
        /// Photo paths
        files: Vec<PathBuf>,

        /// Folder password
        #[arg(short, long)]
        password: String,
    },

    /// Show the bucketed gallery
    Gallery {
        /// Show the private tier (requires --password)
        #[arg(long)]
        private: bool,

        /// Folder password
        #[arg(short, long)]
        password: Option<String>,

        /// Oldest first instead of newest first
        #[arg(long)]
        oldest: bool,
    },

    /// List all registry rows
    List,

    /// Show folder state and record counts
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let store = Arc::new(LocalStore::open(&cli.data)?);
    let registry = Arc::new(LocalRegistry::open(&cli.data)?);
    let owner = OwnerId::new(cli.owner.clone());

    let library = PhotoLibrary::connect(store, registry, owner).await?;
    library.refresh().await?;

    match cli.command {
        Commands::Setup { password, confirm } => {
            library.setup_private(&password, &confirm).await?;
            println!("🔐 Private folder set up for '{}'", cli.owner);
        }

        Commands::Upload { files } => {
            let items = read_items(&files)?;
            let (tx, printer) = progress_printer();
            let report = library.upload(items, Some(tx)).await;
            printer.await?;
            print_report(&report);
        }

        Commands::UploadPrivate { files, password } => {
            library.unlock(&password)?;
            let items = read_items(&files)?;
            let (tx, printer) = progress_printer();
            let report = library.upload_private(items, Some(tx)).await?;
            printer.await?;
            print_report(&report);
        }

        Commands::Gallery {
            private,
            password,
            oldest,
        } => {
            let visibility = if private {
                let password = password
                    .context("--password is required for the private gallery")?;
                library.unlock(&password)?;
                library.hydrate_private().await?;
                Visibility::Private
            } else {
                Visibility::Public
            };
            let sort = if oldest { SortOrder::Oldest } else { SortOrder::Newest };

            let view = library.gallery(visibility, sort);
            if view.is_empty() {
                println!("📭 No photos");
            }
            for section in &view.sections {
                println!("── {} ──", section.bucket.label());
                for tile in &section.tiles {
                    let source = match &tile.source {
                        TileSource::Plain(url) => format!("public    {url}"),
                        TileSource::Decrypted(handle) => match handle.get() {
                            Some(artifact) => {
                                format!("decrypted {} ({} bytes)", artifact.mime, artifact.bytes.len())
                            }
                            None => "decrypted (released)".to_string(),
                        },
                        TileSource::Thumbnail(url) => format!("thumbnail {url}"),
                    };
                    println!(
                        "  {}  {}  {}",
                        tile.record.created_at.format("%Y-%m-%d %H:%M"),
                        tile.record.name,
                        source
                    );
                }
            }
        }

        Commands::List => {
            let records = library.records();
            if records.is_empty() {
                println!("📭 No photos in registry");
            } else {
                println!("📷 Photos ({}):", records.len());
                for record in records {
                    let tier = if record.is_private { "🔒" } else { "  " };
                    println!(
                        "{} {} - {} ({} bytes)",
                        tier, record.id, record.name, record.size_bytes
                    );
                }
            }
        }

        Commands::Status => {
            let state = match library.vault_state() {
                FolderState::Unset => "not set up",
                FolderState::SettingUp => "setting up",
                FolderState::Locked => "locked",
                FolderState::Unlocked => "unlocked",
            };
            let records = library.records();
            let private = records.iter().filter(|r| r.is_private).count();

            println!("📊 Pholife Vault");
            println!("Owner:           {}", cli.owner);
            println!("Private folder:  {state}");
            println!("Photos:          {} ({} private)", records.len(), private);
        }
    }

    Ok(())
}

fn read_items(files: &[PathBuf]) -> anyhow::Result<Vec<UploadItem>> {
    files
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(UploadItem { name, bytes })
        })
        .collect()
}

fn progress_printer() -> (
    pholife_vault::upload::ProgressSender,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) =
        tokio::sync::mpsc::unbounded_channel::<pholife_vault::upload::UploadEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("  {} {:3}% ({:?})", event.name, event.percent(), event.phase);
        }
    });
    (tx, printer)
}

fn print_report(report: &BatchReport) {
    for record in &report.succeeded {
        println!("✅ {} -> {}", record.name, record.id);
    }
    for failure in &report.failed {
        println!("❌ {}: {}", failure.name, failure.error);
    }
    println!(
        "{} of {} uploaded",
        report.succeeded.len(),
        report.total()
    );
}
