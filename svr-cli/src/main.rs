/*!
svr - back up a project's secret files to S3 and restore the newest bundle.

Three commands: `init` writes the per-project `.svrc` record, `push` bundles
the configured include set and uploads it, `pull` fetches the most recent
bundle for the project and extracts it under the project root. Every failure
is reported as a single message and the process exits nonzero.
*/

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use svr_core::{
    build_bundle, extract_bundle, newest_bundle, remote_key, staging_path, ObjectStore,
    ProjectConfig, RemoteEntry, S3ObjectStore, CONFIG_FILE_NAME,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "svr")]
#[command(about = "Secret-file bundle backup and restore")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project configuration file
    Init {
        /// Project name (prompted for if omitted)
        #[arg(long)]
        name: Option<String>,
        /// Project description
        #[arg(long)]
        description: Option<String>,
        /// Project root path (prompted for if omitted)
        #[arg(long)]
        project_root: Option<String>,
    },
    /// Bundle the include set and upload it
    Push,
    /// Download and extract the newest remote bundle
    Pull,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init {
            name,
            description,
            project_root,
        } => cmd_init(name, description, project_root).await,
        Commands::Push => cmd_push().await,
        Commands::Pull => cmd_pull().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn cmd_init(
    name: Option<String>,
    description: Option<String>,
    project_root: Option<String>,
) -> Result<(), anyhow::Error> {
    let cwd = std::env::current_dir()?;

    let written = run_init(&cwd, name, description, project_root, || {
        prompt_bool(
            "Configuration file already exists. Do you want to overwrite it? (y/N): ",
            false,
        )
    })?;

    match written {
        Some(path) => {
            println!("Config file created at {}", path.display());
            println!("Add files to the include list in {CONFIG_FILE_NAME} and run `svr push`");
        }
        None => println!("Keeping existing configuration"),
    }
    Ok(())
}

/// Write a fresh configuration record into `dir`, prompting for any field
/// not supplied as a flag.
///
/// When a record already exists, `confirm_overwrite` decides its fate; a
/// declined overwrite returns `None` and leaves the existing file untouched.
fn run_init(
    dir: &Path,
    name: Option<String>,
    description: Option<String>,
    project_root: Option<String>,
    confirm_overwrite: impl FnOnce() -> io::Result<bool>,
) -> Result<Option<PathBuf>, anyhow::Error> {
    if ProjectConfig::exists(dir) && !confirm_overwrite()? {
        return Ok(None);
    }

    let name = match name {
        Some(name) => name,
        None => prompt_string("Enter project name: ", true)?,
    };
    let description = match description {
        Some(description) => description,
        None => prompt_string("Enter project description: ", false)?,
    };
    let project_root = match project_root {
        Some(root) => root,
        None => prompt_string("Enter project root path: ", true)?,
    };

    let config = ProjectConfig::new(name, description, project_root);
    Ok(Some(config.save(dir)?))
}

async fn cmd_push() -> Result<(), anyhow::Error> {
    let cwd = std::env::current_dir()?;
    let config = ProjectConfig::load(&cwd)?;
    config.aws.check()?;

    // Connect before compressing anything, so a bad remote setup fails
    // without ever creating a local bundle.
    let store = S3ObjectStore::connect(&config.aws).await?;
    run_push(&store, &config).await
}

/// Build the bundle and upload it under the project's remote key.
///
/// The local bundle is ephemeral: it is removed after a successful upload
/// and also when the upload fails.
async fn run_push<S: ObjectStore>(store: &S, config: &ProjectConfig) -> Result<(), anyhow::Error> {
    println!("Compressing {} files...", config.include.len());
    let bundle = build_bundle(Path::new(&config.project_root), &config.include)?;

    let basename = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let key = remote_key(&config.aws.prefix, &basename);

    println!("Uploading files...");
    match store.put_file(&key, &bundle).await {
        Ok(()) => {
            println!("Files uploaded successfully");
            let _ = fs::remove_file(&bundle);
            println!("Temporary files removed");
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&bundle);
            Err(e.into())
        }
    }
}

async fn cmd_pull() -> Result<(), anyhow::Error> {
    let cwd = std::env::current_dir()?;
    let config = ProjectConfig::load(&cwd)?;
    config.aws.check()?;

    let store = S3ObjectStore::connect(&config.aws).await?;
    let listing_prefix = remote_key(&config.aws.prefix, &config.name);
    let entries = store.list(&listing_prefix).await?;
    debug!(prefix = %listing_prefix, count = entries.len(), "Remote listing fetched");

    let newest: RemoteEntry = newest_bundle(entries.into_iter().map(|e| (e.key, e.size)))?;
    println!(
        "Downloading {} ({}, uploaded {})...",
        newest.file_name(),
        format_size(newest.size.max(0) as u64),
        format_millis(newest.timestamp_millis)
    );

    let project_root = Path::new(&config.project_root);
    let staged = staging_path(project_root, newest.file_name())?;
    store.get_to_file(&newest.key, &staged).await?;
    println!("File downloaded to {}", staged.display());

    println!("Extracting files...");
    extract_bundle(&staged, project_root)?;
    println!("Files extracted successfully");

    let _ = fs::remove_file(&staged);
    println!("Temporary files removed");

    println!("Done");
    Ok(())
}

/// Prompt for a line of input; re-asks while the answer is empty if required.
fn prompt_string(msg: &str, required: bool) -> io::Result<String> {
    loop {
        print!("{msg}");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() && required {
            continue;
        }
        return Ok(input.to_string());
    }
}

/// Yes/no prompt; empty input takes the default, anything else re-asks.
fn prompt_bool(msg: &str, default: bool) -> io::Result<bool> {
    loop {
        print!("{msg}");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        match input.as_str() {
            "" => return Ok(default),
            "y" | "yes" | "true" | "1" => return Ok(true),
            "n" | "no" | "false" | "0" => return Ok(false),
            _ => continue,
        }
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_millis(millis: i64) -> String {
    use chrono::{Local, TimeZone};

    match Local.timestamp_millis_opt(millis) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        _ => millis.to_string(),
    }
}
