//! Courier file handoff service

mod args;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use courier_common::format_size;
use courier_server::constants::*;
use courier_server::db::{self, Database};
use courier_server::files::{IncomingFile, StorageArea, default_storage_root};
use courier_server::notify::{Notifier, RawSmtpSettings, SmtpMailer, format_timestamp};
use courier_server::sweeper::{Sweeper, sweep_interval};
use courier_server::{IngestRequest, ServiceConfig, TransferService, TransferStatus};

use args::{Args, Command, SmtpCommand};

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(args.debug);

    let quiet = !matches!(args.command, Command::Run);
    if !quiet {
        println!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));
    }

    let (database, db_path) = setup_db(args.database.clone()).await;
    let storage = setup_storage(args.storage_root.clone());
    if !quiet {
        println!("{}{}", MSG_DATABASE, db_path.display());
        println!("{}{}", MSG_STORAGE_ROOT, storage.root().display());
    }

    let service = setup_service(&database, storage.clone(), &args);

    let result = match args.command {
        Command::Run => run(&database, storage, args.sweep_interval_hours).await,
        Command::Send { to, from, paths } => send(&service, to, from, &paths).await,
        Command::Status { id } => status(&service, &id, args.json).await,
        Command::Fetch { id, output } => fetch(&service, &id, output).await,
        Command::Verify { id } => verify(&service, &id, args.json).await,
        Command::List { limit } => list(&service, limit, args.json).await,
        Command::Sweep => sweep(&database, storage).await,
        Command::Smtp { command } => smtp(&database, command).await,
    };

    if let Err(e) = result {
        eprintln!("{}{}", ERR_GENERIC, e);
        std::process::exit(1);
    }
}

/// Setup tracing output on stderr
///
/// `RUST_LOG` takes precedence over `--debug`.
fn setup_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Set database file permissions to owner-only (0o600)
#[cfg(unix)]
fn set_secure_permissions(path: &Path) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    let mut permissions = metadata.permissions();
    permissions.set_mode(0o600);
    std::fs::set_permissions(path, permissions).map_err(|e| e.to_string())
}

/// Setup database connection
async fn setup_db(database_path: Option<PathBuf>) -> (Database, PathBuf) {
    // Determine database path (use provided path or platform default)
    let db_path = database_path.unwrap_or_else(|| match db::default_database_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}{}", ERR_GENERIC, e);
            std::process::exit(1);
        }
    });

    // Open the pool (bounded retry) and run migrations
    let pool = match db::init_db(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{}{}", ERR_DATABASE_INIT, e);
            std::process::exit(1);
        }
    };

    #[cfg(unix)]
    if let Err(e) = set_secure_permissions(&db_path) {
        eprintln!("{}{}", ERR_SET_PERMISSIONS, e);
        std::process::exit(1);
    }

    (Database::new(pool), db_path)
}

/// Setup the artifact storage area
fn setup_storage(storage_root: Option<PathBuf>) -> StorageArea {
    let root = storage_root.unwrap_or_else(|| match default_storage_root() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{}{}", ERR_GENERIC, e);
            std::process::exit(1);
        }
    });

    match StorageArea::init(&root) {
        Ok(area) => area,
        Err(e) => {
            eprintln!("{}{}: {}", ERR_STORAGE_INIT, root.display(), e);
            std::process::exit(1);
        }
    }
}

/// Wire the transfer service to the database, storage, and SMTP transport
fn setup_service(database: &Database, storage: StorageArea, args: &Args) -> TransferService {
    let notifier = Notifier::new(
        Arc::new(database.config.clone()),
        Arc::new(SmtpMailer::new()),
    );
    TransferService::new(
        database.transfers.clone(),
        storage,
        notifier,
        ServiceConfig {
            base_url: args.base_url.clone(),
            default_retention_days: args.retention_days,
        },
    )
}

/// Setup graceful shutdown signal handling (SIGTERM/SIGINT, Ctrl+C)
async fn setup_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) => {
                    eprintln!("{}: {}", ERR_SIGNAL_SIGTERM, e);
                    std::process::exit(1);
                }
                (_, Err(e)) => {
                    eprintln!("{}: {}", ERR_SIGNAL_SIGINT, e);
                    std::process::exit(1);
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("{}: {}", ERR_SIGNAL_CTRLC, e);
            std::process::exit(1);
        }
    }
}

async fn run(database: &Database, storage: StorageArea, interval_hours: u64) -> CliResult {
    let purged = storage.purge_stale_staging(Duration::from_secs(STALE_STAGING_SECS))?;
    if purged > 0 {
        tracing::info!(purged, "removed stale staging entries");
    }

    let interval = sweep_interval(interval_hours);
    println!("{}{}", MSG_SWEEP_INTERVAL, interval.as_secs() / 3600);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = Sweeper::new(database.transfers.clone(), storage);
    let handle = sweeper.spawn(interval, shutdown_rx);

    setup_shutdown_signal().await;
    println!("{}", MSG_SHUTDOWN_RECEIVED);

    shutdown_tx.send(true)?;
    handle.await?;
    Ok(())
}

/// Collect files to send; directories contribute `dir_name/relative` paths
async fn collect_files(paths: &[PathBuf]) -> Result<Vec<IncomingFile>, Box<dyn Error>> {
    let mut files = Vec::new();

    for path in paths {
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(path)?;
                let relative_path = format!("{}/{}", base_name, relative.to_string_lossy());
                files.push(IncomingFile::open(entry.path(), relative_path).await?);
            }
        } else {
            files.push(IncomingFile::open(path, base_name).await?);
        }
    }

    Ok(files)
}

async fn send(service: &TransferService, to: String, from: String, paths: &[PathBuf]) -> CliResult {
    let files = collect_files(paths).await?;
    let outcome = service
        .ingest(IngestRequest {
            files,
            recipient_email: to,
            sender_email: from,
            retention_days: None,
        })
        .await?;

    println!("Transfer:    {}", outcome.transfer_id);
    println!("Artifact:    {}", outcome.artifact_name);
    println!("Fingerprint: {}", outcome.fingerprint);
    println!("Link:        {}", outcome.download_link);
    println!("Expires:     {}", format_timestamp(outcome.expires_at));
    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_status(status: &TransferStatus) {
    println!("Transfer:    {}", status.transfer_id);
    println!("Artifact:    {}", status.artifact_name);
    println!("From:        {}", status.sender_email);
    println!("To:          {}", status.recipient_email);
    println!("State:       {}", status.state());
    println!("Created:     {}", format_timestamp(status.created_at));
    println!("Expires:     {}", format_timestamp(status.expires_at));
    if let Some(at) = status.downloaded_at {
        println!("Downloaded:  {}", format_timestamp(at));
    }
    println!("Fingerprint: {}", status.fingerprint);
    println!("Size:        {}", format_size(status.total_size));
    for entry in &status.manifest {
        println!("  {} ({})", entry.path, format_size(entry.size));
    }
}

async fn status(service: &TransferService, id: &str, json: bool) -> CliResult {
    let status = service.status(id).await?;
    if json {
        return print_json(&status);
    }
    print_status(&status);
    Ok(())
}

/// Write an artifact to `target` through `<target>.part`
///
/// The part file is renamed into place on success and removed on failure.
async fn save_artifact<R>(reader: &mut R, target: &Path) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let part = target.with_file_name(format!(
        "{}.part",
        target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    match write_part(reader, &part).await {
        Ok(written) => {
            tokio::fs::rename(&part, target).await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&part).await {
                tracing::warn!(path = %part.display(), error = %cleanup, "failed to remove partial download");
            }
            Err(e)
        }
    }
}

async fn write_part<R>(reader: &mut R, part: &Path) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut out = tokio::fs::File::create(part).await?;
    let written = tokio::io::copy(reader, &mut out).await?;
    out.flush().await?;
    out.sync_all().await?;
    Ok(written)
}

async fn fetch(service: &TransferService, id: &str, output: Option<PathBuf>) -> CliResult {
    let mut download = service.download(id).await?;
    for warning in &download.warnings {
        eprintln!("Warning: {}", warning);
    }

    let target = output.unwrap_or_else(|| PathBuf::from(&download.artifact_name));
    let written = save_artifact(&mut download.file, &target).await?;

    println!(
        "Saved {} ({}) to {}",
        download.artifact_name,
        format_size(written),
        target.display()
    );
    Ok(())
}

async fn verify(service: &TransferService, id: &str, json: bool) -> CliResult {
    let report = service.verify(id).await?;
    if json {
        print_json(&report)?;
    }
    if report.is_intact() {
        if json {
            return Ok(());
        }
        println!("OK {}", report.actual);
        Ok(())
    } else {
        Err(format!(
            "fingerprint mismatch: recorded {}, computed {}",
            report.expected, report.actual
        )
        .into())
    }
}

async fn list(service: &TransferService, limit: u32, json: bool) -> CliResult {
    let transfers = service.list(limit).await?;
    if json {
        return print_json(&transfers);
    }
    for status in transfers {
        println!(
            "{}  {:9}  {:>10}  {}  {} -> {}",
            status.transfer_id,
            status.state().to_string(),
            format_size(status.total_size),
            format_timestamp(status.expires_at),
            status.sender_email,
            status.recipient_email
        );
    }
    Ok(())
}

async fn sweep(database: &Database, storage: StorageArea) -> CliResult {
    let sweeper = Sweeper::new(database.transfers.clone(), storage);
    let report = sweeper.run_once(chrono::Utc::now().timestamp()).await?;
    println!(
        "Expired: {}, swept: {}, blobs removed: {}, failed: {}",
        report.expired, report.swept, report.blobs_removed, report.failed
    );
    Ok(())
}

async fn smtp(database: &Database, command: SmtpCommand) -> CliResult {
    match command {
        SmtpCommand::Show => {
            let raw = database.config.load_smtp_raw().await?;
            println!("Server:   {}", raw.server);
            println!("Port:     {}", raw.port);
            println!("User:     {}", raw.user);
            println!(
                "Password: {}",
                if raw.password.is_empty() { "" } else { "********" }
            );
            println!("Sender:   {}", raw.sender);
            if let Err(e) = raw.resolve() {
                eprintln!("Warning: {}", e);
            }
        }
        SmtpCommand::Set {
            server,
            port,
            user,
            password,
            sender,
        } => {
            let settings = RawSmtpSettings {
                server,
                port: port.to_string(),
                user,
                password,
                sender,
            }
            .resolve()?;
            database.config.save_smtp(&settings).await?;
            println!(
                "SMTP settings saved ({}:{}, {:?})",
                settings.server,
                settings.port,
                settings.security()
            );
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::ReadBuf;

    /// Yields some bytes, then fails like a dropped connection
    struct TruncatedReader {
        sent: bool,
    }

    impl AsyncRead for TruncatedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "artifact truncated",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_save_artifact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("notes.txt");

        let mut reader: &[u8] = b"0123456789";
        assert_eq!(save_artifact(&mut reader, &target).await.unwrap(), 10);
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
        assert!(!dir.path().join("notes.txt.part").exists());
    }

    #[tokio::test]
    async fn test_save_artifact_failure_removes_part_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("notes.txt");

        let err = save_artifact(&mut TruncatedReader { sent: false }, &target)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
        assert!(!target.exists());
        assert!(!dir.path().join("notes.txt.part").exists());
    }
}
