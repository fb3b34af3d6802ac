//! triad-ctl — command-line client for the Triad coordinator.
//!
//! One command per invocation, one connection per command. Operation
//! failures are printed, not turned into exit codes; only a usage error
//! exits non-zero.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use triad_core::config::TriadConfig;
use triad_services::CoordinatorClient;

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_list(client: &CoordinatorClient) -> Result<()> {
    let names = client.list().await?;
    if names.is_empty() {
        println!("No files on the coordinator.");
        return Ok(());
    }
    println!("Files on the coordinator:");
    for name in names {
        println!("- {name}");
    }
    Ok(())
}

async fn cmd_send(client: &CoordinatorClient, path: &str) -> Result<()> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let len = file.metadata().await?.len();

    client.send(name, len, &mut file).await?;
    println!("Sent {name} ({len} bytes).");
    Ok(())
}

async fn cmd_receive(client: &CoordinatorClient, name: &str, download_dir: &PathBuf) -> Result<()> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("invalid file name: {name:?}");
    }
    tokio::fs::create_dir_all(download_dir)
        .await
        .with_context(|| format!("failed to create {}", download_dir.display()))?;
    let target = download_dir.join(name);
    let mut out = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("failed to create {}", target.display()))?;

    match client.receive(name, &mut out).await {
        Ok(Some((served, size))) => {
            println!("Received {served} ({size} bytes) into {}.", target.display());
        }
        Ok(None) => {
            // Remove the empty placeholder we created.
            drop(out);
            tokio::fs::remove_file(&target).await.ok();
            println!("File {name} does not exist on the coordinator.");
        }
        Err(e) => {
            // A failed transfer must not leave a truncated download behind.
            drop(out);
            tokio::fs::remove_file(&target).await.ok();
            return Err(e);
        }
    }
    Ok(())
}

async fn cmd_delete(client: &CoordinatorClient, name: &str) -> Result<()> {
    let ack = client.delete(name).await?;
    println!("{ack}");
    Ok(())
}

fn print_usage() {
    println!("Usage: triad-ctl [--coordinator <addr>] <command>");
    println!();
    println!("Commands:");
    println!("  list              List files available on the coordinator");
    println!("  send <path>       Send a file to the coordinator");
    println!("  receive <name>    Fetch a file (removes it from the coordinator)");
    println!("  delete <name>     Delete the file's local parts on the coordinator");
    println!();
    println!("Options:");
    println!("  --coordinator <addr>   Coordinator address (default from config)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let config = TriadConfig::load().unwrap_or_default();

    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --coordinator option
    let mut addr = config.client.coordinator_addr.clone();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--coordinator" {
            i += 1;
            addr = args
                .get(i)
                .context("--coordinator requires a value")?
                .clone();
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    let client = CoordinatorClient::new(addr);

    let outcome = match remaining.as_slice() {
        ["list"] => cmd_list(&client).await,
        ["send", path] => cmd_send(&client, path).await,
        ["receive", name] => cmd_receive(&client, name, &config.client.download_dir).await,
        ["delete", name] => cmd_delete(&client, name).await,
        ["help"] | ["--help"] | ["-h"] | [] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
    }
    Ok(())
}
