//! Status command implementation.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::fingerprint::FingerprintStore;
use crate::fs_abstraction::real_fs;
use crate::utils::format_duration_ago;

/// Run the status command
pub async fn run(config: &Config, config_path: &Path) -> Result<()> {
    let store = FingerprintStore::new(config.state_file.clone());
    let deployed = store.load(real_fs())?;

    println!();
    if config_path.exists() {
        println!("Config: {}", config_path.display());
    } else {
        println!("Config: built-in defaults ({} not found)", config_path.display());
    }
    println!("IPv4 source: {}", config.sources.ipv4_url);
    println!("IPv6 source: {}", config.sources.ipv6_url);
    println!();

    match &deployed {
        Some(fp) => println!("Fingerprint: {}", fp),
        None => println!("Fingerprint: none (never deployed)"),
    }

    match last_update(&config.state_file) {
        Some(modified) => {
            let local: DateTime<Local> = modified.into();
            println!(
                "Last update: {} ({})",
                local.format("%Y-%m-%d %H:%M:%S"),
                format_duration_ago(modified, Utc::now())
            );
        }
        None => println!("Last update: never"),
    }
    println!();

    print_file("nginx config", &config.outputs.proxy);
    print_file("nftables config", &config.outputs.firewall);
    println!();

    Ok(())
}

/// The fingerprint file is rewritten on every deployment, so its mtime is the
/// time of the last update
fn last_update(state_file: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(state_file).ok()?.modified().ok()?;
    Some(modified.into())
}

fn print_file(label: &str, path: &Path) {
    match fs::metadata(path) {
        Ok(meta) => println!("{}: {} ({} bytes)", label, path.display(), meta.len()),
        Err(_) => println!("{}: {} (missing)", label, path.display()),
    }
}
