//! Configuration management for cfsync.
//!
//! Every path, URL and command used by a run comes from [`Config`]. The
//! defaults reproduce the stock Cloudflare + nginx + nftables deployment, so
//! the config file is optional.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::cmd_abstraction::args_to_strings;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/cfsync/config.yaml";
pub const DEFAULT_LOG_FILE: &str = "exec-report.log";

/// Replaced in reload arguments by the path of the file the service reads
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the IP range lists are published
    pub sources: SourcesConfig,

    /// Template files rendered on every change
    pub templates: TemplatesConfig,

    /// Generated configuration files
    pub outputs: OutputsConfig,

    /// Fingerprint of the ranges behind the deployed configuration
    pub state_file: PathBuf,

    /// Append-only run log
    pub log_file: PathBuf,

    /// Advisory lock held during `update` (None disables locking)
    pub lock_file: Option<PathBuf>,

    /// Reload commands run after the files are written
    pub reload: ReloadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            templates: TemplatesConfig::default(),
            outputs: OutputsConfig::default(),
            state_file: PathBuf::from("/etc/cf_ip_hash.txt"),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            lock_file: Some(PathBuf::from("/run/cfsync.lock")),
            reload: ReloadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourcesConfig {
    pub ipv4_url: String,
    pub ipv6_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Largest accepted response body
    pub max_list_bytes: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ipv4_url: "https://www.cloudflare.com/ips-v4".to_string(),
            ipv6_url: "https://www.cloudflare.com/ips-v6".to_string(),
            timeout_secs: 30,
            max_list_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplatesConfig {
    pub proxy: PathBuf,
    pub firewall: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            proxy: PathBuf::from("cf_ips.conf.j2"),
            firewall: PathBuf::from("nftables.conf.j2"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputsConfig {
    pub proxy: PathBuf,
    pub firewall: PathBuf,
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            proxy: PathBuf::from("/etc/nginx/conf.d/cf_ips.conf"),
            firewall: PathBuf::from("/etc/nftables.conf"),
        }
    }
}

/// A service and the argv that makes it re-read its configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceCommand {
    pub name: String,
    pub command: Vec<String>,
}

impl ServiceCommand {
    pub fn new(name: &str, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            command: args_to_strings(command),
        }
    }

    /// Program to execute (first argv element)
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Copy of this command with `{output}` expanded to `output`
    pub fn for_output(&self, output: &Path) -> Self {
        let output = output.to_string_lossy();
        Self {
            name: self.name.clone(),
            command: self
                .command
                .iter()
                .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
                .collect(),
        }
    }

    /// Value given to `-f`/`--file`, if any
    fn file_argument(&self) -> Option<&str> {
        self.args().iter().enumerate().find_map(|(i, arg)| {
            if arg == "-f" || arg == "--file" {
                self.args().get(i + 1).map(String::as_str)
            } else {
                arg.strip_prefix("--file=")
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReloadConfig {
    pub proxy: ServiceCommand,
    pub firewall: ServiceCommand,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            proxy: ServiceCommand::new("nginx", &["nginx", "-s", "reload"]),
            firewall: ServiceCommand::new("nftables", &["nft", "-f", OUTPUT_PLACEHOLDER]),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to the built-in defaults when the
    /// file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_source_url("ipv4_url", &self.sources.ipv4_url)?;
        validate_source_url("ipv6_url", &self.sources.ipv6_url)?;

        if self.sources.timeout_secs == 0 {
            anyhow::bail!("sources.timeout_secs must be greater than zero");
        }
        if self.sources.max_list_bytes == 0 {
            anyhow::bail!("sources.max_list_bytes must be greater than zero");
        }

        for (key, path) in [
            ("templates.proxy", &self.templates.proxy),
            ("templates.firewall", &self.templates.firewall),
            ("outputs.proxy", &self.outputs.proxy),
            ("outputs.firewall", &self.outputs.firewall),
            ("state_file", &self.state_file),
            ("log_file", &self.log_file),
        ] {
            if path.as_os_str().is_empty() {
                anyhow::bail!("{} must not be empty", key);
            }
        }

        if self.outputs.proxy == self.outputs.firewall {
            anyhow::bail!(
                "outputs.proxy and outputs.firewall must be different files: {:?}",
                self.outputs.proxy
            );
        }

        for service in [&self.reload.proxy, &self.reload.firewall] {
            match service.program() {
                Some(program) if !program.trim().is_empty() => {}
                _ => anyhow::bail!("Reload command for '{}' is empty", service.name),
            }
        }

        // nft must load the file that was just written, not a stale one
        if let Some(file) = self.reload.firewall.file_argument() {
            if file != OUTPUT_PLACEHOLDER && Path::new(file) != self.outputs.firewall {
                anyhow::bail!(
                    "reload.firewall loads {} but outputs.firewall is {:?}; use \"{}\" instead",
                    file,
                    self.outputs.firewall,
                    OUTPUT_PLACEHOLDER
                );
            }
        }

        Ok(())
    }

    /// Reload commands in run order (proxy, then firewall) with `{output}`
    /// expanded to each service's output file
    pub fn reload_commands(&self) -> Vec<ServiceCommand> {
        vec![
            self.reload.proxy.for_output(&self.outputs.proxy),
            self.reload.firewall.for_output(&self.outputs.firewall),
        ]
    }

    /// Generate default config with comments
    pub fn generate_default_yaml() -> String {
        include_str!("../templates/config.yaml").to_string()
    }
}

/// Source URLs must use HTTPS; plain HTTP is only accepted for loopback hosts.
fn validate_source_url(key: &str, url: &str) -> Result<()> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid {}: {}", key, url))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback_host(&parsed) => Ok(()),
        _ => anyhow::bail!("{} must use HTTPS: {}", key, url),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}
