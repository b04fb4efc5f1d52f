//! Configuration handling

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use nuve_client::{NuveClient, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

/// Main configuration file
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Nuve server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Service credentials used to sign requests
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Nuve host name or address
    #[serde(default = "default_host")]
    pub host: String,

    /// Nuve port
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL scheme (http or https)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Request timeout in seconds (0 = wait forever)
    #[serde(default)]
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            scheme: default_scheme(),
            timeout_seconds: 0,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_scheme() -> String {
    "http".to_string()
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Service id (`mauth_serviceid`)
    #[serde(default)]
    pub service_id: String,

    /// Shared service key
    #[serde(default)]
    pub key: String,
}

/// Connection flags that override the config file
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Nuve host
    #[arg(long, global = true, env = "NUVE_HOST")]
    pub host: Option<String>,

    /// Nuve port
    #[arg(long, global = true, env = "NUVE_PORT")]
    pub port: Option<u16>,

    /// Service id used to sign requests
    #[arg(long, global = true, env = "NUVE_SERVICE_ID")]
    pub service: Option<String>,

    /// Service key used to sign requests
    #[arg(long, global = true, env = "NUVE_SERVICE_KEY", hide_env_values = true)]
    pub key: Option<String>,
}

impl Config {
    /// Load config from a file path
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path).to_string();
        let path = Path::new(&expanded);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply(&mut self, args: &ConnectionArgs) {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(service) = &args.service {
            self.credentials.service_id = service.clone();
        }
        if let Some(key) = &args.key {
            self.credentials.key = key.clone();
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.server.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Build a client from the effective configuration
    pub fn client(&self) -> Result<NuveClient> {
        if self.credentials.service_id.is_empty() || self.credentials.key.is_empty() {
            bail!(
                "Service credentials missing. Provide via:\n\
                 - --service <id> --key <key>\n\
                 - NUVE_SERVICE_ID / NUVE_SERVICE_KEY\n\
                 - [credentials] in the config file"
            );
        }

        let mut builder = NuveClient::builder()
            .credentials(&self.credentials.service_id, &self.credentials.key)
            .host(&self.server.host)
            .port(self.server.port)
            .scheme(&self.server.scheme);
        if let Some(timeout) = self.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Show the effective configuration with the key redacted
pub fn show(config: &Config) -> Result<()> {
    let mut display = toml::Table::new();
    display.insert(
        "server".to_string(),
        toml::Value::try_from(&config.server)?,
    );

    let mut credentials = toml::Table::new();
    credentials.insert(
        "service_id".to_string(),
        toml::Value::String(config.credentials.service_id.clone()),
    );
    let key = if config.credentials.key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    };
    credentials.insert("key".to_string(), toml::Value::String(key.to_string()));
    display.insert("credentials".to_string(), toml::Value::Table(credentials));

    println!("{}", toml::to_string_pretty(&display)?);
    Ok(())
}
