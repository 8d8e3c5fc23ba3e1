//! Configuration management for the ADM backend.
//!
//! Options come from command-line arguments with environment variable
//! fallbacks, and sensible defaults for everything optional.
//!
//! # Example
//!
//! ```ignore
//! use adm_backend::config::{Cli, Command};
//! use clap::Parser;
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Routes(_) => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 3000)
//! - `CORS_ORIGIN` - Allowed origins, comma-separated (`*` allows any)
//! - `BASE_PATH` - Path prefix stripped before routing
//! - `PAN_BAGNAT_API_BASE_URL` - User directory API base URL
//! - `PAN_BAGNAT_SERVICE_TOKEN` - Fallback `Authorization` for directory calls

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::error::ConfigError;
use crate::server::base_path::BasePathRewriter;
use crate::server::routes::{DEFAULT_CORS_MAX_AGE, DEFAULT_CORS_ORIGINS};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLI Arguments
// =============================================================================

/// ADM backend - session management API for the ADM frontends.
///
/// Without a subcommand the server is started with the given options.
#[derive(Parser, Debug, Clone)]
#[command(name = "adm-backend")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve(ServeConfig),

    /// Print every registered route and exit
    Routes(ServeConfig),
}

/// Options for serving (and for listing the routes that would be served).
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Path prefix stripped from every request before routing (e.g. /adm).
    #[arg(long, env = "BASE_PATH")]
    pub base_path: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout: u64,

    /// Time allowed for in-flight requests to finish on shutdown, in seconds.
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout: u64,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows the local admin and student frontends.
    /// A `*` entry allows any origin.
    #[arg(long, env = "CORS_ORIGIN", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Preflight cache lifetime (Access-Control-Max-Age) in seconds.
    #[arg(long, default_value_t = DEFAULT_CORS_MAX_AGE)]
    pub cors_max_age: u64,

    // =========================================================================
    // User Directory Configuration
    // =========================================================================
    /// Base URL of the Pan-Bagnat API used to enrol students.
    #[arg(long, env = "PAN_BAGNAT_API_BASE_URL")]
    pub pan_bagnat_url: Option<String>,

    /// Authorization value used when a request carries none.
    #[arg(long, env = "PAN_BAGNAT_SERVICE_TOKEN", hide_env_values = true)]
    pub service_token: Option<String>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidServer(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidServer(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(ref base_path) = self.base_path {
            BasePathRewriter::new(base_path)?;
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured origins, or the local frontends when none are set.
    pub fn resolved_cors_origins(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .cors_origins
            .iter()
            .flatten()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if configured.is_empty() {
            DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
        } else {
            configured
        }
    }

    /// The directory base URL, if set and non-blank.
    pub fn directory_url(&self) -> Option<&str> {
        self.pan_bagnat_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Graceful shutdown timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

// =============================================================================
// Tests
// =============================================================================
