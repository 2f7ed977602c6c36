//! Command-line arguments

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use rets_client::{ClientConfig, Format, RequestMethod, RetsVersion};
use std::path::PathBuf;
use std::time::Duration;

/// Where and how to connect
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Login URL of the RETS server
    #[arg(long, env = "RETS_LOGIN_URL")]
    pub login_url: String,

    /// User-Agent sent with every request
    #[arg(long, env = "RETS_USER_AGENT", default_value = concat!("rets-cli/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Password for RETS user-agent authentication
    #[arg(long, env = "RETS_USER_AGENT_PASSWORD", hide_env_values = true)]
    pub user_agent_password: Option<String>,

    #[arg(long, env = "RETS_USERNAME")]
    pub username: String,

    #[arg(long, env = "RETS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Protocol version (1.5, 1.7, 1.7.2, 1.8)
    #[arg(long = "rets-version", env = "RETS_VERSION", default_value = "1.7")]
    pub rets_version: String,

    /// Tabular format (COMPACT or COMPACT-DECODED)
    #[arg(long, env = "RETS_FORMAT", default_value = "COMPACT")]
    pub format: String,

    /// HTTP method for transactions (GET or POST)
    #[arg(long, env = "RETS_REQUEST_METHOD", default_value = "GET")]
    pub method: String,

    /// Read timeout in seconds
    #[arg(long, env = "RETS_READ_TIMEOUT", default_value_t = 600)]
    pub timeout: u64,
}

impl ConnectionArgs {
    /// Build the client configuration, rejecting unknown versions and formats
    pub fn to_config(&self) -> Result<ClientConfig> {
        let version: RetsVersion = self
            .rets_version
            .parse()
            .with_context(|| format!("invalid --rets-version '{}'", self.rets_version))?;
        let format: Format = self
            .format
            .parse()
            .with_context(|| format!("invalid --format '{}'", self.format))?;
        let method: RequestMethod = self
            .method
            .parse()
            .with_context(|| format!("invalid --method '{}'", self.method))?;

        let mut config = ClientConfig::new(&self.login_url, &self.user_agent)
            .with_rets_version(version)
            .with_format(format)
            .with_request_method(method)
            .with_read_timeout(Duration::from_secs(self.timeout));
        if let Some(password) = &self.user_agent_password {
            config = config.with_user_agent_password(password);
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in, print the login reply and log out
    Login,

    /// Fetch metadata
    Metadata {
        /// Metadata type, e.g. METADATA-CLASS
        #[arg(value_name = "TYPE")]
        metadata_type: String,

        /// Metadata ID, e.g. Property or *
        #[arg(default_value = "0")]
        id: String,
    },

    /// Run a DMQL2 search
    Search {
        /// Search type (resource), e.g. Property
        resource: String,

        /// Class, e.g. RES
        class: String,

        /// DMQL2 query, e.g. (ListPrice=300000+)
        query: String,

        /// Comma-separated list of fields to return
        #[arg(long)]
        select: Option<String>,

        /// Maximum number of rows
        #[arg(long)]
        limit: Option<u32>,

        /// Extra request parameter as NAME=VALUE, may be repeated
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Retrieve objects such as photos
    Object {
        /// Resource, e.g. Property
        resource: String,

        /// Object type, e.g. Photo
        #[arg(value_name = "TYPE")]
        object_type: String,

        /// Object ID, e.g. 1001:* or 1001:1:2
        id: String,

        /// Ask for object URLs instead of object data
        #[arg(long)]
        location: bool,

        /// Write each object to <Content-ID>_<Object-ID>.<ext> in this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn parse_param(value: &str) -> std::result::Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{value}'")),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(subcommand)]
        command: Command,
    }

    const BASE: [&str; 7] = [
        "rets",
        "--login-url",
        "https://rets.example.com/login",
        "--username",
        "agent",
        "--password",
        "secret",
    ];

    fn parse(extra: &[&str]) -> TestCli {
        TestCli::try_parse_from(BASE.iter().chain(extra)).unwrap()
    }

    #[test]
    fn test_config_from_flags() {
        let cli = parse(&["--rets-version", "RETS/1.8", "--method", "post", "login"]);
        let config = cli.connection.to_config().unwrap();
        assert_eq!(config.login_url, "https://rets.example.com/login");
        assert_eq!(config.rets_version, RetsVersion::V1_8);
        assert_eq!(config.request_method, RequestMethod::Post);
        assert_eq!(config.format, Format::Compact);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let cli = parse(&["--rets-version", "2.0", "login"]);
        assert!(cli.connection.to_config().is_err());
    }

    #[test]
    fn test_search_params() {
        let cli = parse(&[
            "search",
            "Property",
            "RES",
            "(City=Springfield)",
            "--limit",
            "5",
            "--param",
            "StandardNames=1",
        ]);
        match cli.command {
            Command::Search { limit, params, .. } => {
                assert_eq!(limit, Some(5));
                assert_eq!(params, [("StandardNames".to_string(), "1".to_string())]);
            }
            other => unreachable!("parsed {other:?}"),
        }
    }

    #[test]
    fn test_param_needs_name() {
        assert!(parse_param("=1").is_err());
        assert!(parse_param("Offset").is_err());
        assert_eq!(
            parse_param("Query=(A=1)").unwrap(),
            ("Query".to_string(), "(A=1)".to_string())
        );
    }
}
