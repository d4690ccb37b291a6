//! Command-line access to the VK API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vk_api::{AuthMode, ClientConfig, Params, VkClient};

/// Call VK API methods with the credentials from a config file
#[derive(Parser)]
#[command(name = "vk-api")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/vk-api/config.json)
    #[arg(long, global = true, env = "VK_API_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call an API method and print its response
    Call {
        /// Method name, e.g. users.get
        method: String,

        /// Authenticate with the server access token
        #[arg(long, conflicts_with = "public")]
        token: bool,

        /// Send the call without credentials
        #[arg(long)]
        public: bool,

        /// Request parameters as key=value
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Fetch a server access token
    ServerToken,

    /// Print the auth key for a viewer
    AuthKey {
        viewer_id: String,
    },
}

/// Auth mode selected by the `call` flags
fn auth_mode(token: bool, public: bool) -> AuthMode {
    if public {
        AuthMode::Public
    } else if token {
        AuthMode::Token
    } else {
        AuthMode::Signed
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path),
        None => ClientConfig::load_default(),
    }
    .context("Failed to load configuration")?;
    let client = VkClient::new(config);

    match cli.command {
        Commands::Call {
            method,
            token,
            public,
            params,
        } => {
            let params: Params = params.into_iter().collect();
            let auth = auth_mode(token, public);
            let response = client.call(&method, params, auth).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::ServerToken => {
            println!("{}", client.get_server_access_token().await?);
        }
        Commands::AuthKey { viewer_id } => {
            println!("{}", client.calculate_auth_key(&viewer_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn call_defaults_to_signed() {
        let cli = Cli::try_parse_from(["vk-api", "call", "users.get", "user_ids=1", "q=a=b"])
            .unwrap();

        match cli.command {
            Commands::Call {
                method,
                token,
                public,
                params,
            } => {
                assert_eq!(method, "users.get");
                assert_eq!(auth_mode(token, public), AuthMode::Signed);
                assert_eq!(
                    params,
                    vec![
                        ("user_ids".to_string(), "1".to_string()),
                        ("q".to_string(), "a=b".to_string()),
                    ]
                );
            }
            _ => panic!("expected call command"),
        }
    }

    #[test]
    fn call_flags_select_mode() {
        let cli = Cli::try_parse_from(["vk-api", "call", "users.get", "--token"]).unwrap();
        let Commands::Call { token, public, .. } = cli.command else {
            panic!("expected call command");
        };
        assert_eq!(auth_mode(token, public), AuthMode::Token);

        let cli = Cli::try_parse_from(["vk-api", "call", "users.get", "--public"]).unwrap();
        let Commands::Call { token, public, .. } = cli.command else {
            panic!("expected call command");
        };
        assert_eq!(auth_mode(token, public), AuthMode::Public);
    }

    #[test]
    fn token_and_public_conflict() {
        assert!(Cli::try_parse_from(["vk-api", "call", "m", "--token", "--public"]).is_err());
    }

    #[test]
    fn bare_parameter_is_rejected() {
        assert!(Cli::try_parse_from(["vk-api", "call", "users.get", "oops"]).is_err());
    }

    #[test]
    fn help_is_not_a_parameter() {
        let err = Cli::try_parse_from(["vk-api", "call", "users.get", "--help"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["vk-api", "server-token"]).unwrap();
        assert!(matches!(cli.command, Commands::ServerToken));

        let cli =
            Cli::try_parse_from(["vk-api", "--config", "/tmp/vk.json", "auth-key", "42"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/vk.json")));
        assert!(matches!(cli.command, Commands::AuthKey { viewer_id } if viewer_id == "42"));
    }
}
