//! CLI command definitions and dispatch.

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use pos_client::AppState;
use pos_client::error::{ApiError, SessionError};
use pos_client::models::{ApiRequest, RegistrationRequest};
use pos_client::session::SessionState;
use secrecy::Secret;
use serde_json::Value;
use std::path::PathBuf;

/// Point-of-sale and inventory client
#[derive(Debug, Parser)]
#[command(name = "pos-client", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding base.yaml / local.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "POS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "POS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in, renewing the session if needed
    Status,
    /// List products
    Products,
    /// List suppliers
    Suppliers,
    /// List sales
    Sales,
    /// List users
    Users,
    /// Show store settings
    Settings,
    /// Fetch a report, e.g. `report sales --param from=2024-01-01`
    Report {
        name: String,
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// GET any protected path relative to the API base URL
    Get { path: String },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

impl Cli {
    pub async fn execute(&self, state: &AppState) -> anyhow::Result<()> {
        let session = &state.session;

        match &self.command {
            Commands::Login { username, password } => {
                let claims = session
                    .login(username, Secret::new(password.clone()))
                    .await
                    .map_err(user_facing)?;
                println!("Logged in as user {}", claims.user_id);
            }
            Commands::Register {
                username,
                password,
                email,
                first_name,
                last_name,
            } => {
                let claims = session
                    .register(RegistrationRequest {
                        username: username.clone(),
                        password: Secret::new(password.clone()),
                        email: email.clone(),
                        first_name: first_name.clone(),
                        last_name: last_name.clone(),
                    })
                    .await
                    .map_err(user_facing)?;
                println!("Registered and logged in as user {}", claims.user_id);
            }
            Commands::Logout => {
                session.logout();
                println!("Logged out");
            }
            Commands::Status => match session.bootstrap_session().await {
                SessionState::Authenticated(claims) => {
                    print_json(&serde_json::to_value(&claims)?)?;
                }
                _ => println!("Not logged in"),
            },
            Commands::Products => print_json(&render(state.api.products().list().await)?)?,
            Commands::Suppliers => print_json(&render(state.api.suppliers().list().await)?)?,
            Commands::Sales => print_json(&render(state.api.sales().list().await)?)?,
            Commands::Users => print_json(&render(state.api.users().list().await)?)?,
            Commands::Settings => print_json(&render(state.api.settings().await)?)?,
            Commands::Report { name, params } => {
                print_json(&render(state.api.report(name, params).await)?)?
            }
            Commands::Get { path } => {
                print_json(&render(state.api.fetch(ApiRequest::get(path)).await)?)?
            }
        }

        Ok(())
    }
}

fn user_facing(err: SessionError) -> anyhow::Error {
    anyhow!("{} ({})", err.user_message(), err)
}

fn render(result: Result<Value, ApiError>) -> anyhow::Result<Value> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::Session(e)) => Err(user_facing(e)),
        Err(e) => Err(e).context("Request failed"),
    }
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
