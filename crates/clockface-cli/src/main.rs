use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "clockface", about = "Clockface attendance CLI")]
struct Cli {
    /// Base URL of the clockfaced API.
    #[arg(long, default_value = "http://127.0.0.1:8420")]
    server: String,
    /// API token; falls back to the CLOCKFACE_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a descriptor file for an attendance punch
    Punch {
        /// Path to a JSON file holding the 128-element descriptor array
        descriptor: String,
    },
    /// Enroll (or replace) a face descriptor
    Enroll {
        /// Path to a JSON file holding the 128-element descriptor array
        descriptor: String,
        /// Enroll on behalf of another user (admin only)
        #[arg(long)]
        user_id: Option<i64>,
    },
    /// Show a user's attendance records for a month
    Attendance {
        user_id: i64,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show the company dashboard statistics
    Dashboard,
    /// Show the authenticated user
    Me,
    /// Check daemon health
    Health,
}

fn load_descriptor(path: &str) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read descriptor file {path}"))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not valid JSON"))?;
    if !value.is_array() {
        bail!("{path} must contain a JSON array of numbers");
    }
    Ok(value)
}

fn token(cli: &Cli) -> Result<String> {
    cli.token
        .clone()
        .or_else(|| std::env::var("CLOCKFACE_TOKEN").ok())
        .context("no API token: pass --token or set CLOCKFACE_TOKEN")
}

async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    tracing::debug!(%status, url = %response.url(), "response received");
    let body: Value = response.json().await.unwrap_or(Value::Null);
    println!("{status}");
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.server.trim_end_matches('/').to_string();

    match &cli.command {
        Commands::Punch { descriptor } => {
            let descriptor = load_descriptor(descriptor)?;
            let response = client
                .post(format!("{base}/api/attendance/mark"))
                .bearer_auth(token(&cli)?)
                .json(&json!({ "face_descriptor": descriptor }))
                .send()
                .await?;
            print_response(response).await?;
        }
        Commands::Enroll {
            descriptor,
            user_id,
        } => {
            let descriptor = load_descriptor(descriptor)?;
            let mut body = json!({ "face_descriptor": descriptor });
            if let Some(id) = user_id {
                body["user_id"] = json!(id);
            }
            let response = client
                .post(format!("{base}/api/face-descriptor"))
                .bearer_auth(token(&cli)?)
                .json(&body)
                .send()
                .await?;
            print_response(response).await?;
        }
        Commands::Attendance {
            user_id,
            month,
            year,
        } => {
            let mut request = client
                .get(format!("{base}/api/attendance/user/{user_id}"))
                .bearer_auth(token(&cli)?);
            if let Some(month) = month {
                request = request.query(&[("month", month)]);
            }
            if let Some(year) = year {
                request = request.query(&[("year", year)]);
            }
            print_response(request.send().await?).await?;
        }
        Commands::Dashboard => {
            let response = client
                .get(format!("{base}/api/dashboard/stats"))
                .bearer_auth(token(&cli)?)
                .send()
                .await?;
            print_response(response).await?;
        }
        Commands::Me => {
            let response = client
                .get(format!("{base}/api/me"))
                .bearer_auth(token(&cli)?)
                .send()
                .await?;
            print_response(response).await?;
        }
        Commands::Health => {
            let response = client.get(format!("{base}/health")).send().await?;
            print_response(response).await?;
        }
    }

    Ok(())
}
