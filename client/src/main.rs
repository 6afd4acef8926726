//! Crop Yield Prediction - command line client
//!
//! Submits predictions to the backend and manages the local session.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crop_yield_client::{
    AuthApiClient, AuthService, Config, FileStorage, PredictionApiClient, PredictionPipeline,
    Submission,
};
use shared::{
    build_request, FormInput, LegacyPredictionRequest, PredictionResult, RegisterInput,
    SessionStore, LEGACY_REQUIRED,
};

#[derive(Parser)]
#[command(name = "yield-cli", version, about = "Crop yield prediction client")]
struct Cli {
    /// Override the backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Farmer-friendly prediction (location and crop required)
    Predict(FieldArgs),
    /// Legacy prediction with explicit climate inputs
    Legacy(FieldArgs),
    /// Batch of legacy predictions read from a JSON array file
    Batch {
        #[arg(long)]
        file: PathBuf,
    },
    /// Backend health
    Health,
    /// Loaded model information
    ModelInfo,
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Register a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        farm_size: Option<f64>,
    },
    /// Remove the stored session
    Logout,
    /// Show the logged in user
    Whoami,
}

#[derive(Args)]
struct FieldArgs {
    /// Input field as key=value; canonical and legacy names are accepted
    #[arg(short, long = "field", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,
}

impl FieldArgs {
    fn to_input(&self) -> FormInput {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in {:?}", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yield_cli=info,crop_yield_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }

    tracing::debug!("Environment: {}", config.environment);
    tracing::debug!("Backend: {}", config.api.base_url);

    let storage = FileStorage::new(&config.session.storage_dir);
    let store = Arc::new(SessionStore::open(storage).context("reading the stored session")?);
    let predictions = PredictionApiClient::new(&config.api)?;
    let auth = AuthService::new(
        AuthApiClient::new(&config.api)?,
        store.clone(),
        config.demo.enabled,
    );

    match cli.command {
        Command::Predict(args) => {
            let pipeline = PredictionPipeline::new(predictions);
            let submission = pipeline.submit(&args.to_input(), &*store).await;
            match submission {
                Submission::Delivered { result, .. } => print_json(&result)?,
                Submission::Superseded { request_id, latest } => {
                    anyhow::bail!("request {} superseded by {}", request_id, latest)
                }
            }
        }
        Command::Legacy(args) => {
            let result = match build_request(&args.to_input(), LEGACY_REQUIRED)
                .and_then(|request| LegacyPredictionRequest::try_from(&request))
            {
                Ok(request) => {
                    predictions
                        .predict_legacy(&request, store.token().as_deref())
                        .await
                }
                Err(invalid) => PredictionResult::Failure(invalid.into()),
            };
            print_json(&result)?;
        }
        Command::Batch { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let records: Vec<FormInput> = serde_json::from_str(&raw)
                .with_context(|| format!("{} must hold a JSON array of objects", file.display()))?;

            let mut requests = Vec::with_capacity(records.len());
            for (i, record) in records.iter().enumerate() {
                let request = build_request(record, LEGACY_REQUIRED)
                    .and_then(|request| LegacyPredictionRequest::try_from(&request))
                    .with_context(|| format!("entry {}", i))?;
                requests.push(request);
            }

            match predictions.predict_batch(&requests, store.token().as_deref()).await {
                Ok(results) => print_json(&results)?,
                Err(failure) => print_json(&PredictionResult::Failure(failure))?,
            }
        }
        Command::Health => print_json(&predictions.health().await?)?,
        Command::ModelInfo => print_json(&predictions.model_info().await?)?,
        Command::Login { email, password } => {
            let session = auth.login(&email, &password).await?;
            println!("Logged in as {}", session.profile.display_name());
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            farm_size,
        } => {
            let input = RegisterInput {
                email,
                password,
                first_name,
                last_name,
                farm_size,
            };
            let profile = auth.register(&input).await?;
            println!("Registered {}; log in to continue", profile.email);
        }
        Command::Logout => {
            auth.logout()?;
            println!("Logged out");
        }
        Command::Whoami => match auth.current_user() {
            Some(profile) if auth.is_authenticated() => print_json(&profile)?,
            Some(_) => anyhow::bail!("session expired, log in again"),
            None => anyhow::bail!("not logged in"),
        },
    }

    Ok(())
}
