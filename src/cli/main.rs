use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde_json::json;

#[derive(Parser)]
#[command(name = "cgpa-cli")]
#[command(about = "CGPA Forecast CLI", long_about = None, version)]
struct Cli {
    #[arg(short, long, env = "CGPA_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered models
    Models {
        /// Only active models
        #[arg(short, long, conflicts_with = "inactive")]
        active: bool,

        /// Only inactive models
        #[arg(short, long)]
        inactive: bool,
    },

    /// Predict a batch with one model
    Predict {
        #[arg(value_name = "MODEL_ID")]
        id: u64,

        /// Six comma-separated features; repeat for a batch
        #[arg(short, long = "row", required = true, value_parser = parse_row)]
        rows: Vec<Row>,
    },

    /// Score one student and print recommendations
    Score {
        #[arg(long, default_value = "0")]
        repeated_course: f64,

        #[arg(long)]
        attendance: f64,

        #[arg(long, default_value = "0")]
        part_time_job: f64,

        #[arg(long)]
        motivation_level: f64,

        #[arg(long, default_value = "0")]
        first_generation: f64,

        #[arg(long)]
        friends_performance: f64,
    },

    /// Show model introspection data
    Info {
        #[arg(value_name = "MODEL_ID")]
        id: u64,
    },

    /// Check server health, including every model artifact
    Health,

    /// Show recent prediction logs
    Logs {
        #[arg(short, long)]
        model_id: Option<u64>,
    },
}

/// One feature row given on the command line
#[derive(Debug, Clone, PartialEq)]
struct Row(Vec<f64>);

fn parse_row(value: &str) -> Result<Row, String> {
    value
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid feature '{}': {}", field.trim(), e))
        })
        .collect::<Result<Vec<f64>, String>>()
        .map(Row)
}

/// Print the JSON body; non-success statuses become errors after printing
async fn print_response(response: Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .with_context(|| format!("server returned {} with a non-JSON body", status))?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        bail!("request failed with status {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let response = match cli.command {
        Commands::Models { active, inactive } => {
            let mut url = format!("{}/models", endpoint);
            if active {
                url.push_str("?is_active=true");
            } else if inactive {
                url.push_str("?is_active=false");
            }
            client.get(&url).send().await
        }

        Commands::Predict { id, rows } => {
            let data: Vec<Vec<f64>> = rows.into_iter().map(|Row(row)| row).collect();
            client
                .post(format!("{}/models/{}/predict", endpoint, id))
                .json(&json!({ "data": data }))
                .send()
                .await
        }

        Commands::Score {
            repeated_course,
            attendance,
            part_time_job,
            motivation_level,
            first_generation,
            friends_performance,
        } => {
            client
                .post(format!("{}/predict", endpoint))
                .json(&json!({
                    "repeated_course": repeated_course,
                    "attendance": attendance,
                    "part_time_job": part_time_job,
                    "motivation_level": motivation_level,
                    "first_generation": first_generation,
                    "friends_performance": friends_performance,
                }))
                .send()
                .await
        }

        Commands::Info { id } => {
            client
                .get(format!("{}/models/{}/model_info", endpoint, id))
                .send()
                .await
        }

        Commands::Health => {
            let response = client
                .get(format!("{}/health", endpoint))
                .send()
                .await
                .with_context(|| format!("failed to reach {}", endpoint))?;
            print_response(response).await?;

            client
                .get(format!("{}/models/health_check", endpoint))
                .send()
                .await
        }

        Commands::Logs { model_id } => {
            let mut url = format!("{}/prediction_logs", endpoint);
            if let Some(id) = model_id {
                url.push_str(&format!("?model_id={}", id));
            }
            client.get(&url).send().await
        }
    };

    let response = response.with_context(|| format!("failed to reach {}", endpoint))?;
    print_response(response).await
}
