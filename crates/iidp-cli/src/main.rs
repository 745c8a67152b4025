use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod client;

/// Development CLI for the IIDP assessment server.
#[derive(Parser)]
#[command(name = "iidp")]
#[command(about = "IIDP assessment server CLI for testing and development", long_about = None)]
struct Cli {
    /// Server URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fresh assessment for a learner with no prior responses.
    StartAssessment {
        /// Learner id.
        learner_id: String,
    },
    /// Submit one answered item.
    SubmitResponse {
        /// Learner id.
        learner_id: String,
        /// Item id.
        item_id: String,
        /// Whether the answer was correct.
        #[arg(long)]
        correct: bool,
        /// Seconds spent on the item.
        #[arg(long, default_value_t = 20)]
        elapsed_seconds: u32,
    },
    /// Request the learner's next quiz.
    NextQuiz {
        /// Learner id.
        learner_id: String,
    },
    /// Drive an entire quiz end-to-end, answering every item the same way.
    RunQuiz {
        /// Learner id.
        learner_id: String,
        /// Answer every item correctly (default) or incorrectly.
        #[arg(long)]
        incorrect: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let cli = Cli::parse();

    match cli.command {
        Commands::StartAssessment { learner_id } => {
            let profile = client::start_assessment(&cli.server, &learner_id).await?;
            print_json(&profile);
        }
        Commands::SubmitResponse {
            learner_id,
            item_id,
            correct,
            elapsed_seconds,
        } => {
            let result =
                client::submit_response(&cli.server, &learner_id, &item_id, correct, elapsed_seconds)
                    .await?;
            print_json(&result);
        }
        Commands::NextQuiz { learner_id } => {
            let quiz = client::next_quiz(&cli.server, &learner_id).await?;
            print_json(&quiz);
        }
        Commands::RunQuiz { learner_id, incorrect } => {
            let quiz = client::next_quiz(&cli.server, &learner_id).await?;
            let item_ids = quiz["item_ids"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            println!(
                "{} {} items in phase {}",
                "quiz:".bold(),
                item_ids.len(),
                quiz["phase"]
            );
            for item in item_ids {
                let item_id = item.as_str().unwrap_or_default();
                let result = client::submit_response(
                    &cli.server,
                    &learner_id,
                    item_id,
                    !incorrect,
                    20,
                )
                .await?;
                println!(
                    "  {} theta {:.3} -> {:.3}",
                    item_id.dimmed(),
                    result["theta_before"].as_f64().unwrap_or(0.0),
                    result["theta_after"].as_f64().unwrap_or(0.0)
                );
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}
