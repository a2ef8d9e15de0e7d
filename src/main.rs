use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentiment_csv::{Config, ProcessingSummary, SentimentCsvError};

fn main() -> ExitCode {
    let config = Config::parse();
    init_tracing(config.verbose);

    match run(&config) {
        Ok(summary) => {
            println!(
                "Sentiment analysis completed ({} rows)! Check the output file: {}",
                summary.rows,
                config.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err:?}");
            err.downcast_ref::<SentimentCsvError>()
                .map_or(ExitCode::FAILURE, SentimentCsvError::exit_code)
        }
    }
}

fn run(config: &Config) -> Result<ProcessingSummary> {
    sentiment_csv::run(config).with_context(|| {
        format!(
            "Sentiment analysis of {} failed",
            config.input.display()
        )
    })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sentiment_csv=debug,ort=info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("sentiment_csv=info,ort=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
