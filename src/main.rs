//! Log Anomaly Detector - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use log_anomaly_detector::constants::{APP_NAME, APP_VERSION};
use log_anomaly_detector::logic::config::DetectorConfig;
use log_anomaly_detector::logic::detector::Detector;
use log_anomaly_detector::logic::encoder::HashingEncoder;
use log_anomaly_detector::logic::feedback::{FactStoreClient, FeedbackProvider, NoFeedback};
use log_anomaly_detector::logic::jobs::{DetectionContext, JobKind, LogTracer};
use log_anomaly_detector::logic::storage::{sink_from_config, source_from_config};

#[derive(Parser)]
#[command(name = "log-anomaly-detector")]
#[command(author, version, about = "SOM based log anomaly detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a detection job
    Run {
        /// sompy.train | sompy.inference | sompy.train.inference
        #[arg(short, long, value_parser = parse_job, default_value = "sompy.train.inference")]
        job: JobKind,

        /// Stop after the first successful pass
        #[arg(long)]
        single_run: bool,
    },

    /// List available jobs
    Jobs,
}

fn parse_job(s: &str) -> Result<JobKind, String> {
    s.parse::<JobKind>().map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Jobs => {
            for job in JobKind::ALL {
                println!("{}", job);
            }
            Ok(())
        }
        Commands::Run { job, single_run } => run(job, single_run),
    }
}

fn run(job: JobKind, single_run: bool) -> Result<()> {
    log::info!("Starting {} v{} (job {})", APP_NAME, APP_VERSION, job);

    let config = DetectorConfig::from_env();
    config.validate().context("invalid configuration")?;

    let encoder = HashingEncoder::new(config.vector_length)?;
    let source = source_from_config(&config)?;
    let sink = sink_from_config(&config)?;
    let feedback: Box<dyn FeedbackProvider> = match &config.fact_store_url {
        Some(url) => {
            log::info!("Fact store feedback enabled: {}", url);
            Box::new(FactStoreClient::new(url))
        }
        None => Box::new(NoFeedback),
    };

    let ctx = DetectionContext::new(config, Box::new(encoder), source, sink, feedback);
    let mut detector = Detector::for_job(ctx, job).with_tracer(Box::new(LogTracer));

    detector.run(single_run).with_context(|| format!("job {} failed", job))?;

    let stats = detector.stats();
    log::info!(
        "Done: {} training runs, {} inference runs, {} records scored, {} anomalies, {} suppressed",
        stats.training_runs,
        stats.inference_runs,
        stats.records_scored,
        stats.anomalies,
        stats.false_positives_suppressed
    );
    Ok(())
}
