mod cli;

use clap::Parser;
use cli::{Cli, Commands, ProcessArgs, ResizeArgs};
use std::io::Read;
use std::sync::Arc;
use thumbox::config::Config;
use thumbox::envelope::BatchEnvelope;
use thumbox::observability::Metrics;
use thumbox::pipeline::{BatchCoordinator, InvocationResponse};
use thumbox::storage::StorageClient;
use thumbox::telemetry::{LogSink, MetricSink};
use thumbox::transform::Thumbnailer;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Process(args) => process(config, args).await?,
        Commands::Resize(args) => resize(config, args)?,
    }

    Ok(())
}

/// Run one batch invocation. A fatal envelope error propagates out of the
/// process (non-zero exit) so the invoking runtime can redeliver the batch.
async fn process(config: Config, args: ProcessArgs) -> Result<(), AnyError> {
    let input = if args.envelope == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.envelope)?
    };

    let envelope: BatchEnvelope = serde_json::from_str(&input)?;

    let storage = Arc::new(StorageClient::new(config.storage.clone()));
    let sink: Arc<dyn MetricSink> = Arc::new(LogSink::new());
    let metrics = Arc::new(Metrics::new());
    let coordinator = BatchCoordinator::new(storage, sink, &config, metrics.clone());

    let result = coordinator.process(&envelope).await?;
    let response = InvocationResponse::from_batch(&result)?;

    println!("{}", serde_json::to_string_pretty(&response)?);

    let snapshot = metrics.snapshot();
    info!(
        batches_processed = snapshot.batches_processed,
        items_succeeded = snapshot.items_succeeded,
        items_failed = snapshot.items_failed,
        items_skipped = snapshot.items_skipped,
        "Run complete"
    );

    Ok(())
}

fn resize(config: Config, args: ResizeArgs) -> Result<(), AnyError> {
    let data = std::fs::read(&args.input)?;

    let thumbnailer = Thumbnailer::new(&config.pipeline);
    let thumbnail = thumbnailer.resize(&data)?;

    std::fs::write(&args.output, &thumbnail.data)?;

    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        original_bytes = data.len(),
        thumbnail_bytes = thumbnail.data.len(),
        original_dimensions = ?thumbnail.original_dimensions,
        final_dimensions = ?thumbnail.final_dimensions,
        "Thumbnail written"
    );

    Ok(())
}
