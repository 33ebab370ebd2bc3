mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layertrace=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let options = cli.options()?;
    let output_path = cli.output_path();

    tracing::info!(
        input = %cli.input.display(),
        output = %output_path.display(),
        colors = options.num_colors,
        "converting"
    );

    let data = layertrace::convert(&cli.input, &output_path, &options)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    if data.skipped_layers > 0 {
        tracing::warn!(skipped = data.skipped_layers, "some layers could not be traced");
    }
    tracing::info!(layers = data.layers.len(), "conversion complete");

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&data.report())?);
    }

    Ok(())
}
