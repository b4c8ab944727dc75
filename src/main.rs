//! Command-line entry point.
//!
//! ```text
//! otlp-file-sink validate sink.toml          # print the validated settings
//! otlp-file-sink emit sink.toml --spans 10   # write sample spans to every exporter
//! ```
//!
//! A settings document that fails validation exits with status 1 and the
//! error on stderr, e.g.
//! `exporter "file/2" has invalid configuration: format type is not supported`.

use clap::{Parser, Subcommand};
use opentelemetry::KeyValue;
use opentelemetry_sdk::resource::Resource;
use otlp_file_sink::config::{load_config, Settings};
use otlp_file_sink::exporter::{create_tracer_provider, FileSpanExporter};
use otlp_file_sink::observability::{init_logging, init_tracing, with_startup_logging};
use otlp_file_sink::{FileExporterFactory, FileSinkError, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Target of the sample spans; anything outside the crate's own target is exported.
const EMIT_TARGET: &str = "emit";

#[derive(Parser)]
#[command(name = "otlp-file-sink")]
#[command(about = "Telemetry file sink with validated exporter configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a settings document, then print the result as JSON
    Validate {
        /// Path to the TOML settings document
        config: PathBuf,
    },
    /// Write sample spans through every configured exporter
    Emit {
        /// Path to the TOML settings document
        config: PathBuf,

        /// Number of sample spans to emit
        #[arg(short, long, default_value_t = 1)]
        spans: u32,

        /// `service.name` resource attribute
        #[arg(long, default_value = "otlp-file-sink")]
        service: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate { config } => {
            let settings = with_startup_logging(|| load_config(&config))?;
            init_logging(settings.logging.level.as_deref());

            for (id, exporter) in &settings.exporters {
                tracing::info!(
                    id = %id,
                    path = %exporter.path,
                    format = %exporter.format,
                    compression = %exporter.compression,
                    rotation = exporter.rotation.is_some(),
                    "exporter configuration is valid"
                );
            }

            let json = serde_json::to_string_pretty(&settings)
                .map_err(|e| FileSinkError::Encode(e.to_string()))?;
            println!("{json}");
        }
        Commands::Emit {
            config,
            spans,
            service,
        } => {
            let settings = with_startup_logging(|| load_config(&config))?;
            emit(&settings, spans, service)?;
        }
    }

    Ok(())
}

fn emit(settings: &Settings, spans: u32, service: String) -> Result<()> {
    let resource = Resource::new(vec![KeyValue::new("service.name", service)]);
    let factory = FileExporterFactory::new();

    let exporters = settings
        .exporters
        .values()
        .map(|config| factory.create_exporter(Arc::new(config.clone()), resource.clone()))
        .collect::<Result<Vec<FileSpanExporter>>>()?;

    let provider = create_tracer_provider(exporters, resource);
    init_tracing(settings.logging.level.as_deref(), &provider);

    tracing::info!(
        exporters = settings.exporters.len(),
        spans,
        "emitting sample spans"
    );

    for sequence in 0..spans {
        let span = tracing::info_span!(target: EMIT_TARGET, "sample", sequence);
        span.in_scope(|| {
            tracing::info!(target: EMIT_TARGET, sequence, "sample event");
        });
    }

    for result in provider.force_flush() {
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to flush exporter");
        }
    }

    Ok(())
}
