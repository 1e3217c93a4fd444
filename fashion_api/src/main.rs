mod api;
mod config;
mod error;
mod imaging;

use std::path::PathBuf;

use clap::Parser;
use ort_common::backend::{resolve_backend, BackendPreference};
use tracing::info;
use tracing_subscriber::prelude::*;

use crate::config::ServiceConfig;

#[derive(Debug, Parser)]
pub struct Args {
    /// TOML configuration file; missing files are ignored.
    #[arg(long, default_value = "fashion_api.toml")]
    config: PathBuf,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Route prefix such as `/ai` or `/api`.
    #[arg(long)]
    prefix: Option<String>,
    /// Detection backend: auto, yolo, segmentation or basic.
    #[arg(long)]
    backend: Option<BackendPreference>,
    /// Yolov8 onnx model file to use.
    #[arg(long, short)]
    model: Option<PathBuf>,
    /// Yolov8-seg onnx model file to use.
    #[arg(long)]
    seg_model: Option<PathBuf>,
    /// Whether to attempt to use `cuda` hw acceleration.
    #[arg(long, action, default_value = "false")]
    cuda: bool,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(prefix) = self.prefix {
            config.route_prefix = prefix;
        }
        if let Some(backend) = self.backend {
            config.backend.preference = backend;
        }
        if self.model.is_some() {
            config.backend.yolo_model = self.model;
        }
        if self.seg_model.is_some() {
            config.backend.segmentation_model = self.seg_model;
        }
        config.backend.cuda |= self.cuda;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,fashion_api=info,ort_common=info,fashion_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = ServiceConfig::load(&args.config)?;
    args.apply(&mut config);
    info!("Starting with {config:?}");

    let backend_options = config.backend.clone();
    let backend = tokio::task::spawn_blocking(move || resolve_backend(&backend_options)).await?;
    info!("Resolved {} detection backend", backend.kind());

    let state = api::AppState::new(backend, &config);
    api::serve(state, &config).await
}
