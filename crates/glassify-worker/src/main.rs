//! Glassify overlay binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use glassify_media::{
    load_image, load_still_frame, DirectoryCapture, NearWhiteKeyer, RasterSurface,
    SidecarLandmarkDetector,
};
use glassify_models::PipelineMode;
use glassify_worker::{AppConfig, ModeCoordinator};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting glassify");

    if let Err(e) = run().await {
        error!("glassify failed: {:#}", e);
        std::process::exit(1);
    }

    info!("glassify shutdown complete");
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glassify=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    config.validate()?;
    info!(
        pipeline = %serde_json::to_string(&config.pipeline)?,
        mode = %config.mode,
        frames_dir = %config.frames_dir.display(),
        "Loaded configuration"
    );

    let capture = Arc::new(DirectoryCapture::new(&config.frames_dir));
    let detector = Arc::new(SidecarLandmarkDetector::new());
    let surface = RasterSurface::new(config.pipeline.capture.width, config.pipeline.capture.height);

    let (coordinator, mut notices) =
        ModeCoordinator::new(surface, detector, capture, config.pipeline.clone());
    let mut coordinator = coordinator
        .with_preprocessor(Arc::new(NearWhiteKeyer::with_threshold(config.white_threshold)));

    let notice_task = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            if notice.is_fatal() {
                error!(%notice, "Notice");
            } else {
                warn!(%notice, "Notice");
            }
        }
    });

    coordinator
        .initialize()
        .await
        .context("face detection could not be started")?;

    match &config.asset_path {
        Some(path) => {
            let raw = load_image(path)
                .with_context(|| format!("loading overlay asset {}", path.display()))?;
            coordinator.set_asset(raw).await;
        }
        None => warn!("No overlay asset configured (GLASSIFY_ASSET), only diagnostics are drawn"),
    }

    match coordinator.set_mode(config.mode).await? {
        PipelineMode::Streaming => {
            tokio::select! {
                _ = tokio::time::sleep(config.run_duration) => {
                    info!(secs = config.run_duration.as_secs(), "Run duration elapsed");
                }
                _ = tokio::signal::ctrl_c() => info!("Received shutdown signal"),
            }
        }
        PipelineMode::SingleShot => match &config.still_image {
            Some(path) => {
                let frame = load_still_frame(path)
                    .with_context(|| format!("loading still image {}", path.display()))?;
                let outcome = coordinator.set_still_image(frame).await;
                info!(?outcome, "Single-shot pass finished");
            }
            None => warn!("No still image configured (GLASSIFY_STILL_IMAGE)"),
        },
        PipelineMode::Stopped => {}
    }

    if let Some(output) = &config.output_path {
        export(&coordinator, output).await?;
    }

    coordinator.shutdown().await?;
    drop(coordinator);
    notice_task.await.ok();
    Ok(())
}

/// Write the last rendered frame with both surface layers blended on top.
async fn export(coordinator: &ModeCoordinator<RasterSurface>, output: &Path) -> anyhow::Result<()> {
    let frame = coordinator.state().lock().await.last_frame.clone();
    let Some(frame) = frame else {
        warn!("Nothing was rendered, skipping export");
        return Ok(());
    };

    let composed = coordinator
        .compositor()
        .lock()
        .await
        .surface()
        .composite_onto(frame.image());
    composed
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        path = %output.display(),
        width = composed.width(),
        height = composed.height(),
        "Composited frame written"
    );
    Ok(())
}
