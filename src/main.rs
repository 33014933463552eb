mod app;
mod model;
mod util;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph dataset (JSON with `nodes` and `links`).
    #[arg(long)]
    dataset: PathBuf,

    /// Highlight query result to apply on start (JSON with `node_ids`/`edge_ids`).
    #[arg(long)]
    highlight: Option<PathBuf>,

    #[arg(long, default_value_t = 1440.0)]
    width: f32,

    #[arg(long, default_value_t = 920.0)]
    height: f32,

    /// Tracing filter directive. Falls back to `RUST_LOG`, then `info`.
    #[arg(long)]
    log_filter: Option<String>,

    #[arg(long, default_value_t = 180)]
    search_debounce_ms: u64,
}

fn log_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(directive: Option<&str>) {
    tracing_subscriber::registry()
        .with(log_filter(directive))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let config = app::AppConfig {
        dataset_path: args.dataset,
        highlight_path: args.highlight,
        search_debounce: Duration::from_millis(args.search_debounce_ms),
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width, args.height]),
        ..Default::default()
    };

    eframe::run_native(
        "infra-atlas",
        options,
        Box::new(move |cc| Ok(Box::new(app::AtlasApp::new(cc, config)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_falls_back_to_info_on_bad_directive() {
        assert_eq!(log_filter(Some("infra_atlas=debug")).to_string(), "infra_atlas=debug");
        assert_eq!(log_filter(Some("infra_atlas=loud")).to_string(), "info");
    }
}
