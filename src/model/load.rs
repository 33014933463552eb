use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::graph::GraphDataset;
use super::highlight::HighlightState;

pub fn load_dataset(path: &Path) -> Result<GraphDataset> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph dataset {}", path.display()))?;
    parse_dataset(&raw).with_context(|| format!("failed to parse graph dataset {}", path.display()))
}

pub fn parse_dataset(raw: &str) -> Result<GraphDataset> {
    let dataset: GraphDataset = serde_json::from_str(raw).context("invalid dataset JSON")?;
    if dataset.nodes.is_empty() && !dataset.links.is_empty() {
        return Err(anyhow!(
            "dataset has {} links but no nodes",
            dataset.links.len()
        ));
    }
    Ok(dataset)
}

pub fn load_highlight(path: &Path) -> Result<HighlightState> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read highlight file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse highlight file {}", path.display()))
}
