use std::collections::HashSet;

use serde::Deserialize;

/// Node/edge id sets produced by search, path and compliance queries.
///
/// Orthogonal to selection: it only drives dimming.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HighlightState {
    #[serde(default)]
    pub node_ids: HashSet<String>,
    #[serde(default)]
    pub edge_ids: HashSet<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_dim_others")]
    pub dim_others: bool,
}

fn default_dim_others() -> bool {
    true
}

impl HighlightState {
    pub fn from_ids(
        node_ids: impl IntoIterator<Item = String>,
        edge_ids: impl IntoIterator<Item = String>,
        label: Option<String>,
    ) -> Self {
        Self {
            node_ids: node_ids.into_iter().collect(),
            edge_ids: edge_ids.into_iter().collect(),
            label,
            dim_others: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty() && self.edge_ids.is_empty()
    }

    /// Dimming applies only when there is something to highlight and the
    /// producer asked for the rest to fade.
    pub fn dims_others(&self) -> bool {
        !self.is_empty() && self.dim_others
    }
}
