use std::collections::{HashMap, HashSet};

use eframe::egui::Color32;

use crate::util::stable_index;

use super::super::render_utils::OBSERVABLE10;
use super::TaggedFlow;

pub(in crate::app) const UNCATEGORIZED_ID: &str = "__none__";
const UNCATEGORIZED_NAME: &str = "Uncategorized";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct LegendItem {
    pub id: String,
    pub name: String,
    pub color: Color32,
}

pub(in crate::app) fn category_id(data_category_id: Option<&str>) -> String {
    match data_category_id {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => UNCATEGORIZED_ID.to_owned(),
    }
}

pub(in crate::app) fn category_name(id: &str, names: &HashMap<String, String>) -> String {
    if id == UNCATEGORIZED_ID {
        return UNCATEGORIZED_NAME.to_owned();
    }

    names.get(id).cloned().unwrap_or_else(|| {
        let prefix = id.chars().take(8).collect::<String>();
        format!("Data category ({prefix}…)")
    })
}

pub(in crate::app) fn color_for_category(id: &str) -> Color32 {
    OBSERVABLE10[stable_index(id, OBSERVABLE10.len())]
}

/// Distinct category ids across every edge's flows, in first-seen order.
pub(in crate::app) fn visible_category_ids<'a>(
    flows: impl IntoIterator<Item = &'a [TaggedFlow]>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for edge_flows in flows {
        for tagged in edge_flows {
            let id = category_id(tagged.flow.data_category_id.as_deref());
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    ids
}

pub(in crate::app) fn build_legend(
    category_ids: &[String],
    names: &HashMap<String, String>,
) -> Vec<LegendItem> {
    let mut legend = category_ids
        .iter()
        .map(|id| LegendItem {
            id: id.clone(),
            name: category_name(id, names),
            color: color_for_category(id),
        })
        .collect::<Vec<_>>();

    legend.sort_by(|a, b| {
        let a_none = a.id == UNCATEGORIZED_ID;
        let b_none = b.id == UNCATEGORIZED_ID;
        a_none
            .cmp(&b_none)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    legend
}
