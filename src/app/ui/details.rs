use std::collections::HashMap;

use eframe::egui::{self, RichText, Sense, Ui, vec2};
use serde_json::Value;

use crate::model::{Flow, GraphLink, GraphNode};
use crate::util::short_id;

use super::super::ViewModel;
use super::super::flow::{
    UNCATEGORIZED_ID, category_name, normalize_flow_dir, normalize_frequency_class,
};

const ETAG_PREVIEW_CHARS: usize = 12;

fn metadata_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "—".to_owned(),
        other => other.to_string(),
    }
}

/// What the user clicked in the panel, applied after drawing.
enum DetailsAction {
    SelectNode(String),
    FocusEdge(String),
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let mut action = None;
        egui::ScrollArea::vertical()
            .id_salt("details_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(edge_id) = self.selection.edge()
                    && let Some(link) = self.dataset.link(edge_id)
                {
                    action = self.draw_edge_details(ui, link);
                    ui.separator();
                }

                match self.selection.nodes() {
                    [] if self.selection.edge().is_none() => {
                        ui.label("Select a node or edge in the graph, or press Space.");
                    }
                    [] => {}
                    [id] => {
                        if let Some(node) = self.dataset.node(id) {
                            action = action.take().or(self.draw_node_details(ui, node));
                        } else {
                            ui.label("Selected node no longer exists in the dataset.");
                        }
                    }
                    ids => {
                        ui.label(RichText::new(format!("{} nodes selected", ids.len())).strong());
                        for id in ids {
                            let name = self.dataset.node(id).map_or(id.as_str(), GraphNode::display_name);
                            let text = if self.selection.primary() == Some(id.as_str()) {
                                RichText::new(name).strong()
                            } else {
                                RichText::new(name)
                            };
                            if ui.link(text).clicked() {
                                action = Some(DetailsAction::SelectNode(id.clone()));
                            }
                        }
                    }
                }

                ui.separator();
                self.draw_legend(ui);
            });

        match action {
            Some(DetailsAction::SelectNode(id)) => self.selection.select_single(&id),
            Some(DetailsAction::FocusEdge(id)) => self.selection.focus_edge(&id),
            None => {}
        }
    }

    fn draw_node_details(&self, ui: &mut Ui, node: &GraphNode) -> Option<DetailsAction> {
        let mut action = None;

        ui.label(RichText::new(node.display_name()).strong());
        if !node.kind.is_empty() {
            ui.label(format!("Kind: {}", node.kind));
        }
        ui.small(node.id.as_str());
        if !node.etag.is_empty() {
            ui.small(format!("etag: {}", short_id(&node.etag, ETAG_PREVIEW_CHARS)))
                .on_hover_text(node.etag.as_str());
        }

        if !node.metadata.is_empty() {
            ui.add_space(6.0);
            egui::Grid::new("node_metadata")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    for (key, value) in &node.metadata {
                        ui.label(key.as_str());
                        ui.label(metadata_text(value));
                        ui.end_row();
                    }
                });
        }

        ui.separator();
        ui.label(RichText::new("Connections").strong());
        let mut connected = 0;
        for link in self.dataset.links.iter().filter(|link| link.touches(&node.id)) {
            connected += 1;
            let (arrow, other) = if link.source == node.id {
                ("→", &link.target)
            } else {
                ("←", &link.source)
            };
            let other = self.dataset.node(other).map_or(other.as_str(), GraphNode::display_name);
            let flows = link.flows.len();
            if ui
                .link(format!("{arrow} {other}  ({flows} flows)"))
                .on_hover_text(link.id.as_str())
                .clicked()
            {
                action = Some(DetailsAction::FocusEdge(link.id.clone()));
            }
        }
        if connected == 0 {
            ui.small("No connections.");
        }

        action
    }

    fn draw_edge_details(&self, ui: &mut Ui, link: &GraphLink) -> Option<DetailsAction> {
        let mut action = None;
        let name = |id: &str| {
            self.dataset
                .node(id)
                .map_or_else(|| id.to_owned(), |node| node.display_name().to_owned())
        };

        ui.label(RichText::new(format!("{} → {}", name(&link.source), name(&link.target))).strong());
        if !link.kind.is_empty() {
            ui.label(format!("Kind: {}", link.kind));
        }
        ui.small(link.id.as_str());
        ui.horizontal(|ui| {
            for endpoint in [&link.source, &link.target] {
                if self.dataset.node(endpoint).is_some() && ui.link(name(endpoint)).clicked() {
                    action = Some(DetailsAction::SelectNode(endpoint.clone()));
                }
            }
        });

        ui.add_space(6.0);
        ui.label(RichText::new("Flows").strong());
        let proposals = self
            .flow_filter
            .show_proposals
            .then_some(link.review_flows.as_slice())
            .unwrap_or_default();
        if link.flows.is_empty() && proposals.is_empty() {
            ui.small("No flows on this edge.");
        }
        for flow in &link.flows {
            self.draw_flow_row(ui, flow, false);
        }
        for flow in proposals {
            self.draw_flow_row(ui, flow, true);
        }

        action
    }

    fn draw_flow_row(&self, ui: &mut Ui, flow: &Flow, is_review: bool) {
        let category = flow
            .data_category_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(UNCATEGORIZED_ID);
        let (category_label, color) = self
            .legend
            .iter()
            .find(|item| item.id == category)
            .map(|item| (item.name.clone(), Some(item.color)))
            .unwrap_or_else(|| (category_name(category, &HashMap::new()), None));

        let title = if flow.flow_type.trim().is_empty() {
            "Flow"
        } else {
            flow.flow_type.as_str()
        };
        let mut heading = RichText::new(if is_review {
            format!("Proposal: {title}")
        } else {
            title.to_owned()
        });
        if let Some(color) = color {
            heading = heading.color(color);
        }

        ui.group(|ui| {
            ui.label(heading);
            ui.small(format!("Category: {category_label}"));
            let raw = flow.direction.as_deref().unwrap_or_default();
            ui.small(format!(
                "Direction: {} (raw: {})",
                normalize_flow_dir(flow.direction.as_deref()).as_str(),
                if raw.is_empty() { "—" } else { raw }
            ));
            let frequency = flow.frequency.as_deref().unwrap_or_default();
            ui.small(format!(
                "Frequency: {} ({})",
                if frequency.is_empty() { "—" } else { frequency },
                normalize_frequency_class(flow.frequency.as_deref()).label()
            ));
            if let Some(protocol) = flow.protocol.as_deref().filter(|value| !value.is_empty()) {
                ui.small(format!("Protocol: {protocol}"));
            }
            if flow.implicit {
                ui.small("Implicit flow");
            }
            if let Some(note) = flow.note.as_deref().filter(|value| !value.is_empty()) {
                ui.small(format!("Note: {note}"));
            }
        });
    }

    fn draw_legend(&self, ui: &mut Ui) {
        ui.label(RichText::new("Flow categories").strong());
        if self.legend.is_empty() {
            ui.small("No flows in this dataset.");
            return;
        }

        for item in &self.legend {
            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                ui.painter().rect_filled(rect, 2.0, item.color);
                ui.label(item.name.as_str());
            });
        }
    }
}
