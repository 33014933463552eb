use eframe::egui::{self, RichText, Ui};

use super::super::ViewModel;
use super::super::filter::{FilterOption, OperatingSystem, Scope};
use super::super::flow::{FlowDirectionFilter, UNCATEGORIZED_ID};

const ANY: &str = "Any";

fn option_combo<T: Copy + PartialEq>(
    ui: &mut Ui,
    label: &str,
    value: &mut Option<T>,
    choices: &[T],
    name: fn(T) -> &'static str,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(label)
            .selected_text(value.map_or(ANY, name))
            .show_ui(ui, |ui| {
                ui.selectable_value(value, None, ANY);
                for choice in choices {
                    ui.selectable_value(value, Some(*choice), name(*choice));
                }
            });
    });
}

/// Combo over `options`; the empty string means "any".
fn choice_combo(ui: &mut Ui, label: &str, value: &mut String, options: &[FilterOption]) {
    let selected = options
        .iter()
        .find(|option| option.value == *value)
        .map_or(ANY, |option| option.label.as_str());

    ui.horizontal(|ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(label)
            .selected_text(selected)
            .show_ui(ui, |ui| {
                ui.selectable_value(value, String::new(), ANY);
                for option in options {
                    ui.selectable_value(value, option.value.clone(), option.label.as_str());
                }
            });
    });
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.heading("Graph Controls");
        ui.separator();

        egui::ScrollArea::vertical()
            .id_salt("controls_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.draw_search(ui, now);
                ui.separator();
                self.draw_highlight(ui);
                ui.separator();
                self.draw_flow_filter(ui);
                ui.separator();
                self.draw_quick_filter(ui);
                ui.separator();
                self.draw_layout_controls(ui, now);
            });
    }

    fn draw_search(&mut self, ui: &mut Ui, now: f64) {
        ui.label("Search nodes (name or kind)")
            .on_hover_text("Highlights fuzzy matches. At least two characters.");
        let response = ui.text_edit_singleline(&mut self.search.query);
        if response.changed()
            && let Some(update) = self.search.query_changed(now)
        {
            self.apply_search_update(update);
        }
        if self.search.is_pending() {
            ui.small("Searching...");
        }
    }

    fn draw_highlight(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Highlight").strong());
        if self.highlight.is_empty() {
            ui.small("Nothing highlighted.");
            return;
        }

        let label = self.highlight.label.as_deref().unwrap_or("Highlight");
        ui.label(label);
        ui.small(format!(
            "{} nodes, {} edges{}",
            self.highlight.node_ids.len(),
            self.highlight.edge_ids.len(),
            if self.highlight.dim_others { "" } else { " (no dimming)" }
        ));
        if ui.button("Clear highlight").clicked() {
            self.clear_highlight();
        }
    }

    fn draw_flow_filter(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Data traffic").strong());
        ui.checkbox(&mut self.flow_filter.show_proposals, "Show proposals")
            .on_hover_text("Include flows that still need review.");
        ui.checkbox(&mut self.flow_filter.enabled, "Filter flows");

        let legend = &self.legend;
        let flow_types = &self.flow_types;
        let filter = &mut self.flow_filter;
        ui.add_enabled_ui(filter.enabled, |ui| {
            ui.horizontal_wrapped(|ui| {
                for direction in [
                    FlowDirectionFilter::All,
                    FlowDirectionFilter::Outgoing,
                    FlowDirectionFilter::Incoming,
                ] {
                    ui.selectable_value(&mut filter.direction, direction, direction.label());
                }
            });

            let category_text = filter
                .data_category_id
                .as_deref()
                .and_then(|id| legend.iter().find(|item| item.id == id))
                .map_or("All categories", |item| item.name.as_str());
            egui::ComboBox::from_id_salt("flow_category")
                .selected_text(category_text)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut filter.data_category_id, None, "All categories");
                    for item in legend.iter().filter(|item| item.id != UNCATEGORIZED_ID) {
                        ui.selectable_value(
                            &mut filter.data_category_id,
                            Some(item.id.clone()),
                            RichText::new(&item.name).color(item.color),
                        );
                    }
                });

            egui::ComboBox::from_id_salt("flow_type")
                .selected_text(filter.flow_type.as_deref().unwrap_or("All types"))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut filter.flow_type, None, "All types");
                    for flow_type in flow_types {
                        ui.selectable_value(
                            &mut filter.flow_type,
                            Some(flow_type.clone()),
                            flow_type.as_str(),
                        );
                    }
                });
        });
    }

    fn draw_quick_filter(&mut self, ui: &mut Ui) {
        ui.label(RichText::new("Quick filter").strong())
            .on_hover_text("Dims everything that does not match. Selected nodes always match.");

        let options = &self.filter_options;
        let filter = &mut self.quick_filter;
        ui.horizontal_wrapped(|ui| {
            ui.checkbox(&mut filter.sla_only, "SLA");
            ui.checkbox(&mut filter.critical_only, "Critical");
            ui.checkbox(&mut filter.pii_only, "PII");
            ui.checkbox(&mut filter.legal_requirements_only, "Legal requirements");
            ui.checkbox(&mut filter.financial_value_only, "Financial value");
        });

        option_combo(ui, "Env", &mut filter.env, &Scope::ALL, Scope::label);
        option_combo(ui, "Domain", &mut filter.domain, &Scope::ALL, Scope::label);
        option_combo(ui, "OS", &mut filter.os, &OperatingSystem::ALL, OperatingSystem::label);
        choice_combo(ui, "Kind", &mut filter.kind, &options.kinds);
        choice_combo(ui, "Owner", &mut filter.owner_team, &options.owner_teams);
        choice_combo(ui, "Backup policy", &mut filter.backup_policy, &options.backup_policies);
        choice_combo(ui, "Department", &mut filter.owning_department, &options.departments);
        choice_combo(ui, "Supplier type", &mut filter.supplier_type, &options.supplier_types);
        choice_combo(
            ui,
            "Criticality",
            &mut filter.business_criticality,
            &options.business_criticality,
        );
        choice_combo(
            ui,
            "Information class",
            &mut filter.information_class,
            &options.information_classes,
        );

        if filter.is_active() {
            ui.small(filter.summary(options));
            if let Some(matches) = &self.filter_matches {
                ui.small(format!("{} matching nodes", matches.len()));
            }
            if ui.button("Reset quick filter").clicked() {
                filter.reset();
            }
        }
    }

    fn draw_layout_controls(&mut self, ui: &mut Ui, now: f64) {
        ui.label(RichText::new("Layout").strong());
        ui.horizontal_wrapped(|ui| {
            if ui.button("Reheat layout").clicked() {
                self.graph.reheat();
            }
            if ui.button("Fit graph").clicked() {
                let ids = self
                    .dataset
                    .nodes
                    .iter()
                    .map(|node| node.id.clone())
                    .collect::<Vec<_>>();
                self.graph.frame_nodes(&ids, 1.0, now);
            }
            if ui
                .button("Jump to node")
                .on_hover_text("Space")
                .clicked()
            {
                self.open_palette();
            }
        });

        let simulation = self.graph.simulation();
        ui.small(format!(
            "alpha {:.3}{} | zoom {:.2}x",
            simulation.alpha(),
            if simulation.is_running() { "" } else { " (settled)" },
            self.graph.viewport().scale(),
        ));
        if !self.selection.is_empty() && ui.button("Clear selection").on_hover_text("Escape").clicked()
        {
            self.selection.clear();
        }
    }
}
