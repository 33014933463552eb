use eframe::egui::{self, Align2, Context, RichText, vec2};

use super::super::ViewModel;

const MAX_LIST_HEIGHT: f32 = 360.0;

impl ViewModel {
    pub(in crate::app) fn draw_palette(&mut self, ctx: &Context, now: f64) {
        if !self.palette.is_open() {
            return;
        }

        let mut open = true;
        let mut picked = None;
        egui::Window::new("Jump to node")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_TOP, vec2(0.0, 80.0))
            .default_width(420.0)
            .show(ctx, |ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.palette.query)
                        .hint_text("Type a node name or kind")
                        .desired_width(f32::INFINITY),
                );
                if self.focus_palette_query {
                    response.request_focus();
                    self.focus_palette_query = false;
                }
                if response.changed() {
                    self.palette.query_changed();
                }

                let active = self.palette.active_index();
                let rows = self
                    .palette
                    .results()
                    .into_iter()
                    .map(|item| (item.title.clone(), item.subtitle.clone()))
                    .collect::<Vec<_>>();
                if rows.is_empty() {
                    ui.small("No matching nodes.");
                    return;
                }

                egui::ScrollArea::vertical()
                    .max_height(MAX_LIST_HEIGHT)
                    .show(ui, |ui| {
                        for (index, (title, subtitle)) in rows.iter().enumerate() {
                            let mut text = RichText::new(title);
                            if index == active {
                                text = text.strong();
                            }
                            let row = ui.selectable_label(index == active, text);
                            let row = match subtitle {
                                Some(subtitle) => row.on_hover_text(subtitle.as_str()),
                                None => row,
                            };
                            if row.clicked() {
                                picked = Some(index);
                            }
                        }
                    });
                ui.small("↑/↓ to move, Enter to select, Esc to close");
            });

        if let Some(index) = picked {
            self.palette.set_active(index);
            let outcome = self.palette.confirm();
            self.palette_outcome(outcome, now);
        } else if !open {
            self.close_palette();
        }
    }
}
