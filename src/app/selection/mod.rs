//! Node/edge selection state machine.

mod palette;

pub(in crate::app) use palette::{CommandPalette, PaletteOutcome};

/// Modifier keys held during a node click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct ClickModifiers {
    pub toggle: bool,
    pub add: bool,
}

impl ClickModifiers {
    pub fn from_egui(modifiers: eframe::egui::Modifiers) -> Self {
        Self {
            toggle: modifiers.command || modifiers.ctrl,
            add: modifiers.shift,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct Selection {
    primary: Option<String>,
    nodes: Vec<String>,
    edge: Option<String>,
    revision: u64,
}

impl Selection {
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn edge(&self) -> Option<&str> {
        self.edge.as_deref()
    }

    /// Bumped on every change so dependents can skip unchanged frames.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edge.is_none()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node == id)
    }

    /// Node click from the graph. Plain clicks replace the selection, except
    /// that clicking the sole selected node clears it. Toggle flips
    /// membership; add only inserts.
    pub fn click_node(&mut self, id: &str, modifiers: ClickModifiers) {
        if id.is_empty() {
            return;
        }

        let plain = !modifiers.toggle && !modifiers.add;
        if plain && self.edge.is_none() && self.nodes.len() == 1 && self.nodes[0] == id {
            self.clear();
            return;
        }

        if !plain {
            self.edge = None;
            let existing = self.nodes.iter().position(|node| node == id);
            match existing {
                Some(index) if modifiers.toggle => {
                    self.nodes.remove(index);
                    self.primary = self.nodes.last().cloned();
                }
                Some(_) => self.primary = Some(id.to_owned()),
                None => {
                    self.nodes.push(id.to_owned());
                    self.primary = Some(id.to_owned());
                }
            }
            self.revision += 1;
            return;
        }

        self.select_single(id);
    }

    pub fn select_single(&mut self, id: &str) {
        self.primary = Some(id.to_owned());
        self.nodes = vec![id.to_owned()];
        self.edge = None;
        self.revision += 1;
    }

    /// Graph edge click: the edge replaces any node selection.
    pub fn select_edge(&mut self, id: &str) {
        self.primary = None;
        self.nodes.clear();
        self.edge = Some(id.to_owned());
        self.revision += 1;
    }

    /// Focuses an edge without touching the node selection, as when an edge
    /// is picked from the details panel.
    pub fn focus_edge(&mut self, id: &str) {
        self.edge = Some(id.to_owned());
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        if self.is_empty() && self.primary.is_none() {
            return;
        }
        self.primary = None;
        self.nodes.clear();
        self.edge = None;
        self.revision += 1;
    }

    /// Drops ids that no longer exist after a dataset refresh.
    pub fn retain_existing(&mut self, node_exists: impl Fn(&str) -> bool, edge_exists: impl Fn(&str) -> bool) {
        let before = (self.nodes.len(), self.edge.is_some(), self.primary.is_some());
        self.nodes.retain(|id| node_exists(id));
        if self.edge.as_deref().is_some_and(|id| !edge_exists(id)) {
            self.edge = None;
        }
        if self.primary.as_deref().is_some_and(|id| !node_exists(id)) {
            self.primary = self.nodes.last().cloned();
        }
        if before != (self.nodes.len(), self.edge.is_some(), self.primary.is_some()) {
            self.revision += 1;
        }
    }
}
