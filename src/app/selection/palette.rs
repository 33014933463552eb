use crate::model::GraphNode;

const MAX_RESULTS: usize = 120;

const SCORE_EXACT: u32 = 1000;
const SCORE_PREFIX: u32 = 500;
const SCORE_SUBSTRING: u32 = 250;
const SCORE_SUBTITLE: u32 = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct CommandItem {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
}

impl CommandItem {
    fn from_node(node: &GraphNode) -> Self {
        let kind = node.kind.trim();
        Self {
            id: node.id.clone(),
            title: node.display_name().to_owned(),
            subtitle: (!kind.is_empty()).then(|| kind.to_owned()),
        }
    }

    fn score(&self, query: &str) -> u32 {
        let title = self.title.to_lowercase();
        let subtitle = self.subtitle.as_deref().unwrap_or_default().to_lowercase();

        let mut score = 0;
        if title == query {
            score += SCORE_EXACT;
        }
        if title.starts_with(query) {
            score += SCORE_PREFIX;
        }
        if title.contains(query) {
            score += SCORE_SUBSTRING;
        }
        if subtitle.contains(query) {
            score += SCORE_SUBTITLE;
        }
        score
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum PaletteOutcome {
    Idle,
    Closed,
    Selected(String),
}

/// Quick "jump to node" list opened with Space.
#[derive(Clone, Debug, Default)]
pub(in crate::app) struct CommandPalette {
    open: bool,
    pub query: String,
    active_index: usize,
    items: Vec<CommandItem>,
}

impl CommandPalette {
    pub fn set_nodes(&mut self, nodes: &[GraphNode]) {
        let mut items = nodes.iter().map(CommandItem::from_node).collect::<Vec<_>>();
        items.sort_by_cached_key(|item| item.title.to_lowercase());
        self.items = items;
        self.active_index = 0;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
        self.query.clear();
        self.active_index = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Items for the current query: everything (capped) when blank, else
    /// positive scores, best first, ties in list order.
    pub fn results(&self) -> Vec<&CommandItem> {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return self.items.iter().take(MAX_RESULTS).collect();
        }

        let mut scored = self
            .items
            .iter()
            .filter_map(|item| {
                let score = item.score(&query);
                (score > 0).then_some((score, item))
            })
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, item)| item)
            .collect()
    }

    pub fn query_changed(&mut self) {
        self.active_index = 0;
    }

    pub fn move_active(&mut self, delta: isize) {
        let last = self.results().len().saturating_sub(1);
        let next = self.active_index.saturating_add_signed(delta);
        self.active_index = next.min(last);
    }

    pub fn set_active(&mut self, index: usize) {
        self.active_index = index.min(self.results().len().saturating_sub(1));
    }

    /// Picks the active row, closing the palette when something was chosen.
    pub fn confirm(&mut self) -> PaletteOutcome {
        let chosen = self
            .results()
            .get(self.active_index)
            .map(|item| item.id.clone());
        match chosen {
            Some(id) => {
                self.close();
                PaletteOutcome::Selected(id)
            }
            None => PaletteOutcome::Idle,
        }
    }
}
