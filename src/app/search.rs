use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use tracing::{debug, trace};

use crate::model::{GraphNode, HighlightState};

const MIN_QUERY_CHARS: usize = 2;

/// Holds the latest input until it has been stable for `delay`.
#[derive(Clone, Debug)]
pub(super) struct Debouncer {
    delay_secs: f64,
    pending: Option<(String, f64)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_secs: delay.as_secs_f64(),
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: String, now: f64) {
        self.pending = Some((value, now + self.delay_secs));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn take_due(&mut self, now: f64) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}

/// Monotonic request tokens; only the newest token's response is applied.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct RequestTokens {
    current: u64,
}

impl RequestTokens {
    pub fn issue(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Makes every outstanding token stale.
    pub fn invalidate(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.current
    }
}

#[derive(Clone, Debug)]
struct SearchEntry {
    id: String,
    name: String,
    kind: String,
}

struct SearchRequest {
    token: u64,
    query: String,
}

#[derive(Debug)]
pub(super) struct SearchResponse {
    token: u64,
    query: String,
    node_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum SearchUpdate {
    Cleared,
    Results(HighlightState),
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

fn match_entries(matcher: &SkimMatcherV2, entries: &[SearchEntry], query: &str) -> Vec<String> {
    let mut scored = entries
        .iter()
        .filter_map(|entry| {
            let by_name = fuzzy_match_score(matcher, &entry.name, query);
            let by_kind = fuzzy_match_score(matcher, &entry.kind, query);
            by_name.max(by_kind).map(|score| (score, entry))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, entry)| entry.id.clone()).collect()
}

fn spawn_worker(entries: Vec<SearchEntry>) -> (Sender<SearchRequest>, Receiver<SearchResponse>) {
    let (request_tx, request_rx) = mpsc::channel::<SearchRequest>();
    let (response_tx, response_rx) = mpsc::channel();

    thread::spawn(move || {
        let matcher = SkimMatcherV2::default();
        while let Ok(request) = request_rx.recv() {
            let node_ids = match_entries(&matcher, &entries, &request.query);
            let response = SearchResponse {
                token: request.token,
                query: request.query,
                node_ids,
            };
            if response_tx.send(response).is_err() {
                break;
            }
        }
    });

    (request_tx, response_rx)
}

/// Debounced node search with token based cancellation. Matching runs on a
/// worker thread that lives as long as this value.
pub(super) struct NodeSearch {
    pub query: String,
    debouncer: Debouncer,
    tokens: RequestTokens,
    requests: Sender<SearchRequest>,
    responses: Receiver<SearchResponse>,
}

impl NodeSearch {
    pub fn new(nodes: &[GraphNode], debounce: Duration) -> Self {
        let entries = nodes
            .iter()
            .map(|node| SearchEntry {
                id: node.id.clone(),
                name: node.display_name().to_owned(),
                kind: node.kind.clone(),
            })
            .collect();
        let (requests, responses) = spawn_worker(entries);
        Self {
            query: String::new(),
            debouncer: Debouncer::new(debounce),
            tokens: RequestTokens::default(),
            requests,
            responses,
        }
    }

    /// Called after every edit of [`Self::query`]. Short queries clear the
    /// search highlight right away.
    pub fn query_changed(&mut self, now: f64) -> Option<SearchUpdate> {
        let query = self.query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            self.debouncer.cancel();
            self.tokens.invalidate();
            return Some(SearchUpdate::Cleared);
        }
        self.tokens.invalidate();
        self.debouncer.schedule(query.to_owned(), now);
        None
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.deadline().is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.debouncer.deadline()
    }

    /// Dispatches a due query and applies the newest current response.
    pub fn poll(&mut self, now: f64) -> Option<SearchUpdate> {
        if let Some(query) = self.debouncer.take_due(now) {
            let token = self.tokens.issue();
            trace!(token, query = %query, "search dispatched");
            if self.requests.send(SearchRequest { token, query }).is_err() {
                debug!("search worker is gone");
            }
        }

        let mut latest = None;
        while let Ok(response) = self.responses.try_recv() {
            if let Some(update) = self.accept(response) {
                latest = Some(update);
            }
        }
        latest
    }

    fn accept(&self, response: SearchResponse) -> Option<SearchUpdate> {
        if !self.tokens.is_current(response.token) {
            debug!(token = response.token, query = %response.query, "stale search response discarded");
            return None;
        }
        Some(SearchUpdate::Results(HighlightState::from_ids(
            response.node_ids,
            [],
            Some(format!("Search: {}", response.query)),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, kind: &str) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            name: name.to_owned(),
            kind: kind.to_owned(),
            ..GraphNode::default()
        }
    }

    fn search() -> NodeSearch {
        NodeSearch::new(
            &[node("1", "Billing API", "service"), node("2", "Ledger", "database")],
            Duration::from_millis(180),
        )
    }

    #[test]
    fn debouncer_waits_for_quiet_input() {
        let mut debouncer = Debouncer::new(Duration::from_millis(200));
        debouncer.schedule("ab".to_owned(), 1.0);
        debouncer.schedule("abc".to_owned(), 1.1);
        assert_eq!(debouncer.take_due(1.25), None);
        assert_eq!(debouncer.take_due(1.3), Some("abc".to_owned()));
        assert_eq!(debouncer.take_due(2.0), None);
    }

    #[test]
    fn tokens_make_older_requests_stale() {
        let mut tokens = RequestTokens::default();
        let first = tokens.issue();
        let second = tokens.issue();
        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        tokens.invalidate();
        assert!(!tokens.is_current(second));
    }

    #[test]
    fn short_queries_clear_and_cancel() {
        let mut search = search();
        search.query = "bil".to_owned();
        assert_eq!(search.query_changed(0.0), None);
        assert!(search.is_pending());

        search.query = " b ".to_owned();
        assert_eq!(search.query_changed(0.05), Some(SearchUpdate::Cleared));
        assert!(!search.is_pending());
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut search = search();
        let old = search.tokens.issue();
        let current = search.tokens.issue();

        let stale = SearchResponse {
            token: old,
            query: "le".to_owned(),
            node_ids: vec!["2".to_owned()],
        };
        assert_eq!(search.accept(stale), None);

        let fresh = SearchResponse {
            token: current,
            query: "bill".to_owned(),
            node_ids: vec!["1".to_owned()],
        };
        let Some(SearchUpdate::Results(highlight)) = search.accept(fresh) else {
            panic!("current response rejected");
        };
        assert!(highlight.node_ids.contains("1"));
        assert!(highlight.edge_ids.is_empty());
        assert_eq!(highlight.label.as_deref(), Some("Search: bill"));
        assert!(highlight.dim_others);
    }

    #[test]
    fn editing_the_query_drops_the_in_flight_response() {
        let mut search = search();
        search.query = "bil".to_owned();
        assert_eq!(search.query_changed(0.0), None);
        assert_eq!(search.poll(0.1), None);
        let Some(query) = search.debouncer.take_due(0.2) else {
            panic!("query not due");
        };
        let in_flight = search.tokens.issue();

        search.query = "bill".to_owned();
        assert_eq!(search.query_changed(0.25), None);
        let late = SearchResponse {
            token: in_flight,
            query,
            node_ids: vec!["1".to_owned()],
        };
        assert_eq!(search.accept(late), None);
        assert!(search.is_pending());
    }

    #[test]
    fn fuzzy_matching_covers_names_and_kinds() {
        let matcher = SkimMatcherV2::default();
        let entries = [
            SearchEntry {
                id: "1".to_owned(),
                name: "Billing API".to_owned(),
                kind: "service".to_owned(),
            },
            SearchEntry {
                id: "2".to_owned(),
                name: "Ledger".to_owned(),
                kind: "database".to_owned(),
            },
        ];
        assert_eq!(match_entries(&matcher, &entries, "bilapi"), ["1"]);
        assert_eq!(match_entries(&matcher, &entries, "DATAB"), ["2"]);
        assert!(match_entries(&matcher, &entries, "zzz").is_empty());
    }
}
