//! Metadata quick filter: a flat set of independent predicates over node
//! metadata. Only non-default fields take part in matching.

mod dimming;

use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};

use crate::model::GraphNode;

pub(in crate::app) use dimming::apply_quick_filter_dimming;

const YES_WORDS: [&str; 5] = ["ja", "sant", "true", "1", "yes"];

/// Accepts `true`, the number 1 and the yes-words above.
pub(in crate::app) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64() == Some(1.0),
        Some(Value::String(text)) => {
            let normalized = text.trim().to_lowercase();
            YES_WORDS.contains(&normalized.as_str())
        }
        _ => false,
    }
}

fn metadata_str<'a>(metadata: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    metadata.get(key).and_then(Value::as_str).map(str::trim)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum Scope {
    Keab,
    Process,
}

impl Scope {
    pub const ALL: [Self; 2] = [Self::Keab, Self::Process];

    fn value(self) -> &'static str {
        match self {
            Self::Keab => "keab",
            Self::Process => "process",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Keab => "KEAB",
            Self::Process => "Process",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(in crate::app) enum OperatingSystem {
    Windows,
    Linux,
}

impl OperatingSystem {
    pub const ALL: [Self; 2] = [Self::Windows, Self::Linux];

    fn value(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    fn fixed(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }

    fn plain(value: String) -> Self {
        Self {
            label: value.clone(),
            value,
        }
    }
}

fn label_for(options: &[FilterOption], value: &str) -> String {
    options
        .iter()
        .find(|option| option.value == value)
        .map_or_else(|| value.to_owned(), |option| option.label.clone())
}

/// Choices offered by the quick filter controls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct FilterOptions {
    pub kinds: Vec<FilterOption>,
    pub owner_teams: Vec<FilterOption>,
    pub backup_policies: Vec<FilterOption>,
    pub departments: Vec<FilterOption>,
    pub supplier_types: Vec<FilterOption>,
    pub business_criticality: Vec<FilterOption>,
    pub information_classes: Vec<FilterOption>,
}

fn kind_label(kind: &str) -> String {
    kind.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl FilterOptions {
    pub fn from_nodes(nodes: &[GraphNode]) -> Self {
        let mut kinds = BTreeSet::new();
        let mut owners = BTreeSet::new();
        let mut policies = BTreeSet::new();
        for node in nodes {
            let kind = node.kind.trim();
            if !kind.is_empty() {
                kinds.insert(kind.to_owned());
            }
            if let Some(owner) = metadata_str(&node.metadata, "owner_team").filter(|s| !s.is_empty()) {
                owners.insert(owner.to_owned());
            }
            if let Some(policy) =
                metadata_str(&node.metadata, "backup_policy").filter(|s| !s.is_empty())
            {
                policies.insert(policy.to_owned());
            }
        }

        Self {
            kinds: kinds
                .into_iter()
                .map(|kind| FilterOption {
                    label: kind_label(&kind),
                    value: kind,
                })
                .collect(),
            owner_teams: owners.into_iter().map(FilterOption::plain).collect(),
            backup_policies: policies.into_iter().map(FilterOption::plain).collect(),
            departments: [
                ("el", "El"),
                ("varme", "Värme"),
                ("ekonomi", "Ekonomi"),
                ("digit", "Digit"),
                ("vatten", "Vatten"),
                ("stab", "Stab"),
                ("marknad", "Marknad"),
            ]
            .into_iter()
            .map(|(value, label)| FilterOption::fixed(value, label))
            .collect(),
            supplier_types: [("intern", "Intern"), ("saas", "SaaS"), ("paas", "PaaS")]
                .into_iter()
                .map(|(value, label)| FilterOption::fixed(value, label))
                .collect(),
            business_criticality: [("low", "Low"), ("medium", "Medium"), ("high", "High")]
                .into_iter()
                .map(|(value, label)| FilterOption::fixed(value, label))
                .collect(),
            information_classes: [
                ("intern", "Internal"),
                ("begransad", "Restricted"),
                ("skyddad", "Protected"),
                ("oppen", "Open"),
                ("konfidentiell", "Confidential"),
            ]
            .into_iter()
            .map(|(value, label)| FilterOption::fixed(value, label))
            .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub(in crate::app) struct QuickFilterState {
    pub sla_only: bool,
    pub critical_only: bool,
    pub pii_only: bool,
    pub legal_requirements_only: bool,
    pub financial_value_only: bool,
    pub env: Option<Scope>,
    pub domain: Option<Scope>,
    pub os: Option<OperatingSystem>,
    pub kind: String,
    pub owner_team: String,
    pub backup_policy: String,
    pub owning_department: String,
    pub supplier_type: String,
    pub business_criticality: String,
    pub information_class: String,
}

impl QuickFilterState {
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn exact_fields(&self) -> [(&'static str, &str); 6] {
        [
            ("owner_team", &self.owner_team),
            ("backup_policy", &self.backup_policy),
            ("owning_department", &self.owning_department),
            ("supplier_type", &self.supplier_type),
            ("business_criticality", &self.business_criticality),
            ("information_class", &self.information_class),
        ]
    }

    /// Conjunction of the non-default fields.
    pub fn matches(&self, node: &GraphNode) -> bool {
        let metadata = &node.metadata;

        let flags = [
            (self.sla_only, "sla"),
            (self.critical_only, "critical"),
            (self.pii_only, "pii"),
            (self.legal_requirements_only, "legal_requirements"),
            (self.financial_value_only, "financial_value"),
        ];
        if flags
            .iter()
            .any(|(required, key)| *required && !is_truthy(metadata.get(*key)))
        {
            return false;
        }

        let lowered = |key: &str| metadata_str(metadata, key).map(str::to_lowercase);
        if let Some(env) = self.env
            && lowered("env").as_deref() != Some(env.value())
        {
            return false;
        }
        if let Some(domain) = self.domain
            && lowered("domain").as_deref() != Some(domain.value())
        {
            return false;
        }
        if let Some(os) = self.os
            && lowered("os").as_deref() != Some(os.value())
        {
            return false;
        }

        let kind = self.kind.trim();
        if !kind.is_empty() && node.kind.trim() != kind {
            return false;
        }

        self.exact_fields().iter().all(|(key, wanted)| {
            let wanted = wanted.trim();
            wanted.is_empty() || metadata_str(metadata, key) == Some(wanted)
        })
    }

    /// Ids of matching nodes. Selected nodes are always included.
    pub fn compute_matches(&self, nodes: &[GraphNode], selected: &[String]) -> HashSet<String> {
        let mut matches = nodes
            .iter()
            .filter(|node| self.matches(node))
            .map(|node| node.id.clone())
            .collect::<HashSet<_>>();
        matches.extend(selected.iter().cloned());
        matches
    }

    /// Human readable description of the active fields, e.g.
    /// `SLA • Env: KEAB • Kind: Application`.
    pub fn summary(&self, options: &FilterOptions) -> String {
        let mut parts = Vec::new();
        if self.sla_only {
            parts.push("SLA".to_owned());
        }
        if self.critical_only {
            parts.push("Critical".to_owned());
        }
        if self.legal_requirements_only {
            parts.push("Legal requirements: Yes".to_owned());
        }
        if self.financial_value_only {
            parts.push("Financial value: Yes".to_owned());
        }
        if self.pii_only {
            parts.push("PII: Yes".to_owned());
        }
        if let Some(env) = self.env {
            parts.push(format!("Env: {}", env.label()));
        }
        if let Some(domain) = self.domain {
            parts.push(format!("Domain: {}", domain.label()));
        }
        if let Some(os) = self.os {
            parts.push(format!("OS: {}", os.label()));
        }

        let labelled = [
            ("Kind", &self.kind, &options.kinds),
            ("Owner", &self.owner_team, &options.owner_teams),
            ("Backup policy", &self.backup_policy, &options.backup_policies),
            ("Owning department", &self.owning_department, &options.departments),
            ("Supplier type", &self.supplier_type, &options.supplier_types),
            (
                "Business criticality",
                &self.business_criticality,
                &options.business_criticality,
            ),
            (
                "Information class",
                &self.information_class,
                &options.information_classes,
            ),
        ];
        for (title, value, choices) in labelled {
            let value = value.trim();
            if !value.is_empty() {
                parts.push(format!("{title}: {}", label_for(choices, value)));
            }
        }

        parts.join(" • ")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(id: &str, kind: &str, metadata: Value) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            kind: kind.to_owned(),
            name: id.to_owned(),
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            ..GraphNode::default()
        }
    }

    #[test]
    fn truthy_parser_accepts_yes_synonyms() {
        for value in [json!(true), json!(1), json!(1.0), json!(" Ja "), json!("SANT"), json!("yes"), json!("1")] {
            assert!(is_truthy(Some(&value)), "{value}");
        }
        for value in [json!(false), json!(0), json!(2), json!("no"), json!(""), json!(null), json!([true])] {
            assert!(!is_truthy(Some(&value)), "{value}");
        }
        assert!(!is_truthy(None));
    }

    #[test]
    fn default_state_is_inactive_and_matches_everything() {
        let filter = QuickFilterState::default();
        assert!(!filter.is_active());
        assert!(filter.matches(&node("a", "", json!({}))));
    }

    #[test]
    fn only_active_fields_participate() {
        let filter = QuickFilterState {
            sla_only: true,
            env: Some(Scope::Keab),
            ..QuickFilterState::default()
        };
        assert!(filter.is_active());

        assert!(filter.matches(&node("a", "server", json!({"sla": "ja", "env": " KEAB ", "os": "linux"}))));
        assert!(!filter.matches(&node("b", "server", json!({"sla": true, "env": "process"}))));
        assert!(!filter.matches(&node("c", "server", json!({"env": "keab"}))));
    }

    #[test]
    fn exact_fields_compare_trimmed_strings() {
        let filter = QuickFilterState {
            kind: "application".to_owned(),
            owner_team: "Platform".to_owned(),
            ..QuickFilterState::default()
        };
        assert!(filter.matches(&node("a", "application", json!({"owner_team": " Platform "}))));
        assert!(!filter.matches(&node("b", "application", json!({"owner_team": "platform"}))));
        assert!(!filter.matches(&node("c", "database", json!({"owner_team": "Platform"}))));
        assert!(!filter.matches(&node("d", "application", json!({"owner_team": 3}))));
    }

    #[test]
    fn selected_nodes_always_match() {
        let nodes = [
            node("a", "server", json!({"pii": "yes"})),
            node("b", "server", json!({})),
        ];
        let filter = QuickFilterState {
            pii_only: true,
            critical_only: true,
            ..QuickFilterState::default()
        };
        let matches = filter.compute_matches(&nodes, &["b".to_owned()]);
        assert_eq!(matches, HashSet::from(["b".to_owned()]));
    }

    #[test]
    fn options_and_summary() {
        let nodes = [
            node("a", "business_application", json!({"owner_team": "Ops", "backup_policy": "daily"})),
            node("b", " server ", json!({"owner_team": "Dev"})),
            node("c", "server", json!({"owner_team": ""})),
        ];
        let options = FilterOptions::from_nodes(&nodes);
        let kinds = options.kinds.iter().map(|o| (o.value.as_str(), o.label.as_str())).collect::<Vec<_>>();
        assert_eq!(kinds, [("business_application", "Business Application"), ("server", "Server")]);
        let owners = options.owner_teams.iter().map(|o| o.value.as_str()).collect::<Vec<_>>();
        assert_eq!(owners, ["Dev", "Ops"]);

        let filter = QuickFilterState {
            sla_only: true,
            env: Some(Scope::Keab),
            os: Some(OperatingSystem::Linux),
            kind: "server".to_owned(),
            owning_department: "varme".to_owned(),
            ..QuickFilterState::default()
        };
        assert_eq!(
            filter.summary(&options),
            "SLA • Env: KEAB • OS: Linux • Kind: Server • Owning department: Värme"
        );
        assert_eq!(QuickFilterState::default().summary(&options), "");
    }
}
