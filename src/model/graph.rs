use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Node kind whose members name the data categories referenced by flows.
pub const DATA_CATEGORY_KIND: &str = "data_category";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphNode {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_metadata")]
    pub metadata: Map<String, Value>,
    #[serde(default, deserialize_with = "de_string")]
    pub etag: String,
}

impl GraphNode {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A directed data exchange record attached to an edge.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Flow {
    #[serde(default, deserialize_with = "de_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de_string")]
    pub flow_type: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub direction: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub data_category_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "de_bool")]
    pub implicit: bool,
    #[serde(default, alias = "notes", deserialize_with = "de_opt_string")]
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphLink {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub source: String,
    #[serde(deserialize_with = "de_id")]
    pub target: String,
    #[serde(default, deserialize_with = "de_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "de_metadata")]
    pub metadata: Map<String, Value>,
    #[serde(default, deserialize_with = "de_string")]
    pub etag: String,
    #[serde(default, deserialize_with = "de_flows")]
    pub flows: Vec<Flow>,
    #[serde(default, deserialize_with = "de_flows")]
    pub review_flows: Vec<Flow>,
}

impl GraphLink {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// The node/edge collections delivered by one refresh. Replaced wholesale.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphDataset {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, alias = "edges")]
    pub links: Vec<GraphLink>,
}

impl GraphDataset {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn link(&self, id: &str) -> Option<&GraphLink> {
        self.links.iter().find(|link| link.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Category id -> display name, taken from nodes of the data category kind.
    pub fn category_names(&self) -> HashMap<String, String> {
        self.nodes
            .iter()
            .filter(|node| node.kind.trim().eq_ignore_ascii_case(DATA_CATEGORY_KIND))
            .map(|node| (node.id.clone(), node.name.clone()))
            .collect()
    }
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(mut object) => object.remove("id").and_then(value_to_string),
        Value::Array(_) => None,
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_to_string(value).ok_or_else(|| serde::de::Error::custom("expected an id string"))
}

fn de_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

/// Anything other than `true` (or a "true" string) reads as false.
fn de_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn de_metadata<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn de_flows<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Flow>, D::Error> {
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| Flow::deserialize(item).ok())
        .collect())
}
