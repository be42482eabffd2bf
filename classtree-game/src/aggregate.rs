//! Per-player behavioral counters built from the event stream.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::constants::DISTINCT_KEY_PRIORITY;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAggregate {
    pub count: u64,
    pub distinct_count: u64,
    #[serde(default)]
    pub distinct_values: BTreeSet<String>,
}

/// Aggregates keyed by event name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerAggregates {
    events: BTreeMap<String, EventAggregate>,
}

impl PlayerAggregates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, event_name: &str) -> Option<&EventAggregate> {
        self.events.get(event_name)
    }

    /// Replace the counters for one event wholesale.
    pub fn insert(&mut self, event_name: impl Into<String>, aggregate: EventAggregate) {
        self.events.insert(event_name.into(), aggregate);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventAggregate)> {
        self.events.iter().map(|(name, agg)| (name.as_str(), agg))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Fold one event into the counters.
    pub fn record_event(&mut self, event_name: &str, metadata: &Map<String, Value>) {
        let aggregate = self.events.entry(event_name.to_string()).or_default();
        aggregate.count = aggregate.count.saturating_add(1);

        if let Some(key) = distinct_key(metadata)
            && aggregate.distinct_values.insert(key)
        {
            aggregate.distinct_count = aggregate.distinct_values.len() as u64;
        }
    }

    /// Convenience for bulk counts that carry no distinct values.
    pub fn add_count(&mut self, event_name: &str, amount: u64) {
        let aggregate = self.events.entry(event_name.to_string()).or_default();
        aggregate.count = aggregate.count.saturating_add(amount);
    }
}

/// Distinct value for an event: the first present priority key, else the
/// first metadata value in insertion order. Blank picks (null, empty, zero or
/// `false`) fall through to the first value.
#[must_use]
pub fn distinct_key(metadata: &Map<String, Value>) -> Option<String> {
    let prioritized = DISTINCT_KEY_PRIORITY
        .iter()
        .find_map(|key| metadata.get(*key))
        .filter(|value| !is_blank(value));
    let picked = prioritized
        .or_else(|| metadata.values().next())
        .filter(|value| !is_blank(value))?;
    Some(match picked {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
