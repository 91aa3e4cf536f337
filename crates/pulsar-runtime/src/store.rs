//! Cycle-scoped sensor state: the input snapshot, the output map, the
//! last-known cache, and decoding of raw backend readings.

use std::collections::BTreeMap;

use pulsar_core::Value;

// ---------------------------------------------------------------------------
// Snapshot & outputs
// ---------------------------------------------------------------------------

/// Inputs captured at cycle start. One snapshot is observed for the whole
/// cycle so every group sees consistent values.
#[derive(Debug, Clone, Default)]
pub struct SensorSnapshot {
    values: BTreeMap<String, Value>,
}

impl SensorSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor: impl Into<String>, value: Value) {
        self.values.insert(sensor.into(), value);
    }

    pub fn get(&self, sensor: &str) -> Option<&Value> {
        self.values.get(sensor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

impl FromIterator<(String, Value)> for SensorSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// What reading an output key yields.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRead<'a> {
    Value(&'a Value),
    /// Explicitly written null (e.g. a Set expression over a missing
    /// sensor). Reads resolve through the fallback policy, not the
    /// snapshot.
    Null,
    Absent,
}

/// Outputs written by rules. Persistent across cycles: a value written in
/// cycle n is visible to later groups in cycle n and to every group in
/// cycle n+1.
#[derive(Debug, Clone, Default)]
pub struct CycleOutputs {
    values: BTreeMap<String, Option<Value>>,
}

impl CycleOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, key: impl Into<String>, value: Option<Value>) {
        self.values.insert(key.into(), value);
    }

    pub fn read(&self, key: &str) -> OutputRead<'_> {
        match self.values.get(key) {
            Some(Some(value)) => OutputRead::Value(value),
            Some(None) => OutputRead::Null,
            None => OutputRead::Absent,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Value>)> {
        self.values.iter()
    }
}

// ---------------------------------------------------------------------------
// Last-known cache
// ---------------------------------------------------------------------------

/// Per-sensor most recent reading, for `use_last_known` fallbacks.
#[derive(Debug, Clone, Default)]
pub struct LastKnownCache {
    entries: BTreeMap<String, (Value, i64)>,
}

impl LastKnownCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sensor: impl Into<String>, value: Value, at_ms: i64) {
        self.entries.insert(sensor.into(), (value, at_ms));
    }

    /// The cached value, provided it is no older than `max_age_ms` (when
    /// given) at `now_ms`.
    pub fn fresh(&self, sensor: &str, max_age_ms: Option<u64>, now_ms: i64) -> Option<&Value> {
        let (value, at_ms) = self.entries.get(sensor)?;
        if let Some(max_age) = max_age_ms {
            let age = now_ms.saturating_sub(*at_ms);
            if age < 0 || age as u64 > max_age {
                return None;
            }
        }
        Some(value)
    }
}

// ---------------------------------------------------------------------------
// Backend decoding
// ---------------------------------------------------------------------------

/// A raw value as read from the key-value backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReading {
    /// Hash entry fields, e.g. `{value: "21.5", timestamp: "169..."}`.
    Hash(BTreeMap<String, String>),
    /// Plain string payload.
    Text(String),
}

/// Decode a backend reading into a value and optional timestamp.
///
/// Preference order: hash entries with a `value` field, then plain scalar
/// strings, then JSON `{value, timestamp}` objects. Anything else decodes
/// as a plain string value.
pub fn decode_reading(reading: &BackendReading) -> Option<(Value, Option<i64>)> {
    match reading {
        BackendReading::Hash(fields) => {
            let raw = fields.get("value")?;
            let value = parse_scalar(raw).unwrap_or_else(|| Value::Str(raw.clone()));
            let timestamp = fields.get("timestamp").and_then(|t| t.trim().parse().ok());
            Some((value, timestamp))
        }
        BackendReading::Text(raw) => {
            if let Some(value) = parse_scalar(raw) {
                return Some((value, None));
            }
            if raw.trim_start().starts_with('{') {
                if let Ok(obj) = serde_json::from_str::<serde_json::Value>(raw) {
                    if let Some(value) = obj.get("value") {
                        let decoded = json_scalar(value)?;
                        let timestamp = obj.get("timestamp").and_then(serde_json::Value::as_i64);
                        return Some((decoded, timestamp));
                    }
                }
            }
            Some((Value::Str(raw.clone()), None))
        }
    }
}

fn parse_scalar(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    trimmed.parse::<f64>().ok().map(Value::Number)
}

fn json_scalar(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}
