//! Driver-neutral graph values and their portable (JSON) representation.
//!
//! Backends decode their wire values into [`GraphValue`]. Before a record
//! leaves the connector every value is passed through [`GraphValue::normalize`],
//! which maps the non-portable wrapper kinds (temporal, spatial, graph
//! structures) onto plain JSON and leaves everything else untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use serde_json::{Map, Number, Value};

use crate::error::{CoreError, Result};

/// Query parameters keyed by name (without the leading `$`).
pub type Params = BTreeMap<String, GraphValue>;

/// A normalized result record: column name to portable value.
pub type Record = Map<String, Value>;

/// A value as returned by (or sent to) the graph database.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node(GraphNode),
    Relationship(GraphRelationship),
    Path(GraphPath),
    Temporal(Temporal),
    Point(Point),
}

/// Temporal wrapper kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Temporal {
    Date(NaiveDate),
    Time { time: NaiveTime, offset: FixedOffset },
    LocalTime(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    LocalDateTime(NaiveDateTime),
    Duration(Duration),
}

/// A calendar-aware duration: months and days are kept apart from seconds
/// because their length depends on the date they are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: i64,
}

/// A spatial point. `z` is present for 3D points only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub srid: i64,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, GraphValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphRelationship {
    pub id: i64,
    pub rel_type: String,
    pub properties: BTreeMap<String, GraphValue>,
}

/// Path elements in traversal order: node, relationship, node, ...
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphPath {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

impl GraphValue {
    /// Convert to the portable representation.
    pub fn normalize(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(b),
            Self::Integer(i) => Value::Number(i.into()),
            Self::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s),
            Self::Bytes(bytes) => Value::Array(
                bytes
                    .into_iter()
                    .map(|b| Value::Number(b.into()))
                    .collect(),
            ),
            Self::List(items) => Value::Array(items.into_iter().map(Self::normalize).collect()),
            Self::Map(map) => Value::Object(normalize_map(map)),
            Self::Node(node) => Value::Object(normalize_map(node.properties)),
            Self::Relationship(rel) => Value::Object(normalize_map(rel.properties)),
            Self::Path(path) => Value::Array(path.into_elements()),
            Self::Temporal(t) => Value::String(t.to_iso8601()),
            Self::Point(p) => p.to_json(),
        }
    }

    /// Read a list of strings, treating `null` as empty.
    pub fn as_string_list(&self) -> Result<Vec<String>> {
        match self {
            Self::Null => Ok(Vec::new()),
            Self::List(items) => items
                .iter()
                .map(|item| match item {
                    Self::String(s) => Ok(s.clone()),
                    other => Err(CoreError::Decode(format!(
                        "expected string list element, got {}",
                        other.kind()
                    ))),
                })
                .collect(),
            other => Err(CoreError::Decode(format!(
                "expected list of strings, got {}",
                other.kind()
            ))),
        }
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Node(_) => "node",
            Self::Relationship(_) => "relationship",
            Self::Path(_) => "path",
            Self::Temporal(_) => "temporal",
            Self::Point(_) => "point",
        }
    }
}

fn normalize_map(map: BTreeMap<String, GraphValue>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, v.normalize())).collect()
}

impl GraphPath {
    fn into_elements(self) -> Vec<Value> {
        let mut elements = Vec::with_capacity(self.nodes.len() + self.relationships.len());
        let mut rels = self.relationships.into_iter();
        for node in self.nodes {
            elements.push(Value::Object(normalize_map(node.properties)));
            if let Some(rel) = rels.next() {
                elements.push(Value::Object(normalize_map(rel.properties)));
            }
        }
        elements
    }
}

impl Temporal {
    /// ISO-8601 rendering. Parsing the result back yields the same value.
    pub fn to_iso8601(&self) -> String {
        match self {
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Time { time, offset } => format!("{}{}", format_time(time), offset),
            Self::LocalTime(t) => format_time(t),
            Self::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, false),
            Self::LocalDateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Self::Duration(d) => d.to_iso8601(),
        }
    }
}

fn format_time(time: &NaiveTime) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

impl Duration {
    /// `P<months>M<days>DT<seconds>[.<nanos>]S`, e.g. `P14M3DT12.5S`.
    pub fn to_iso8601(&self) -> String {
        let mut seconds = self.seconds;
        let mut nanos = self.nanoseconds;
        // Keep the fractional part the same sign as the whole seconds.
        if seconds > 0 && nanos < 0 {
            seconds -= 1;
            nanos += 1_000_000_000;
        } else if seconds < 0 && nanos > 0 {
            seconds += 1;
            nanos -= 1_000_000_000;
        }

        let secs = if nanos == 0 {
            seconds.to_string()
        } else {
            let sign = if seconds < 0 || nanos < 0 { "-" } else { "" };
            let frac = format!("{:09}", nanos.abs());
            format!("{sign}{}.{}", seconds.abs(), frac.trim_end_matches('0'))
        };
        format!("P{}M{}DT{}S", self.months, self.days, secs)
    }
}

impl Point {
    fn to_json(self) -> Value {
        let mut obj = Map::new();
        obj.insert("srid".to_string(), Value::Number(self.srid.into()));
        obj.insert("x".to_string(), GraphValue::Float(self.x).normalize());
        obj.insert("y".to_string(), GraphValue::Float(self.y).normalize());
        if let Some(z) = self.z {
            obj.insert("z".to_string(), GraphValue::Float(z).normalize());
        }
        Value::Object(obj)
    }
}

// ── Row ──────────────────────────────────────────────────────────

/// One result row as produced by a backend, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, GraphValue)>,
}

impl Row {
    pub fn new(fields: Vec<(String, GraphValue)>) -> Self {
        Self { fields }
    }

    /// Field access by column name.
    pub fn get(&self, key: &str) -> Option<&GraphValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Field access that fails when the column is absent.
    pub fn require(&self, key: &str) -> Result<&GraphValue> {
        self.get(key)
            .ok_or_else(|| CoreError::Decode(format!("missing column `{key}`")))
    }

    /// Materialize the row with every value normalized.
    pub fn into_record(self) -> Record {
        self.fields
            .into_iter()
            .map(|(k, v)| (k, v.normalize()))
            .collect()
    }
}

impl FromIterator<(String, GraphValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, GraphValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────

impl From<bool> for GraphValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for GraphValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for GraphValue {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<u32> for GraphValue {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for GraphValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for GraphValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NaiveDate> for GraphValue {
    fn from(v: NaiveDate) -> Self {
        Self::Temporal(Temporal::Date(v))
    }
}

impl From<DateTime<FixedOffset>> for GraphValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::Temporal(Temporal::DateTime(v))
    }
}

impl From<NaiveDateTime> for GraphValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::Temporal(Temporal::LocalDateTime(v))
    }
}

impl<T: Into<GraphValue>> From<Vec<T>> for GraphValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<GraphValue>> From<Option<T>> for GraphValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for GraphValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(obj) => Self::Map(obj.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

/// Build [`Params`] from a JSON object. Anything else is rejected.
pub fn params_from_json(value: Value) -> Result<Params> {
    match value {
        Value::Object(obj) => Ok(obj.into_iter().map(|(k, v)| (k, v.into())).collect()),
        Value::Null => Ok(Params::new()),
        other => Err(CoreError::Decode(format!(
            "parameters must be a JSON object, got {other}"
        ))),
    }
}
