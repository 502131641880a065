//! Mapping between Bolt values and [`GraphValue`].
//!
//! `neo4rs` hands row values out through serde. Reading them back as
//! `BoltType` fails on points and flattens durations into a bare
//! `[seconds, nanos]` list, so rows are decoded with a visitor that asks for
//! every value as the Bolt enum and dispatches on its kind tag.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use neo4rs::{
    BoltDateTimeZoneId, BoltDuration, BoltList, BoltMap, BoltNull, BoltString, BoltType,
};
use serde::de::{self, Deserialize, Deserializer, EnumAccess, IgnoredAny, MapAccess, SeqAccess};
use serde::de::{VariantAccess, Visitor};

use cypherlink_core::value::{
    Duration, GraphNode, GraphPath, GraphRelationship, Point, Temporal,
};
use cypherlink_core::{GraphValue, Row};

use crate::client::GraphError;

/// Day number of 1970-01-01 counted from 0001-01-01 as day 1.
const UNIX_EPOCH_DAY: i64 = 719_163;
const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ── Bolt → GraphValue ────────────────────────────────────────────

/// Decode one result row. Columns come back sorted by name.
pub fn decode_row(row: &neo4rs::Row) -> Result<Row, GraphError> {
    let columns: BTreeMap<String, Decoded> = row
        .to_strict()
        .map_err(|e| GraphError::query(format!("Failed to decode row: {e}")))?;
    Ok(columns.into_iter().map(|(key, value)| (key, value.0)).collect())
}

/// Kind tags, indexed the way `neo4rs` numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoltKind {
    Null,
    String,
    Boolean,
    Map,
    Integer,
    Float,
    List,
    Node,
    Relation,
    UnboundedRelation,
    Point2D,
    Point3D,
    Bytes,
    Path,
    Duration,
    Date,
    Time,
    LocalTime,
    DateTime,
    LocalDateTime,
    DateTimeZoneId,
}

impl BoltKind {
    const ALL: [BoltKind; 21] = [
        Self::Null,
        Self::String,
        Self::Boolean,
        Self::Map,
        Self::Integer,
        Self::Float,
        Self::List,
        Self::Node,
        Self::Relation,
        Self::UnboundedRelation,
        Self::Point2D,
        Self::Point3D,
        Self::Bytes,
        Self::Path,
        Self::Duration,
        Self::Date,
        Self::Time,
        Self::LocalTime,
        Self::DateTime,
        Self::LocalDateTime,
        Self::DateTimeZoneId,
    ];
}

impl<'de> Deserialize<'de> for BoltKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KindVisitor;

        impl<'de> Visitor<'de> for KindVisitor {
            type Value = BoltKind;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a Bolt kind tag")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<BoltKind, E> {
                usize::try_from(v)
                    .ok()
                    .and_then(|i| BoltKind::ALL.get(i).copied())
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_u8(KindVisitor)
    }
}

/// A value read with its Bolt kind intact.
struct Decoded(GraphValue);

impl<'de> Deserialize<'de> for Decoded {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The kind tag is only offered to enum requests made under this name.
        deserializer
            .deserialize_enum(std::any::type_name::<BoltType>(), &[], ValueVisitor)
            .map(Decoded)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = GraphValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Bolt value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<GraphValue, E> {
        Ok(GraphValue::Null)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<GraphValue, E> {
        Ok(GraphValue::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<GraphValue, E> {
        Ok(GraphValue::Integer(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<GraphValue, E> {
        Ok(GraphValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<GraphValue, E> {
        Ok(GraphValue::String(v.to_owned()))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<GraphValue, E> {
        Ok(GraphValue::Bytes(v.to_vec()))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<GraphValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Decoded(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(GraphValue::List(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<GraphValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = BTreeMap::new();
        while let Some((key, Decoded(value))) = map.next_entry::<String, Decoded>()? {
            entries.insert(key, value);
        }
        Ok(GraphValue::Map(entries))
    }

    fn visit_enum<A>(self, data: A) -> Result<GraphValue, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (kind, variant): (BoltKind, _) = data.variant()?;
        let value = match kind {
            BoltKind::Null
            | BoltKind::String
            | BoltKind::Boolean
            | BoltKind::Map
            | BoltKind::Integer
            | BoltKind::Float
            | BoltKind::List
            | BoltKind::Bytes => variant.tuple_variant(1, ValueVisitor)?,
            BoltKind::Node => GraphValue::Node(
                variant
                    .tuple_variant(1, ElementVisitor)?
                    .into_node()
                    .map_err(de::Error::custom)?,
            ),
            BoltKind::Relation | BoltKind::UnboundedRelation => GraphValue::Relationship(
                variant
                    .tuple_variant(1, ElementVisitor)?
                    .into_relationship()
                    .map_err(de::Error::custom)?,
            ),
            BoltKind::Path => GraphValue::Path(
                variant
                    .tuple_variant(1, ElementVisitor)?
                    .into_path()
                    .map_err(de::Error::custom)?,
            ),
            BoltKind::Point2D => {
                GraphValue::Point(variant.tuple_variant(3, PointVisitor { has_z: false })?)
            }
            BoltKind::Point3D => {
                GraphValue::Point(variant.tuple_variant(4, PointVisitor { has_z: true })?)
            }
            BoltKind::Duration => {
                GraphValue::Temporal(Temporal::Duration(variant.tuple_variant(1, DurationVisitor)?))
            }
            BoltKind::Date
            | BoltKind::Time
            | BoltKind::LocalTime
            | BoltKind::DateTime
            | BoltKind::LocalDateTime
            | BoltKind::DateTimeZoneId => GraphValue::Temporal(
                variant
                    .tuple_variant(1, TemporalVisitor)?
                    .into_temporal(kind)
                    .map_err(de::Error::custom)?,
            ),
        };
        Ok(value)
    }
}

// ── Graph elements ───────────────────────────────────────────────

#[derive(serde::Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum ElementField {
    Id,
    Type,
    Labels,
    Properties,
    Nodes,
    Relationships,
    Indices,
    #[serde(other)]
    Other,
}

/// The union of what nodes, relationships and paths carry.
#[derive(Default)]
struct ElementParts {
    id: Option<i64>,
    rel_type: Option<String>,
    labels: Vec<String>,
    properties: BTreeMap<String, GraphValue>,
    nodes: Vec<GraphValue>,
    relationships: Vec<GraphValue>,
    indices: Vec<i64>,
}

struct ElementVisitor;

impl<'de> Visitor<'de> for ElementVisitor {
    type Value = ElementParts;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Bolt node, relationship or path")
    }

    fn visit_map<A>(self, mut map: A) -> Result<ElementParts, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut parts = ElementParts::default();
        while let Some(field) = map.next_key::<ElementField>()? {
            match field {
                ElementField::Id => parts.id = Some(map.next_value()?),
                ElementField::Type => parts.rel_type = Some(map.next_value()?),
                ElementField::Labels => parts.labels = map.next_value()?,
                ElementField::Properties => {
                    parts.properties = map
                        .next_value::<BTreeMap<String, Decoded>>()?
                        .into_iter()
                        .map(|(key, value)| (key, value.0))
                        .collect();
                }
                ElementField::Nodes => parts.nodes = decoded_list(map.next_value()?),
                ElementField::Relationships => {
                    parts.relationships = decoded_list(map.next_value()?);
                }
                ElementField::Indices => parts.indices = map.next_value()?,
                ElementField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(parts)
    }
}

fn decoded_list(items: Vec<Decoded>) -> Vec<GraphValue> {
    items.into_iter().map(|item| item.0).collect()
}

impl ElementParts {
    fn into_node(self) -> Result<GraphNode, String> {
        Ok(GraphNode {
            id: self.id.ok_or("node without id")?,
            labels: self.labels,
            properties: self.properties,
        })
    }

    fn into_relationship(self) -> Result<GraphRelationship, String> {
        Ok(GraphRelationship {
            id: self.id.ok_or("relationship without id")?,
            rel_type: self.rel_type.ok_or("relationship without type")?,
            properties: self.properties,
        })
    }

    /// Walk the path's index pairs: a 1-based relationship index, negative
    /// when traversed against its direction, then a node index.
    fn into_path(self) -> Result<GraphPath, String> {
        let nodes = self
            .nodes
            .into_iter()
            .map(|value| match value {
                GraphValue::Node(node) => Ok(node),
                other => Err(format!("expected node in path, got {}", other.kind())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let relationships = self
            .relationships
            .into_iter()
            .map(|value| match value {
                GraphValue::Relationship(rel) => Ok(rel),
                other => Err(format!("expected relationship in path, got {}", other.kind())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start = nodes.first().cloned().ok_or("path without nodes")?;
        let steps = self.indices.chunks_exact(2);
        if !steps.remainder().is_empty() {
            return Err(format!("odd number of path indices: {}", self.indices.len()));
        }

        let mut path = GraphPath {
            nodes: vec![start],
            relationships: Vec::new(),
        };
        for step in steps {
            let rel = step[0]
                .unsigned_abs()
                .checked_sub(1)
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| relationships.get(i))
                .ok_or_else(|| format!("path relationship index {} out of range", step[0]))?;
            let node = usize::try_from(step[1])
                .ok()
                .and_then(|i| nodes.get(i))
                .ok_or_else(|| format!("path node index {} out of range", step[1]))?;
            path.relationships.push(rel.clone());
            path.nodes.push(node.clone());
        }
        Ok(path)
    }
}

// ── Spatial and temporal ─────────────────────────────────────────

/// Reads `srid, x, y[, z]` in order.
struct PointVisitor {
    has_z: bool,
}

impl<'de> Visitor<'de> for PointVisitor {
    type Value = Point;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.has_z {
            formatter.write_str("a 3D point")
        } else {
            formatter.write_str("a 2D point")
        }
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Point, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let srid = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let x = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let y = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        let z = if self.has_z {
            Some(
                seq.next_element()?
                    .ok_or_else(|| de::Error::invalid_length(3, &self))?,
            )
        } else {
            None
        };
        Ok(Point { srid, x, y, z })
    }
}

/// `neo4rs` exposes a duration as total seconds and nanoseconds, with the
/// months and days already folded into the seconds.
struct DurationVisitor;

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Bolt duration")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Duration, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let seconds = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let nanoseconds = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Ok(Duration {
            months: 0,
            days: 0,
            seconds,
            nanoseconds,
        })
    }
}

#[derive(serde::Deserialize)]
#[serde(field_identifier, rename_all = "snake_case")]
enum TemporalField {
    Days,
    Seconds,
    NanoSeconds,
    TzOffsetSeconds,
    TzInfo,
    #[serde(other)]
    Other,
}

#[derive(Default)]
struct TemporalParts {
    days: Option<i64>,
    seconds: Option<i64>,
    nanoseconds: Option<i64>,
    offset_seconds: Option<i64>,
    zone: Option<String>,
}

struct TemporalVisitor;

impl<'de> Visitor<'de> for TemporalVisitor {
    type Value = TemporalParts;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a Bolt temporal value")
    }

    fn visit_map<A>(self, mut map: A) -> Result<TemporalParts, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut parts = TemporalParts::default();
        while let Some(field) = map.next_key::<TemporalField>()? {
            match field {
                TemporalField::Days => parts.days = Some(map.next_value()?),
                TemporalField::Seconds => parts.seconds = Some(map.next_value()?),
                TemporalField::NanoSeconds => parts.nanoseconds = Some(map.next_value()?),
                TemporalField::TzOffsetSeconds => parts.offset_seconds = Some(map.next_value()?),
                TemporalField::TzInfo => parts.zone = Some(map.next_value()?),
                TemporalField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(parts)
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("temporal value without `{field}`"))
}

impl TemporalParts {
    fn into_temporal(self, kind: BoltKind) -> Result<Temporal, String> {
        let temporal = match kind {
            BoltKind::Date => {
                let days = required(self.days, "days")?;
                Temporal::Date(
                    date_from_epoch_days(days).ok_or_else(|| format!("invalid date: {days}"))?,
                )
            }
            BoltKind::LocalTime => Temporal::LocalTime(self.time_of_day()?),
            BoltKind::Time => Temporal::Time {
                time: self.time_of_day()?,
                offset: self.offset()?,
            },
            BoltKind::DateTime => {
                // Seconds count wall-clock time at the offset.
                let offset = self.offset()?;
                let seconds = required(self.seconds, "seconds")?
                    .checked_sub(i64::from(offset.local_minus_utc()))
                    .ok_or("datetime out of range")?;
                let utc = from_timestamp(seconds, required(self.nanoseconds, "nanoseconds")?)?;
                Temporal::DateTime(utc.with_timezone(&offset))
            }
            BoltKind::LocalDateTime => Temporal::LocalDateTime(
                from_timestamp(
                    required(self.seconds, "seconds")?,
                    required(self.nanoseconds, "nanoseconds")?,
                )?
                .naive_utc(),
            ),
            BoltKind::DateTimeZoneId => {
                // Seconds count wall-clock time in the named zone.
                let local = from_timestamp(
                    required(self.seconds, "seconds")?,
                    required(self.nanoseconds, "nanoseconds")?,
                )?
                .naive_utc();
                let zone = required(self.zone, "tz_info")?;
                let zoned = BoltDateTimeZoneId::from((local, zone.as_str()));
                let datetime = DateTime::<FixedOffset>::try_from(&zoned)
                    .map_err(|e| format!("invalid datetime in zone {zone}: {e}"))?;
                Temporal::DateTime(datetime)
            }
            other => return Err(format!("{other:?} is not a temporal kind")),
        };
        Ok(temporal)
    }

    fn time_of_day(&self) -> Result<NaiveTime, String> {
        let nanos = required(self.nanoseconds, "nanoseconds")?;
        let seconds = u32::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok();
        let subsec = u32::try_from(nanos.rem_euclid(NANOS_PER_SECOND)).ok();
        seconds
            .zip(subsec)
            .and_then(|(s, n)| NaiveTime::from_num_seconds_from_midnight_opt(s, n))
            .ok_or_else(|| format!("invalid time of day: {nanos}ns"))
    }

    fn offset(&self) -> Result<FixedOffset, String> {
        let seconds = required(self.offset_seconds, "tz_offset_seconds")?;
        i32::try_from(seconds)
            .ok()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| format!("invalid UTC offset: {seconds}s"))
    }
}

fn date_from_epoch_days(days: i64) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAY)
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

fn from_timestamp(seconds: i64, nanoseconds: i64) -> Result<DateTime<Utc>, String> {
    u32::try_from(nanoseconds)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(seconds, nanos))
        .ok_or_else(|| format!("invalid timestamp: {seconds}s {nanoseconds}ns"))
}

// ── GraphValue → Bolt ────────────────────────────────────────────

/// Convert a parameter into a Bolt value. Graph structures are sent as
/// their property maps, points as `{srid, x, y[, z]}` maps.
pub fn to_bolt(value: GraphValue) -> BoltType {
    match value {
        GraphValue::Null => BoltType::Null(BoltNull),
        GraphValue::Boolean(b) => b.into(),
        GraphValue::Integer(i) => i.into(),
        GraphValue::Float(f) => f.into(),
        GraphValue::String(s) => s.into(),
        GraphValue::Bytes(b) => BoltType::List(BoltList::from(
            b.into_iter().map(|byte| BoltType::from(i64::from(byte))).collect::<Vec<_>>(),
        )),
        GraphValue::List(items) => BoltType::List(BoltList::from(
            items.into_iter().map(to_bolt).collect::<Vec<_>>(),
        )),
        GraphValue::Map(map) => to_bolt_map(map),
        GraphValue::Node(node) => to_bolt_map(node.properties),
        GraphValue::Relationship(rel) => to_bolt_map(rel.properties),
        GraphValue::Path(path) => {
            let mut items = Vec::new();
            let mut rels = path.relationships.into_iter();
            for node in path.nodes {
                items.push(to_bolt_map(node.properties));
                if let Some(rel) = rels.next() {
                    items.push(to_bolt_map(rel.properties));
                }
            }
            BoltType::List(BoltList::from(items))
        }
        GraphValue::Temporal(t) => match t {
            Temporal::Date(d) => d.into(),
            Temporal::Time { time, offset } => (time, offset).into(),
            Temporal::LocalTime(t) => t.into(),
            Temporal::DateTime(dt) => dt.into(),
            Temporal::LocalDateTime(dt) => dt.into(),
            Temporal::Duration(d) => BoltType::Duration(BoltDuration::new(
                d.months.into(),
                d.days.into(),
                d.seconds.into(),
                d.nanoseconds.into(),
            )),
        },
        GraphValue::Point(p) => {
            let mut map = BTreeMap::new();
            map.insert("srid".to_string(), GraphValue::Integer(p.srid));
            map.insert("x".to_string(), GraphValue::Float(p.x));
            map.insert("y".to_string(), GraphValue::Float(p.y));
            if let Some(z) = p.z {
                map.insert("z".to_string(), GraphValue::Float(z));
            }
            to_bolt_map(map)
        }
    }
}

fn to_bolt_map(map: BTreeMap<String, GraphValue>) -> BoltType {
    let mut bolt = BoltMap::new();
    for (k, v) in map {
        bolt.put(BoltString::from(k), to_bolt(v));
    }
    BoltType::Map(bolt)
}
