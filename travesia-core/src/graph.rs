//! Graph vocabulary: the closed set of labels and relationship types, validated
//! property names, and the node/relationship descriptors the loaders consume.
//!
//! Only values built here are ever interpolated into query text; every
//! property value travels as a query parameter.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeLabel {
    User,
    Destination,
    Hotel,
    Activity,
    Reservation,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 5] = [
        NodeLabel::User,
        NodeLabel::Destination,
        NodeLabel::Hotel,
        NodeLabel::Activity,
        NodeLabel::Reservation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "Usuario",
            NodeLabel::Destination => "Destino",
            NodeLabel::Hotel => "Hotel",
            NodeLabel::Activity => "Actividad",
            NodeLabel::Reservation => "Reserva",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| StoreError::InvalidIdentifier(format!("unknown node label '{}'", s)))
    }
}

impl TryFrom<String> for NodeLabel {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeLabel> for String {
    fn from(label: NodeLabel) -> Self {
        label.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelationshipType {
    Visited,
    FriendOf,
    FamilyOf,
    Booked,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 4] = [
        RelationshipType::Visited,
        RelationshipType::FriendOf,
        RelationshipType::FamilyOf,
        RelationshipType::Booked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Visited => "VISITO",
            RelationshipType::FriendOf => "AMIGO_DE",
            RelationshipType::FamilyOf => "FAMILIAR_DE",
            RelationshipType::Booked => "RESERVO",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RelationshipType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::InvalidIdentifier(format!("unknown relationship type '{}'", s)))
    }
}

impl TryFrom<String> for RelationshipType {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelationshipType> for String {
    fn from(kind: RelationshipType) -> Self {
        kind.as_str().to_string()
    }
}

/// A property name that is safe to splice into query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyKey(String);

impl PropertyKey {
    pub fn parse(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        if valid_head && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            Ok(Self(name))
        } else {
            Err(StoreError::InvalidIdentifier(format!("invalid property name '{}'", name)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PropertyKey {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PropertyKey> for String {
    fn from(key: PropertyKey) -> Self {
        key.0
    }
}

/// Scalar property value accepted by the graph layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    /// Converts a JSON scalar. `null` maps to `None`; arrays and objects are rejected.
    pub fn from_json(value: &Value) -> Result<Option<Self>, StoreError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(PropertyValue::Boolean(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Some(PropertyValue::Integer(i))),
                None => n
                    .as_f64()
                    .map(|f| Some(PropertyValue::Float(f)))
                    .ok_or_else(|| StoreError::InvalidRecord(format!("unrepresentable number {}", n))),
            },
            Value::String(s) => Ok(Some(PropertyValue::String(s.clone()))),
            other => Err(StoreError::InvalidRecord(format!(
                "graph properties must be scalars, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(x) => write!(f, "{}", x),
            PropertyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

/// A node to merge: the identity property plus any further properties.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub key: PropertyKey,
    pub value: PropertyValue,
    pub properties: Vec<(PropertyKey, PropertyValue)>,
}

impl NodeSpec {
    pub fn new(key: PropertyKey, value: impl Into<PropertyValue>) -> Self {
        Self {
            key,
            value: value.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: PropertyKey, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key, value.into()));
        self
    }

    /// Builds a node from a JSON object; its first key is the identity property.
    pub fn from_json(object: &serde_json::Map<String, Value>) -> Result<Self, StoreError> {
        let mut entries = object.iter();
        let (id_key, id_value) = entries
            .next()
            .ok_or_else(|| StoreError::InvalidRecord("node has no properties".to_string()))?;

        let key = PropertyKey::parse(id_key.as_str())?;
        let value = PropertyValue::from_json(id_value)?.ok_or_else(|| {
            StoreError::InvalidRecord(format!("identity property '{}' is null", id_key))
        })?;

        let mut properties = Vec::new();
        for (name, raw) in entries {
            if let Some(v) = PropertyValue::from_json(raw)? {
                properties.push((PropertyKey::parse(name.as_str())?, v));
            }
        }

        Ok(Self { key, value, properties })
    }
}

/// Directed relationship between two nodes, each matched by one property.
///
/// The serialized field names match the relation seed files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    #[serde(rename = "label_origen")]
    pub from_label: NodeLabel,
    #[serde(rename = "prop_origen")]
    pub from_key: PropertyKey,
    #[serde(rename = "valor_origen")]
    pub from_value: PropertyValue,
    #[serde(rename = "label_destino")]
    pub to_label: NodeLabel,
    #[serde(rename = "prop_destino")]
    pub to_key: PropertyKey,
    #[serde(rename = "valor_destino")]
    pub to_value: PropertyValue,
    #[serde(rename = "tipo")]
    pub kind: RelationshipType,
}

/// How non-identity properties are written when a node is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Only the identity property is ever stored.
    #[default]
    IdentityOnly,
    /// Properties are set when the node is created and left alone afterwards.
    OnCreate,
    /// Properties are overwritten on every merge.
    Always,
}

/// Selects relationships between two labels for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipQuery {
    pub from_label: NodeLabel,
    pub from_key: PropertyKey,
    pub to_label: NodeLabel,
    pub to_key: PropertyKey,
    pub kind: Option<RelationshipType>,
}

impl RelationshipQuery {
    /// Any relationship from one user to another.
    pub fn social() -> Self {
        Self {
            from_label: NodeLabel::User,
            from_key: PropertyKey("usuario_id".to_string()),
            to_label: NodeLabel::User,
            to_key: PropertyKey("usuario_id".to_string()),
            kind: None,
        }
    }

    /// `VISITO` relationships from users to destinations.
    pub fn visits() -> Self {
        Self {
            from_label: NodeLabel::User,
            from_key: PropertyKey("usuario_id".to_string()),
            to_label: NodeLabel::Destination,
            to_key: PropertyKey("destino_id".to_string()),
            kind: Some(RelationshipType::Visited),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RelationshipRow {
    pub origin: String,
    pub relation: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelationshipReport {
    pub social: Vec<RelationshipRow>,
    pub visits: Vec<RelationshipRow>,
}

impl fmt::Display for RelationshipReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "Relaciones sociales (Usuario -> Usuario)", &self.social)?;
        write_section(f, "Relaciones de visitas (Usuario -> Destino)", &self.visits)
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, rows: &[RelationshipRow]) -> fmt::Result {
    writeln!(f, "{}:", title)?;
    if rows.is_empty() {
        return writeln!(f, "  (sin resultados)");
    }
    for row in rows {
        writeln!(f, "  {} -[{}]-> {}", row.origin, row.relation, row.destination)?;
    }
    Ok(())
}
