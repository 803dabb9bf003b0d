//! Generic result values returned by the API.
//!
//! # Design
//! The backend has no fixed schema, so records stay as JSON maps. Domain
//! methods pull the fields they need through accessors that fail with
//! `ApiError::Field` instead of panicking on a bad cast.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Caller-declared expectation of the response body layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single JSON object.
    Single,
    /// An array of JSON objects.
    Collection,
    /// An array of strings.
    Names,
}

/// One domain entity (app, user, data item).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Returns a string field, failing if it is absent or not a string.
    pub fn str_field(&self, field: &str) -> ApiResult<&str> {
        match self.0.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ApiError::field(
                field,
                format!("expected a string, found {}", kind(other)),
            )),
            None => Err(ApiError::field(field, "is missing")),
        }
    }

    pub fn id(&self) -> ApiResult<&str> {
        self.str_field("id")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = ApiError;

    fn try_from(value: Value) -> ApiResult<Self> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            other => Err(ApiError::Decode(format!(
                "expected an object, found {}",
                kind(&other)
            ))),
        }
    }
}

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Record(Record),
    Collection(Vec<Record>),
    Names(Vec<String>),
    /// The server answered 200 with no body.
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// `Empty` maps to `None`; any non-record payload is a `Field` error.
    pub fn into_record(self) -> ApiResult<Option<Record>> {
        match self {
            Payload::Record(record) => Ok(Some(record)),
            Payload::Empty => Ok(None),
            other => Err(ApiError::field("<body>", format!("expected a record, found {}", other.label()))),
        }
    }

    /// Like [`Payload::into_record`], but an empty body is also an error.
    pub fn require_record(self) -> ApiResult<Record> {
        self.into_record()?
            .ok_or_else(|| ApiError::field("<body>", "expected a record, found an empty body"))
    }

    /// `Empty` maps to an empty vector.
    pub fn into_collection(self) -> ApiResult<Vec<Record>> {
        match self {
            Payload::Collection(records) => Ok(records),
            Payload::Empty => Ok(Vec::new()),
            other => Err(ApiError::field(
                "<body>",
                format!("expected a collection, found {}", other.label()),
            )),
        }
    }

    pub fn into_names(self) -> ApiResult<Vec<String>> {
        match self {
            Payload::Names(names) => Ok(names),
            Payload::Empty => Ok(Vec::new()),
            other => Err(ApiError::field("<body>", format!("expected names, found {}", other.label()))),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Payload::Record(_) => "a record",
            Payload::Collection(_) => "a collection",
            Payload::Names(_) => "names",
            Payload::Empty => "an empty body",
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
