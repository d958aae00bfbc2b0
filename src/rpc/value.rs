//! Schema-less Thrift value tree.
//!
//! Every protocol decodes into and encodes from these types, so a payload can
//! cross from one encoding to another without the relay knowing its IDL.

use std::fmt;

use crate::rpc::error::ProtocolError;

/// Thrift type tags, numbered as on the wire in the binary protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TType {
    Stop,
    Void,
    Bool,
    Byte,
    Double,
    I16,
    I32,
    I64,
    String,
    Struct,
    Map,
    Set,
    List,
}

impl TType {
    /// Standard Thrift type id.
    pub fn id(self) -> u8 {
        match self {
            TType::Stop => 0,
            TType::Void => 1,
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::I16 => 6,
            TType::I32 => 8,
            TType::I64 => 10,
            TType::String => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }

    /// Type name used by the JSON protocol. Stop and void have none.
    pub fn json_name(self) -> Option<&'static str> {
        match self {
            TType::Bool => Some("tf"),
            TType::Byte => Some("i8"),
            TType::I16 => Some("i16"),
            TType::I32 => Some("i32"),
            TType::I64 => Some("i64"),
            TType::Double => Some("dbl"),
            TType::String => Some("str"),
            TType::Struct => Some("rec"),
            TType::Map => Some("map"),
            TType::Set => Some("set"),
            TType::List => Some("lst"),
            TType::Stop | TType::Void => None,
        }
    }

    pub fn from_json_name(name: &str) -> Option<Self> {
        match name {
            "tf" => Some(TType::Bool),
            "i8" => Some(TType::Byte),
            "i16" => Some(TType::I16),
            "i32" => Some(TType::I32),
            "i64" => Some(TType::I64),
            "dbl" => Some(TType::Double),
            "str" => Some(TType::String),
            "rec" => Some(TType::Struct),
            "map" => Some(TType::Map),
            "set" => Some(TType::Set),
            "lst" => Some(TType::List),
            _ => None,
        }
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TType::Stop => "stop",
            TType::Void => "void",
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::Double => "double",
            TType::I16 => "i16",
            TType::I32 => "i32",
            TType::I64 => "i64",
            TType::String => "string",
            TType::Struct => "struct",
            TType::Map => "map",
            TType::Set => "set",
            TType::List => "list",
        };
        f.write_str(name)
    }
}

/// A single decoded Thrift value.
///
/// Binary fields share the string type tag on the wire. They decode as
/// [`Value::String`] unless the bytes are not valid UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Struct(Struct),
    Map {
        key: TType,
        value: TType,
        entries: Vec<(Value, Value)>,
    },
    Set {
        elem: TType,
        items: Vec<Value>,
    },
    List {
        elem: TType,
        items: Vec<Value>,
    },
}

impl Value {
    pub fn ttype(&self) -> TType {
        match self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::I16(_) => TType::I16,
            Value::I32(_) => TType::I32,
            Value::I64(_) => TType::I64,
            Value::Double(_) => TType::Double,
            Value::String(_) | Value::Binary(_) => TType::String,
            Value::Struct(_) => TType::Struct,
            Value::Map { .. } => TType::Map,
            Value::Set { .. } => TType::Set,
            Value::List { .. } => TType::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Byte(v) => Some(i32::from(*v)),
            Value::I16(v) => Some(i32::from(*v)),
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or set.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List { items, .. } | Value::Set { items, .. } => Some(items),
            _ => None,
        }
    }
}

/// A Thrift struct as an ordered list of `(field id, value)` pairs.
///
/// Decoders keep the order fields arrived in, so re-encoding a struct that was
/// only passed through reproduces the same field sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Struct {
    fields: Vec<(i16, Value)>,
}

impl Struct {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Struct::set`].
    pub fn with(mut self, id: i16, value: impl Into<Value>) -> Self {
        self.set(id, value.into());
        self
    }

    /// Set a field, replacing an existing value in place.
    pub fn set(&mut self, id: i16, value: Value) {
        match self.fields.iter_mut().find(|(fid, _)| *fid == id) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((id, value)),
        }
    }

    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.iter().find(|(fid, _)| *fid == id).map(|(_, v)| v)
    }

    /// Remove a field and return its value.
    pub fn take(&mut self, id: i16) -> Option<Value> {
        let index = self.fields.iter().position(|(fid, _)| *fid == id)?;
        Some(self.fields.remove(index).1)
    }

    pub fn fields(&self) -> &[(i16, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Take a required field and convert it.
    pub fn required<T: ThriftValue>(
        &mut self,
        id: i16,
        context: &'static str,
    ) -> Result<T, ProtocolError> {
        let value = self
            .take(id)
            .ok_or(ProtocolError::MissingField { context, field: id })?;
        T::from_value(value)
    }

    /// Take an optional field and convert it if present.
    pub fn optional<T: ThriftValue>(&mut self, id: i16) -> Result<Option<T>, ProtocolError> {
        self.take(id).map(T::from_value).transpose()
    }
}

impl From<Struct> for Value {
    fn from(s: Struct) -> Self {
        Value::Struct(s)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Conversion between Rust types and Thrift values.
pub trait ThriftValue: Sized {
    const TTYPE: TType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self, ProtocolError>;
}

fn mismatch(expected: TType, value: &Value) -> ProtocolError {
    ProtocolError::TypeMismatch {
        expected,
        actual: value.ttype(),
    }
}

impl ThriftValue for bool {
    const TTYPE: TType = TType::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch(TType::Bool, &other)),
        }
    }
}

impl ThriftValue for i32 {
    const TTYPE: TType = TType::I32;

    fn into_value(self) -> Value {
        Value::I32(self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        value.as_i32().ok_or_else(|| mismatch(TType::I32, &value))
    }
}

impl ThriftValue for i64 {
    const TTYPE: TType = TType::I64;

    fn into_value(self) -> Value {
        Value::I64(self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::I64(v) => Ok(v),
            other => other
                .as_i32()
                .map(i64::from)
                .ok_or_else(|| mismatch(TType::I64, &other)),
        }
    }
}

impl ThriftValue for String {
    const TTYPE: TType = TType::String;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(mismatch(TType::String, &other)),
        }
    }
}

impl ThriftValue for Struct {
    const TTYPE: TType = TType::Struct;

    fn into_value(self) -> Value {
        Value::Struct(self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Struct(s) => Ok(s),
            other => Err(mismatch(TType::Struct, &other)),
        }
    }
}

impl<T: ThriftValue> ThriftValue for Vec<T> {
    const TTYPE: TType = TType::List;

    fn into_value(self) -> Value {
        Value::List {
            elem: T::TTYPE,
            items: self.into_iter().map(ThriftValue::into_value).collect(),
        }
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::List { items, .. } | Value::Set { items, .. } => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch(TType::List, &other)),
        }
    }
}
