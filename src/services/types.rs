//! Concrete data types the relay reads or builds.
//!
//! Most Concrete structs are large and only passed through, so they stay
//! opaque [`Struct`]s behind a newtype. Accessors read the few fields the
//! relay needs by id.

use crate::rpc::error::ProtocolError;
use crate::rpc::value::{Struct, TType, ThriftValue, Value};

/// Newtype over an opaque struct, carried through the relay unchanged.
macro_rules! opaque_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name(Struct);

        impl $name {
            pub fn from_struct(body: Struct) -> Self {
                Self(body)
            }

            pub fn as_struct(&self) -> &Struct {
                &self.0
            }

            pub fn into_struct(self) -> Struct {
                self.0
            }
        }

        impl ThriftValue for $name {
            const TTYPE: TType = TType::Struct;

            fn into_value(self) -> Value {
                Value::Struct(self.0)
            }

            fn from_value(value: Value) -> Result<Self, ProtocolError> {
                Struct::from_value(value).map(Self)
            }
        }
    };
}

opaque_struct!(
    /// `FetchRequest {1: communicationIds, 2: auxiliaryData?}`
    FetchRequest
);
opaque_struct!(
    /// `FetchResult {1: communications}`
    FetchResult
);
opaque_struct!(
    /// One document: `{1: id, 4: text?, 10: sectionList?, ...}`.
    Communication
);
opaque_struct!(SearchQuery);
opaque_struct!(SearchResult);
opaque_struct!(SearchCapability);

impl FetchRequest {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        Self(Struct::new().with(1, ids.into_value()))
    }

    /// Requested ids. A request without the field asks for nothing.
    pub fn communication_ids(&self) -> Vec<&str> {
        self.0
            .get(1)
            .and_then(Value::as_items)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

impl FetchResult {
    pub fn new(communications: Vec<Communication>) -> Self {
        Self(Struct::new().with(1, communications.into_value()))
    }

    pub fn len(&self) -> usize {
        self.0.get(1).and_then(Value::as_items).map_or(0, <[Value]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Communications in the result, in reply order. Non-struct entries are skipped.
    pub fn communications(&self) -> Vec<Communication> {
        self.0
            .get(1)
            .and_then(Value::as_items)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_struct)
                    .cloned()
                    .map(Communication)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Communication {
    pub fn id(&self) -> Option<&str> {
        self.0.get(1).and_then(Value::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.0.get(4).and_then(Value::as_str)
    }

    /// Text covered by the sentence whose UUID string equals `uuid`.
    ///
    /// Returns `None` when no such sentence exists. A sentence without a
    /// text span, or a communication without text, yields an empty string.
    pub fn sentence_text(&self, uuid: &str) -> Option<String> {
        let sentence = self.sentences().find(|s| sentence_uuid(s) == Some(uuid))?;
        let span = match sentence.get(3).and_then(Value::as_struct) {
            Some(span) => TextSpan::from_struct(span),
            None => return Some(String::new()),
        };
        Some(span.slice(self.text().unwrap_or_default()))
    }

    fn sentences(&self) -> impl Iterator<Item = &Struct> {
        items(&self.0, 10)
            .filter_map(Value::as_struct)
            .flat_map(|section| items(section, 2).filter_map(Value::as_struct))
    }
}

fn items(body: &Struct, id: i16) -> impl Iterator<Item = &Value> {
    body.get(id)
        .and_then(Value::as_items)
        .unwrap_or_default()
        .iter()
}

fn sentence_uuid(sentence: &Struct) -> Option<&str> {
    sentence
        .get(1)
        .and_then(Value::as_struct)
        .and_then(|uuid| uuid.get(1))
        .and_then(Value::as_str)
}

/// Character offsets into a communication's text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub start: i32,
    pub ending: i32,
}

impl TextSpan {
    fn from_struct(body: &Struct) -> Self {
        Self {
            start: body.get(1).and_then(Value::as_i32).unwrap_or(0),
            ending: body.get(2).and_then(Value::as_i32).unwrap_or(0),
        }
    }

    /// Slice `text` by character offsets, clamping out-of-range bounds.
    pub fn slice(&self, text: &str) -> String {
        let start = usize::try_from(self.start).unwrap_or(0);
        let ending = usize::try_from(self.ending).unwrap_or(0);
        if ending <= start {
            return String::new();
        }
        text.chars().skip(start).take(ending - start).collect()
    }
}

/// `ServiceInfo {1: name, 2: version, 3: description?}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

impl ThriftValue for ServiceInfo {
    const TTYPE: TType = TType::Struct;

    fn into_value(self) -> Value {
        let mut body = Struct::new().with(1, self.name).with(2, self.version);
        if let Some(description) = self.description {
            body.set(3, Value::String(description));
        }
        Value::Struct(body)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let mut body = Struct::from_value(value)?;
        Ok(Self {
            name: body.required(1, "ServiceInfo")?,
            version: body.required(2, "ServiceInfo")?,
            description: body.optional(3)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A communication with one section holding the given `(uuid, start, ending)` sentences.
    pub fn communication(id: &str, text: &str, sentences: &[(&str, i32, i32)]) -> Communication {
        let sentence_list: Vec<Struct> = sentences
            .iter()
            .map(|(uuid, start, ending)| {
                Struct::new()
                    .with(1, Struct::new().with(1, *uuid))
                    .with(3, Struct::new().with(1, *start).with(2, *ending))
            })
            .collect();
        let section = Struct::new().with(2, sentence_list.into_value());
        Communication::from_struct(
            Struct::new()
                .with(1, id)
                .with(4, text)
                .with(10, vec![section].into_value()),
        )
    }
}
