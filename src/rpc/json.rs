//! Thrift JSON protocol (TJSONProtocol), as spoken by browser clients.
//!
//! ```text
//! message: [1, "name", kind, seqid, {struct}]
//! struct:  {"<field id>": {"<type>": value}, ...}
//! map:     ["<key type>", "<value type>", count, {"<key>": value, ...}]
//! list:    ["<elem type>", count, value, ...]
//! ```

use base64::Engine;
use serde_json::{Map, Number, Value as Json};

use crate::rpc::error::ProtocolError;
use crate::rpc::message::{Message, MessageHeader, MessageType};
use crate::rpc::value::{Struct, TType, Value};

const VERSION: i64 = 1;
const MAX_DEPTH: usize = 64;

pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let doc = Json::Array(vec![
        Json::from(VERSION),
        Json::from(msg.name.as_str()),
        Json::from(msg.kind as i32),
        Json::from(msg.seq_id),
        encode_struct(&msg.body)?,
    ]);
    Ok(serde_json::to_vec(&doc)?)
}

pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let doc: Json = serde_json::from_slice(bytes)?;
    let parts = doc
        .as_array()
        .ok_or_else(|| ProtocolError::invalid("message is not a JSON array"))?;
    if parts.len() < 4 {
        return Err(ProtocolError::invalid("message header is incomplete"));
    }

    let version = parts[0]
        .as_i64()
        .ok_or_else(|| ProtocolError::invalid("message version is not a number"))?;
    if version != VERSION {
        return Err(ProtocolError::BadVersion(version));
    }
    let name = parts[1]
        .as_str()
        .ok_or_else(|| ProtocolError::invalid("message name is not a string"))?
        .to_string();
    let kind = parts[2]
        .as_i64()
        .and_then(|k| i32::try_from(k).ok())
        .and_then(MessageType::from_i32)
        .ok_or_else(|| ProtocolError::invalid("invalid message type"))?;
    let seq_id = parts[3]
        .as_i64()
        .and_then(|s| i32::try_from(s).ok())
        .ok_or_else(|| ProtocolError::invalid("invalid sequence id"))?;
    let body = match parts.get(4) {
        Some(body) => decode_struct(body, 0)?,
        None => Struct::new(),
    };

    Ok(Message {
        name,
        kind,
        seq_id,
        body,
    })
}

/// Best-effort read of the header of a payload whose body may be malformed.
pub fn peek_header(bytes: &[u8]) -> Option<MessageHeader> {
    let doc: Json = serde_json::from_slice(bytes).ok()?;
    let parts = doc.as_array()?;
    let name = parts.get(1)?.as_str()?.to_string();
    let seq_id = i32::try_from(parts.get(3)?.as_i64()?).ok()?;
    Some(MessageHeader { name, seq_id })
}

fn type_tag(ttype: TType) -> Result<&'static str, ProtocolError> {
    ttype
        .json_name()
        .ok_or_else(|| ProtocolError::UnknownType(ttype.to_string()))
}

fn encode_struct(s: &Struct) -> Result<Json, ProtocolError> {
    let mut fields = Map::new();
    for (id, value) in s.fields() {
        let mut typed = Map::new();
        typed.insert(type_tag(value.ttype())?.to_string(), encode_value(value)?);
        fields.insert(id.to_string(), Json::Object(typed));
    }
    Ok(Json::Object(fields))
}

fn encode_double(v: f64) -> Json {
    match Number::from_f64(v) {
        Some(n) => Json::Number(n),
        None if v.is_nan() => Json::from("NaN"),
        None if v > 0.0 => Json::from("Infinity"),
        None => Json::from("-Infinity"),
    }
}

fn encode_value(value: &Value) -> Result<Json, ProtocolError> {
    Ok(match value {
        Value::Bool(v) => Json::from(u8::from(*v)),
        Value::Byte(v) => Json::from(*v),
        Value::I16(v) => Json::from(*v),
        Value::I32(v) => Json::from(*v),
        Value::I64(v) => Json::from(*v),
        Value::Double(v) => encode_double(*v),
        Value::String(v) => Json::from(v.as_str()),
        Value::Binary(v) => Json::from(base64::engine::general_purpose::STANDARD.encode(v)),
        Value::Struct(s) => encode_struct(s)?,
        Value::Map {
            key,
            value,
            entries,
        } => {
            let mut object = Map::new();
            for (k, v) in entries {
                object.insert(encode_key(k)?, encode_value(v)?);
            }
            Json::Array(vec![
                Json::from(type_tag(*key)?),
                Json::from(type_tag(*value)?),
                Json::from(entries.len()),
                Json::Object(object),
            ])
        }
        Value::List { elem, items } | Value::Set { elem, items } => {
            let mut array = Vec::with_capacity(items.len() + 2);
            array.push(Json::from(type_tag(*elem)?));
            array.push(Json::from(items.len()));
            for item in items {
                array.push(encode_value(item)?);
            }
            Json::Array(array)
        }
    })
}

/// JSON object keys are always strings, so scalar map keys are quoted.
fn encode_key(key: &Value) -> Result<String, ProtocolError> {
    Ok(match key {
        Value::Bool(v) => u8::from(*v).to_string(),
        Value::Byte(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::Double(v) => match encode_double(*v) {
            Json::String(s) => s,
            other => other.to_string(),
        },
        Value::String(v) => v.clone(),
        Value::Binary(v) => base64::engine::general_purpose::STANDARD.encode(v),
        other => {
            return Err(ProtocolError::invalid(format!(
                "{} map keys are not supported",
                other.ttype()
            )))
        }
    })
}

fn decode_struct(json: &Json, depth: usize) -> Result<Struct, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::invalid("nesting too deep"));
    }
    let object = json
        .as_object()
        .ok_or_else(|| ProtocolError::invalid("struct is not a JSON object"))?;

    let mut s = Struct::new();
    for (key, field) in object {
        let id: i16 = key
            .parse()
            .map_err(|_| ProtocolError::invalid(format!("invalid field id {key:?}")))?;
        let typed = field
            .as_object()
            .filter(|o| o.len() == 1)
            .ok_or_else(|| ProtocolError::invalid(format!("field {id} is not a typed value")))?;
        if let Some((tag, inner)) = typed.iter().next() {
            let ttype = parse_tag(tag)?;
            s.set(id, decode_value(ttype, inner, depth + 1)?);
        }
    }
    Ok(s)
}

fn parse_tag(tag: &str) -> Result<TType, ProtocolError> {
    TType::from_json_name(tag).ok_or_else(|| ProtocolError::UnknownType(tag.to_string()))
}

fn tag_at(parts: &[Json], index: usize) -> Result<TType, ProtocolError> {
    let tag = parts
        .get(index)
        .and_then(Json::as_str)
        .ok_or_else(|| ProtocolError::invalid("container type tag missing"))?;
    parse_tag(tag)
}

fn count_at(parts: &[Json], index: usize) -> Result<usize, ProtocolError> {
    parts
        .get(index)
        .and_then(Json::as_u64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ProtocolError::invalid("container size missing"))
}

fn integer<T: TryFrom<i64>>(json: &Json, ttype: TType) -> Result<T, ProtocolError> {
    let raw = match json {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    };
    raw.and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ProtocolError::invalid(format!("invalid {ttype} value {json}")))
}

fn double(json: &Json) -> Result<f64, ProtocolError> {
    match json {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
    .ok_or_else(|| ProtocolError::invalid(format!("invalid double value {json}")))
}

fn decode_value(ttype: TType, json: &Json, depth: usize) -> Result<Value, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::invalid("nesting too deep"));
    }
    Ok(match ttype {
        TType::Bool => match json {
            Json::Bool(b) => Value::Bool(*b),
            other => Value::Bool(integer::<i64>(other, ttype)? != 0),
        },
        TType::Byte => Value::Byte(integer(json, ttype)?),
        TType::I16 => Value::I16(integer(json, ttype)?),
        TType::I32 => Value::I32(integer(json, ttype)?),
        TType::I64 => Value::I64(integer(json, ttype)?),
        TType::Double => Value::Double(double(json)?),
        TType::String => Value::String(
            json.as_str()
                .ok_or_else(|| ProtocolError::invalid("string value is not a JSON string"))?
                .to_string(),
        ),
        TType::Struct => Value::Struct(decode_struct(json, depth)?),
        TType::Map => {
            let parts = json
                .as_array()
                .ok_or_else(|| ProtocolError::invalid("map is not a JSON array"))?;
            let key = tag_at(parts, 0)?;
            let value = tag_at(parts, 1)?;
            let count = count_at(parts, 2)?;
            let object = parts
                .get(3)
                .and_then(Json::as_object)
                .ok_or_else(|| ProtocolError::invalid("map entries missing"))?;
            if object.len() != count {
                return Err(ProtocolError::invalid(format!(
                    "map declares {count} entries but has {}",
                    object.len()
                )));
            }
            let mut entries = Vec::with_capacity(count);
            for (k, v) in object {
                entries.push((decode_key(key, k)?, decode_value(value, v, depth + 1)?));
            }
            Value::Map {
                key,
                value,
                entries,
            }
        }
        TType::List | TType::Set => {
            let parts = json
                .as_array()
                .ok_or_else(|| ProtocolError::invalid("collection is not a JSON array"))?;
            let elem = tag_at(parts, 0)?;
            let count = count_at(parts, 1)?;
            let raw = &parts[2..];
            if raw.len() != count {
                return Err(ProtocolError::invalid(format!(
                    "collection declares {count} elements but has {}",
                    raw.len()
                )));
            }
            let items = raw
                .iter()
                .map(|item| decode_value(elem, item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            if ttype == TType::Set {
                Value::Set { elem, items }
            } else {
                Value::List { elem, items }
            }
        }
        TType::Stop | TType::Void => return Err(ProtocolError::UnknownType(ttype.to_string())),
    })
}

fn decode_key(ttype: TType, key: &str) -> Result<Value, ProtocolError> {
    match ttype {
        TType::String => Ok(Value::String(key.to_string())),
        TType::Bool | TType::Byte | TType::I16 | TType::I32 | TType::I64 | TType::Double => {
            decode_value(ttype, &Json::from(key), 0)
        }
        other => Err(ProtocolError::invalid(format!(
            "{other} map keys are not supported"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_browser_alive_call() {
        let payload = br#"[1,"alive",1,0,{}]"#;
        let msg = decode_message(payload).unwrap();
        assert_eq!(msg.name, "alive");
        assert_eq!(msg.kind, MessageType::Call);
        assert_eq!(msg.seq_id, 0);
        assert!(msg.body.is_empty());
    }

    #[test]
    fn encodes_bool_reply_like_thrift_js() {
        let header = MessageHeader {
            name: "alive".into(),
            seq_id: 3,
        };
        let reply = Message::reply(&header, Struct::new().with(0, true));
        let bytes = encode_message(&reply).unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            r#"[1,"alive",2,3,{"0":{"tf":1}}]"#
        );
    }

    #[test]
    fn decodes_fetch_request_arguments() {
        let payload = br#"[1,"fetch",1,7,{"1":{"rec":{"1":{"lst":["str",2,"a","b"]}}}}]"#;
        let msg = decode_message(payload).unwrap();
        let request = msg.body.get(1).and_then(Value::as_struct).unwrap();
        let ids = request.get(1).and_then(Value::as_items).unwrap();
        assert_eq!(ids, &[Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn preserves_field_order() {
        let payload = br#"[1,"m",1,0,{"10":{"i32":1},"2":{"i32":2},"1":{"i32":3}}]"#;
        let msg = decode_message(payload).unwrap();
        let ids: Vec<i16> = msg.body.fields().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10, 2, 1]);
    }

    #[test]
    fn map_keys_are_quoted() {
        let value = Value::Map {
            key: TType::I32,
            value: TType::String,
            entries: vec![(Value::I32(4), Value::from("four"))],
        };
        let json = encode_value(&value).unwrap();
        assert_eq!(json.to_string(), r#"["i32","str",1,{"4":"four"}]"#);
        assert_eq!(decode_value(TType::Map, &json, 0).unwrap(), value);
    }

    #[test]
    fn non_finite_doubles_are_strings() {
        assert_eq!(encode_double(f64::INFINITY), Json::from("Infinity"));
        assert!(double(&Json::from("NaN")).unwrap().is_nan());
    }

    #[test]
    fn rejects_count_mismatch() {
        let payload = br#"[1,"m",1,0,{"1":{"lst":["i32",3,1,2]}}]"#;
        assert!(matches!(
            decode_message(payload),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(matches!(
            decode_message(br#"[2,"alive",1,0,{}]"#),
            Err(ProtocolError::BadVersion(2))
        ));
    }

    #[test]
    fn peeks_header_of_broken_body() {
        let payload = br#"[1,"search",1,42,{"1":{"bogus":1}}]"#;
        assert!(decode_message(payload).is_err());
        let header = peek_header(payload).unwrap();
        assert_eq!(header.name, "search");
        assert_eq!(header.seq_id, 42);
    }

    #[test]
    fn deeply_nested_lists_are_rejected() {
        let mut inner = String::from(r#"["i32",1,0]"#);
        for _ in 0..100 {
            inner = format!(r#"["lst",1,{inner}]"#);
        }
        let payload = format!(r#"[1,"m",1,0,{{"1":{{"lst":{inner}}}}}]"#);
        assert!(matches!(
            decode_message(payload.as_bytes()),
            Err(ProtocolError::InvalidData(_))
        ));
    }
}
