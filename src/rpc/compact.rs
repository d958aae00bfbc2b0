//! Thrift compact protocol (TCompactProtocol), as spoken by backend services.
//!
//! Integers are zigzag varints, field headers carry the id as a delta from
//! the previous field when it fits in four bits, and bool field values are
//! folded into the field header's type nibble.

use crate::rpc::error::ProtocolError;
use crate::rpc::message::{Message, MessageHeader, MessageType};
use crate::rpc::value::{Struct, TType, Value};

const PROTOCOL_ID: u8 = 0x82;
const VERSION: u8 = 1;
const VERSION_MASK: u8 = 0x1f;
const TYPE_SHIFT: u8 = 5;
const MAX_DEPTH: usize = 64;

const CT_STOP: u8 = 0x00;
const CT_BOOL_TRUE: u8 = 0x01;
const CT_BOOL_FALSE: u8 = 0x02;
const CT_BYTE: u8 = 0x03;
const CT_I16: u8 = 0x04;
const CT_I32: u8 = 0x05;
const CT_I64: u8 = 0x06;
const CT_DOUBLE: u8 = 0x07;
const CT_BINARY: u8 = 0x08;
const CT_LIST: u8 = 0x09;
const CT_SET: u8 = 0x0a;
const CT_MAP: u8 = 0x0b;
const CT_STRUCT: u8 = 0x0c;

fn compact_type(ttype: TType) -> Result<u8, ProtocolError> {
    Ok(match ttype {
        TType::Bool => CT_BOOL_TRUE,
        TType::Byte => CT_BYTE,
        TType::I16 => CT_I16,
        TType::I32 => CT_I32,
        TType::I64 => CT_I64,
        TType::Double => CT_DOUBLE,
        TType::String => CT_BINARY,
        TType::List => CT_LIST,
        TType::Set => CT_SET,
        TType::Map => CT_MAP,
        TType::Struct => CT_STRUCT,
        TType::Stop | TType::Void => return Err(ProtocolError::UnknownType(ttype.to_string())),
    })
}

fn ttype_of(ctype: u8) -> Result<TType, ProtocolError> {
    Ok(match ctype {
        CT_BOOL_TRUE | CT_BOOL_FALSE => TType::Bool,
        CT_BYTE => TType::Byte,
        CT_I16 => TType::I16,
        CT_I32 => TType::I32,
        CT_I64 => TType::I64,
        CT_DOUBLE => TType::Double,
        CT_BINARY => TType::String,
        CT_LIST => TType::List,
        CT_SET => TType::Set,
        CT_MAP => TType::Map,
        CT_STRUCT => TType::Struct,
        other => return Err(ProtocolError::UnknownType(format!("compact {other:#x}"))),
    })
}

fn zigzag32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

fn zigzag64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

fn unzigzag32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

fn unzigzag64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let mut writer = Writer::default();
    writer.buf.push(PROTOCOL_ID);
    writer
        .buf
        .push((VERSION & VERSION_MASK) | ((msg.kind as u8) << TYPE_SHIFT));
    writer.varint(u64::from(msg.seq_id as u32));
    writer.bytes(msg.name.as_bytes());
    writer.structure(&msg.body)?;
    Ok(writer.buf)
}

pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let mut reader = Reader::new(bytes);
    let (kind, header) = reader.header()?;
    let body = reader.structure(0)?;
    Ok(Message {
        name: header.name,
        kind,
        seq_id: header.seq_id,
        body,
    })
}

pub fn peek_header(bytes: &[u8]) -> Option<MessageHeader> {
    Reader::new(bytes).header().ok().map(|(_, header)| header)
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn varint(&mut self, mut n: u64) {
        while n >= 0x80 {
            self.buf.push((n as u8 & 0x7f) | 0x80);
            n >>= 7;
        }
        self.buf.push(n as u8);
    }

    fn bytes(&mut self, data: &[u8]) {
        self.varint(data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    fn field_header(&mut self, ctype: u8, id: i16, last: &mut i16) {
        let delta = i32::from(id) - i32::from(*last);
        if delta > 0 && delta <= 15 {
            self.buf.push(((delta as u8) << 4) | ctype);
        } else {
            self.buf.push(ctype);
            self.varint(u64::from(zigzag32(i32::from(id))));
        }
        *last = id;
    }

    fn structure(&mut self, s: &Struct) -> Result<(), ProtocolError> {
        let mut last = 0i16;
        for (id, value) in s.fields() {
            match value {
                Value::Bool(b) => {
                    let ctype = if *b { CT_BOOL_TRUE } else { CT_BOOL_FALSE };
                    self.field_header(ctype, *id, &mut last);
                }
                other => {
                    self.field_header(compact_type(other.ttype())?, *id, &mut last);
                    self.value(other)?;
                }
            }
        }
        self.buf.push(CT_STOP);
        Ok(())
    }

    fn collection_header(&mut self, elem: TType, size: usize) -> Result<(), ProtocolError> {
        let ctype = compact_type(elem)?;
        if size < 15 {
            self.buf.push(((size as u8) << 4) | ctype);
        } else {
            self.buf.push(0xf0 | ctype);
            self.varint(size as u64);
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<(), ProtocolError> {
        match value {
            Value::Bool(b) => self.buf.push(if *b { CT_BOOL_TRUE } else { CT_BOOL_FALSE }),
            Value::Byte(v) => self.buf.push(*v as u8),
            Value::I16(v) => self.varint(u64::from(zigzag32(i32::from(*v)))),
            Value::I32(v) => self.varint(u64::from(zigzag32(*v))),
            Value::I64(v) => self.varint(zigzag64(*v)),
            Value::Double(v) => self.buf.extend_from_slice(&v.to_le_bytes()),
            Value::String(v) => self.bytes(v.as_bytes()),
            Value::Binary(v) => self.bytes(v),
            Value::Struct(s) => self.structure(s)?,
            Value::List { elem, items } | Value::Set { elem, items } => {
                self.collection_header(*elem, items.len())?;
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Map {
                key,
                value,
                entries,
            } => {
                if entries.is_empty() {
                    self.buf.push(0);
                } else {
                    self.varint(entries.len() as u64);
                    self.buf
                        .push((compact_type(*key)? << 4) | compact_type(*value)?);
                    for (k, v) in entries {
                        self.value(k)?;
                        self.value(v)?;
                    }
                }
            }
        }
        Ok(())
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn byte(&mut self) -> Result<u8, ProtocolError> {
        let b = *self.buf.get(self.pos).ok_or(ProtocolError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if len > self.remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        let buf = self.buf;
        let slice = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn varint(&mut self) -> Result<u64, ProtocolError> {
        let mut result = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.byte()?;
            result |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ProtocolError::invalid("varint too long"))
    }

    fn varint32(&mut self) -> Result<u32, ProtocolError> {
        u32::try_from(self.varint()?).map_err(|_| ProtocolError::invalid("varint exceeds 32 bits"))
    }

    /// Length-checked size prefix: every element occupies at least one byte.
    fn size(&mut self, raw: u64) -> Result<usize, ProtocolError> {
        let size = usize::try_from(raw).map_err(|_| ProtocolError::invalid("size overflow"))?;
        if size > self.remaining() {
            return Err(ProtocolError::SizeLimit {
                size,
                max: self.remaining(),
            });
        }
        Ok(size)
    }

    fn header(&mut self) -> Result<(MessageType, MessageHeader), ProtocolError> {
        let protocol_id = self.byte()?;
        if protocol_id != PROTOCOL_ID {
            return Err(ProtocolError::invalid(format!(
                "bad compact protocol id {protocol_id:#x}"
            )));
        }
        let version_and_type = self.byte()?;
        let version = version_and_type & VERSION_MASK;
        if version != VERSION {
            return Err(ProtocolError::BadVersion(i64::from(version)));
        }
        let kind = MessageType::from_i32(i32::from((version_and_type >> TYPE_SHIFT) & 0x07))
            .ok_or_else(|| ProtocolError::invalid("invalid message type"))?;
        let seq_id = self.varint32()? as i32;
        let name = self.string()?;
        Ok((kind, MessageHeader { name, seq_id }))
    }

    fn string(&mut self) -> Result<String, ProtocolError> {
        let raw = self.varint()?;
        let len = self.size(raw)?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::invalid("name is not UTF-8"))
    }

    fn structure(&mut self, depth: usize) -> Result<Struct, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::invalid("nesting too deep"));
        }
        let mut s = Struct::new();
        let mut last = 0i16;
        loop {
            let header = self.byte()?;
            let ctype = header & 0x0f;
            if ctype == CT_STOP {
                break;
            }
            let delta = header >> 4;
            let id = if delta == 0 {
                i16::try_from(unzigzag32(self.varint32()?))
                    .map_err(|_| ProtocolError::invalid("field id out of range"))?
            } else {
                last.wrapping_add(i16::from(delta))
            };
            let value = match ctype {
                CT_BOOL_TRUE => Value::Bool(true),
                CT_BOOL_FALSE => Value::Bool(false),
                other => self.value(ttype_of(other)?, depth + 1)?,
            };
            s.set(id, value);
            last = id;
        }
        Ok(s)
    }

    fn value(&mut self, ttype: TType, depth: usize) -> Result<Value, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::invalid("nesting too deep"));
        }
        Ok(match ttype {
            TType::Bool => Value::Bool(self.byte()? == CT_BOOL_TRUE),
            TType::Byte => Value::Byte(self.byte()? as i8),
            TType::I16 => Value::I16(unzigzag32(self.varint32()?) as i16),
            TType::I32 => Value::I32(unzigzag32(self.varint32()?)),
            TType::I64 => Value::I64(unzigzag64(self.varint()?)),
            TType::Double => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.take(8)?);
                Value::Double(f64::from_le_bytes(raw))
            }
            TType::String => {
                let raw = self.varint()?;
                let len = self.size(raw)?;
                let bytes = self.take(len)?.to_vec();
                match String::from_utf8(bytes) {
                    Ok(s) => Value::String(s),
                    Err(e) => Value::Binary(e.into_bytes()),
                }
            }
            TType::Struct => Value::Struct(self.structure(depth)?),
            TType::List | TType::Set => {
                let header = self.byte()?;
                let elem = ttype_of(header & 0x0f)?;
                let raw = match header >> 4 {
                    15 => self.varint()?,
                    short => u64::from(short),
                };
                let size = self.size(raw)?;
                let mut items = Vec::with_capacity(size);
                for _ in 0..size {
                    items.push(self.value(elem, depth + 1)?);
                }
                if ttype == TType::Set {
                    Value::Set { elem, items }
                } else {
                    Value::List { elem, items }
                }
            }
            TType::Map => {
                let raw = self.varint()?;
                let size = self.size(raw)?;
                if size == 0 {
                    // Empty maps carry no type byte on the wire.
                    return Ok(Value::Map {
                        key: TType::String,
                        value: TType::String,
                        entries: Vec::new(),
                    });
                }
                let types = self.byte()?;
                let key = ttype_of(types >> 4)?;
                let value = ttype_of(types & 0x0f)?;
                let mut entries = Vec::with_capacity(size);
                for _ in 0..size {
                    let k = self.value(key, depth + 1)?;
                    let v = self.value(value, depth + 1)?;
                    entries.push((k, v));
                }
                Value::Map {
                    key,
                    value,
                    entries,
                }
            }
            TType::Stop | TType::Void => return Err(ProtocolError::UnknownType(ttype.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_matches_reference_values() {
        assert_eq!(zigzag32(0), 0);
        assert_eq!(zigzag32(-1), 1);
        assert_eq!(zigzag32(1), 2);
        assert_eq!(zigzag64(-2), 3);
        assert_eq!(unzigzag32(3), -2);
        assert_eq!(unzigzag64(u64::MAX), i64::MIN);
    }

    #[test]
    fn encodes_alive_call_bytes() {
        let call = Message::call("alive", 0, Struct::new());
        let bytes = encode_message(&call).unwrap();
        assert_eq!(bytes, vec![0x82, 0x21, 0x00, 0x05, b'a', b'l', b'i', b'v', b'e', 0x00]);
    }

    #[test]
    fn bool_fields_fold_into_header() {
        let header = MessageHeader {
            name: "alive".into(),
            seq_id: 0,
        };
        let reply = Message::reply(&header, Struct::new().with(0, true));
        let bytes = encode_message(&reply).unwrap();
        // field 0 is not a positive delta from 0, so the long form is used
        assert_eq!(&bytes[bytes.len() - 3..], &[CT_BOOL_TRUE, 0x00, CT_STOP]);
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded.body.get(0), Some(&Value::Bool(true)));
    }

    #[test]
    fn long_field_deltas_use_explicit_ids() {
        let body = Struct::new().with(1, 1i32).with(40, 2i64).with(3, "x");
        let msg = Message::call("m", 9, body.clone());
        let decoded = decode_message(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(decoded.body, body);
        assert_eq!(decoded.seq_id, 9);
    }

    #[test]
    fn large_lists_use_varint_size() {
        let items: Vec<Value> = (0..20).map(Value::I32).collect();
        let body = Struct::new().with(
            1,
            Value::List {
                elem: TType::I32,
                items,
            },
        );
        let msg = Message::call("m", 0, body.clone());
        assert_eq!(decode_message(&encode_message(&msg).unwrap()).unwrap().body, body);
    }

    #[test]
    fn invalid_utf8_becomes_binary() {
        let body = Struct::new().with(2, Value::Binary(vec![0xff, 0xfe]));
        let msg = Message::call("m", 0, body.clone());
        assert_eq!(decode_message(&encode_message(&msg).unwrap()).unwrap().body, body);
    }

    #[test]
    fn oversized_collection_is_rejected() {
        // list header claiming 2^20 i32 elements in a tiny payload
        let mut bytes = vec![0x82, 0x21, 0x00, 0x01, b'm', 0x19, 0xf5];
        bytes.extend_from_slice(&[0x80, 0x80, 0x40]);
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::SizeLimit { .. })
        ));
    }

    #[test]
    fn truncated_payload_is_eof() {
        let call = Message::call("fetch", 1, Struct::new().with(1, "abc"));
        let bytes = encode_message(&call).unwrap();
        assert!(matches!(
            decode_message(&bytes[..bytes.len() - 1]),
            Err(ProtocolError::UnexpectedEof)
        ));
        assert_eq!(peek_header(&bytes).unwrap().name, "fetch");
    }

    #[test]
    fn deeply_nested_lists_are_rejected() {
        // each 0x19 opens a one-element list of lists
        let mut bytes = vec![0x82, 0x21, 0x00, 0x01, b'm', 0x19];
        bytes.extend(std::iter::repeat(0x19).take(10_000));
        bytes.push(CT_STOP);
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::InvalidData(_))
        ));
    }
}
