//! JSON encoding and decoding options used by the request executor.

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Serialize, de::DeserializeOwned, forward_to_deserialize_any};
use serde_json::{Map, Value};

/// How request bodies are encoded and response bodies decoded.
///
/// The defaults match property names case-insensitively on decode and drop
/// `null` members on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// Match struct property names regardless of case.
    ///
    /// Only field names of the target types are matched; keys of map-typed
    /// members (token log-probabilities, logit bias) are kept verbatim. An
    /// exactly named member wins over a differently cased duplicate.
    pub case_insensitive: bool,
    /// Remove `null` members from objects before a body is sent.
    pub omit_null: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            omit_null: true,
        }
    }
}

impl JsonOptions {
    /// Strict serde behaviour: exact property names, nulls kept.
    pub fn strict() -> Self {
        Self {
            case_insensitive: false,
            omit_null: false,
        }
    }

    pub fn encode<T: Serialize + ?Sized>(&self, body: &T) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(body)?;
        if self.omit_null {
            strip_nulls(&mut value);
        }
        Ok(value)
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, serde_json::Error> {
        if !self.case_insensitive {
            return serde_json::from_slice(bytes);
        }

        let value: Value = serde_json::from_slice(bytes)?;
        T::deserialize(CaseInsensitive(&value))
    }
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, member| !member.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Deserializes a parsed body, resolving object keys against the field names
/// the target struct asks for.
struct CaseInsensitive<'de>(&'de Value);

impl<'de> Deserializer<'de> for CaseInsensitive<'de> {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Members::verbatim(map)),
            Value::Array(items) => visitor.visit_seq(Elements(items.iter())),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(Elements(items.iter())),
            other => other.deserialize_seq(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Members::verbatim(map)),
            other => other.deserialize_map(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => visitor.visit_map(Members::for_fields(map, fields)),
            other => other.deserialize_struct(name, fields, visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct identifier ignored_any
    }
}

struct Members<'de> {
    entries: std::vec::IntoIter<(&'de str, &'de Value)>,
    pending: Option<&'de Value>,
}

impl<'de> Members<'de> {
    fn verbatim(map: &'de Map<String, Value>) -> Self {
        let entries: Vec<_> = map.iter().map(|(key, value)| (key.as_str(), value)).collect();
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }

    fn for_fields(map: &'de Map<String, Value>, fields: &'static [&'static str]) -> Self {
        let entries: Vec<_> = map
            .iter()
            .map(|(key, value)| (resolve_field(map, key, fields), value))
            .collect();
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

/// The field `key` should populate. Unknown keys pass through unchanged, as
/// does a cased key whose exact field name is also present.
fn resolve_field<'de>(
    map: &Map<String, Value>,
    key: &'de str,
    fields: &'static [&'static str],
) -> &'de str {
    if fields.iter().any(|field| *field == key) {
        return key;
    }
    match fields.iter().find(|field| field.eq_ignore_ascii_case(key)) {
        Some(field) if !map.contains_key(*field) => *field,
        _ => key,
    }
}

impl<'de> MapAccess<'de> for Members<'de> {
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(BorrowedStrDeserializer::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        match self.pending.take() {
            Some(value) => seed.deserialize(CaseInsensitive(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct Elements<'de>(std::slice::Iter<'de, Value>);

impl<'de> SeqAccess<'de> for Elements<'de> {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        self.0
            .next()
            .map(|value| seed.deserialize(CaseInsensitive(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}
