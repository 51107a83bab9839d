//! Native values exchanged with the codec

use indexmap::map::{Entry, IntoIter, Iter, Keys};
use indexmap::IndexMap;
use time::OffsetDateTime;

use crate::xml::Element;

/// Reserved mapping key holding an element's attributes
pub const ATTRIBUTES_KEY: &str = "@attributes";

/// Reserved mapping key holding the text of an element that also has attributes
pub const TEXT_KEY: &str = "#text";

/// A value marshalled into, or unmarshalled out of, a SOAP message
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value (`xsi:nil`)
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// `xsd:dateTime` value
    DateTime(OffsetDateTime),
    /// `xsd:base64Binary` value
    Binary(Vec<u8>),
    /// Repeated sibling elements
    Array(Array),
    /// Element with named children (key-value pairs with order preservation)
    Object(Object),
    /// Pre-built or uninterpreted XML subtree
    Xml(Element),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Any number, widening integers
    #[allow(clippy::as_conversions)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&Element> {
        match self {
            Self::Xml(tree) => Some(tree),
            _ => None,
        }
    }

    /// Entry `key` of a mapping; `None` for every other value
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object().and_then(|entries| entries.get(key))
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    u32 => Int,
    i64 => Int,
    f64 => Float,
    String => String,
    &str => String,
    OffsetDateTime => DateTime,
    Vec<u8> => Binary,
    Array => Array,
    Vec<Value> => Array,
    Object => Object,
    IndexMap<String, Value> => Object,
    Element => Xml,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Element content keyed by child tag, in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object(IndexMap<String, Value>);

impl Object {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Set `key`, keeping its original position when it already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Add a value under `key`; a repeated key turns its entry into a sequence
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        match self.0.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(value),
                existing => {
                    let first = std::mem::take(existing);
                    *existing = Value::Array(Array(vec![first, value]));
                }
            },
        }
    }

    /// Remove `key`, keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<IndexMap<String, Value>> for Object {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self(entries)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Values of repeated sibling elements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array(Vec<Value>);

impl Array {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Array {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self(items)
    }
}

impl FromIterator<Value> for Array {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::ser::{SerializeMap, SerializeSeq};
    use serde::{Serialize, Serializer};

    use super::{Array, Object, Value};
    use crate::scalar;

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Self::Null => serializer.serialize_unit(),
                Self::Bool(b) => serializer.serialize_bool(*b),
                Self::Int(n) => serializer.serialize_i64(*n),
                Self::Float(n) => serializer.serialize_f64(*n),
                Self::String(s) => serializer.serialize_str(s),
                Self::DateTime(dt) => serializer.serialize_str(&scalar::format_datetime(dt)),
                Self::Binary(bytes) => serializer.serialize_str(&scalar::encode_base64(bytes)),
                Self::Array(arr) => arr.serialize(serializer),
                Self::Object(obj) => obj.serialize(serializer),
                Self::Xml(element) => serializer.serialize_str(&element.to_xml_string()),
            }
        }
    }

    impl Serialize for Object {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }

    impl Serialize for Array {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for value in self {
                seq.serialize_element(value)?;
            }
            seq.end()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::from(false).is_null());
        assert_eq!(Value::Bool(false).as_bool(), Some(false));
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_float(), Some(7.0));
        assert_eq!(Value::Float(7.5).as_int(), None);
        assert_eq!(Value::from("hi").as_string(), Some("hi"));
        assert_eq!(Value::from(vec![1u8, 2]).as_binary(), Some(&[1u8, 2][..]));
        assert!(Value::from(Element::new("a")).as_xml().is_some());
        assert_eq!(Value::Null.as_object(), None);
        assert_eq!(Value::Int(1).get("a"), None);
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }

    #[test]
    fn test_object_keeps_document_order() {
        let mut obj = Object::new();
        obj.insert("second", 2i32);
        obj.insert("first", 1i32);
        obj.insert("third", 3i32);
        obj.insert("second", 4i32);
        obj.remove("first");

        let keys: Vec<_> = obj.keys().collect();
        assert_eq!(keys, vec!["second", "third"]);
        assert_eq!(obj.get("second"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_object_append_collapses_repeats() {
        let mut obj = Object::new();
        obj.append("item", "no");
        obj.append("other", 1i32);
        obj.append("item", "en");
        obj.append("item", "ny");

        assert_eq!(
            obj.get("item"),
            Some(&Value::from(vec![
                Value::from("no"),
                Value::from("en"),
                Value::from("ny")
            ]))
        );
        assert_eq!(obj.get("other"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_object_from_pairs() {
        let obj: Object = [("a", 1i32), ("b", 2i32)].into_iter().collect();
        assert_eq!(obj.get("b"), Some(&Value::Int(2)));
        assert_eq!(Value::Object(obj).get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_array_push_and_get() {
        let mut arr = Array::new();
        arr.push(Value::Null);
        arr.push(42i32);
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(1), Some(&Value::Int(42)));
        assert_eq!(arr.get(2), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_to_json() -> Result<(), serde_json::Error> {
        let mut inner = Object::new();
        inner.insert("ok", true);
        inner.insert("n", 3i32);
        let mut obj = Object::new();
        obj.insert("result", inner);
        obj.insert("tags", vec![Value::from("a"), Value::Null]);
        obj.insert("blob", vec![0xffu8, 0x00]);

        let json = serde_json::to_string(&Value::Object(obj))?;
        assert_eq!(
            json,
            r#"{"result":{"ok":true,"n":3},"tags":["a",null],"blob":"/wA="}"#
        );
        Ok(())
    }
}
