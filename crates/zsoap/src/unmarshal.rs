//! XML elements to native values

use tracing::warn;

use crate::envelope::{SOAP_ENCODING_NAMESPACE, XSI_NAMESPACE};
use crate::error::{Error, ErrorKind, Result};
use crate::scalar::ScalarKind;
use crate::schema::{Field, Schema, Struct, ANY_FIELD};
use crate::value::{Array, Object, Value, ATTRIBUTES_KEY, TEXT_KEY};
use crate::xml::namespace::declared_prefix;
use crate::xml::Element;

/// Schema-driven decoder
///
/// Lenient by default: a required field missing from the XML decodes to
/// `Null`. In strict mode it is a [`ErrorKind::SchemaMismatch`] instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unmarshaller {
    strict: bool,
}

impl Unmarshaller {
    pub const fn new() -> Self {
        Self { strict: false }
    }

    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub const fn is_strict(self) -> bool {
        self.strict
    }

    /// Decode `node` against `schema`
    pub fn unmarshall(self, node: &Element, schema: &Schema) -> Result<Value> {
        if is_nil(node) {
            return Ok(Value::Null);
        }
        match schema {
            Schema::Scalar(ScalarKind::Any) => Ok(decode_any(node)),
            Schema::Scalar(kind) => kind.decode(&node.text()),
            Schema::Struct(body) => self.unmarshall_struct(node, body).map(Value::Object),
            Schema::Array(item) => node
                .elements()
                .map(|child| self.unmarshall(child, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::from),
            Schema::List(item) => {
                let mut items = Array::new();
                for child in node.elements() {
                    let mut entry = Object::new();
                    entry.insert(child.local_name(), self.unmarshall(child, item)?);
                    items.push(entry);
                }
                Ok(Value::Array(items))
            }
            Schema::Wildcard => Ok(Value::Xml(node.clone())),
        }
    }

    /// Decode the children of `node` field by field, in schema order
    pub fn unmarshall_struct(self, node: &Element, body: &Struct) -> Result<Object> {
        let mut object = Object::with_capacity(body.len());
        let mut claimed = vec![false; node.elements().count()];

        for field in body.fields() {
            if field.is_wildcard() {
                continue;
            }
            let local = field.local_name();
            let matches: Vec<(usize, &Element)> = node
                .elements()
                .enumerate()
                .filter(|(_, child)| child.local_name() == local)
                .collect();
            for (index, _) in &matches {
                if let Some(slot) = claimed.get_mut(*index) {
                    *slot = true;
                }
            }

            if field.is_repeated() {
                // a repeated list field repeats whole containers
                let item = match &field.schema {
                    Schema::Array(item) => item.as_ref(),
                    schema => schema,
                };
                let items = matches
                    .iter()
                    .map(|(_, child)| self.unmarshall(child, item))
                    .collect::<Result<Vec<_>>>()?;
                object.insert(field.name.as_str(), items);
                continue;
            }

            match matches.first() {
                Some((_, child)) => {
                    object.insert(field.name.as_str(), self.unmarshall(child, &field.schema)?);
                }
                None => self.missing(node, field, &mut object)?,
            }
        }

        if body.fields().iter().any(Field::is_wildcard) {
            let rest: Vec<Value> = node
                .elements()
                .zip(&claimed)
                .filter(|(_, claimed)| !**claimed)
                .map(|(child, _)| Value::Xml(child.clone()))
                .collect();
            object.insert(ANY_FIELD, rest);
        }
        Ok(object)
    }

    fn missing(self, node: &Element, field: &Field, object: &mut Object) -> Result<()> {
        if field.occurs.is_optional() {
            return Ok(());
        }
        if self.strict {
            return Err(Error::from_kind(ErrorKind::SchemaMismatch {
                expected: format!("element {}", field.name),
                found: format!("no such child of {}", node.tag()),
            }));
        }
        warn!(field = %field.name, element = %node.tag(), "required element missing, decoded as null");
        object.insert(field.name.as_str(), Value::Null);
        Ok(())
    }
}

/// Decode `node` against `schema` in lenient mode
pub fn unmarshall(node: &Element, schema: &Schema) -> Result<Value> {
    Unmarshaller::new().unmarshall(node, schema)
}

/// Decode `node` without a schema.
///
/// A text-only element becomes a string (typed when it carries `xsi:type`),
/// distinct children become a mapping and repeated tags a sequence.
/// Attributes other than namespace declarations and encoding markup are
/// kept under `@attributes`, with the text under `#text`.
pub fn unmarshall_raw(node: &Element) -> Value {
    if is_nil(node) {
        return Value::Null;
    }

    let attributes: Object = node
        .attributes()
        .filter(|(name, _)| !is_markup_attribute(node, name))
        .map(|(name, value)| (name, Value::from(value)))
        .collect();

    if node.elements().next().is_none() {
        let leaf = decode_any(node);
        if attributes.is_empty() {
            return leaf;
        }
        let mut object = Object::new();
        object.insert(ATTRIBUTES_KEY, attributes);
        if node.has_text() {
            object.insert(TEXT_KEY, leaf);
        }
        return Value::Object(object);
    }

    let mut object = Object::new();
    if !attributes.is_empty() {
        object.insert(ATTRIBUTES_KEY, attributes);
    }
    for child in node.elements() {
        object.append(child.local_name(), unmarshall_raw(child));
    }
    Value::Object(object)
}

/// `xsi:nil="true"`
fn is_nil(node: &Element) -> bool {
    node.attributes().any(|(name, value)| {
        xsi_local(node, name) == Some("nil") && matches!(value.trim(), "true" | "1")
    })
}

/// Local name of an attribute in the XML Schema instance namespace
fn xsi_local<'a>(node: &Element, name: &'a str) -> Option<&'a str> {
    let (prefix, local) = name.split_once(':')?;
    let uri = node.lookup_namespace(prefix);
    (uri == Some(XSI_NAMESPACE) || (uri.is_none() && prefix == "xsi")).then_some(local)
}

fn is_markup_attribute(node: &Element, name: &str) -> bool {
    if declared_prefix(name).is_some() || xsi_local(node, name).is_some() {
        return true;
    }
    name.split_once(':').is_some_and(|(prefix, local)| {
        local == "encodingStyle"
            || node.lookup_namespace(prefix) == Some(SOAP_ENCODING_NAMESPACE)
    })
}

/// Untyped leaf: honour `xsi:type` when it names a built-in scalar type,
/// fall back to raw decoding otherwise
fn decode_any(node: &Element) -> Value {
    if node.elements().next().is_some() {
        return unmarshall_raw(node);
    }
    let text = node.text();
    let kind = node
        .attributes()
        .find(|(name, _)| xsi_local(node, name) == Some("type"))
        .and_then(|(_, type_name)| ScalarKind::from_xsd(type_name));
    match kind {
        Some(kind) => kind.decode(&text).unwrap_or(Value::String(text)),
        None => Value::String(text),
    }
}
