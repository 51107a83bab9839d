//! Native values to XML elements
//!
//! [`marshall`] is the untyped path: the shape of the value decides the shape
//! of the XML. [`marshall_with_schema`] follows explicit type hints: field
//! order comes from the schema and scalars go through the kind's encoder.

use tracing::warn;

use crate::envelope::XSI_NAMESPACE;
use crate::error::{Error, ErrorKind, Result, Span};
use crate::scalar::canonical_text;
use crate::schema::{Schema, Struct};
use crate::value::{Object, Value, ATTRIBUTES_KEY, TEXT_KEY};
use crate::xml::Element;

/// Tag used for items of a list container that carry no name of their own
pub const LIST_ITEM: &str = "item";

/// Marshal `value` as a child of `target` named `name`.
///
/// A pre-built [`Value::Xml`] tree is appended as it is; `name` only applies
/// to the tags generated for other values.
///
/// With a `namespace`, the tag is qualified with the prefix bound to it,
/// declaring one on `target` when unbound (`prefix_hint`, else `ns0`, `ns1`,
/// ...). An empty `prefix_hint` instead declares the namespace as the default
/// namespace of the new element itself.
pub fn marshall(
    target: &mut Element,
    name: &str,
    value: &Value,
    namespace: Option<&str>,
    prefix_hint: Option<&str>,
) -> Result<()> {
    let Some(uri) = namespace else {
        return marshal_value(target, name, value);
    };

    if prefix_hint == Some("") {
        let start = target.elements().count();
        marshal_value(target, name, value)?;
        for child in target.elements_mut().skip(start) {
            if child.lookup_namespace("") != Some(uri) {
                child.declare_namespace(None, uri);
            }
        }
        return Ok(());
    }

    let tag = qualify(target, name, uri, prefix_hint);
    marshal_value(target, &tag, value)
}

/// Marshal `value` under `name` following `schema`
pub fn marshall_with_schema(
    target: &mut Element,
    name: &str,
    value: &Value,
    schema: &Schema,
) -> Result<()> {
    marshal_typed(target, name, value, schema)
}

/// Marshal the entries of `object` directly into `target`, in `body` order
pub fn marshall_struct(target: &mut Element, object: &Object, body: &Struct) -> Result<()> {
    for field in body.fields() {
        if field.is_wildcard() {
            continue;
        }
        if let Some(value) = object.get(&field.name) {
            marshal_typed(target, &field.name, value, &field.schema)?;
        }
    }

    for (key, value) in object {
        match key.as_str() {
            ATTRIBUTES_KEY => set_attributes(target, value)?,
            TEXT_KEY => set_text(target, value),
            _ if body.get(key).is_none() => {
                warn!(key = %key, element = %target.tag(), "marshalling key not declared in schema");
                marshal_value(target, key, value)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn qualify(target: &mut Element, name: &str, uri: &str, prefix_hint: Option<&str>) -> String {
    if name.contains(':') {
        return name.to_string();
    }
    let prefix = target.ensure_prefix(uri, prefix_hint);
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}:{name}")
    }
}

fn marshal_value(target: &mut Element, tag: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => append_nil(target, tag),
        Value::Array(items) => {
            for item in items {
                marshal_value(target, tag, item)?;
            }
        }
        Value::Object(object) => {
            let child = target.append_child(tag);
            for (key, value) in object {
                match key.as_str() {
                    ATTRIBUTES_KEY => set_attributes(child, value)?,
                    TEXT_KEY => set_text(child, value),
                    _ => marshal_value(child, key, value)?,
                }
            }
        }
        Value::Xml(tree) => {
            target.append_element(tree.clone());
        }
        scalar => {
            let child = target.append_child(tag);
            if let Some(text) = canonical_text(scalar) {
                child.set_text(text);
            }
        }
    }
    Ok(())
}

fn marshal_typed(target: &mut Element, tag: &str, value: &Value, schema: &Schema) -> Result<()> {
    match (schema, value) {
        (_, Value::Null) => append_nil(target, tag),
        (Schema::Array(item), Value::Array(items)) => {
            for value in items {
                marshal_typed(target, tag, value, item)?;
            }
        }
        (Schema::Array(item), value) => marshal_typed(target, tag, value, item)?,
        (Schema::List(item), Value::Array(items)) => {
            let container = target.append_child(tag);
            for value in items {
                match value {
                    Value::Object(entry) if entry.len() == 1 => {
                        for (name, value) in entry {
                            marshal_typed(container, name, value, item)?;
                        }
                    }
                    value => marshal_typed(container, LIST_ITEM, value, item)?,
                }
            }
        }
        (Schema::Struct(_) | Schema::Scalar(_), Value::Array(items)) => {
            for value in items {
                marshal_typed(target, tag, value, schema)?;
            }
        }
        (Schema::Struct(body), Value::Object(object)) => {
            let child = target.append_child(tag);
            marshall_struct(child, object, body)?;
        }
        (Schema::Scalar(kind), value) if canonical_text(value).is_some() => {
            let text = kind.encode(value)?;
            target.append_child(tag).set_text(text);
        }
        (_, value) => marshal_value(target, tag, value)?,
    }
    Ok(())
}

fn append_nil(target: &mut Element, tag: &str) {
    let child = target.append_child(tag);
    let xsi = child.ensure_prefix(XSI_NAMESPACE, Some("xsi"));
    child.set_attribute(&format!("{xsi}:nil"), "true");
}

fn set_attributes(element: &mut Element, value: &Value) -> Result<()> {
    let Some(attributes) = value.as_object() else {
        return Err(Error::with_message(
            ErrorKind::InvalidScalar {
                kind: ATTRIBUTES_KEY.to_string(),
                text: format!("{value:?}"),
            },
            Span::empty(),
            format!("{ATTRIBUTES_KEY} must be a mapping"),
        ));
    };
    for (name, value) in attributes {
        if let Some(text) = canonical_text(value) {
            element.set_attribute(name, text);
        }
    }
    Ok(())
}

fn set_text(element: &mut Element, value: &Value) {
    if let Some(text) = canonical_text(value) {
        element.set_text(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarKind;

    fn object(entries: Vec<(&str, Value)>) -> Value {
        Value::Object(entries.into_iter().collect())
    }

    #[test]
    fn test_scalars_are_canonical() -> Result<()> {
        let mut root = Element::new("root");
        marshall(&mut root, "flag", &Value::Bool(true), None, None)?;
        marshall(&mut root, "count", &Value::Int(3), None, None)?;
        marshall(&mut root, "ratio", &Value::Float(f64::INFINITY), None, None)?;
        assert_eq!(
            root.to_xml_string(),
            "<root><flag>true</flag><count>3</count><ratio>INF</ratio></root>"
        );
        Ok(())
    }

    #[test]
    fn test_null_is_nil() -> Result<()> {
        let mut root = Element::new("root");
        marshall(&mut root, "missing", &Value::Null, None, None)?;
        assert_eq!(
            root.to_xml_string(),
            "<root><missing xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:nil=\"true\"></missing></root>"
        );

        // no redeclaration when xsi is already in scope
        let mut root = Element::with_namespace("root", XSI_NAMESPACE, Some("xsi"));
        marshall(&mut root, "missing", &Value::Null, None, None)?;
        let missing = root.child("missing");
        assert_eq!(missing.and_then(|e| e.attribute("xsi:nil")), Some("true"));
        assert_eq!(missing.map(|e| e.attributes().count()), Some(1));
        Ok(())
    }

    #[test]
    fn test_mapping_and_sequence() -> Result<()> {
        let value = object(vec![
            ("username", Value::from("test")),
            ("item", Value::from(vec![Value::from("no"), Value::from("en")])),
        ]);
        let mut root = Element::new("root");
        marshall(&mut root, "Header", &value, None, None)?;
        assert_eq!(
            root.to_xml_string(),
            "<root><Header><username>test</username><item>no</item><item>en</item></Header></root>"
        );
        Ok(())
    }

    #[test]
    fn test_reserved_keys() -> Result<()> {
        let value = object(vec![
            (ATTRIBUTES_KEY, object(vec![("unit", Value::from("kg"))])),
            (TEXT_KEY, Value::Float(2.5)),
        ]);
        let mut root = Element::new("root");
        marshall(&mut root, "weight", &value, None, None)?;
        assert_eq!(root.to_xml_string(), "<root><weight unit=\"kg\">2.5</weight></root>");
        Ok(())
    }

    #[test]
    fn test_namespace_declared_on_target() -> Result<()> {
        let mut root = Element::new("root");
        marshall(&mut root, "a", &Value::Int(1), Some("urn:a"), Some("tns"))?;
        marshall(&mut root, "b", &Value::Int(2), Some("urn:a"), None)?;
        marshall(&mut root, "c", &Value::Int(3), Some("urn:c"), None)?;
        assert_eq!(
            root.to_xml_string(),
            "<root xmlns:tns=\"urn:a\" xmlns:ns0=\"urn:c\">\
             <tns:a>1</tns:a><tns:b>2</tns:b><ns0:c>3</ns0:c></root>"
        );
        Ok(())
    }

    #[test]
    fn test_default_namespace_on_element() -> Result<()> {
        let header = object(vec![
            ("username", Value::from("test")),
            ("password", Value::from("password")),
        ]);
        let mut root = Element::new("soap:Header");
        marshall(&mut root, "MyTestHeader", &header, Some("service"), Some(""))?;
        assert_eq!(
            root.to_xml_string(),
            "<soap:Header><MyTestHeader xmlns=\"service\"><username>test</username>\
             <password>password</password></MyTestHeader></soap:Header>"
        );
        Ok(())
    }

    #[test]
    fn test_prebuilt_tree_is_copied() -> Result<()> {
        let mut fragment = Element::new("inner");
        fragment.set_text("x");
        let mut root = Element::new("root");
        marshall(&mut root, "outer", &Value::Xml(fragment.clone()), None, None)?;
        assert_eq!(root.to_xml_string(), "<root><inner>x</inner></root>");
        assert_eq!(fragment.text(), "x");
        Ok(())
    }

    #[test]
    fn test_prebuilt_header_keeps_its_own_tag() -> Result<()> {
        let security = Element::parse(
            "<qmw:Security xmlns:qmw=\"http://www.qmwise.com/\">\
             <qmw:ClientID>NAME</qmw:ClientID></qmw:Security>",
        )?;
        let mut header = Element::new("soap:Header");
        marshall(&mut header, "Security", &Value::Xml(security), None, None)?;

        let names: Vec<String> = header.elements().map(Element::tag).collect();
        assert_eq!(names, vec!["qmw:Security"]);
        let client_id = header.child("Security").and_then(|s| s.child("ClientID"));
        assert_eq!(
            client_id.and_then(Element::namespace_uri),
            Some("http://www.qmwise.com/")
        );
        Ok(())
    }

    #[test]
    fn test_schema_order_and_coercion() -> Result<()> {
        let body = Struct::new()
            .field("id", Schema::int())
            .field("active", Schema::boolean())
            .optional("note", Schema::string());
        let value = object(vec![
            ("extra", Value::from("kept")),
            ("active", Value::from("1")),
            ("id", Value::from("42")),
        ]);
        let mut root = Element::new("root");
        marshall_with_schema(&mut root, "record", &value, &Schema::Struct(body))?;
        assert_eq!(
            root.to_xml_string(),
            "<root><record><id>42</id><active>true</active><extra>kept</extra></record></root>"
        );
        Ok(())
    }

    #[test]
    fn test_schema_rejects_bad_scalar() {
        let mut root = Element::new("root");
        let err = marshall_with_schema(&mut root, "n", &Value::from("abc"), &Schema::int()).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::InvalidScalar { .. })
        ));
    }

    #[test]
    fn test_list_container() -> Result<()> {
        let value = Value::from(vec![
            object(vec![("item", Value::from("no"))]),
            Value::from("en"),
        ]);
        let mut root = Element::new("root");
        let schema = Schema::list(Schema::Scalar(ScalarKind::String));
        marshall_with_schema(&mut root, "return", &value, &schema)?;
        assert_eq!(
            root.to_xml_string(),
            "<root><return><item>no</item><item>en</item></return></root>"
        );
        Ok(())
    }

    #[test]
    fn test_repeated_field() -> Result<()> {
        let body = Struct::new().field("n", Schema::array(Schema::int()));
        let value: Object = [("n", Value::from(vec![Value::Int(1), Value::Int(2)]))]
            .into_iter()
            .collect();
        let mut root = Element::new("root");
        marshall_struct(&mut root, &value, &body)?;
        assert_eq!(root.to_xml_string(), "<root><n>1</n><n>2</n></root>");
        Ok(())
    }

    #[test]
    fn test_childless_request() -> Result<()> {
        let mut body = Element::new("soap:Body");
        marshall(&mut body, "ChildlessRequest", &Value::Object(Object::new()), None, None)?;
        assert_eq!(
            body.to_xml_string(),
            "<soap:Body><ChildlessRequest></ChildlessRequest></soap:Body>"
        );
        Ok(())
    }
}
