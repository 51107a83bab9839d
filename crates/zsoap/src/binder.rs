//! Call arguments to schema-ordered parameters
//!
//! Arguments arrive positionally, as keywords, or both, possibly nested. The
//! binder arranges them into the exact order of the operation's input
//! message, recursing into nested structures.

use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::schema::{Field, Message, Schema, Struct};
use crate::value::{Object, Value, ATTRIBUTES_KEY, TEXT_KEY};

/// Bind arguments onto `input`, returning `{ wrapper: { field: value, ... } }`.
///
/// Each top-level field takes its keyword, else the next positional value,
/// else is omitted when optional. A keyword naming no top-level field is
/// moved onto the single nested field carrying that name. A lone positional
/// mapping whose keys all name input fields stands for the keywords.
pub fn bind(input: &Message, positional: &[Value], keywords: &Object) -> Result<Object> {
    let (positional, keywords) = match positional {
        [Value::Object(mapping)] if keywords.is_empty() && names_fields(&input.body, mapping) => {
            (&[][..], mapping)
        }
        _ => (positional, keywords),
    };
    let keywords = promote(&input.body, keywords)?;

    let mut remaining = positional.iter();
    let mut bound = Object::with_capacity(input.body.len());
    for field in input.body.fields() {
        let value = match keywords.get(&field.name) {
            Some(value) => Some(value),
            None if field.is_wildcard() => None,
            None => remaining.next(),
        };
        match value {
            Some(value) => {
                bound.insert(field.name.as_str(), bind_value(field, value, &field.name)?);
            }
            None if field.occurs.is_optional() => {}
            None => return Err(missing(&field.name)),
        }
    }

    let extra = remaining.count();
    if extra > 0 {
        return Err(Error::from_kind(ErrorKind::TooManyArguments {
            expected: positional.len() - extra,
            found: positional.len(),
        }));
    }

    let mut wrapped = Object::with_capacity(1);
    wrapped.insert(input.name.as_str(), bound);
    Ok(wrapped)
}

fn names_fields(body: &Struct, mapping: &Object) -> bool {
    !mapping.is_empty() && mapping.keys().all(|key| body.get(key).is_some())
}

/// Keywords with flat shorthand moved to their nested slot
fn promote(body: &Struct, keywords: &Object) -> Result<Object> {
    let mut promoted: Object = keywords
        .iter()
        .filter(|(name, _)| body.get(name).is_some())
        .map(|(name, value)| (name.as_str(), value.clone()))
        .collect();

    for (name, value) in keywords {
        if body.get(name).is_some() {
            continue;
        }
        let mut candidates = Vec::new();
        nested_paths(body, name, &mut Vec::new(), &mut candidates);
        match candidates.as_slice() {
            [] => {
                return Err(Error::from_kind(ErrorKind::UnexpectedArgument {
                    name: name.clone(),
                }))
            }
            [path] => {
                debug!(argument = %name, path = %path.join("."), "promoting keyword to nested field");
                insert_at(&mut promoted, path, name, value)?;
            }
            paths => {
                return Err(Error::from_kind(ErrorKind::AmbiguousArgument {
                    name: name.clone(),
                    candidates: paths
                        .iter()
                        .map(|path| format!("{}.{name}", path.join(".")))
                        .collect(),
                }))
            }
        }
    }
    Ok(promoted)
}

/// Paths of the nested structs declaring a field called `name`
fn nested_paths(body: &Struct, name: &str, prefix: &mut Vec<String>, found: &mut Vec<Vec<String>>) {
    for field in body.fields() {
        let Schema::Struct(inner) = &field.schema else {
            continue;
        };
        prefix.push(field.name.clone());
        if inner.get(name).is_some() {
            found.push(prefix.clone());
        }
        nested_paths(inner, name, prefix, found);
        prefix.pop();
    }
}

fn insert_at(object: &mut Object, path: &[String], name: &str, value: &Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        if object.contains_key(name) {
            warn!(argument = %name, "shorthand keyword shadowed by explicit value");
        } else {
            object.insert(name, value.clone());
        }
        return Ok(());
    };
    if !object.contains_key(first) {
        object.insert(first.as_str(), Object::new());
    }
    match object.get_mut(first).and_then(Value::as_object_mut) {
        Some(inner) => insert_at(inner, rest, name, value),
        None => Err(Error::from_kind(ErrorKind::UnexpectedArgument {
            name: name.to_string(),
        })),
    }
}

fn bind_value(field: &Field, value: &Value, path: &str) -> Result<Value> {
    let Some(body) = field.schema.item().as_struct() else {
        return Ok(value.clone());
    };
    match value {
        Value::Object(mapping) => bind_mapping(body, mapping, path).map(Value::Object),
        Value::Array(items) if field.is_repeated() || matches!(field.schema, Schema::List(_)) => items
            .iter()
            .map(|item| match item {
                Value::Object(mapping) => bind_mapping(body, mapping, path).map(Value::Object),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::from),
        other => Ok(other.clone()),
    }
}

/// Match a caller mapping against a nested struct by the same rules, minus positionals
fn bind_mapping(body: &Struct, mapping: &Object, path: &str) -> Result<Object> {
    if let Some(key) = mapping
        .keys()
        .find(|key| !is_reserved(key) && body.get(key).is_none())
    {
        return Err(Error::from_kind(ErrorKind::UnexpectedArgument {
            name: format!("{path}.{key}"),
        }));
    }

    let mut bound = Object::with_capacity(mapping.len());
    for field in body.fields() {
        let field_path = format!("{path}.{}", field.name);
        match mapping.get(&field.name) {
            Some(value) => {
                bound.insert(field.name.as_str(), bind_value(field, value, &field_path)?);
            }
            None if field.occurs.is_optional() => {}
            None => return Err(missing(&field_path)),
        }
    }
    for (key, value) in mapping.iter().filter(|(key, _)| is_reserved(key)) {
        bound.insert(key.as_str(), value.clone());
    }
    Ok(bound)
}

fn is_reserved(key: &str) -> bool {
    key == ATTRIBUTES_KEY || key == TEXT_KEY
}

fn missing(field: &str) -> Error {
    Error::from_kind(ErrorKind::MissingArgument {
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_lead() -> Message {
        let lead_key = Struct::new()
            .field("keyType", Schema::string())
            .field("keyValue", Schema::string());
        Message::new("paramsGetLead", Struct::new().field("leadKey", lead_key))
    }

    fn lead_key(first: (&str, &str), second: (&str, &str)) -> Value {
        Value::Object(
            [
                (first.0, Value::from(first.1)),
                (second.0, Value::from(second.1)),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn keywords(entries: Vec<(&str, Value)>) -> Object {
        entries.into_iter().collect()
    }

    fn keys(value: Option<&Value>) -> Vec<String> {
        value
            .and_then(Value::as_object)
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_nested_mapping_as_keyword() -> Result<()> {
        let args = keywords(vec![(
            "leadKey",
            lead_key(("keyType", "IDNUM"), ("keyValue", "1")),
        )]);
        let bound = bind(&get_lead(), &[], &args)?;

        let params = bound.get("paramsGetLead");
        let key = params.and_then(|p| p.get("leadKey"));
        assert_eq!(key.and_then(|k| k.get("keyType")), Some(&Value::from("IDNUM")));
        assert_eq!(key.and_then(|k| k.get("keyValue")), Some(&Value::from("1")));
        Ok(())
    }

    #[test]
    fn test_whole_mapping_as_positional() -> Result<()> {
        let args = keywords(vec![(
            "leadKey",
            lead_key(("keyType", "IDNUM"), ("keyValue", "1")),
        )]);
        let by_keyword = bind(&get_lead(), &[], &args)?;
        let by_position = bind(&get_lead(), &[Value::Object(args)], &Object::new())?;
        assert_eq!(by_keyword, by_position);
        Ok(())
    }

    #[test]
    fn test_keyword_order_does_not_matter() -> Result<()> {
        let forward = keywords(vec![(
            "leadKey",
            lead_key(("keyType", "IDNUM"), ("keyValue", "1")),
        )]);
        let backward = keywords(vec![(
            "leadKey",
            lead_key(("keyValue", "1"), ("keyType", "IDNUM")),
        )]);
        let a = bind(&get_lead(), &[], &forward)?;
        let b = bind(&get_lead(), &[], &backward)?;
        let path = |o: &Object| keys(o.get("paramsGetLead").and_then(|p| p.get("leadKey")));
        assert_eq!(path(&a), vec!["keyType", "keyValue"]);
        assert_eq!(path(&b), vec!["keyType", "keyValue"]);
        Ok(())
    }

    #[test]
    fn test_shorthand_promotion() -> Result<()> {
        let args = keywords(vec![
            ("keyValue", Value::from("1")),
            ("keyType", Value::from("IDNUM")),
        ]);
        let bound = bind(&get_lead(), &[], &args)?;
        let key = bound.get("paramsGetLead").and_then(|p| p.get("leadKey"));
        assert_eq!(keys(key), vec!["keyType", "keyValue"]);
        Ok(())
    }

    #[test]
    fn test_ambiguous_shorthand() {
        let input = Message::new(
            "search",
            Struct::new()
                .field("customer", Struct::new().field("id", Schema::int()))
                .field("order", Struct::new().field("id", Schema::int())),
        );
        let err = bind(&input, &[], &keywords(vec![("id", Value::Int(1))])).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::AmbiguousArgument { name, candidates })
                if name == "id" && candidates == &["customer.id", "order.id"]
        ));
    }

    #[test]
    fn test_positional_then_keyword() -> Result<()> {
        let input = Message::new(
            "doEnsembleURIQuery",
            Struct::new()
                .field("queryFormat", Schema::string())
                .field("queryString", Schema::string())
                .field("startIndex", Schema::int())
                .field("maxResults", Schema::int()),
        );
        let bound = bind(
            &input,
            &[Value::from("Xpath"), Value::from("/markovChain"), Value::Int(0)],
            &keywords(vec![("maxResults", Value::Int(-1))]),
        )?;
        let params = bound.get("doEnsembleURIQuery");
        assert_eq!(
            keys(params),
            vec!["queryFormat", "queryString", "startIndex", "maxResults"]
        );
        assert_eq!(params.and_then(|p| p.get("maxResults")), Some(&Value::Int(-1)));
        Ok(())
    }

    #[test]
    fn test_binding_errors() {
        let input = Message::new(
            "op",
            Struct::new()
                .field("a", Schema::int())
                .optional("b", Schema::int())
                .field("c", Struct::new().field("d", Schema::int())),
        );

        let err = bind(&input, &[Value::Int(1)], &Object::new()).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::MissingArgument { field }) if field == "c"
        ));

        let nested = keywords(vec![("a", Value::Int(1)), ("c", Value::Object(Object::new()))]);
        let err = bind(&input, &[], &nested).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::MissingArgument { field }) if field == "c.d"
        ));

        let err = bind(&input, &[], &keywords(vec![("zzz", Value::Int(1))])).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::UnexpectedArgument { name }) if name == "zzz"
        ));

        let too_many = [Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)];
        let err = bind(&input, &too_many, &Object::new()).err();
        assert!(matches!(
            err.as_ref().map(Error::kind),
            Some(ErrorKind::TooManyArguments { expected: 3, found: 4 })
        ));
        assert!(err.is_some_and(|e| e.is_binding_error()));
    }

    #[test]
    fn test_optional_fields_are_omitted() -> Result<()> {
        let input = Message::new(
            "op",
            Struct::new()
                .optional("a", Schema::int())
                .field("b", Schema::int()),
        );
        let bound = bind(&input, &[], &keywords(vec![("b", Value::Int(2))]))?;
        assert_eq!(keys(bound.get("op")), vec!["b"]);
        Ok(())
    }
}
