//! Type schemas and WSDL operation descriptions
//!
//! These are built once (by a WSDL reader or by hand, as the caller's explicit
//! type hints) and are read-only afterwards. A [`Catalog`] is meant to be
//! shared as `Arc<Catalog>` between clients and threads.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::scalar::ScalarKind;

/// Field name that captures every child element not claimed by another field
pub const ANY_FIELD: &str = "##any";

/// Upper bound of a field's occurrence count
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// `minOccurs` / `maxOccurs` of a field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Occurs {
    /// Exactly once
    pub const REQUIRED: Self = Self {
        min: 1,
        max: MaxOccurs::Bounded(1),
    };

    /// Zero or one
    pub const OPTIONAL: Self = Self {
        min: 0,
        max: MaxOccurs::Bounded(1),
    };

    /// Zero or more
    pub const MANY: Self = Self {
        min: 0,
        max: MaxOccurs::Unbounded,
    };

    pub const fn new(min: u32, max: MaxOccurs) -> Self {
        Self { min, max }
    }

    pub const fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// More than one occurrence allowed
    pub const fn is_repeated(&self) -> bool {
        match self.max {
            MaxOccurs::Bounded(max) => max > 1,
            MaxOccurs::Unbounded => true,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::REQUIRED
    }
}

/// Shape expected for an element's content
#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    Scalar(ScalarKind),
    Struct(Struct),
    /// Repeated sibling elements sharing the field's tag
    Array(Box<Schema>),
    /// Container element whose every child element is one item
    List(Box<Schema>),
    /// Captured as an uninterpreted XML subtree
    Wildcard,
}

impl Schema {
    pub const fn string() -> Self {
        Self::Scalar(ScalarKind::String)
    }

    pub const fn int() -> Self {
        Self::Scalar(ScalarKind::Int)
    }

    pub const fn float() -> Self {
        Self::Scalar(ScalarKind::Float)
    }

    pub const fn boolean() -> Self {
        Self::Scalar(ScalarKind::Bool)
    }

    pub const fn datetime() -> Self {
        Self::Scalar(ScalarKind::DateTime)
    }

    pub const fn base64() -> Self {
        Self::Scalar(ScalarKind::Base64)
    }

    pub const fn any() -> Self {
        Self::Scalar(ScalarKind::Any)
    }

    pub fn array(item: Self) -> Self {
        Self::Array(Box::new(item))
    }

    pub fn list(item: Self) -> Self {
        Self::List(Box::new(item))
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Self::Struct(body) => Some(body),
            _ => None,
        }
    }

    /// Item schema for repeated content, the schema itself otherwise
    pub fn item(&self) -> &Self {
        match self {
            Self::Array(item) | Self::List(item) => item,
            other => other,
        }
    }
}

impl From<Struct> for Schema {
    fn from(body: Struct) -> Self {
        Self::Struct(body)
    }
}

impl From<ScalarKind> for Schema {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

/// Named member of a [`Struct`]
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub occurs: Occurs,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            occurs: Occurs::REQUIRED,
        }
    }

    pub fn optional(mut self) -> Self {
        self.occurs.min = 0;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.occurs = Occurs::MANY;
        self
    }

    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Local part of the field name
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == ANY_FIELD && self.schema == Schema::Wildcard
    }

    /// Field collects every matching sibling into a sequence
    pub fn is_repeated(&self) -> bool {
        matches!(self.schema, Schema::Array(_)) || self.occurs.is_repeated()
    }
}

/// Ordered list of fields; order dictates marshalling output
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Struct {
    fields: Vec<Field>,
}

impl Struct {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder: append a required field
    pub fn field(self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.with(Field::new(name, schema))
    }

    /// Builder: append an optional field
    pub fn optional(self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.with(Field::new(name, schema).optional())
    }

    /// Builder: append a zero-or-more field
    pub fn repeated(self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.with(Field::new(name, schema).repeated())
    }

    /// Builder: capture unclaimed children
    pub fn wildcard(self) -> Self {
        self.with(Field::new(ANY_FIELD, Schema::Wildcard).optional())
    }

    pub fn with(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for Struct {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Wrapper element of a request, response or header
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub name: String,
    pub namespace: Option<String>,
    pub body: Struct,
}

impl Message {
    pub fn new(name: impl Into<String>, body: Struct) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            body,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Body fields as a schema, for the unmarshaller
    pub fn schema(&self) -> Schema {
        Schema::Struct(self.body.clone())
    }
}

/// WSDL operation: request, response and optional header messages
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub name: String,
    pub action: Option<String>,
    pub input: Message,
    pub output: Message,
    pub header: Option<Message>,
}

impl Operation {
    pub fn new(name: impl Into<String>, input: Message, output: Message) -> Self {
        Self {
            name: name.into(),
            action: None,
            input,
            output,
            header: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_header(mut self, header: Message) -> Self {
        self.header = Some(header);
        self
    }
}

/// Operations of one service, keyed by name
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    operations: IndexMap<String, Arc<Operation>>,
    namespace: Option<String>,
    location: Option<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service target namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Service endpoint address
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.insert(operation);
        self
    }

    pub fn insert(&mut self, operation: Operation) {
        self.operations
            .insert(operation.name.clone(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Operation>> {
        self.operations.get(name)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values().map(Arc::as_ref)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
