//! Request building, response decoding and the transport seam
//!
//! The [`Client`] does no I/O of its own: requests go out through a
//! [`Transport`] as a [`Request`], and the transport hands back the raw
//! response document.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::binder::bind;
use crate::config::Config;
use crate::envelope::{Envelope, SoapVersion};
use crate::error::{Error, ErrorKind, Result, Span};
use crate::marshal::{marshall, marshall_struct};
use crate::multiref::Resolver;
use crate::schema::{Catalog, Message, Operation};
use crate::unmarshal::{unmarshall_raw, Unmarshaller};
use crate::value::{Object, Value};
use crate::xml::namespace::declared_prefix;
use crate::xml::{Element, Parser};

/// Serialized request handed to a [`Transport`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    /// SOAPAction; for SOAP 1.2 it is also carried in `content_type`
    pub action: &'a str,
    /// Endpoint address
    pub location: &'a str,
    /// HTTP `Content-Type` for the envelope's SOAP version
    pub content_type: &'a str,
    pub body: &'a [u8],
}

/// Moves a serialized request to the service and returns the response body.
///
/// Implementations should return the body of HTTP error responses too: SOAP
/// faults usually arrive with status 500 and are decoded as data.
pub trait Transport {
    fn send(&self, request: &Request<'_>) -> std::result::Result<Vec<u8>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request<'_>) -> std::result::Result<Vec<u8>, TransportError> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: &Request<'_>) -> std::result::Result<Vec<u8>, TransportError> {
        (**self).send(request)
    }
}

/// Failure reported by a [`Transport`]
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        let message = match err.status {
            Some(status) => format!("transport failure (status {status}): {}", err.message),
            None => format!("transport failure: {}", err.message),
        };
        Self::with_message(ErrorKind::Transport, Span::empty(), message)
    }
}

/// SOAP client over an operation [`Catalog`]
#[derive(Debug)]
pub struct Client<T> {
    catalog: Arc<Catalog>,
    transport: T,
    config: Config,
    headers: Object,
}

impl<T> Client<T> {
    pub fn new(catalog: Arc<Catalog>, transport: T, config: Config) -> Self {
        Self {
            catalog,
            transport,
            config,
            headers: Object::new(),
        }
    }

    /// Client for raw calls only, with no described operations
    pub fn without_catalog(transport: T, config: Config) -> Self {
        Self::new(Arc::new(Catalog::new()), transport, config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Persistent header sent with every request.
    ///
    /// XML values are inserted as they are. Other values are marshalled under
    /// `name`, following the operation's header message when it has that name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name, value);
    }

    pub fn headers(&self) -> &Object {
        &self.headers
    }

    pub fn operation(&self, name: &str) -> Result<&Operation> {
        self.catalog.get(name).map(Arc::as_ref).ok_or_else(|| {
            Error::from_kind(ErrorKind::UnknownOperation {
                name: name.to_string(),
            })
        })
    }

    /// Build the envelope for a described operation.
    ///
    /// The child elements of `header_fragment` open the `Header`, followed by
    /// the persistent headers.
    pub fn build_request(
        &self,
        operation: &str,
        positional: &[Value],
        keywords: &Object,
        header_fragment: Option<&Element>,
    ) -> Result<Element> {
        let op = self.operation(operation)?;
        let bound = bind(&op.input, positional, keywords)?;

        let mut envelope = Envelope::new(self.config.version, &self.config.envelope_prefix);
        self.fill_header(&mut envelope, header_fragment, op.header.as_ref())?;

        let empty = Object::new();
        let params = bound
            .get(&op.input.name)
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let namespace = op
            .input
            .namespace
            .as_deref()
            .or(self.catalog.namespace())
            .or(self.config.namespace.as_deref());
        let wrapper = envelope.body_mut().append_child(&op.input.name);
        if let Some(namespace) = namespace {
            wrapper.declare_namespace(None, namespace);
        }
        marshall_struct(wrapper, params, &op.input.body)?;

        debug!(operation, "built request");
        Ok(envelope.into_element())
    }

    /// Build the envelope for a raw call: `params` are marshalled in the given
    /// order under `<method xmlns="namespace">`
    pub fn build_call(
        &self,
        method: &str,
        params: &[(&str, Value)],
        headers: Option<&Element>,
    ) -> Result<Element> {
        let mut envelope = Envelope::new(self.config.version, &self.config.envelope_prefix);
        self.fill_header(&mut envelope, headers, None)?;

        let wrapper = envelope.body_mut().append_child(method);
        let namespace = self
            .config
            .namespace
            .as_deref()
            .or(self.catalog.namespace());
        if let Some(namespace) = namespace {
            wrapper.declare_namespace(None, namespace);
        }
        for (name, value) in params {
            marshall(wrapper, name, value, None, None)?;
        }

        debug!(method, "built raw request");
        Ok(envelope.into_element())
    }

    /// Build the envelope for a raw call around a caller-built request element,
    /// which takes the place of the generated wrapper
    pub fn build_call_element(
        &self,
        request: &Element,
        headers: Option<&Element>,
    ) -> Result<Element> {
        let mut envelope = Envelope::new(self.config.version, &self.config.envelope_prefix);
        self.fill_header(&mut envelope, headers, None)?;
        envelope.body_mut().append_element(request.clone());

        debug!(request = %request.tag(), "built raw request from element");
        Ok(envelope.into_element())
    }

    /// Decode a response. With a known operation the body is decoded against
    /// its output message, otherwise without a schema.
    pub fn parse_response(&self, raw: &[u8], operation: Option<&str>) -> Result<Value> {
        if let Some(op) = operation.and_then(|name| self.catalog.get(name)) {
            return self.parse_response_with(raw, &op.output);
        }
        if let Some(name) = operation {
            debug!(operation = name, "operation not in catalog, decoding raw");
        }
        let body = self.response_body(raw)?;
        let wrapper = first_element(&body)?;
        if is_fault(&body, wrapper) {
            return Ok(fault_value(wrapper));
        }
        Ok(unmarshall_raw(wrapper))
    }

    /// Decode a response against `message`, typically a corrected copy of an
    /// operation's output message
    pub fn parse_response_with(&self, raw: &[u8], message: &Message) -> Result<Value> {
        let body = self.response_body(raw)?;
        let wrapper = first_element(&body)?;
        if is_fault(&body, wrapper) {
            return Ok(fault_value(wrapper));
        }

        let expected = message
            .name
            .rsplit_once(':')
            .map_or(message.name.as_str(), |(_, local)| local);
        if wrapper.local_name() != expected {
            if self.config.strict {
                return Err(Error::from_kind(ErrorKind::SchemaMismatch {
                    expected: message.name.clone(),
                    found: wrapper.tag(),
                }));
            }
            warn!(
                expected = %message.name,
                found = %wrapper.tag(),
                "response wrapper differs from the declared one, decoding with the declared body"
            );
        }

        Unmarshaller::new()
            .strict(self.config.strict)
            .unmarshall_struct(wrapper, &message.body)
            .map(Value::Object)
    }

    /// Parsed, multiRef-resolved `Body` of a response document
    fn response_body(&self, raw: &[u8]) -> Result<Element> {
        let root = Parser::with_config(raw, self.config.parse).parse()?;
        let body = Envelope::from_element(root)?.into_body();
        Resolver::new()
            .strict(self.config.strict)
            .with_max_depth(self.config.multiref_depth)
            .with_max_inlined(self.config.multiref_max_inlined)
            .resolve(&body)
    }

    fn fill_header(
        &self,
        envelope: &mut Envelope,
        fragment: Option<&Element>,
        message: Option<&Message>,
    ) -> Result<()> {
        if let Some(fragment) = fragment {
            graft_children(envelope.header_mut(), fragment);
        }
        for (name, value) in &self.headers {
            let header = envelope.header_mut();
            match (value, message.filter(|m| m.name == *name)) {
                (Value::Xml(tree), _) => {
                    header.append_element(tree.clone());
                }
                (Value::Object(object), Some(message)) => {
                    marshall_struct(header.append_child(name), object, &message.body)?;
                }
                (value, _) => marshall(header, name, value, None, None)?,
            }
        }
        Ok(())
    }

    fn location(&self) -> &str {
        self.config
            .location
            .as_deref()
            .or(self.catalog.location())
            .unwrap_or_default()
    }
}

impl<T: Transport> Client<T> {
    /// Raw call: no binding, the response wrapper element is returned with
    /// multiRefs resolved
    pub fn call(
        &self,
        method: &str,
        params: &[(&str, Value)],
        headers: Option<&Element>,
    ) -> Result<Element> {
        let request = self.build_call(method, params, headers)?;
        self.send_raw(method, &request)
    }

    /// Raw call sending `request` as the body's only element
    pub fn call_element(
        &self,
        method: &str,
        request: &Element,
        headers: Option<&Element>,
    ) -> Result<Element> {
        let request = self.build_call_element(request, headers)?;
        self.send_raw(method, &request)
    }

    /// Call a described operation and decode its response
    pub fn invoke(&self, operation: &str, positional: &[Value], keywords: &Object) -> Result<Value> {
        let request = self.build_request(operation, positional, keywords, None)?;
        let op = self.operation(operation)?;
        let raw = self.send(op.action.as_deref().unwrap_or_default(), &request)?;
        self.parse_response_with(&raw, &op.output)
    }

    fn send_raw(&self, method: &str, request: &Element) -> Result<Element> {
        let action = format!("{}{method}", self.config.action.as_deref().unwrap_or_default());
        let raw = self.send(&action, request)?;
        let body = self.response_body(&raw)?;
        body.into_elements().next().ok_or_else(|| empty_body(method))
    }

    fn send(&self, action: &str, request: &Element) -> Result<Vec<u8>> {
        let location = self.location();
        let content_type = content_type(self.config.version, action);
        let body = request.to_bytes();
        debug!(action, location, content_type = %content_type, "sending request");
        let request = Request {
            action,
            location,
            content_type: &content_type,
            body: &body,
        };
        Ok(self.transport.send(&request)?)
    }
}

/// Append the child elements of a header container, carrying over the
/// namespace declarations made on the container itself
fn graft_children(header: &mut Element, fragment: &Element) {
    let declarations: Vec<(&str, &str)> = fragment
        .attributes()
        .filter(|(name, _)| declared_prefix(name).is_some())
        .collect();
    for child in fragment.elements() {
        let mut child = child.clone();
        for (name, uri) in &declarations {
            if child.attribute(name).is_none() {
                child.set_attribute(name, *uri);
            }
        }
        header.append_element(child);
    }
}

fn first_element(body: &Element) -> Result<&Element> {
    body.first_element().ok_or_else(|| empty_body("response"))
}

fn empty_body(what: &str) -> Error {
    Error::from_kind(ErrorKind::SchemaMismatch {
        expected: format!("{what} element"),
        found: "empty soap:Body".to_string(),
    })
}

/// `Fault` in the envelope namespace, directly under `body`
fn is_fault(body: &Element, element: &Element) -> bool {
    element.local_name() == "Fault" && element.namespace_uri() == body.namespace_uri()
}

/// SOAP 1.2 carries the action as a media type parameter
fn content_type(version: SoapVersion, action: &str) -> String {
    match version {
        SoapVersion::Soap12 if !action.is_empty() => {
            format!("{}; action=\"{action}\"", version.content_type())
        }
        _ => version.content_type().to_string(),
    }
}

fn fault_value(element: &Element) -> Value {
    let mut object = Object::new();
    object.insert("Fault", unmarshall_raw(element));
    Value::Object(object)
}
