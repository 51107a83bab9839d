//! SOAP envelopes and faults

use indexmap::IndexMap;
use std::fmt;

use crate::error::{Error, ErrorKind, Result};
use crate::value::{Value, TEXT_KEY};
use crate::xml::{Element, QName};

pub const SOAP11_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP12_NAMESPACE: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const SOAP_ENCODING_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// SOAP protocol version
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SoapVersion {
    #[default]
    Soap11,
    Soap12,
}

impl SoapVersion {
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Soap11 => SOAP11_NAMESPACE,
            Self::Soap12 => SOAP12_NAMESPACE,
        }
    }

    /// HTTP content type of a request body
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Soap11 => "text/xml; charset=utf-8",
            Self::Soap12 => "application/soap+xml; charset=utf-8",
        }
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        match uri {
            SOAP11_NAMESPACE => Some(Self::Soap11),
            SOAP12_NAMESPACE => Some(Self::Soap12),
            _ => None,
        }
    }
}

/// Envelope under construction, or taken apart from a response.
///
/// Header and body share the envelope's namespace scope while they are
/// being filled, so `xsi`, `xsd` and the envelope prefix are never
/// redeclared inside them.
#[derive(Clone, Debug)]
pub struct Envelope {
    version: SoapVersion,
    root: Element,
    header: Option<Element>,
    body: Element,
}

impl Envelope {
    pub fn new(version: SoapVersion, prefix: &str) -> Self {
        let mut root = Element::new(&format!("{prefix}:Envelope"));
        root.declare_namespace(Some(prefix), version.namespace());
        root.declare_namespace(Some("xsd"), XSD_NAMESPACE);
        root.declare_namespace(Some("xsi"), XSI_NAMESPACE);
        let body = Element::from_parts(
            QName::new(Some(prefix), "Body"),
            IndexMap::new(),
            &root.scope,
        );
        Self {
            version,
            root,
            header: None,
            body,
        }
    }

    /// Split a parsed document into header and body
    pub fn from_element(mut root: Element) -> Result<Self> {
        let version = root.namespace_uri().and_then(SoapVersion::from_namespace);
        let (Some(version), "Envelope") = (version, root.local_name()) else {
            return Err(Error::from_kind(ErrorKind::SchemaMismatch {
                expected: "soap:Envelope".to_string(),
                found: root.tag(),
            }));
        };
        let header = root.take_children_named("Header").into_iter().next();
        let Some(body) = root.take_children_named("Body").into_iter().next() else {
            return Err(Error::from_kind(ErrorKind::SchemaMismatch {
                expected: "soap:Body".to_string(),
                found: format!("{} without body", root.tag()),
            }));
        };
        Ok(Self {
            version,
            root,
            header,
            body,
        })
    }

    pub fn version(&self) -> SoapVersion {
        self.version
    }

    pub fn header(&self) -> Option<&Element> {
        self.header.as_ref()
    }

    /// Header element, created on first use
    pub fn header_mut(&mut self) -> &mut Element {
        let Self { root, header, .. } = self;
        header.get_or_insert_with(|| {
            let prefix = root.prefix().unwrap_or_default();
            Element::from_parts(QName::new(Some(prefix), "Header"), IndexMap::new(), &root.scope)
        })
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    pub fn into_body(self) -> Element {
        self.body
    }

    /// Assemble the envelope; an empty header is left out
    pub fn into_element(self) -> Element {
        let mut root = self.root;
        if let Some(header) = self.header.filter(|header| !header.is_empty()) {
            root.append_element(header);
        }
        root.append_element(self.body);
        root
    }
}

/// SOAP fault, recognised from a decoded body
#[derive(Clone, Debug, PartialEq)]
pub struct Fault {
    pub code: String,
    pub reason: String,
    pub actor: Option<String>,
    pub detail: Option<Value>,
}

impl Fault {
    /// Recognise a fault in `value`, either the `Fault` structure itself or a
    /// mapping holding it under a `Fault` key
    pub fn from_value(value: &Value) -> Option<Self> {
        let fault = value.get("Fault").unwrap_or(value);

        // SOAP 1.1
        if let (Some(code), Some(reason)) = (
            fault.get("faultcode").and_then(text_of),
            fault.get("faultstring").and_then(text_of),
        ) {
            return Some(Self {
                code,
                reason,
                actor: fault.get("faultactor").and_then(text_of),
                detail: fault.get("detail").cloned(),
            });
        }

        // SOAP 1.2
        let code = fault.get("Code")?.get("Value").and_then(text_of)?;
        let reason = fault.get("Reason")?.get("Text").and_then(text_of)?;
        Some(Self {
            code,
            reason,
            actor: fault.get("Role").and_then(text_of),
            detail: fault.get("Detail").cloned(),
        })
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.reason)
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.get(0).and_then(text_of),
        _ => value.get(TEXT_KEY).and_then(Value::as_string).map(str::to_string),
    }
}
