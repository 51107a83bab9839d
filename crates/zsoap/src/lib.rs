//! zSOAP - SOAP message codec
//!
//! Maps native values to namespace-qualified XML and back, either untyped or
//! driven by a schema taken from a WSDL operation. Responses using Axis-style
//! multiRef indirection are resolved before decoding, and call arguments are
//! bound onto nested parameter structures in schema order.
//!
//! # Quick Start
//!
//! ```
//! use zsoap::{unmarshall, Element, Schema, Struct, Value};
//! # fn main() -> Result<(), zsoap::Error> {
//! let mut span = Element::parse("<span><name>foo</name></span>")?;
//! zsoap::marshall(&mut span, "value", &Value::Bool(true), None, None)?;
//! assert_eq!(span.to_xml_string(), "<span><name>foo</name><value>true</value></span>");
//!
//! let schema = Schema::Struct(
//!     Struct::new()
//!         .field("name", Schema::string())
//!         .field("value", Schema::boolean()),
//! );
//! let decoded = unmarshall(&span, &schema)?;
//! assert_eq!(decoded.get("value"), Some(&Value::Bool(true)));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod value;
pub use value::{Array, Object, Value, ATTRIBUTES_KEY, TEXT_KEY};

pub mod xml;
pub use xml::{Element, Namespaces, Node, QName};

pub mod scalar;
pub use scalar::ScalarKind;

pub mod schema;
pub use schema::{Catalog, Field, MaxOccurs, Message, Occurs, Operation, Schema, Struct};

pub mod marshal;
pub use marshal::{marshall, marshall_struct, marshall_with_schema};

pub mod multiref;
pub use multiref::{resolve, Resolver};

pub mod unmarshal;
pub use unmarshal::{unmarshall, unmarshall_raw, Unmarshaller};

pub mod binder;
pub use binder::bind;

pub mod envelope;
pub use envelope::{Envelope, Fault, SoapVersion};

pub mod config;
pub use config::Config;

pub mod client;
pub use client::{Client, Request, Transport, TransportError};

/// Parse an XML document into its root element
pub fn from_str(s: &str) -> Result<Element> {
    xml::parse(s)
}

/// Parse an XML document from bytes
pub fn from_bytes(bytes: &[u8]) -> Result<Element> {
    xml::parse_bytes(bytes)
}

/// Parse with custom limits
pub fn from_bytes_with_config(bytes: &[u8], config: xml::Config) -> Result<Element> {
    xml::Parser::with_config(bytes, config).parse()
}
