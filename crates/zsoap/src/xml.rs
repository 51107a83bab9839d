//! Mutable XML tree with namespace scoping

pub mod cursor;
pub mod model;
pub mod namespace;
pub mod parser;
pub mod writer;

pub use model::{Descendants, Element, Node, QName};
pub use namespace::Namespaces;
pub use parser::{parse, parse_bytes, Config, Parser};
pub use writer::XML_DECLARATION;
