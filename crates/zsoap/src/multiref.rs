//! multiRef resolution
//!
//! Some toolkits (Axis in particular) move shared or repeated structures out
//! of the response into sibling elements carrying an `id`, leaving behind
//! placeholders with `href="#id"`. Resolution produces a new tree in which
//! every placeholder holds a copy of its target; the parsed document is left
//! untouched.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::xml::{Element, Node};

/// Default bound on nested reference expansion
pub const DEFAULT_MAX_DEPTH: u16 = 64;

/// Default bound on the number of elements copied in from reference targets
pub const DEFAULT_MAX_INLINED: usize = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolver {
    strict: bool,
    max_depth: u16,
    /// 0 disables the bound
    max_inlined: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub const fn new() -> Self {
        Self {
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_inlined: DEFAULT_MAX_INLINED,
        }
    }

    /// Fail on reference cycles and on the depth and size bounds instead of
    /// leaving the placeholder in place
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub const fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bound the total number of elements copied from targets; 0 disables it
    pub const fn with_max_inlined(mut self, max_inlined: usize) -> Self {
        self.max_inlined = max_inlined;
        self
    }

    /// Resolve every `href` placeholder under `body`
    pub fn resolve(self, body: &Element) -> Result<Element> {
        let mut index = HashMap::new();
        for element in body.descendants() {
            if let Some(id) = element.attribute("id") {
                index.entry(id).or_insert(element);
            }
        }
        debug!(targets = index.len(), "indexed multiRef targets");

        let mut expansion = Expansion {
            resolver: self,
            index,
            path: Vec::new(),
            inlined: 0,
        };
        let mut resolved = expansion.expand(body)?;
        resolved.rebase(&body.inherited);
        Ok(resolved)
    }
}

/// Resolve `body` leniently: cycles and unknown ids stay as placeholders
pub fn resolve(body: &Element) -> Element {
    Resolver::new()
        .resolve(body)
        .unwrap_or_else(|_| body.clone())
}

struct Expansion<'a> {
    resolver: Resolver,
    index: HashMap<&'a str, &'a Element>,
    /// ids being expanded on the current path
    path: Vec<&'a str>,
    /// elements copied in from targets so far
    inlined: usize,
}

impl<'a> Expansion<'a> {
    fn expand(&mut self, node: &'a Element) -> Result<Element> {
        let target = match node.attribute("href").and_then(|href| href.strip_prefix('#')) {
            Some(id) => self.target(id)?,
            None => None,
        };

        let mut copy = Element::new(&node.tag());
        for (name, value) in node.attributes() {
            if target.is_none() || name != "href" {
                copy.attributes.insert(name.to_string(), value.to_string());
            }
        }

        let mut entered = 0;
        if let Some(id) = node.attribute("id") {
            self.path.push(id);
            entered += 1;
        }
        let source = match target {
            Some((id, target)) => {
                debug!(id, placeholder = %node.tag(), "inlining multiRef");
                for (name, value) in target.attributes() {
                    if name != "id" {
                        copy.attributes.insert(name.to_string(), value.to_string());
                    }
                }
                self.path.push(id);
                entered += 1;
                target
            }
            None => node,
        };

        let expanded = self.expand_children(source, &mut copy);
        self.path.truncate(self.path.len().saturating_sub(entered));
        expanded?;
        Ok(copy)
    }

    fn expand_children(&mut self, source: &'a Element, copy: &mut Element) -> Result<()> {
        for node in source.nodes() {
            match node {
                Node::Element(element) => {
                    let child = self.expand(element)?;
                    copy.push_element(child);
                }
                Node::Text(text) => {
                    copy.append_text(text);
                }
            }
        }
        Ok(())
    }

    /// Target of `#id`, or `None` when the placeholder has to stay
    fn target(&mut self, id: &str) -> Result<Option<(&'a str, &'a Element)>> {
        let Some((&key, &target)) = self.index.get_key_value(id) else {
            warn!(id, "unresolved multiRef reference");
            return Ok(None);
        };
        if self.path.contains(&key) {
            warn!(id, "multiRef cycle left unresolved");
            if self.resolver.strict {
                return Err(Error::from_kind(ErrorKind::MultiRefCycle { id: id.to_string() }));
            }
            return Ok(None);
        }
        if self.path.len() >= usize::from(self.resolver.max_depth) {
            warn!(id, max_depth = self.resolver.max_depth, "multiRef nesting too deep");
            if self.resolver.strict {
                return Err(Error::from_kind(ErrorKind::MaxDepthExceeded {
                    max: self.resolver.max_depth,
                }));
            }
            return Ok(None);
        }

        let max = self.resolver.max_inlined;
        if max > 0 {
            let size = self.inlined.saturating_add(target.descendants().count());
            if size > max {
                warn!(id, max_inlined = max, "multiRef expansion too large");
                if self.resolver.strict {
                    return Err(Error::from_kind(ErrorKind::MaxSizeExceeded { max }));
                }
                // keep the bound tripped so later placeholders stay cheap
                self.inlined = size;
                return Ok(None);
            }
            self.inlined = size;
        }
        Ok(Some((key, target)))
    }
}
