//! Client configuration

use crate::envelope::SoapVersion;
use crate::multiref::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_INLINED};
use crate::xml;

/// Settings for a [`Client`](crate::Client)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Envelope version of outgoing requests
    pub version: SoapVersion,
    /// Prefix bound to the envelope namespace (`soap:Envelope`)
    pub envelope_prefix: String,
    /// Service namespace for raw calls, declared as the wrapper's default namespace
    pub namespace: Option<String>,
    /// Endpoint address, overriding the catalog's
    pub location: Option<String>,
    /// SOAPAction prefix for raw calls; the method name is appended
    pub action: Option<String>,
    /// Fail on schema mismatches and multiRef cycles instead of degrading
    pub strict: bool,
    /// Limits applied when parsing responses
    pub parse: xml::Config,
    /// Bound on nested multiRef expansion
    pub multiref_depth: u16,
    /// Bound on elements copied in by multiRef expansion; 0 disables it
    pub multiref_max_inlined: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SoapVersion::Soap11,
            envelope_prefix: "soap".to_string(),
            namespace: None,
            location: None,
            action: None,
            strict: false,
            parse: xml::Config::default(),
            multiref_depth: DEFAULT_MAX_DEPTH,
            multiref_max_inlined: DEFAULT_MAX_INLINED,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: SoapVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_envelope_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.envelope_prefix = prefix.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_parse_limits(mut self, parse: xml::Config) -> Self {
        self.parse = parse;
        self
    }

    pub fn with_multiref_depth(mut self, depth: u16) -> Self {
        self.multiref_depth = depth;
        self
    }

    pub fn with_multiref_max_inlined(mut self, max_inlined: usize) -> Self {
        self.multiref_max_inlined = max_inlined;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, SoapVersion::Soap11);
        assert_eq!(config.envelope_prefix, "soap");
        assert!(!config.strict);
        assert_eq!(config.multiref_depth, 64);
        assert_eq!(config.multiref_max_inlined, 100_000);
        assert_eq!(config.parse, xml::Config::default());
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .with_version(SoapVersion::Soap12)
            .with_namespace("http://localhost/api")
            .with_parse_limits(xml::Config::unlimited())
            .strict(true);
        assert_eq!(config.version, SoapVersion::Soap12);
        assert_eq!(config.namespace.as_deref(), Some("http://localhost/api"));
        assert_eq!(config.parse, xml::Config::unlimited());
        assert!(config.strict);
    }
}
