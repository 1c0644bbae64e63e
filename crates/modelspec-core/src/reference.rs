//! Model references of the form `[scheme://][[registry/]namespace/]name[:tag]`.

use std::fmt;
use std::str::FromStr;

use crate::error::ReferenceError;

pub const DEFAULT_PROTOCOL_SCHEME: &str = "https";
pub const DEFAULT_REGISTRY: &str = "registry.cnai.com";
pub const DEFAULT_NAMESPACE: &str = "sys";
pub const DEFAULT_TAG: &str = "latest";

/// A parsed model name. Missing components take the registry defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelReference {
    pub scheme: String,
    pub registry: String,
    pub namespace: String,
    pub name: String,
    pub tag: String,
}

impl ModelReference {
    /// Split `input` into its components without validating them.
    ///
    /// `"gemma-2b:latest"` → `registry.cnai.com/sys/gemma-2b:latest`.
    pub fn parse(input: &str) -> Self {
        let mut reference = Self {
            scheme: DEFAULT_PROTOCOL_SCHEME.into(),
            registry: DEFAULT_REGISTRY.into(),
            namespace: DEFAULT_NAMESPACE.into(),
            name: String::new(),
            tag: DEFAULT_TAG.into(),
        };

        let rest = match input.split_once("://") {
            Some((scheme, rest)) => {
                reference.scheme = scheme.to_string();
                rest
            }
            None => input,
        };

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [registry, namespace, name] => {
                reference.registry = registry.to_string();
                reference.namespace = namespace.to_string();
                reference.name = name.to_string();
            }
            [namespace, name] => {
                reference.namespace = namespace.to_string();
                reference.name = name.to_string();
            }
            [name] => reference.name = name.to_string(),
            // Deeper paths leave the name empty, which validate() rejects.
            _ => {}
        }

        if let Some((name, tag)) = reference.name.split_once(':') {
            let (name, tag) = (name.to_string(), tag.to_string());
            reference.name = name;
            reference.tag = tag;
        }

        reference
    }

    pub fn validate(&self) -> Result<(), ReferenceError> {
        if self.name.is_empty() {
            return Err(ReferenceError::MissingName(self.full_tagname()));
        }
        if self.tag.contains(':') {
            return Err(ReferenceError::ColonInTag(self.full_tagname()));
        }
        Ok(())
    }

    pub fn full_tagname(&self) -> String {
        format!(
            "{}/{}/{}:{}",
            self.registry, self.namespace, self.name, self.tag
        )
    }

    /// Tag name with the default registry (and default namespace) elided.
    pub fn short_tagname(&self) -> String {
        if self.registry != DEFAULT_REGISTRY {
            return self.full_tagname();
        }
        if self.namespace == DEFAULT_NAMESPACE {
            format!("{}:{}", self.name, self.tag)
        } else {
            format!("{}/{}:{}", self.namespace, self.name, self.tag)
        }
    }
}

impl FromStr for ModelReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reference = Self::parse(s);
        reference.validate()?;
        Ok(reference)
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_tagname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_with_tag_takes_defaults() {
        let r = ModelReference::parse("gemma-2b:latest");
        assert_eq!(r.scheme, "https");
        assert_eq!(r.registry, DEFAULT_REGISTRY);
        assert_eq!(r.namespace, DEFAULT_NAMESPACE);
        assert_eq!(r.name, "gemma-2b");
        assert_eq!(r.tag, "latest");
    }

    #[test]
    fn missing_tag_defaults_to_latest() {
        let r = ModelReference::parse("gemma-2b");
        assert_eq!(r.tag, "latest");
        assert_eq!(r.short_tagname(), "gemma-2b:latest");
    }

    #[test]
    fn namespace_and_registry_forms() {
        let r = ModelReference::parse("google/gemma-2b:it");
        assert_eq!(r.namespace, "google");
        assert_eq!(r.name, "gemma-2b");
        assert_eq!(r.tag, "it");
        assert_eq!(r.short_tagname(), "google/gemma-2b:it");

        let r = ModelReference::parse("http://localhost:5000/google/gemma-2b:v1");
        assert_eq!(r.scheme, "http");
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.full_tagname(), "localhost:5000/google/gemma-2b:v1");
        assert_eq!(r.short_tagname(), "localhost:5000/google/gemma-2b:v1");
    }

    #[test]
    fn only_first_colon_splits_the_tag() {
        let r = ModelReference::parse("gemma:a:b");
        assert_eq!(r.name, "gemma");
        assert_eq!(r.tag, "a:b");
        assert_eq!(
            r.validate(),
            Err(ReferenceError::ColonInTag(
                "registry.cnai.com/sys/gemma:a:b".into()
            ))
        );
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            "".parse::<ModelReference>(),
            Err(ReferenceError::MissingName(_))
        ));
        assert!(matches!(
            "a/b/c/d".parse::<ModelReference>(),
            Err(ReferenceError::MissingName(_))
        ));
    }

    #[test]
    fn display_is_short_tagname() {
        let r: ModelReference = "gemma-2b:latest".parse().unwrap();
        assert_eq!(r.to_string(), "gemma-2b:latest");
    }
}
