//! @ai:module:intent Reduce export directives to an exported flag and path override
//! @ai:module:layer domain
//! @ai:module:public_api ResourceConfig
//! @ai:module:depends_on ast
//! @ai:module:stateless true

use crate::ast::{Annotation, AnnotationArgs, AnnotationValue};
use serde::Serialize;

/// @ai:intent Per-call export decision; never stored on a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceConfig {
    pub exported: bool,
    pub path: Option<String>,
}

impl ResourceConfig {
    pub const EXPORTED: ResourceConfig = ResourceConfig {
        exported: true,
        path: None,
    };

    /// @ai:intent Decide export and path from a directive
    /// @ai:pre repo_annotation_required is true when the repository has neither a CRUD base nor a type-level directive
    /// @ai:post a missing directive or a marker means exported without override
    /// @ai:example (@RestResource(path = "x"), required = true) -> {exported: false, path: "x"}
    /// @ai:effects pure
    pub fn resolve(directive: Option<&Annotation>, repo_annotation_required: bool) -> Self {
        let Some(directive) = directive else {
            return Self::EXPORTED;
        };

        match &directive.args {
            AnnotationArgs::Marker => Self::EXPORTED,
            AnnotationArgs::Single(AnnotationValue::Bool(exported)) => Self {
                exported: *exported,
                path: None,
            },
            AnnotationArgs::Single(_) | AnnotationArgs::Named(_) => Self {
                exported: directive
                    .arg("exported")
                    .and_then(AnnotationValue::as_bool)
                    .unwrap_or(!repo_annotation_required),
                path: directive
                    .arg("path")
                    .and_then(AnnotationValue::as_str)
                    .map(str::to_string),
            },
        }
    }

    /// @ai:intent Decide export for operations whose absence of a directive is caller-defined
    /// @ai:post with no directive, exported unless the repository requires opting in
    /// @ai:effects pure
    pub fn resolve_custom(directive: Option<&Annotation>, repo_annotation_required: bool) -> Self {
        match directive {
            Some(_) => Self::resolve(directive, repo_annotation_required),
            None => Self {
                exported: !repo_annotation_required,
                path: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directive(pairs: Vec<(&str, AnnotationValue)>) -> Annotation {
        Annotation::named(
            "RestResource",
            pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    #[test]
    fn test_marker_and_absence_are_exported() {
        assert_eq!(ResourceConfig::resolve(None, true), ResourceConfig::EXPORTED);
        let marker = Annotation::marker("RestResource");
        assert_eq!(ResourceConfig::resolve(Some(&marker), true), ResourceConfig::EXPORTED);
    }

    #[test]
    fn test_named_arguments() {
        let hidden = directive(vec![("exported", AnnotationValue::Bool(false))]);
        assert!(!ResourceConfig::resolve(Some(&hidden), false).exported);

        let path_only = directive(vec![("path", AnnotationValue::Str("byColor".into()))]);
        assert_eq!(
            ResourceConfig::resolve(Some(&path_only), false),
            ResourceConfig {
                exported: true,
                path: Some("byColor".to_string())
            }
        );
        assert!(!ResourceConfig::resolve(Some(&path_only), true).exported);
    }

    #[test]
    fn test_custom_default_follows_requirement() {
        assert!(ResourceConfig::resolve_custom(None, false).exported);
        assert!(!ResourceConfig::resolve_custom(None, true).exported);
    }
}
