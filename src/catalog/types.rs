use std::fmt;

use axum::http::Method;
use serde::Deserialize;

/// One entry of an endpoint JSON file, as written on disk.
///
/// Both the standard catalog files and a deployment's configured catalog use
/// this shape. Fields a configured entry may omit are optional here and
/// validated in `core`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRecord {
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub request_path: Option<String>,
    #[serde(default)]
    pub min_supported_version: Option<u32>,
    #[serde(default)]
    pub max_supported_version: Option<u32>,
    #[serde(default)]
    pub auth_scopes_required: Option<String>,
    #[serde(default, rename = "requiresXFAPI")]
    pub requires_xfapi: Option<bool>,
}

/// A single segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateSegment {
    /// Fixed text, stored lowercased (matching is case-insensitive).
    Literal(String),
    /// `{name}` placeholder, matches any one non-empty segment.
    Param(String),
}

impl TemplateSegment {
    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    pub fn matches_literal(&self, segment: &str) -> bool {
        match self {
            Self::Literal(text) => text.eq_ignore_ascii_case(segment),
            Self::Param(_) => false,
        }
    }
}

/// A declared CDR endpoint. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDefinition {
    pub(crate) method: Method,
    pub(crate) path_template: String,
    pub(crate) segments: Vec<TemplateSegment>,
    pub(crate) min_supported_version: u32,
    pub(crate) max_supported_version: u32,
    pub(crate) required_scope: Option<String>,
    pub(crate) requires_interaction_id: bool,
}

impl EndpointDefinition {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Template as declared, e.g. `/energy/accounts/{accountId}/balance`.
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    pub fn min_supported_version(&self) -> u32 {
        self.min_supported_version
    }

    pub fn max_supported_version(&self) -> u32 {
        self.max_supported_version
    }

    /// `None` means the endpoint is public (no consent required).
    pub fn required_scope(&self) -> Option<&str> {
        self.required_scope.as_deref()
    }

    pub fn requires_interaction_id(&self) -> bool {
        self.requires_interaction_id
    }

    pub fn has_params(&self) -> bool {
        self.segments.iter().any(TemplateSegment::is_param)
    }

    /// Method plus template with every parameter collapsed to `{}`.
    ///
    /// Two definitions with the same key are indistinguishable to the resolver.
    pub fn shape_key(&self) -> ShapeKey {
        ShapeKey::new(&self.method, &self.segments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey(String);

impl ShapeKey {
    pub(crate) fn new(method: &Method, segments: &[TemplateSegment]) -> Self {
        let mut key = method.as_str().to_string();
        key.push(' ');
        for segment in segments {
            key.push('/');
            match segment {
                TemplateSegment::Literal(text) => key.push_str(text),
                TemplateSegment::Param(_) => key.push_str("{}"),
            }
        }
        Self(key)
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
