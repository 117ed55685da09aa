//! Endpoint catalog loading.
//!
//! The full standard catalog is embedded in the crate (one JSON file per
//! domain). A deployment's configured catalog is a subset of it: every
//! configured entry must name a standard endpoint, and may narrow or widen
//! the supported version range. Everything is validated here, once, so the
//! per-request path never sees a malformed definition.

use std::{collections::HashMap, path::Path, sync::Arc};

use axum::http::Method;
use thiserror::Error;

use super::types::{EndpointDefinition, EndpointRecord, ShapeKey, TemplateSegment};

const BANKING_ENDPOINTS: &str = include_str!("data/cdr-banking-endpoints.json");
const ENERGY_ENDPOINTS: &str = include_str!("data/cdr-energy-endpoints.json");
const COMMON_ENDPOINTS: &str = include_str!("data/cdr-common-endpoints.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid endpoint json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read endpoint file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("endpoint entry {index}: missing requestType")]
    MissingMethod { index: usize },
    #[error("endpoint entry {index}: missing requestPath")]
    MissingPath { index: usize },
    #[error("endpoint entry {index}: invalid requestType '{value}'")]
    InvalidMethod { index: usize, value: String },
    #[error("endpoint {path}: {reason}")]
    InvalidTemplate { path: String, reason: &'static str },
    #[error("endpoint {path}: missing supported version range")]
    MissingVersions { path: String },
    #[error("endpoint {path}: invalid supported version range {min}..={max}")]
    InvalidVersionRange { path: String, min: u32, max: u32 },
    #[error("duplicate endpoint {0}")]
    Duplicate(ShapeKey),
    #[error("configured endpoint {0} is not a CDR standard endpoint")]
    UnknownEndpoint(ShapeKey),
}

/// Method-indexed, insertion-ordered collection of definitions.
#[derive(Debug, Clone, Default)]
pub struct EndpointSet {
    ordered: Vec<Arc<EndpointDefinition>>,
    by_method: HashMap<Method, Vec<Arc<EndpointDefinition>>>,
    by_shape: HashMap<ShapeKey, Arc<EndpointDefinition>>,
}

impl EndpointSet {
    fn insert(&mut self, definition: EndpointDefinition) -> Result<(), CatalogError> {
        let key = definition.shape_key();
        if self.by_shape.contains_key(&key) {
            return Err(CatalogError::Duplicate(key));
        }
        let definition = Arc::new(definition);
        self.by_method
            .entry(definition.method.clone())
            .or_default()
            .push(Arc::clone(&definition));
        self.by_shape.insert(key, Arc::clone(&definition));
        self.ordered.push(definition);
        Ok(())
    }

    /// Candidates for `method`, in catalog order.
    pub fn for_method(&self, method: &Method) -> &[Arc<EndpointDefinition>] {
        self.by_method.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, key: &ShapeKey) -> Option<&Arc<EndpointDefinition>> {
        self.by_shape.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EndpointDefinition>> {
        self.ordered.iter()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// The full standard catalog plus the deployment's configured subset.
///
/// Built once at startup and shared read-only (`Arc<Catalog>`) across requests.
#[derive(Debug, Clone)]
pub struct Catalog {
    standard: EndpointSet,
    configured: EndpointSet,
}

impl Catalog {
    /// Every standard endpoint, all of them implemented.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_records(&standard_records()?, None)
    }

    /// Standard catalog with the given configured subset.
    pub fn with_configured(configured: &[EndpointRecord]) -> Result<Self, CatalogError> {
        Self::from_records(&standard_records()?, Some(configured))
    }

    pub fn with_configured_json(json: &str) -> Result<Self, CatalogError> {
        let configured: Vec<EndpointRecord> = serde_json::from_str(json)?;
        Self::with_configured(&configured)
    }

    /// Load the configured subset from a JSON file, or implement everything
    /// when no file is given.
    pub fn from_file(path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            return Self::standard();
        };
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::with_configured_json(&json)
    }

    /// Build from explicit records. `configured = None` implements the whole
    /// standard set.
    pub fn from_records(
        standard: &[EndpointRecord],
        configured: Option<&[EndpointRecord]>,
    ) -> Result<Self, CatalogError> {
        let mut standard_set = EndpointSet::default();
        for (index, record) in standard.iter().enumerate() {
            standard_set.insert(standard_definition(index, record)?)?;
        }

        let configured_set = match configured {
            None => standard_set.clone(),
            Some(records) => {
                let mut set = EndpointSet::default();
                for (index, record) in records.iter().enumerate() {
                    set.insert(configured_definition(index, record, &standard_set)?)?;
                }
                set
            }
        };

        Ok(Self {
            standard: standard_set,
            configured: configured_set,
        })
    }

    /// Every endpoint the standard defines.
    pub fn full_catalog(&self) -> &EndpointSet {
        &self.standard
    }

    /// Endpoints this deployment implements.
    pub fn configured_catalog(&self) -> &EndpointSet {
        &self.configured
    }
}

/// Banking, energy and common definitions concatenated in that order.
pub fn standard_records() -> Result<Vec<EndpointRecord>, CatalogError> {
    let mut records: Vec<EndpointRecord> = serde_json::from_str(BANKING_ENDPOINTS)?;
    records.extend(serde_json::from_str::<Vec<EndpointRecord>>(ENERGY_ENDPOINTS)?);
    records.extend(serde_json::from_str::<Vec<EndpointRecord>>(COMMON_ENDPOINTS)?);
    Ok(records)
}

struct ParsedTarget {
    method: Method,
    path_template: String,
    segments: Vec<TemplateSegment>,
}

fn parse_target(index: usize, record: &EndpointRecord) -> Result<ParsedTarget, CatalogError> {
    let method = record
        .request_type
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(CatalogError::MissingMethod { index })?;
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        CatalogError::InvalidMethod {
            index,
            value: method.to_string(),
        }
    })?;

    let path = record
        .request_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(CatalogError::MissingPath { index })?;
    let (path_template, segments) = parse_template(path)?;

    Ok(ParsedTarget {
        method,
        path_template,
        segments,
    })
}

/// Split a template into segments; empty segments (double or trailing
/// slashes) are dropped.
pub(crate) fn parse_template(path: &str) -> Result<(String, Vec<TemplateSegment>), CatalogError> {
    let invalid = |reason| CatalogError::InvalidTemplate {
        path: path.to_string(),
        reason,
    };

    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if raw.is_empty() {
        return Err(invalid("template has no segments"));
    }

    let mut segments = Vec::with_capacity(raw.len());
    for segment in &raw {
        if let Some(name) = segment
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            if name.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            if name.contains(['{', '}']) {
                return Err(invalid("malformed parameter"));
            }
            segments.push(TemplateSegment::Param(name.to_string()));
        } else if segment.contains(['{', '}']) {
            return Err(invalid("malformed parameter"));
        } else {
            segments.push(TemplateSegment::Literal(segment.to_ascii_lowercase()));
        }
    }

    Ok((format!("/{}", raw.join("/")), segments))
}

fn checked_range(path: &str, min: u32, max: u32) -> Result<(u32, u32), CatalogError> {
    if min == 0 || min > max {
        return Err(CatalogError::InvalidVersionRange {
            path: path.to_string(),
            min,
            max,
        });
    }
    Ok((min, max))
}

fn standard_definition(
    index: usize,
    record: &EndpointRecord,
) -> Result<EndpointDefinition, CatalogError> {
    let target = parse_target(index, record)?;
    let (min, max) = match (record.min_supported_version, record.max_supported_version) {
        (Some(min), Some(max)) => checked_range(&target.path_template, min, max)?,
        _ => {
            return Err(CatalogError::MissingVersions {
                path: target.path_template,
            });
        }
    };

    Ok(EndpointDefinition {
        method: target.method,
        path_template: target.path_template,
        segments: target.segments,
        min_supported_version: min,
        max_supported_version: max,
        required_scope: record
            .auth_scopes_required
            .clone()
            .filter(|s| !s.trim().is_empty()),
        requires_interaction_id: record.requires_xfapi.unwrap_or(true),
    })
}

fn configured_definition(
    index: usize,
    record: &EndpointRecord,
    standard: &EndpointSet,
) -> Result<EndpointDefinition, CatalogError> {
    let target = parse_target(index, record)?;
    let key = ShapeKey::new(&target.method, &target.segments);
    let base = standard
        .get(&key)
        .ok_or_else(|| CatalogError::UnknownEndpoint(key.clone()))?;

    let min = record
        .min_supported_version
        .unwrap_or(base.min_supported_version);
    let max = record
        .max_supported_version
        .unwrap_or(base.max_supported_version);
    let (min, max) = checked_range(&base.path_template, min, max)?;

    Ok(EndpointDefinition {
        min_supported_version: min,
        max_supported_version: max,
        ..EndpointDefinition::clone(base)
    })
}
