//! Request → endpoint definition resolution.
//!
//! Matching walks the request one segment at a time, narrowing the
//! method-filtered candidates as it goes. At each depth the candidates whose
//! template has a literal equal to the request segment are explored before
//! the ones that have a parameter there; if the literal branch cannot be
//! completed the walk backs off to the parameter branch. A template matches
//! only if it ends exactly at the last request segment, so
//! `/banking/accounts/{accountId}` never swallows
//! `/banking/accounts/123/payments/scheduled`.

use std::sync::Arc;

use axum::http::Method;

use crate::catalog::{Catalog, EndpointDefinition, EndpointSet, TemplateSegment};

use super::path::{BasePath, request_segments};

/// No CDR endpoint is shallower than `/{domain}/{resource}`.
const MIN_ENDPOINT_SEGMENTS: usize = 2;

/// A definition matched against one concrete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub definition: Arc<EndpointDefinition>,
    /// Request segments after base-path stripping, in request case.
    pub segments: Vec<String>,
    /// `(name, value)` for every `{param}` in the template.
    pub params: Vec<(String, String)>,
}

impl ResolvedEndpoint {
    fn new(definition: Arc<EndpointDefinition>, segments: &[String]) -> Self {
        let params = definition
            .segments()
            .iter()
            .zip(segments)
            .filter_map(|(template, actual)| match template {
                TemplateSegment::Param(name) => Some((name.clone(), actual.clone())),
                TemplateSegment::Literal(_) => None,
            })
            .collect();
        Self {
            definition,
            segments: segments.to_vec(),
            params,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of resolving a request against both catalogs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Matches an endpoint this deployment implements.
    Implemented(ResolvedEndpoint),
    /// A CDR standard endpoint, but not in the configured catalog.
    NotImplemented(ResolvedEndpoint),
    /// Not a CDR endpoint at all.
    NotFound,
}

impl Resolution {
    /// The matched endpoint, implemented or not.
    pub fn endpoint(&self) -> Option<&ResolvedEndpoint> {
        match self {
            Self::Implemented(ep) | Self::NotImplemented(ep) => Some(ep),
            Self::NotFound => None,
        }
    }

    pub fn is_implemented(&self) -> bool {
        matches!(self, Self::Implemented(_))
    }
}

/// Stateless resolver; cheap to share.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    base_path: BasePath,
}

impl PathResolver {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: BasePath::new(base_path),
        }
    }

    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    /// Normalized segments left after the base path, or `None` when the path
    /// cannot be a CDR endpoint (missing prefix, too shallow).
    pub fn endpoint_segments(&self, raw_path: &str) -> Option<Vec<String>> {
        let segments = request_segments(raw_path);
        let rest = self.base_path.strip(&segments)?;
        (rest.len() >= MIN_ENDPOINT_SEGMENTS).then(|| rest.to_vec())
    }

    /// Resolve against a single endpoint set.
    pub fn resolve_in(
        &self,
        method: &Method,
        raw_path: &str,
        set: &EndpointSet,
    ) -> Option<ResolvedEndpoint> {
        let segments = self.endpoint_segments(raw_path)?;
        match_segments(method, &segments, set)
    }

    /// Resolve against the configured catalog first, then the full standard
    /// catalog.
    pub fn resolve(&self, method: &Method, raw_path: &str, catalog: &Catalog) -> Resolution {
        let Some(segments) = self.endpoint_segments(raw_path) else {
            return Resolution::NotFound;
        };
        if let Some(ep) = match_segments(method, &segments, catalog.configured_catalog()) {
            return Resolution::Implemented(ep);
        }
        match match_segments(method, &segments, catalog.full_catalog()) {
            Some(ep) => Resolution::NotImplemented(ep),
            None => Resolution::NotFound,
        }
    }
}

fn match_segments(
    method: &Method,
    segments: &[String],
    set: &EndpointSet,
) -> Option<ResolvedEndpoint> {
    let candidates: Vec<&Arc<EndpointDefinition>> = set.for_method(method).iter().collect();
    walk(&candidates, segments, 0).map(|definition| ResolvedEndpoint::new(Arc::clone(definition), segments))
}

fn walk<'c>(
    candidates: &[&'c Arc<EndpointDefinition>],
    segments: &[String],
    depth: usize,
) -> Option<&'c Arc<EndpointDefinition>> {
    let Some(segment) = segments.get(depth) else {
        // Request exhausted: only a template of exactly this length matches.
        return candidates
            .iter()
            .find(|d| d.segments().len() == depth)
            .copied();
    };

    let mut literal = Vec::new();
    let mut param = Vec::new();
    for &candidate in candidates {
        match candidate.segments().get(depth) {
            Some(t) if t.matches_literal(segment) => literal.push(candidate),
            Some(t) if t.is_param() => param.push(candidate),
            _ => {}
        }
    }

    if !literal.is_empty()
        && let Some(found) = walk(&literal, segments, depth + 1)
    {
        return Some(found);
    }
    if param.is_empty() {
        return None;
    }
    walk(&param, segments, depth + 1)
}
