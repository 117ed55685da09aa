//! Request path normalization and base-path stripping.

use url::Url;

/// Path portion of a raw request target: scheme/host, query string and
/// fragment removed.
fn path_part(raw: &str) -> String {
    if raw.contains("://")
        && let Ok(url) = Url::parse(raw)
    {
        return url.path().to_string();
    }
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    raw[..end].to_string()
}

/// Split a raw request target into its non-empty path segments.
///
/// `https://host/cds-au/v1/banking/accounts/?page=2` becomes
/// `["cds-au", "v1", "banking", "accounts"]`.
pub fn request_segments(raw: &str) -> Vec<String> {
    path_part(raw)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BaseSegment {
    Literal(String),
    Any,
}

/// Configured prefix every CDR request must carry, e.g. `/cds-au/v1`.
///
/// A `{name}` segment matches any value. An empty base path is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasePath {
    segments: Vec<BaseSegment>,
}

impl BasePath {
    pub fn new(path: &str) -> Self {
        let segments = path
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') {
                    BaseSegment::Any
                } else {
                    BaseSegment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Remove the base path from the front of `segments`.
    ///
    /// Returns `None` when the request does not carry the full prefix; such a
    /// request is never a candidate for resolution.
    pub fn strip<'a>(&self, segments: &'a [String]) -> Option<&'a [String]> {
        if segments.len() < self.segments.len() {
            return None;
        }
        let (prefix, rest) = segments.split_at(self.segments.len());
        let matches = self
            .segments
            .iter()
            .zip(prefix)
            .all(|(base, actual)| match base {
                BaseSegment::Any => true,
                BaseSegment::Literal(text) => text.eq_ignore_ascii_case(actual),
            });
        matches.then_some(rest)
    }
}
