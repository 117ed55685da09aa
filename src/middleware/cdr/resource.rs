//! Resource ownership: ids in the path (GET) or in a batch body (POST) must
//! belong to the authenticated customer.
//!
//! Unowned ids answer 404, never 403, so existence is not leaked.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::error::{CdrRejection, ErrorCode, ErrorList};
use crate::resolver::ResolvedEndpoint;
use crate::services::auth::CdrUser;
use crate::state::CdrState;

use super::context;

/// Which entitlement list an id is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entitlement {
    BankingAccounts,
    BankingPayees,
    EnergyAccounts,
    ServicePoints,
}

impl Entitlement {
    fn ids(self, user: &CdrUser) -> &[String] {
        match self {
            Self::BankingAccounts => &user.accounts_banking,
            Self::BankingPayees => &user.banking_payees,
            Self::EnergyAccounts => &user.accounts_energy,
            Self::ServicePoints => &user.energy_service_points,
        }
    }
}

/// Path prefixes (template literals) whose next segment is a customer-owned id.
const RESOURCE_ROOTS: &[(&[&str], Entitlement)] = &[
    (&["banking", "accounts"], Entitlement::BankingAccounts),
    (&["banking", "payees"], Entitlement::BankingPayees),
    (&["energy", "accounts"], Entitlement::EnergyAccounts),
    (
        &["energy", "electricity", "servicepoints"],
        Entitlement::ServicePoints,
    ),
];

/// What a request asks to access.
#[derive(Debug, PartialEq, Eq)]
enum Claim {
    /// Nothing customer-specific.
    None,
    /// One id taken from the path.
    PathId(Entitlement, String),
    /// A batch of ids in `data.<field>` of the JSON body.
    BodyIds(Entitlement, &'static str),
}

fn path_claim(ep: &ResolvedEndpoint) -> Claim {
    let template = ep.definition.segments();
    for (root, entitlement) in RESOURCE_ROOTS {
        let under_root = template.len() > root.len()
            && root
                .iter()
                .zip(template)
                .all(|(literal, segment)| segment.matches_literal(literal));
        if under_root && template[root.len()].is_param() {
            // The id sits right after the root; whatever follows
            // (`/balance`, `/transactions/{id}`, ...) does not matter.
            if let Some(id) = ep.segments.get(root.len()) {
                return Claim::PathId(*entitlement, id.clone());
            }
        }
    }
    Claim::None
}

fn body_claim(ep: &ResolvedEndpoint) -> Claim {
    let template = ep.definition.segments();
    let starts_with = |prefix: &[&str]| {
        template.len() >= prefix.len()
            && prefix
                .iter()
                .zip(template)
                .all(|(literal, segment)| segment.matches_literal(literal))
    };

    if starts_with(&["energy", "electricity", "servicepoints"]) {
        Claim::BodyIds(Entitlement::ServicePoints, "servicePointIds")
    } else if starts_with(&["energy"]) {
        Claim::BodyIds(Entitlement::EnergyAccounts, "accountIds")
    } else if starts_with(&["banking"]) {
        Claim::BodyIds(Entitlement::BankingAccounts, "accountIds")
    } else {
        Claim::None
    }
}

fn claim_for(method: &Method, ep: &ResolvedEndpoint) -> Claim {
    if ep.definition.required_scope().is_none() {
        return Claim::None;
    }
    match *method {
        Method::GET if ep.definition.has_params() => path_claim(ep),
        Method::POST => body_claim(ep),
        _ => Claim::None,
    }
}

/// `data.<field>` as a list of ids, or the field errors it has.
fn requested_ids(body: &[u8], field: &str) -> Result<Vec<String>, ErrorList> {
    let path = format!("data.{field}");
    let json: Value = serde_json::from_slice(body)
        .map_err(|_| ErrorList::single(ErrorCode::FieldInvalid, "data"))?;

    let Some(data) = json.get("data").filter(|d| d.is_object()) else {
        return Err(ErrorList::single(ErrorCode::FieldMissing, "data"));
    };
    let ids = match data.get(field) {
        None | Some(Value::Null) => return Err(ErrorList::single(ErrorCode::FieldMissing, path)),
        Some(Value::Array(ids)) if ids.is_empty() => {
            return Err(ErrorList::single(ErrorCode::FieldMissing, path));
        }
        Some(Value::Array(ids)) => ids,
        Some(_) => return Err(ErrorList::single(ErrorCode::FieldInvalid, path)),
    };

    ids.iter()
        .map(|id| match id {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            _ => Err(ErrorList::single(ErrorCode::FieldInvalid, path.clone())),
        })
        .collect()
}

/// One `Resource/Invalid` per id the user does not own.
fn unowned(ids: &[String], owned: &[String]) -> ErrorList {
    let mut errors = ErrorList::new();
    for id in ids {
        if !owned.contains(id) {
            errors.push(ErrorCode::ResourceInvalid, id.as_str());
        }
    }
    errors
}

pub async fn validate_resource(
    State(state): State<CdrState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, CdrRejection> {
    let resolution = context::resolution(&state, &mut req);
    let claim = match resolution.endpoint() {
        Some(ep) => claim_for(req.method(), ep),
        None => Claim::None,
    };
    if claim == Claim::None {
        return Ok(next.run(req).await);
    }

    let Some(user) = req.extensions().get::<CdrUser>().cloned() else {
        return Err(CdrRejection::Unauthorized("no authenticated user".into()));
    };

    let errors = match claim {
        Claim::None => ErrorList::new(),
        Claim::PathId(entitlement, id) => unowned(&[id], entitlement.ids(&user)),
        Claim::BodyIds(entitlement, field) => {
            let (parts, body) = req.into_parts();
            let bytes: Bytes = match axum::body::to_bytes(body, state.options.body_limit_bytes).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to buffer request body");
                    return Err(CdrRejection::BadRequest(ErrorList::single(
                        ErrorCode::FieldInvalid,
                        "data",
                    )));
                }
            };
            let ids = requested_ids(&bytes, field).map_err(CdrRejection::BadRequest)?;
            req = Request::from_parts(parts, Body::from(bytes));
            unowned(&ids, entitlement.ids(&user))
        }
    };

    if !errors.is_empty() {
        tracing::warn!(
            customer_id = %user.customer_id,
            unowned = errors.len(),
            "request for resources not owned by the customer"
        );
        return Err(CdrRejection::NotFound(errors));
    }

    Ok(next.run(req).await)
}
