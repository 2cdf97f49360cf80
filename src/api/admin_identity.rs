//! Administrator identity extraction.
//!
//! Authentication happens upstream; the gateway forwards the verified
//! operator id in the `x-admin-id` header. Whether that id is privileged is
//! decided later by the [`Authorizer`](crate::service::Authorizer).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::{AdminId, SYSTEM_ACTOR};
use crate::error::LifecycleError;

/// Header carrying the authenticated operator id.
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Extracts the caller's [`AdminId`] from [`ADMIN_ID_HEADER`].
///
/// Rejects with [`LifecycleError::Forbidden`] when the header is missing,
/// blank or not valid UTF-8, and when it names the reserved
/// [`SYSTEM_ACTOR`], which the audit log uses for scheduler rows.
#[derive(Debug, Clone)]
pub struct AdminIdentity(pub AdminId);

impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = LifecycleError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ADMIN_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                LifecycleError::Forbidden(format!("missing {ADMIN_ID_HEADER} header"))
            })?;
        if id.eq_ignore_ascii_case(SYSTEM_ACTOR) {
            return Err(LifecycleError::Forbidden(format!(
                "{id} is a reserved actor id"
            )));
        }
        Ok(Self(AdminId::new(id)))
    }
}
