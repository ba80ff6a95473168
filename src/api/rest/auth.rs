use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Caller identity resolved by the upstream gateway. Requests reaching this
/// service are already authenticated; we only read who they are.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|err| AppError::Unauthorized(format!("invalid {ACTOR_ID_HEADER}: {err}")))?;
        let role = header(parts, ACTOR_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(AppError::Unauthorized)?;

        Ok(Caller(Actor { id, role }))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|err| AppError::Unauthorized(format!("invalid {name} header: {err}")))
}
