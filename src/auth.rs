use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Driver,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Driver => "driver",
            Role::Operator => "operator",
        }
    }
}

/// The gateway in front of this service terminates real authentication;
/// we trust its identity headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

pub async fn require_actor(mut request: Request, next: Next) -> Result<Response, AppError> {
    let actor = actor_from_headers(request.headers()).ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn actor_from_headers(headers: &HeaderMap) -> Option<Actor> {
    let id: Uuid = headers
        .get(ACTOR_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let role = match headers.get(ACTOR_ROLE_HEADER)?.to_str().ok()?.trim() {
        "customer" => Role::Customer,
        "driver" => Role::Driver,
        "operator" => Role::Operator,
        _ => return None,
    };
    Some(Actor { id, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, role: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(ACTOR_ID_HEADER, HeaderValue::from_str(id).unwrap());
        map.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        map
    }

    #[test]
    fn parses_well_formed_identity() {
        let id = Uuid::new_v4();
        let actor = actor_from_headers(&headers(&id.to_string(), "driver")).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::Driver);
    }

    #[test]
    fn rejects_unknown_role() {
        let id = Uuid::new_v4().to_string();
        assert!(actor_from_headers(&headers(&id, "admin")).is_none());
    }

    #[test]
    fn rejects_malformed_id() {
        assert!(actor_from_headers(&headers("not-a-uuid", "customer")).is_none());
    }

    #[test]
    fn rejects_missing_headers() {
        assert!(actor_from_headers(&HeaderMap::new()).is_none());
    }
}
