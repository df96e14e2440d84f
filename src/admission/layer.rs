use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::admission::policy::RatePolicy;
use crate::auth::ACTOR_ID_HEADER;
use crate::error::AppError;
use crate::state::AppState;

/// Runs before actor extraction; the key comes from raw headers.
pub async fn admit(
    State((state, policy)): State<(Arc<AppState>, RatePolicy)>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(request.headers(), policy.name);
    let decision = state.rate_gate.check(&key, &policy).await?;
    if !decision.allowed {
        return Err(AppError::RateLimited(decision));
    }

    let headers = decision.headers();
    let mut response = next.run(request).await;
    response.headers_mut().extend(headers);
    Ok(response)
}

fn client_key(headers: &HeaderMap, policy: &str) -> String {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown");
    let actor = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|actor| !actor.is_empty())
        .unwrap_or("anon");
    format!("rate:{policy}:{ip}:{actor}")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn key_combines_policy_ip_and_actor() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.9"));
        headers.insert(
            ACTOR_ID_HEADER,
            HeaderValue::from_static("c6f37905-53d5-4f10-9373-bd0d24e796aa"),
        );
        assert_eq!(
            client_key(&headers, "orders"),
            "rate:orders:10.0.0.9:c6f37905-53d5-4f10-9373-bd0d24e796aa"
        );
    }

    #[test]
    fn forwarded_chains_use_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.0.0.9, 172.16.0.1"),
        );
        assert_eq!(client_key(&headers, "general"), "rate:general:10.0.0.9:anon");
    }

    #[test]
    fn missing_headers_fall_back_to_placeholders() {
        assert_eq!(
            client_key(&HeaderMap::new(), "tracking"),
            "rate:tracking:unknown:anon"
        );
    }
}
