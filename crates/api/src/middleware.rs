use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use farmgate_auth::Role;
use farmgate_core::{CompanyId, UserId};

use crate::context::{ActorContext, COMPANY_ID_HEADER, ROLE_HEADER, USER_ID_HEADER};

/// Lift the gateway-verified identity headers into an [`ActorContext`].
///
/// Credentials are never inspected here; the authentication collaborator in
/// front of this service has already verified them.
pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor = extract_actor(req.headers())?;
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn extract_actor(headers: &HeaderMap) -> Result<ActorContext, StatusCode> {
    let user_id = header(headers, USER_ID_HEADER)?
        .ok_or(StatusCode::UNAUTHORIZED)
        .and_then(|raw| UserId::new(raw).map_err(|_| StatusCode::UNAUTHORIZED))?;

    let role: Role = header(headers, ROLE_HEADER)?
        .ok_or(StatusCode::UNAUTHORIZED)?
        .parse()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let company_id = match header(headers, COMPANY_ID_HEADER)? {
        None => None,
        Some(raw) => Some(CompanyId::new(raw).map_err(|_| StatusCode::UNAUTHORIZED)?),
    };

    Ok(ActorContext::new(user_id, role, company_id))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, StatusCode> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn full_identity_is_extracted() {
        let actor = extract_actor(&headers(&[
            (USER_ID_HEADER, "co-1"),
            (ROLE_HEADER, "COMPANY"),
            (COMPANY_ID_HEADER, "acme"),
        ]))
        .unwrap();
        assert_eq!(actor.user_id().as_str(), "co-1");
        assert_eq!(actor.role(), Role::Company);
        assert_eq!(actor.subject().company_id.as_ref().map(|c| c.as_str()), Some("acme"));
    }

    #[test]
    fn missing_or_unknown_role_is_unauthorized() {
        assert_eq!(
            extract_actor(&headers(&[(USER_ID_HEADER, "u-1")])),
            Err(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(
            extract_actor(&headers(&[(USER_ID_HEADER, "u-1"), (ROLE_HEADER, "WIZARD")])),
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn blank_user_id_is_unauthorized() {
        assert_eq!(
            extract_actor(&headers(&[(USER_ID_HEADER, " "), (ROLE_HEADER, "ADMIN")])),
            Err(StatusCode::UNAUTHORIZED)
        );
    }
}
