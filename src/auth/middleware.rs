use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;

use crate::auth::token;
use crate::error::ApiError;
use crate::rbac::Role;
use crate::store::{AppState, TenantId};

/// Caller identified by a valid, unexpired session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub tenant: Option<TenantId>,
    pub role: Option<Role>,
    pub ip_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = extract_bearer_token(parts).ok_or_else(|| {
            ApiError::Unauthorized("missing or invalid authorization header".into())
        })?;

        let claims = token::verify(&raw, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            ApiError::Unauthorized("invalid or expired token".into())
        })?;

        Ok(Self {
            user_id: claims.user_id,
            email: claims.email,
            tenant: claims
                .tenant_id
                .filter(|id| *id > 0)
                .map(TenantId::trusted),
            role: claims.role,
            ip_addr: extract_ip(parts, state.config.trust_proxy_headers),
            user_agent: extract_user_agent(parts),
        })
    }
}

/// Authenticated caller whose session is bound to a tenant.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user_id: i64,
    pub email: String,
    pub tenant: TenantId,
    pub role: Role,
    pub ip_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl TryFrom<AuthUser> for TenantContext {
    type Error = ApiError;

    fn try_from(auth: AuthUser) -> Result<Self, Self::Error> {
        match (auth.tenant, auth.role) {
            (Some(tenant), Some(role)) => Ok(Self {
                user_id: auth.user_id,
                email: auth.email,
                tenant,
                role,
                ip_addr: auth.ip_addr,
                user_agent: auth.user_agent,
            }),
            _ => Err(ApiError::tenant_required()),
        }
    }
}

impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state).await?.try_into()
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token.to_owned())
}

fn extract_user_agent(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(USER_AGENT)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

fn extract_ip(parts: &Parts, trust_proxy: bool) -> Option<String> {
    // Only trust X-Forwarded-For when behind a configured reverse proxy
    if trust_proxy
        && let Some(forwarded) = parts.headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first_ip) = val.split(',').next()
    {
        return Some(first_ip.trim().to_owned());
    }
    parts
        .extensions
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn make_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/test");
        for &(k, v) in headers {
            builder = builder.header(k, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn auth_user(tenant: Option<i64>, role: Option<Role>) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "a@example.com".into(),
            tenant: tenant.map(TenantId::trusted),
            role,
            ip_addr: None,
            user_agent: None,
        }
    }

    // -- extract_bearer_token --

    #[test]
    fn bearer_token_valid() {
        let parts = make_parts(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(extract_bearer_token(&parts), Some("abc.def.ghi".into()));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let parts = make_parts(&[("authorization", "bearer abc123")]);
        assert_eq!(extract_bearer_token(&parts), Some("abc123".into()));
    }

    #[test]
    fn bearer_token_missing_header() {
        let parts = make_parts(&[]);
        assert_eq!(extract_bearer_token(&parts), None);
    }

    #[test]
    fn bearer_token_wrong_scheme() {
        let parts = make_parts(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_bearer_token(&parts), None);
    }

    #[test]
    fn bearer_token_empty_after_prefix() {
        let parts = make_parts(&[("authorization", "Bearer ")]);
        assert_eq!(extract_bearer_token(&parts), None);
    }

    #[test]
    fn bearer_token_with_extra_parts_rejected() {
        let parts = make_parts(&[("authorization", "Bearer abc def")]);
        assert_eq!(extract_bearer_token(&parts), None);
    }

    // -- extract_ip / user agent --

    #[test]
    fn ip_from_forwarded_for_trusted() {
        let parts = make_parts(&[("x-forwarded-for", "1.2.3.4, 5.6.7.8")]);
        assert_eq!(extract_ip(&parts, true), Some("1.2.3.4".into()));
    }

    #[test]
    fn ip_forwarded_for_ignored_when_not_trusted() {
        let parts = make_parts(&[("x-forwarded-for", "1.2.3.4")]);
        assert_eq!(extract_ip(&parts, false), None);
    }

    #[test]
    fn ip_from_connect_info() {
        let mut parts = make_parts(&[]);
        let addr: std::net::SocketAddr = "127.0.0.1:9000".parse().unwrap();
        parts.extensions.insert(axum::extract::ConnectInfo(addr));
        assert_eq!(extract_ip(&parts, false), Some("127.0.0.1".into()));
    }

    #[test]
    fn user_agent_captured() {
        let parts = make_parts(&[("user-agent", "curl/8.0")]);
        assert_eq!(extract_user_agent(&parts), Some("curl/8.0".into()));
    }

    // -- tenant context --

    #[test]
    fn tenant_context_requires_tenant() {
        let err = TenantContext::try_from(auth_user(None, Some(Role::Admin))).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "tenant context required"));
    }

    #[test]
    fn tenant_context_requires_role() {
        assert!(TenantContext::try_from(auth_user(Some(4), None)).is_err());
    }

    #[test]
    fn tenant_context_carries_tenant_and_role() {
        let ctx = TenantContext::try_from(auth_user(Some(4), Some(Role::Member))).unwrap();
        assert_eq!(ctx.tenant.get(), 4);
        assert_eq!(ctx.role, Role::Member);
    }
}
