use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::rbac::Role;
use crate::store::TenantId;

/// Session claims. The token is the whole session: nothing is stored server
/// side, so logout is the client discarding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub tenant_id: Option<i64>,
    pub email: String,
    pub role: Option<Role>,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(
        user_id: i64,
        tenant: Option<TenantId>,
        email: &str,
        role: Option<Role>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
        Self {
            user_id,
            tenant_id: tenant.map(TenantId::get),
            email: email.to_owned(),
            role,
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl),
        }
    }
}

pub fn sign(claims: &Claims, secret: &str) -> anyhow::Result<String> {
    if secret.is_empty() {
        anyhow::bail!("token signing secret is empty");
    }
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Check signature, algorithm, `exp` and `nbf`.
pub fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_nbf = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}
