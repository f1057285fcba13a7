use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::ipnetwork::IpNetwork;

use crate::services::audit_service::Actor;

/// Tokens are issued by the identity provider; this service only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Applicant,
    Admin,
    Recruiter,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "applicant" => Some(Role::Applicant),
            "admin" => Some(Role::Admin),
            "recruiter" => Some(Role::Recruiter),
            _ => None,
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Recruiter)
    }
}

impl Claims {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .ok()
        .map(|data| data.claims)
}

fn bearer_claims(headers: &HeaderMap) -> std::result::Result<Claims, Response> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let config = crate::config::get_config();
    decode_token(token.trim(), &config.jwt_secret)
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "invalid_token"))
}

async fn authorize(mut req: Request, next: Next, allowed: fn(Role) -> bool) -> Response {
    let claims = match bearer_claims(req.headers()) {
        Ok(claims) => claims,
        Err(res) => return res,
    };
    match claims.role() {
        Some(role) if allowed(role) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        _ => {
            tracing::debug!(sub = %claims.sub, role = ?claims.role, "role not allowed");
            reject(StatusCode::FORBIDDEN, "forbidden")
        }
    }
}

/// Admins and recruiters.
pub async fn require_staff(req: Request, next: Next) -> Response {
    authorize(req, next, |role| role.is_staff()).await
}

pub async fn require_applicant(req: Request, next: Next) -> Response {
    authorize(req, next, |role| role == Role::Applicant).await
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());
    forwarded_for.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts.extensions.get::<Claims>().map(|c| c.sub.clone());
        let ip = forwarded_ip(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Actor {
            subject,
            ip: ip.map(IpNetwork::from),
            user_agent,
        })
    }
}
