use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error as ActixError, HttpMessage, HttpRequest, HttpResponse,
};
use campus_models::auth::{TOKEN_AUDIENCE, TOKEN_ISSUER};
use campus_models::{ApiResponse, Claims, Role};
use async_trait::async_trait;
use campus_observability::TraceContext;
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Authentication required")]
    Missing,
    #[error("Invalid or expired token")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("Token subject is not a user id")]
    BadSubject,
    #[error("Account is no longer active")]
    Inactive,
    #[error("Account lookup failed: {0}")]
    Lookup(String),
}

/// Standing of the account behind a token. Consulted on every
/// authenticated request so that deactivation and role changes apply
/// before the token expires.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Current role of an active account, `None` once it is gone or inactive.
    async fn active_role(&self, user_id: Uuid) -> Result<Option<Role>, TokenError>;
}

/// Replaces the role carried by the token with the stored one.
async fn refresh_claims(mut claims: Claims, accounts: &dyn AccountLookup) -> Result<Claims, TokenError> {
    let user_id = claims.user_id().ok_or(TokenError::BadSubject)?;
    match accounts.active_role(user_id).await? {
        Some(role) => {
            claims.role = role;
            Ok(claims)
        }
        None => Err(TokenError::Inactive),
    }
}

/// HS256 signing and verification keys shared by the login handler and
/// the middleware.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Signs a token for the user and returns it with its expiry instant.
    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        name: &str,
        role: Role,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let now = Utc::now();
        let expires_at = now + self.expiry;
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if data.claims.user_id().is_none() {
            return Err(TokenError::BadSubject);
        }
        Ok(data.claims)
    }
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
    keys: Arc<JwtKeys>,
    accounts: Option<Arc<dyn AccountLookup>>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let keys = Arc::clone(&self.keys);
        let accounts = self.accounts.clone();

        Box::pin(async move {
            if is_public_endpoint(req.method(), req.path()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let verified = match bearer_token(req.request()) {
                Some(token) => keys.verify(&token),
                None => Err(TokenError::Missing),
            };
            let verified = match (verified, accounts) {
                (Ok(claims), Some(accounts)) => refresh_claims(claims, accounts.as_ref()).await,
                (verified, _) => verified,
            };

            match verified {
                Ok(claims) => {
                    if let Some(user_id) = claims.user_id() {
                        let ctx = req.extensions().get::<TraceContext>().cloned();
                        if let Some(ctx) = ctx {
                            req.extensions_mut().insert(ctx.with_user(user_id));
                        }
                    }
                    req.extensions_mut().insert(claims);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(TokenError::Lookup(e)) => {
                    tracing::error!(path = %req.path(), error = %e, "Account lookup failed");
                    Ok(req
                        .into_response(HttpResponse::InternalServerError().json(ApiResponse::error("Server error")))
                        .map_into_right_body())
                }
                Err(e) => {
                    tracing::debug!(path = %req.path(), "Rejected request: {}", e);
                    let message = match e {
                        TokenError::Missing => "Authentication required",
                        TokenError::Inactive => "Account is no longer active",
                        _ => "Invalid or expired token",
                    };
                    Ok(req
                        .into_response(HttpResponse::Unauthorized().json(ApiResponse::error(message)))
                        .map_into_right_body())
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct AuthMiddlewareFactory {
    keys: Arc<JwtKeys>,
    accounts: Option<Arc<dyn AccountLookup>>,
}

impl AuthMiddlewareFactory {
    /// Trusts the role inside the token until it expires.
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys, accounts: None }
    }

    /// Checks every token against the stored account.
    pub fn with_accounts(mut self, accounts: Arc<dyn AccountLookup>) -> Self {
        self.accounts = Some(accounts);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service: Rc::new(service),
            keys: Arc::clone(&self.keys),
            accounts: self.accounts.clone(),
        }))
    }
}

/// Endpoints reachable without a bearer token.
pub fn is_public_endpoint(method: &Method, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    match path {
        "/health" => true,
        "/api/auth/login" => method == Method::POST,
        "/api/departments" => method == Method::GET,
        _ => method == Method::OPTIONS,
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn extract_claims_from_request(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}
