use campus_database::models::{NewUser, User};
use campus_database::utils::{hash_password, normalize_email, verify_password};
use campus_database::Stores;
use async_trait::async_trait;
use campus_middleware::{AccountLookup, JwtKeys, TokenError};
use campus_models::auth::LoginRequest;
use campus_models::{Role, RoleKind};
use campus_observability::log_auth_event;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::SERVICE_NAME;
use crate::config::BootstrapAdmin;
use crate::errors::{ServiceError, ServiceResult};

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub struct AuthService {
    stores: Stores,
    keys: Arc<JwtKeys>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(stores: Stores, keys: Arc<JwtKeys>, bcrypt_cost: u32) -> Self {
        Self { stores, keys, bcrypt_cost }
    }

    pub async fn login(&self, request: LoginRequest) -> ServiceResult<LoginResponse> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let user = match self.stores.users.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                log_auth_event(SERVICE_NAME, "login", None, Some("unknown or inactive user"));
                return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(&request.password, &user.password_hash)? {
            log_auth_event(SERVICE_NAME, "login", Some(user.id), Some("wrong password"));
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        let (token, expires_at) = self
            .keys
            .issue(user.id, &user.email, &user.name, user.role())
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))?;

        log_auth_event(SERVICE_NAME, "login", Some(user.id), None);
        Ok(LoginResponse { token, expires_at, user })
    }

    /// Seeds the first admin unless a user with that email already exists.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<Option<User>> {
        let email = normalize_email(&admin.email);
        if self.stores.users.find_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        let user = self
            .stores
            .users
            .create(NewUser {
                name: admin.name.clone(),
                email,
                password_hash: hash_password(&admin.password, self.bcrypt_cost)?,
                role: RoleKind::Admin,
                department_id: None,
                batch_id: None,
                section: None,
                enrollment_id: None,
                employee_id: None,
                can_register_students: false,
            })
            .await?;

        tracing::info!(user_id = %user.id, email = %user.email, "Bootstrap admin created");
        Ok(Some(user))
    }
}

/// Tokens stay valid only while their account is active; the role is
/// read from the store each time.
#[async_trait]
impl AccountLookup for AuthService {
    async fn active_role(&self, user_id: Uuid) -> Result<Option<Role>, TokenError> {
        let user = self
            .stores
            .users
            .find(user_id)
            .await
            .map_err(|e| TokenError::Lookup(e.to_string()))?;
        Ok(user.filter(|u| u.is_active).map(|u| u.role()))
    }
}
