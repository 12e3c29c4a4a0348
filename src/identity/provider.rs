use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::principal::{flexible_id, UserIdentity};
use super::roles::{resolve_roles, RawRoleId};
use crate::error::AppResult;
use crate::http::ApiClient;

pub const PROFILE_PATH: &str = "usuarios/perfil";
pub const LOGIN_PATH: &str = "auth/login";

/// Fetches the profile of the user owning `token`. Fails on any non-2xx or undecodable body.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn fetch_profile(&self, token: &str) -> AppResult<UserIdentity>;
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body returned by the backend on a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub nombre: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<RawRoleId>,
    pub token: String,
}

impl LoginResponse {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id.clone(),
            nombre: self.nombre.clone(),
            email: self.email.clone(),
            roles: resolve_roles(&self.roles),
            ..Default::default()
        }
    }
}

/// Profile as served by the backend: raw role ids instead of resolved roles.
#[derive(Debug, Clone, Deserialize)]
struct ProfilePayload {
    #[serde(deserialize_with = "flexible_id")]
    id: String,
    nombre: String,
    email: String,
    #[serde(default)]
    roles: Vec<RawRoleId>,
    #[serde(default)]
    telefono: Option<String>,
    #[serde(default, rename = "avatarUrl")]
    avatar_url: Option<String>,
}

impl From<ProfilePayload> for UserIdentity {
    fn from(p: ProfilePayload) -> Self {
        UserIdentity {
            roles: resolve_roles(&p.roles),
            id: p.id,
            nombre: p.nombre,
            email: p.email,
            telefono: p.telefono,
            avatar_url: p.avatar_url,
        }
    }
}

/// Auth endpoints of the marketplace backend.
#[derive(Clone)]
pub struct HttpAuthApi {
    api: ApiClient,
}

impl HttpAuthApi {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let req = LoginRequest { email: email.to_string(), password: password.to_string() };
        let resp: LoginResponse = self.api.post_json(LOGIN_PATH, &req).await?;
        info!(target: "adopta::auth", user_id = %resp.id, roles = resp.roles.len(), "login accepted");
        Ok(resp)
    }
}

#[async_trait]
impl ProfileFetcher for HttpAuthApi {
    async fn fetch_profile(&self, token: &str) -> AppResult<UserIdentity> {
        let payload: ProfilePayload = self.api.get_json_with_token(PROFILE_PATH, Some(token)).await?;
        Ok(payload.into())
    }
}
