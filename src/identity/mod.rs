//! Client identity: who is logged in, as what role, and what the UI may show them.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod credentials;
mod guard;
mod principal;
mod provider;
mod roles;
mod service;
mod session;
pub mod token;

pub use authorizer::{has_any_role, has_role, is_admin, is_authenticated, Screen};
pub use credentials::{CredentialChannel, LegacyCredentials, ROLE_ID_KEY, TOKEN_KEY, USER_ID_KEY};
pub use guard::{Guard, GuardDecision, GuardWatch, RedirectReason, Routes};
pub use principal::{UserIdentity, UserPatch};
pub use provider::{HttpAuthApi, LoginRequest, LoginResponse, ProfileFetcher, LOGIN_PATH, PROFILE_PATH};
pub use roles::{resolve_roles, RawRoleId, RoleName};
pub use service::{InitOutcome, SessionService};
pub use session::{Generation, Session, SessionPatch, SessionSnapshot, SessionStore, SessionToken, StoreOptions, AUTH_STORAGE_KEY};
