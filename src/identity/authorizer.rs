use std::collections::BTreeSet;

use super::roles::RoleName;
use super::session::Session;

pub fn is_authenticated(session: &Session) -> bool { session.is_logged_in() }

pub fn is_admin(session: &Session) -> bool { has_role(session, &RoleName::Admin) }

pub fn has_role(session: &Session, role: &RoleName) -> bool {
    session.user().map(|u| u.has_role(role)).unwrap_or(false)
}

/// Empty `allowed` means any authenticated user.
pub fn has_any_role(session: &Session, allowed: &BTreeSet<RoleName>) -> bool {
    match session.user() {
        Some(u) => allowed.is_empty() || u.has_any_role(allowed),
        None => false,
    }
}

/// Role-gated areas of the marketplace client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Listings browsing; never guarded
    PublicListings,
    Profile,
    AdoptionRequest,
    /// Foundation profile, campaigns and news management
    FoundationPanel,
    /// User, foundation and listing administration tables
    AdminPanel,
}

impl Screen {
    pub fn requires_login(&self) -> bool { !matches!(self, Screen::PublicListings) }

    /// Roles admitted to the screen. Empty means any logged in user.
    pub fn allowed_roles(&self) -> BTreeSet<RoleName> {
        match self {
            Screen::PublicListings | Screen::Profile => BTreeSet::new(),
            Screen::AdoptionRequest => [RoleName::Usuario].into_iter().collect(),
            Screen::FoundationPanel => [RoleName::Refugio, RoleName::Admin].into_iter().collect(),
            Screen::AdminPanel => [RoleName::Admin].into_iter().collect(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "listings" | "public" => Some(Screen::PublicListings),
            "profile" | "perfil" => Some(Screen::Profile),
            "adoption" | "adopcion" => Some(Screen::AdoptionRequest),
            "foundation" | "refugio" => Some(Screen::FoundationPanel),
            "admin" => Some(Screen::AdminPanel),
            _ => None,
        }
    }
}
