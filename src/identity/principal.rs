use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use super::roles::RoleName;

/// Id that the backend sends either as a number or a string. Always held as a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlexibleId(pub String);

impl<'de> Deserialize<'de> for FlexibleId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Str(String),
            Int(i64),
            Uint(u64),
        }
        Ok(FlexibleId(match Wire::deserialize(d)? {
            Wire::Str(s) => s,
            Wire::Int(n) => n.to_string(),
            Wire::Uint(n) => n.to_string(),
        }))
    }
}

pub(crate) fn flexible_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    FlexibleId::deserialize(d).map(|id| id.0)
}

/// Who is logged in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub nombre: String,
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(default, rename = "avatarUrl", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserIdentity {
    pub fn has_role(&self, role: &RoleName) -> bool { self.roles.contains(role) }

    pub fn has_any_role(&self, allowed: &BTreeSet<RoleName>) -> bool {
        !self.roles.is_disjoint(allowed)
    }

    /// Merge the fields present in `patch`. Id and roles are not patchable.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(v) = patch.nombre { self.nombre = v; }
        if let Some(v) = patch.email { self.email = v; }
        if let Some(v) = patch.telefono { self.telefono = Some(v); }
        if let Some(v) = patch.avatar_url { self.avatar_url = Some(v); }
    }
}

/// Partial profile update, typically the echo of a profile edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPatch {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default, rename = "avatarUrl")]
    pub avatar_url: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.nombre.is_none() && self.email.is_none() && self.telefono.is_none() && self.avatar_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::roles::resolve_roles;

    #[test]
    fn numeric_and_string_ids_deserialize() {
        let u: UserIdentity = serde_json::from_str(r#"{"id":7,"nombre":"Ana","email":"a@x.com"}"#).unwrap();
        assert_eq!(u.id, "7");
        assert!(u.roles.is_empty());
        let u: UserIdentity = serde_json::from_str(r#"{"id":"abc","nombre":"Ana","email":"a@x.com","roles":["refugio"]}"#).unwrap();
        assert_eq!(u.id, "abc");
        assert!(u.has_role(&RoleName::Refugio));
    }

    #[test]
    fn apply_merges_only_present_fields() {
        let mut u = UserIdentity {
            id: "7".into(),
            nombre: "Ana".into(),
            email: "a@x.com".into(),
            roles: resolve_roles(&["2"]),
            ..Default::default()
        };
        u.apply(UserPatch { nombre: Some("Ana María".into()), ..Default::default() });
        assert_eq!(u.nombre, "Ana María");
        assert_eq!(u.email, "a@x.com");
        assert_eq!(u.roles, resolve_roles(&["2"]));
        assert!(UserPatch::default().is_empty());
    }

    #[test]
    fn has_any_role_is_intersection() {
        let u = UserIdentity { roles: resolve_roles(&["3"]), ..Default::default() };
        assert!(!u.has_any_role(&resolve_roles(&["1"])));
        assert!(u.has_any_role(&resolve_roles(&["1", "3"])));
        assert!(!u.has_any_role(&BTreeSet::new()));
    }
}
