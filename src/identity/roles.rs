use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Semantic role of a marketplace account.
///
/// Raw ids outside the fixed table resolve to `Unknown` carrying the raw id, so two different
/// unknown ids stay two set members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleName {
    Admin,
    /// Foundation / shelter account
    Refugio,
    Usuario,
    Unknown(String),
}

const UNKNOWN_PREFIX: &str = "unknown:";

impl RoleName {
    /// Map one backend role id. Ids are trimmed first.
    pub fn from_raw_id(raw: &str) -> Self {
        match raw.trim() {
            "1" => RoleName::Admin,
            "2" => RoleName::Refugio,
            "3" => RoleName::Usuario,
            other => RoleName::Unknown(other.to_string()),
        }
    }

    /// Backend id for the known roles.
    pub fn raw_id(&self) -> Option<&'static str> {
        match self {
            RoleName::Admin => Some("1"),
            RoleName::Refugio => Some("2"),
            RoleName::Usuario => Some("3"),
            RoleName::Unknown(_) => None,
        }
    }

    pub fn as_label(&self) -> String {
        match self {
            RoleName::Admin => "admin".into(),
            RoleName::Refugio => "refugio".into(),
            RoleName::Usuario => "usuario".into(),
            RoleName::Unknown(raw) => format!("{}{}", UNKNOWN_PREFIX, raw),
        }
    }

    fn from_label(label: &str) -> Self {
        match label {
            "admin" => RoleName::Admin,
            "refugio" => RoleName::Refugio,
            "usuario" => RoleName::Usuario,
            other => RoleName::Unknown(other.strip_prefix(UNKNOWN_PREFIX).unwrap_or(other).to_string()),
        }
    }

    pub fn is_known(&self) -> bool { !matches!(self, RoleName::Unknown(_)) }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.as_label()) }
}

impl Serialize for RoleName {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(&self.as_label()) }
}

impl<'de> Deserialize<'de> for RoleName {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let label = String::deserialize(d)?;
        Ok(RoleName::from_label(&label))
    }
}

/// Resolve backend role ids to semantic roles. Pure; calling it twice with the same input yields the
/// same set.
pub fn resolve_roles<S: AsRef<str>>(raw_role_ids: &[S]) -> BTreeSet<RoleName> {
    raw_role_ids.iter().map(|r| RoleName::from_raw_id(r.as_ref())).collect()
}

/// A role id as it arrives over the wire: `2`, `"2"` or `{ "id": 2, ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRoleId(pub String);

impl RawRoleId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for RawRoleId {
    fn from(s: &str) -> Self { RawRoleId(s.to_string()) }
}

impl AsRef<str> for RawRoleId {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Serialize for RawRoleId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(&self.0) }
}

impl<'de> Deserialize<'de> for RawRoleId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Str(String),
            Num(i64),
            Obj { id: super::principal::FlexibleId },
        }
        Ok(match Wire::deserialize(d)? {
            Wire::Str(s) => RawRoleId(s),
            Wire::Num(n) => RawRoleId(n.to_string()),
            Wire::Obj { id } => RawRoleId(id.0),
        })
    }
}
