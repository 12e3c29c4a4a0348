//! Client-side reading of bearer tokens. Tokens are opaque to the client except for one thing:
//! when they are JWTs we honor the `exp` claim before trusting a cached copy.

use base64::Engine;
use chrono::{DateTime, Utc};

/// Expiry instant of a JWT, if the token is one and carries `exp`. Signatures are not checked.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() { return None; }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// True only for JWTs whose `exp` is at or before `now`. Opaque tokens never expire here.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    jwt_expiry(token).map(|exp| exp <= now).unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn make_jwt(exp: i64) -> String {
    let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    let header = enc.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = enc.encode(serde_json::json!({"sub": "7", "exp": exp}).to_string());
    format!("{}.{}.c2ln", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_tokens_never_expire() {
        assert!(jwt_expiry("T").is_none());
        assert!(!is_expired_at("T", Utc::now()));
        assert!(!is_expired_at("a.b", Utc::now()));
        assert!(!is_expired_at("a.!!!.c", Utc::now()));
    }

    #[test]
    fn jwt_exp_is_honored() {
        let now = Utc::now();
        let past = make_jwt(now.timestamp() - 60);
        let future = make_jwt(now.timestamp() + 3600);
        assert!(is_expired_at(&past, now));
        assert!(!is_expired_at(&future, now));
        assert_eq!(jwt_expiry(&future).map(|d| d.timestamp()), Some(now.timestamp() + 3600));
    }
}
