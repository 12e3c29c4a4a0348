use super::*;

#[test]
fn http_status_mapping() {
    assert_eq!(AppError::auth("auth", "no").http_status(), 401);
    assert_eq!(AppError::forbidden("forbidden", "no").http_status(), 403);
    assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
    assert_eq!(AppError::network("network", "down").http_status(), 503);
    assert_eq!(AppError::decode("decode", "bad json").http_status(), 502);
    assert_eq!(AppError::storage("storage", "disk").http_status(), 500);
    assert_eq!(AppError::config("config", "bad url").http_status(), 500);
    assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
}

#[test]
fn from_status_picks_kind_and_keeps_code() {
    let e = AppError::from_status(401, "");
    assert!(matches!(e, AppError::Auth { .. }));
    assert_eq!(e.message(), "HTTP 401");
    assert!(e.is_auth_rejection());

    let e = AppError::from_status(403, "no access");
    assert!(matches!(e, AppError::Forbidden { .. }));
    assert_eq!(e.message(), "no access");

    let e = AppError::from_status(500, "boom");
    assert_eq!(e.code_str(), "http_500");
    assert_eq!(e.http_status(), 500);
    assert!(!e.is_auth_rejection());
}

#[test]
fn display_is_code_then_message() {
    let e = AppError::decode("decode", "missing field `email`");
    assert_eq!(e.to_string(), "decode: missing field `email`");
}

#[test]
fn anyhow_maps_to_internal() {
    let e: AppError = anyhow::anyhow!("something broke").into();
    assert!(matches!(e, AppError::Internal { .. }));
    assert_eq!(e.message(), "something broke");
}
