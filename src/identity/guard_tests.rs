use std::sync::Arc;

use super::*;
use crate::identity::principal::UserIdentity;
use crate::identity::roles::resolve_roles;
use crate::identity::session::{SessionPatch, SessionStore, StoreOptions};
use crate::storage::MemoryKv;

fn store() -> SessionStore { SessionStore::open(Arc::new(MemoryKv::new()), StoreOptions::default()) }

fn user_with(raw_roles: &[&str]) -> UserIdentity {
    UserIdentity { id: "1".into(), nombre: "N".into(), email: "n@x.com".into(), roles: resolve_roles(raw_roles), ..Default::default() }
}

#[test]
fn loading_while_uninitialized_regardless_of_login() {
    let routes = Routes::default();
    let s = store();
    assert_eq!(Guard::authenticated().evaluate(&s.get_session(), &routes), GuardDecision::Loading);

    // a trusted-but-unverified login still shows loading until initialization
    let kv = Arc::new(MemoryKv::new());
    let first = SessionStore::open(kv.clone(), StoreOptions::default());
    first.set_session(SessionPatch::signed_in("T", user_with(&["1"])));
    let rehydrated = SessionStore::open(kv, StoreOptions::default()).get_session();
    assert!(rehydrated.is_logged_in());
    let admin_guard = Guard::new(resolve_roles(&["1"]));
    assert_eq!(admin_guard.evaluate(&rehydrated, &routes), GuardDecision::Loading);
}

#[test]
fn unauthenticated_goes_to_sign_in() {
    let s = store();
    s.set_session(SessionPatch::signed_out());
    let d = Guard::authenticated().evaluate(&s.get_session(), &Routes::default());
    assert_eq!(d, GuardDecision::Redirect { to: "/login".into(), reason: RedirectReason::Unauthenticated });
}

#[test]
fn wrong_role_goes_home_not_sign_in() {
    let s = store();
    s.set_session(SessionPatch::signed_in("T", user_with(&["3"])));
    let d = Guard::new(resolve_roles(&["1"])).evaluate(&s.get_session(), &Routes::default());
    assert_eq!(d, GuardDecision::Redirect { to: "/".into(), reason: RedirectReason::Unauthorized });
}

#[test]
fn matching_role_or_empty_set_renders() {
    let s = store();
    s.set_session(SessionPatch::signed_in("T", user_with(&["2"])));
    let session = s.get_session();
    let routes = Routes::default();
    assert!(Guard::new(resolve_roles(&["1", "2"])).evaluate(&session, &routes).is_render());
    assert!(Guard::new(Default::default()).evaluate(&session, &routes).is_render());
    assert!(Guard::for_screen(Screen::FoundationPanel).evaluate(&session, &routes).is_render());
    assert!(!Guard::for_screen(Screen::AdminPanel).evaluate(&session, &routes).is_render());
}

#[test]
fn public_screen_renders_even_while_loading() {
    let s = store();
    assert!(Guard::for_screen(Screen::PublicListings).evaluate(&s.get_session(), &Routes::default()).is_render());
}

#[test]
fn custom_routes_are_used() {
    let s = store();
    s.set_session(SessionPatch::signed_out());
    let routes = Routes { sign_in: "/ingresar".into(), home: "/inicio".into() };
    match Guard::authenticated().evaluate(&s.get_session(), &routes) {
        GuardDecision::Redirect { to, .. } => assert_eq!(to, "/ingresar"),
        other => panic!("unexpected decision {:?}", other),
    }
}

#[tokio::test]
async fn watch_reevaluates_on_logout() {
    let s = store();
    s.set_session(SessionPatch::signed_in("T", user_with(&["1"])));
    let mut w = GuardWatch::new(Guard::for_screen(Screen::AdminPanel), Routes::default(), s.subscribe());
    assert!(w.current().is_render());

    s.set_session(SessionPatch::signed_out());
    let d = w.changed().await.unwrap();
    assert_eq!(d, GuardDecision::Redirect { to: "/login".into(), reason: RedirectReason::Unauthenticated });
}

#[tokio::test]
async fn settled_waits_past_loading() {
    let s = Arc::new(store());
    let mut w = GuardWatch::new(Guard::authenticated(), Routes::default(), s.subscribe());
    assert_eq!(w.current(), GuardDecision::Loading);

    let writer = s.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        writer.set_session(SessionPatch::signed_in("T", user_with(&["3"])));
    });
    let d = w.settled().await.unwrap();
    assert!(d.is_render());
}
