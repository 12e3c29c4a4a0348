use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use adopta::identity::{resolve_roles, Guard, Routes, Screen, Session, SessionPatch, SessionStore, StoreOptions, UserIdentity};
use adopta::storage::MemoryKv;

fn session_with_roles(raw: &[&str]) -> Session {
    let store = SessionStore::open(Arc::new(MemoryKv::new()), StoreOptions::default());
    let user = UserIdentity { id: "1".into(), nombre: "bench".into(), email: "b@x.com".into(), roles: resolve_roles(raw), ..Default::default() };
    store.set_session(SessionPatch::signed_in("T", user))
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_roles");
    for &n in &[1usize, 3, 32] {
        let ids: Vec<String> = (0..n).map(|i| ((i % 5) + 1).to_string()).collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| criterion::black_box(resolve_roles(ids)));
        });
    }
    group.finish();
}

fn bench_guards(c: &mut Criterion) {
    let routes = Routes::default();
    let sessions = [
        ("admin", session_with_roles(&["1"])),
        ("refugio", session_with_roles(&["2"])),
        ("usuario", session_with_roles(&["3"])),
    ];
    let screens = [Screen::Profile, Screen::AdoptionRequest, Screen::FoundationPanel, Screen::AdminPanel];
    let mut group = c.benchmark_group("guard_evaluate");
    for (name, session) in &sessions {
        group.bench_with_input(BenchmarkId::new("all_screens", name), session, |b, s| {
            let guards: Vec<Guard> = screens.iter().map(|sc| Guard::for_screen(*sc)).collect();
            b.iter(|| {
                let mut rendered = 0usize;
                for g in &guards {
                    if g.evaluate(s, &routes).is_render() { rendered += 1; }
                }
                criterion::black_box(rendered);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_guards);
criterion_main!(benches);
