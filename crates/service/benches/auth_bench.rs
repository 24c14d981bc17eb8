use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use service::auth::SessionManager;
use service::auth::domain::{LoginInput, RegisterInput};
use service::auth::password::{HashCost, SecretHasher};
use service::auth::repository::mock::MockCredentialStore;
use service::auth::token::TokenIssuer;

fn manager() -> SessionManager<MockCredentialStore> {
    let repo = Arc::new(MockCredentialStore::default());
    let hasher = SecretHasher::new(HashCost::default()).unwrap();
    let tokens = TokenIssuer::new("bench-access", "bench-refresh").unwrap();
    SessionManager::new(repo, hasher, tokens).unwrap()
}

fn bench_sessions(c: &mut Criterion) {
    let svc = manager();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let input = RegisterInput { full_name: "Bench".into(), email: "bench@example.com".into(), password: "Benchmark1".into(), role: None };
    rt.block_on(svc.register(uuid::Uuid::new_v4(), input)).unwrap();
    let creds = LoginInput { email: "bench@example.com".into(), password: "Benchmark1".into() };

    c.bench_function("auth_login_verify", |b| {
        b.iter(|| {
            let _ = rt.block_on(svc.login(creds.clone())).unwrap();
        });
    });

    let mut refresh_token = rt.block_on(svc.login(creds.clone())).unwrap().tokens.refresh_token;
    c.bench_function("auth_refresh_rotate", |b| {
        b.iter(|| {
            refresh_token = rt.block_on(svc.refresh(&refresh_token)).unwrap().refresh_token;
        });
    });

    let access = rt.block_on(svc.login(creds.clone())).unwrap().tokens.access_token;
    c.bench_function("auth_verify_access", |b| {
        b.iter(|| svc.authenticate(&access).unwrap());
    });
}

criterion_group!(benches, bench_sessions);
criterion_main!(benches);
