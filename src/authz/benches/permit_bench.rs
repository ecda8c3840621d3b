//! Authorization engine benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use permit_authz::{CacheConfig, InMemoryStore, PermitConfig, PermitEngine};
use permit_core::{Resource, User};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Chain of `depth` roles, each inheriting the previous one and adding a
/// permission; `alice` holds the last role
async fn hierarchy_engine(depth: usize, cache: bool) -> (PermitEngine, User) {
    let config = PermitConfig {
        cache: CacheConfig {
            enabled: cache,
            ..CacheConfig::default()
        },
        ..PermitConfig::default()
    };
    let engine = PermitEngine::with_config(config, Arc::new(InMemoryStore::new())).unwrap();

    for level in 0..depth {
        let mut role = engine
            .role()
            .slug(format!("level-{}", level))
            .permission(format!("resource.action{}", level));
        if level > 0 {
            role = role.inherits(format!("level-{}", level - 1));
        }
        role.create().await.unwrap();
    }

    let alice = User::new("alice");
    engine
        .assign_role(&alice.id, &format!("level-{}", depth - 1))
        .await
        .unwrap();
    (engine, alice)
}

fn bench_role_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("role_check");

    for depth in [1usize, 5, 20].iter() {
        group.bench_with_input(BenchmarkId::new("uncached", depth), depth, |b, &depth| {
            let (engine, alice) = rt.block_on(hierarchy_engine(depth, false));
            b.to_async(&rt).iter(|| async {
                let decision = engine
                    .check(black_box(&alice), black_box("resource.action0"), None)
                    .await
                    .unwrap();
                black_box(decision);
            });
        });

        group.bench_with_input(BenchmarkId::new("cached", depth), depth, |b, &depth| {
            let (engine, alice) = rt.block_on(hierarchy_engine(depth, true));

            // Prime the cache
            rt.block_on(async {
                engine.can(&alice, "resource.action0", None).await.unwrap();
            });

            b.to_async(&rt).iter(|| async {
                let decision = engine
                    .check(black_box(&alice), black_box("resource.action0"), None)
                    .await
                    .unwrap();
                black_box(decision);
            });
        });
    }

    group.finish();
}

fn bench_gate_check(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (engine, alice) = rt.block_on(hierarchy_engine(1, true));

    engine
        .gates()
        .before(|user: &User, _: &str, _: Option<&Resource>| {
            (user.attribute("banned") == Some("true")).then_some(false)
        })
        .define("posts.update", |user: &User, post: Option<&Resource>| {
            post.map_or(false, |p| p.is_owned_by(user))
        });

    let post = Resource::new("post:1").with_attribute("owner_id", "alice");

    c.bench_function("gate_check", |b| {
        b.to_async(&rt).iter(|| async {
            let allowed = engine
                .can(black_box(&alice), "posts.update", Some(black_box(&post)))
                .await
                .unwrap();
            black_box(allowed);
        });
    });
}

fn bench_concurrent_checks(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (engine, _) = rt.block_on(hierarchy_engine(5, true));
    let engine = Arc::new(engine);

    let users: Vec<User> = (0..100).map(|i| User::new(format!("user-{}", i))).collect();
    rt.block_on(async {
        for user in &users {
            engine.assign_role(&user.id, "level-4").await.unwrap();
        }
    });

    let mut group = c.benchmark_group("concurrent_checks");
    group.throughput(criterion::Throughput::Elements(users.len() as u64));
    group.bench_function("100_users", |b| {
        b.to_async(&rt).iter(|| async {
            let checks = users.iter().map(|user| {
                let engine = engine.clone();
                let user = user.clone();
                tokio::spawn(async move { engine.can(&user, "resource.action2", None).await })
            });
            for handle in futures::future::join_all(checks).await {
                black_box(handle.unwrap().unwrap());
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_role_check,
    bench_gate_check,
    bench_concurrent_checks
);
criterion_main!(benches);
