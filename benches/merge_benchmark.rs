use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flexfit_api::models::{Identity, Profile, SubscriptionStatus};
use flexfit_api::session::merge::{diff_update, merge_profile};

fn sample_identity() -> Identity {
    Identity {
        uid: "bench-uid".to_string(),
        email: Some("bench@example.com".to_string()),
        display_name: Some("Bench User".to_string()),
        photo_url: Some("https://example.com/avatar.jpg".to_string()),
        id_token: "bench-token".to_string(),
    }
}

fn sample_stored() -> Profile {
    Profile {
        uid: "bench-uid".to_string(),
        email: Some("bench@example.com".to_string()),
        display_name: "Stored User".to_string(),
        photo_url: Some("https://example.com/old.jpg".to_string()),
        created_at: "2024-01-01T00:00:00Z".to_string(),
        last_login: "2024-06-01T00:00:00Z".to_string(),
        subscription_plan: "premium".to_string(),
        subscription_status: SubscriptionStatus::Active,
        subscription_buy_date: Some("2024-05-15T00:00:00Z".to_string()),
        subscription_expiry_date: Some("2099-06-15T00:00:00Z".to_string()),
    }
}

fn benchmark_merge(c: &mut Criterion) {
    let identity = sample_identity();
    let stored = sample_stored();
    let now = Utc::now();

    let mut group = c.benchmark_group("profile_merge");

    group.bench_function("merge_first_login", |b| {
        b.iter(|| merge_profile(black_box(&identity), black_box(None), now))
    });

    group.bench_function("merge_existing_profile", |b| {
        b.iter(|| merge_profile(black_box(&identity), black_box(Some(&stored)), now))
    });

    group.bench_function("diff_update", |b| {
        let merged = merge_profile(&identity, Some(&stored), now);
        b.iter(|| diff_update(black_box(&merged), black_box(&stored)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_merge);
criterion_main!(benches);
