//! Model rotation tests for the quota-aware provider.

mod test_utils;

use chrono::TimeDelta;
use std::time::Duration;
use test_utils::{MockBackend, MockBehavior, MockResponse, VALID_JSON, manual_clock, retry, unit};
use testscribe_core::ManualClock;
use testscribe_error::{LimitScope, ProviderErrorKind};
use testscribe_interface::AnnotationProvider;
use testscribe_models::QuotaAwareProvider;
use testscribe_rate_limit::{ModelLimits, ModelPool, ModelPreference, RateLimits};

fn quota_provider(
    backend: MockBackend,
    models: &str,
    limits: RateLimits,
) -> (QuotaAwareProvider<MockBackend>, ManualClock) {
    let (clock, shared) = manual_clock();
    let provider = QuotaAwareProvider::new(
        backend,
        models,
        ModelLimits::uniform(limits),
        retry(&shared),
        shared,
    );
    (provider, clock)
}

#[tokio::test]
async fn test_rotates_when_daily_cap_is_spent() {
    let backend = MockBackend::new_success(VALID_JSON);
    let (provider, _) = quota_provider(
        backend.clone(),
        "model-a,model-b",
        RateLimits::new(None, None, Some(1)),
    );
    let test = unit("tests/test_a.py::test_one");

    provider.annotate(&test, "pass", &[]).await.unwrap();
    provider.annotate(&test, "pass", &[]).await.unwrap();
    let err = provider.annotate(&test, "pass", &[]).await.unwrap_err();

    assert_eq!(
        backend.called_models(),
        vec!["model-a".to_string(), "model-b".to_string()]
    );
    assert!(matches!(
        err.provider_kind(),
        Some(ProviderErrorKind::DailyQuotaExhausted(_))
    ));
    assert!(provider.pool().await.all_exhausted());
}

#[tokio::test]
async fn test_day_scoped_429_marks_model_exhausted() {
    let backend = MockBackend::new_success(VALID_JSON).with_model(
        "model-a",
        MockBehavior::Error(ProviderErrorKind::RateLimited {
            message: "GenerateRequestsPerDay quota exceeded".to_string(),
            retry_after: None,
            scope: LimitScope::Day,
        }),
    );
    let (provider, clock) = quota_provider(
        backend.clone(),
        "model-a,model-b",
        RateLimits::unlimited(),
    );

    provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap();

    assert_eq!(
        backend.called_models(),
        vec!["model-a".to_string(), "model-b".to_string()]
    );
    assert!(clock.sleeps().is_empty());
    let pool = provider.pool().await;
    assert!(pool.model("model-a").unwrap().is_exhausted());
    assert!(!pool.model("model-b").unwrap().is_exhausted());
}

#[tokio::test]
async fn test_minute_429_ceiling_cools_model_down() {
    let backend = MockBackend::new_success(VALID_JSON).with_model(
        "model-a",
        MockBehavior::Error(ProviderErrorKind::RateLimited {
            message: "Too many requests".to_string(),
            retry_after: None,
            scope: LimitScope::Minute,
        }),
    );
    let (provider, clock) = quota_provider(
        backend.clone(),
        "model-a,model-b",
        RateLimits::unlimited(),
    );

    provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap();

    assert_eq!(
        backend.called_models(),
        vec!["model-a", "model-a", "model-a", "model-b"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
    let pool = provider.pool().await;
    assert!(pool.model("model-a").unwrap().cooldown_until().is_some());
    assert!(!pool.model("model-a").unwrap().is_exhausted());
}

#[tokio::test]
async fn test_single_model_pool_gives_up_after_two_cycles() {
    let backend = MockBackend::new_error(ProviderErrorKind::RateLimited {
        message: "Too many requests".to_string(),
        retry_after: Some(Duration::from_secs(1)),
        scope: LimitScope::Minute,
    });
    let (provider, _) = quota_provider(backend.clone(), "only", RateLimits::unlimited());

    let err = provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err.provider_kind(),
        Some(ProviderErrorKind::PoolExhausted { cycles: 2, .. })
    ));
    // Two selection cycles of three attempts each.
    assert_eq!(backend.call_count(), 6);
}

#[tokio::test]
async fn test_daily_429_on_last_cycle_reports_daily_exhaustion() {
    let minute = ProviderErrorKind::RateLimited {
        message: "Too many requests".to_string(),
        retry_after: Some(Duration::from_secs(1)),
        scope: LimitScope::Minute,
    };
    let day = ProviderErrorKind::RateLimited {
        message: "GenerateRequestsPerDay quota exceeded".to_string(),
        retry_after: None,
        scope: LimitScope::Day,
    };
    let backend = MockBackend::new_with_behavior(MockBehavior::Sequence(vec![
        MockResponse::Error(minute.clone()),
        MockResponse::Error(minute.clone()),
        MockResponse::Error(minute),
        MockResponse::Error(day),
    ]));
    let (provider, _) = quota_provider(backend.clone(), "only", RateLimits::unlimited());

    let err = provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err.provider_kind(),
        Some(ProviderErrorKind::DailyQuotaExhausted(_))
    ));
    assert_eq!(backend.call_count(), 4);
    assert!(provider.pool().await.all_exhausted());
}

#[tokio::test]
async fn test_exhausted_model_recovers_after_a_day() {
    let backend = MockBackend::new_success(VALID_JSON);
    let (provider, clock) =
        quota_provider(backend.clone(), "only", RateLimits::new(Some(10), None, Some(1)));
    let test = unit("tests/test_a.py::test_one");

    provider.annotate(&test, "pass", &[]).await.unwrap();
    assert!(provider.annotate(&test, "pass", &[]).await.is_err());

    clock.advance(Duration::from_secs(23 * 3600));
    assert!(provider.annotate(&test, "pass", &[]).await.is_err());

    clock.advance(Duration::from_secs(3600));
    provider.annotate(&test, "pass", &[]).await.unwrap();

    assert_eq!(backend.call_count(), 2);
    let pool = provider.pool().await;
    assert!(!pool.model("only").unwrap().is_exhausted());
}

#[tokio::test]
async fn test_all_discovers_models_after_preferred() {
    let backend =
        MockBackend::new_success(VALID_JSON).with_listing(&["model-x", "model-y", "model-z"]);
    let (provider, _) = quota_provider(backend.clone(), "model-y,all", RateLimits::unlimited());

    let candidates = provider.candidate_models().await.unwrap();
    assert_eq!(candidates, vec!["model-y", "model-x", "model-z"]);

    provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap();
    assert_eq!(backend.called_models(), vec!["model-y".to_string()]);
    assert_eq!(backend.listing_count(), 1);
}

#[tokio::test]
async fn test_listing_refreshes_on_interval() {
    let backend = MockBackend::new_success(VALID_JSON).with_listing(&["model-x"]);
    let (clock, shared) = manual_clock();
    let pool = ModelPool::new(
        ModelPreference::parse("all", "mock-default"),
        ModelLimits::uniform(RateLimits::unlimited()),
    )
    .with_refresh_interval(TimeDelta::hours(6));
    let provider = QuotaAwareProvider::new(
        backend.clone(),
        "all",
        ModelLimits::uniform(RateLimits::unlimited()),
        retry(&shared),
        shared,
    )
    .with_pool(pool);
    let test = unit("tests/test_a.py::test_one");

    provider.annotate(&test, "pass", &[]).await.unwrap();
    clock.advance(Duration::from_secs(3600));
    provider.annotate(&test, "pass", &[]).await.unwrap();
    assert_eq!(backend.listing_count(), 1);

    clock.advance(Duration::from_secs(5 * 3600));
    provider.annotate(&test, "pass", &[]).await.unwrap();
    assert_eq!(backend.listing_count(), 2);
}

#[tokio::test]
async fn test_failed_discovery_falls_back_to_default_model() {
    let backend = MockBackend::new_success(VALID_JSON).with_failing_listing();
    let (provider, _) = quota_provider(backend.clone(), "all", RateLimits::unlimited());

    provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap();

    assert_eq!(backend.called_models(), vec!["mock-default".to_string()]);
}

#[tokio::test]
async fn test_parse_failure_is_not_rotated() {
    let backend = MockBackend::new_success("I cannot help with that.");
    let (provider, _) = quota_provider(backend.clone(), "model-a,model-b", RateLimits::unlimited());

    let err = provider
        .annotate(&unit("tests/test_a.py::test_one"), "pass", &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err.provider_kind(),
        Some(ProviderErrorKind::UnparseableResponse(_))
    ));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_reports_primary_model_limits() {
    let (provider, _) = quota_provider(
        MockBackend::new_success(VALID_JSON),
        "model-a",
        RateLimits::new(Some(15), Some(1_000_000), Some(200)),
    );
    assert_eq!(
        provider.rate_limits(),
        Some(RateLimits::new(Some(15), Some(1_000_000), Some(200)))
    );
    assert_eq!(provider.model_name(), "model-a");
}
