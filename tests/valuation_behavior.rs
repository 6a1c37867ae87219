//! End-to-end valuation behavior: store-first reads, primary/secondary
//! failover, per-invocation provider logs, and concurrent first requests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use motorval_core::{
    CircuitBreaker, CircuitBreakerConfig, FailoverValuer, FetchedValuation, ProviderError,
    ProviderId, ServiceError, StoreConfig, Valuation, ValuationProvider, ValuationRow,
    ValuationService, ValuationStore, Vrm,
};

struct ScriptedProvider {
    id: ProviderId,
    responses: Mutex<VecDeque<Result<(f64, f64), ProviderError>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(id: ProviderId, responses: Vec<Result<(f64, f64), ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ValuationProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn request_url(&self, vrm: &Vrm, mileage: u32) -> String {
        format!(
            "https://{}.example/valuations/{}?mileage={mileage}",
            self.id,
            vrm.as_str()
        )
    }

    fn fetch<'a>(
        &'a self,
        vrm: &'a Vrm,
        _mileage: u32,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedValuation, ProviderError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .responses
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::transport("script exhausted")));
        Box::pin(async move {
            let (lowest, highest) = scripted?;
            let valuation = Valuation::new(vrm.clone(), lowest, highest, self.id)
                .map_err(|error| ProviderError::malformed(error.to_string()))?;
            Ok(FetchedValuation {
                valuation,
                status_code: 200,
            })
        })
    }
}

fn open_store(dir: &tempfile::TempDir) -> ValuationStore {
    let config = StoreConfig {
        motorval_home: dir.path().to_path_buf(),
        db_path: dir.path().join("valuations.duckdb"),
        max_pool_size: 4,
    };
    ValuationStore::open(config).expect("store opens")
}

fn breaker() -> Arc<CircuitBreaker> {
    Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
        call_timeout: Duration::from_millis(500),
        error_threshold_pct: 50,
        reset_timeout: Duration::from_millis(50),
        volume_threshold: 5,
        window_size: 10,
    }))
}

fn service(
    store: &ValuationStore,
    primary: Arc<ScriptedProvider>,
    secondary: Arc<ScriptedProvider>,
) -> ValuationService {
    let valuer = FailoverValuer::new(primary, secondary, breaker());
    ValuationService::new(store.clone(), valuer)
}

fn vrm() -> Vrm {
    Vrm::parse("AB12CDE").expect("valid vrm")
}

#[tokio::test]
async fn first_request_values_via_the_primary_and_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let primary = ScriptedProvider::new(ProviderId::SuperCar, vec![Ok((10.0, 1_000_000.0))]);
    let secondary = ScriptedProvider::new(ProviderId::PremiumCar, vec![]);
    let service = service(&store, primary.clone(), secondary.clone());

    let valuation = service
        .fetch_or_create(&vrm(), 10_000)
        .await
        .expect("valuation succeeds");

    assert_eq!(valuation.lowest_value, 10.0);
    assert_eq!(valuation.highest_value, 1_000_000.0);
    assert_eq!(valuation.provider, ProviderId::SuperCar);
    assert_eq!(secondary.calls(), 0);

    let row = store
        .find_valuation("AB12CDE")
        .expect("query succeeds")
        .expect("row persisted");
    assert_eq!(row.provider.as_deref(), Some("Super Car Valuations"));

    let logs = store.provider_logs_for("AB12CDE").expect("logs query");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].provider, "Super Car Valuations");
    assert_eq!(logs[0].status_code, Some(200));
    assert!(logs[0].error_message.is_none());
    assert!(logs[0].url.contains("/valuations/AB12CDE?mileage=10000"));
}

#[tokio::test]
async fn repeat_request_is_served_from_the_store_without_upstream_calls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let primary = ScriptedProvider::new(ProviderId::SuperCar, vec![Ok((100.0, 200.0))]);
    let secondary = ScriptedProvider::new(ProviderId::PremiumCar, vec![]);
    let service = service(&store, primary.clone(), secondary.clone());

    let first = service
        .fetch_or_create(&vrm(), 10_000)
        .await
        .expect("first succeeds");
    let second = service
        .fetch_or_create(&vrm(), 99_999)
        .await
        .expect("second succeeds");

    assert_eq!(first.lowest_value, second.lowest_value);
    assert_eq!(first.highest_value, second.highest_value);
    assert_eq!(first.provider, second.provider);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);

    // No new provider log either; the second request never left the store.
    let logs = store.provider_logs_for("AB12CDE").expect("logs query");
    assert_eq!(logs.len(), 1);
}

#[tokio::test]
async fn primary_failure_fails_over_and_logs_both_invocations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let primary = ScriptedProvider::new(
        ProviderId::SuperCar,
        vec![Err(ProviderError::status(ProviderId::SuperCar, 503))],
    );
    let secondary = ScriptedProvider::new(ProviderId::PremiumCar, vec![Ok((9_500.0, 10_275.0))]);
    let service = service(&store, primary, secondary);

    let valuation = service
        .fetch_or_create(&vrm(), 10_000)
        .await
        .expect("fallback succeeds");

    assert_eq!(valuation.provider, ProviderId::PremiumCar);
    let row = store
        .find_valuation("AB12CDE")
        .expect("query succeeds")
        .expect("row persisted");
    assert_eq!(row.provider.as_deref(), Some("Premium Car Valuations"));

    let logs = store.provider_logs_for("AB12CDE").expect("logs query");
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].provider, "Super Car Valuations");
    assert_eq!(logs[0].status_code, Some(503));
    assert!(logs[0].error_message.is_some());
    assert_eq!(logs[1].provider, "Premium Car Valuations");
    assert!(logs[1].error_message.is_none());
}

#[tokio::test]
async fn both_providers_failing_persists_nothing_but_logs_everything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    let primary = ScriptedProvider::new(
        ProviderId::SuperCar,
        vec![Err(ProviderError::transport("connection refused"))],
    );
    let secondary = ScriptedProvider::new(
        ProviderId::PremiumCar,
        vec![Err(ProviderError::status(ProviderId::PremiumCar, 500))],
    );
    let service = service(&store, primary, secondary);

    let error = service
        .fetch_or_create(&vrm(), 10_000)
        .await
        .expect_err("must fail");
    match error {
        ServiceError::Unavailable { vrm, reason } => {
            assert_eq!(vrm.as_str(), "AB12CDE");
            assert!(reason.contains("connection refused"));
            assert!(reason.contains("500"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(store
        .find_valuation("AB12CDE")
        .expect("query succeeds")
        .is_none());

    let logs = store.provider_logs_for("AB12CDE").expect("logs query");
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.error_message.is_some()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_first_requests_resolve_to_a_single_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    // Distinct bounds per call so a lost race is observable: both callers
    // must still agree with whatever row won the insert.
    let primary = ScriptedProvider::new(
        ProviderId::SuperCar,
        vec![Ok((100.0, 200.0)), Ok((300.0, 400.0))],
    );
    let secondary = ScriptedProvider::new(ProviderId::PremiumCar, vec![]);
    let service = Arc::new(service(&store, primary, secondary));

    let first = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.fetch_or_create(&vrm(), 10_000).await })
    };
    let second = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.fetch_or_create(&vrm(), 10_000).await })
    };

    let first = first.await.expect("task joins").expect("first succeeds");
    let second = second.await.expect("task joins").expect("second succeeds");

    let row = store
        .find_valuation("AB12CDE")
        .expect("query succeeds")
        .expect("exactly one row exists");
    for valuation in [&first, &second] {
        assert_eq!(valuation.lowest_value, row.lowest_value);
        assert_eq!(valuation.highest_value, row.highest_value);
    }
}

#[tokio::test]
async fn legacy_rows_without_provider_read_as_the_primary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir);
    store
        .insert_valuation(&ValuationRow {
            vrm: "AB12CDE".to_owned(),
            lowest_value: 1_000.0,
            highest_value: 2_000.0,
            provider: None,
            created_at: "2020-01-01T00:00:00Z".to_owned(),
        })
        .expect("legacy row inserts");

    let primary = ScriptedProvider::new(ProviderId::SuperCar, vec![]);
    let secondary = ScriptedProvider::new(ProviderId::PremiumCar, vec![]);
    let service = service(&store, primary.clone(), secondary);

    let valuation = service
        .lookup(&vrm())
        .expect("lookup succeeds")
        .expect("row exists");
    assert_eq!(valuation.provider, ProviderId::SuperCar);
    assert_eq!(primary.calls(), 0);

    // The defaulting happens at read time only; the row itself stays NULL.
    let row = store
        .find_valuation("AB12CDE")
        .expect("query succeeds")
        .expect("row exists");
    assert!(row.provider.is_none());
}
