use axum::routing::{get, post};
use axum::Router;
use payment_orchestrator::bus::consumer::EventConsumer;
use payment_orchestrator::bus::InMemoryBus;
use payment_orchestrator::config::AppConfig;
use payment_orchestrator::correlation::store::InMemoryCorrelationStore;
use payment_orchestrator::correlation::sweeper::CorrelationSweeper;
use payment_orchestrator::gateways::http::HttpGatewayClient;
use payment_orchestrator::inbox::bootstrap::WebhookBootstrap;
use payment_orchestrator::inbox::service::InboxService;
use payment_orchestrator::inbox::signature::SignatureVerifier;
use payment_orchestrator::service::orchestrator::PaymentOrchestrator;
use payment_orchestrator::service::status_broadcaster::StatusBroadcaster;
use payment_orchestrator::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CHALLENGE_TTL_HOURS: i64 = 3;
const SWEEP_INTERVAL_SECS: u64 = 3 * 60 * 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();

    let gateway = Arc::new(HttpGatewayClient {
        base_url: cfg.api_url.clone(),
        api_key: cfg.api_key.clone(),
        s2s_token: cfg.s2s_token.clone(),
        brand_id: cfg.brand_id.clone(),
        timeout_ms: cfg.gateway_timeout_ms,
        client: reqwest::Client::new(),
    });

    let (bus, rx) = InMemoryBus::channel();
    let correlations = Arc::new(InMemoryCorrelationStore::new());
    let broadcaster = Arc::new(StatusBroadcaster::new());
    let verifier = Arc::new(SignatureVerifier::new());

    let orchestrator = Arc::new(PaymentOrchestrator {
        gateway: gateway.clone(),
        bus: Arc::new(bus.clone()),
        correlations: correlations.clone(),
        self_url: cfg.self_url.clone(),
        ui_url: cfg.ui_url.clone(),
        challenge_ttl: chrono::Duration::hours(CHALLENGE_TTL_HOURS),
    });

    let consumer = EventConsumer {
        orchestrator: orchestrator.clone(),
        broadcaster: broadcaster.clone(),
        bus: bus.clone(),
    };
    tokio::spawn(consumer.run(rx));

    let sweeper = CorrelationSweeper {
        store: correlations.clone(),
        ttl: chrono::Duration::hours(CHALLENGE_TTL_HOURS),
        interval: std::time::Duration::from_secs(SWEEP_INTERVAL_SECS),
    };
    tokio::spawn(sweeper.run());

    let bootstrap = WebhookBootstrap {
        gateway: gateway.clone(),
        verifier: verifier.clone(),
        self_url: cfg.self_url.clone(),
    };
    bootstrap.run().await;

    let state = AppState {
        orchestrator,
        broadcaster,
        inbox: InboxService {
            bus: Arc::new(bus.clone()),
        },
        verifier,
    };

    let app = Router::new()
        .route(
            "/payments",
            post(payment_orchestrator::http::handlers::payments::create_payment),
        )
        .route(
            "/payments/:purchase_id/events",
            get(payment_orchestrator::http::handlers::payments::payment_events),
        )
        .route(
            "/payments/:purchase_id/callback",
            post(payment_orchestrator::http::handlers::payments::three_d_secure_callback),
        )
        .route(
            "/inbox/purchase-paid",
            post(payment_orchestrator::http::handlers::inbox::purchase_paid),
        )
        .route(
            "/inbox/purchase-failed",
            post(payment_orchestrator::http::handlers::inbox::purchase_failed),
        )
        .route(
            "/ops/liveness",
            get(payment_orchestrator::http::handlers::payments::liveness),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!("listening on {}", cfg.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
