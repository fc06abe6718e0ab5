use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use nadia_core::NadiaConfig;
use nadia_identity::EntityResolver;
use nadia_llm::LlmClient;
use nadia_orchestrator::{Pipeline, Supervisor};
use nadia_review::DashboardState;
use nadia_safety::SafetyEvaluator;
use nadia_store_db::InteractionRepository;
use nadia_store_kv::{HistoryStore, KvStore, WalQueue};
use nadia_tracker::ActivityTracker;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

mod app;
mod http;
mod transport;

use transport::LoggingTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nadia_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("NADIA_CONFIG").ok();
    let config = NadiaConfig::load(config_path.as_deref())?;

    let pool = nadia_store_db::connect(&config.database.url, config.database.max_connections).await?;
    let repo = Arc::new(InteractionRepository::new(pool));

    let kv = KvStore::new(&config.kv.url)?;
    let history = HistoryStore::new(kv.clone());
    let wal = WalQueue::new(kv.clone());
    let recovery_wal = WalQueue::new(kv.clone());

    let llm = Arc::new(LlmClient::new(&config.llm)?);
    if config.llm.warm_up_on_boot {
        if let Err(e) = llm.warm_up().await {
            warn!(error = %e, "LLM cache warm-up failed, continuing without it");
        }
    }
    let safety = Arc::new(SafetyEvaluator::new());
    let review = Arc::new(nadia_review::ReviewQueue::new(kv.clone(), Arc::clone(&repo), &config.review));

    let transport = Arc::new(LoggingTransport);
    let resolver = Arc::new(EntityResolver::new(Arc::clone(&transport), config.identity.clone()));

    match repo.recent_user_ids(config.identity.warm_up_limit as i64).await {
        Ok(raw_ids) => {
            let ids: Vec<_> = raw_ids.into_iter().map(nadia_core::UserId::from).collect();
            let resolved = resolver.warm_up(&ids).await;
            info!(resolved, candidates = ids.len(), "entity resolver warm-up complete");
        }
        Err(e) => warn!(error = %e, "failed to load recent users for entity warm-up, starting cold"),
    }

    let (dispatch_tx, dispatch_rx) = mpsc::channel(256);
    let tracker = ActivityTracker::new(config.tracker.clone(), kv.clone(), dispatch_tx);

    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&repo),
        history,
        wal,
        Arc::clone(&llm),
        Arc::clone(&safety),
        Arc::clone(&review),
    ));

    let recovery_max_attempts = config.recovery.max_attempts;

    match nadia_orchestrator::recover_on_startup(&pipeline, &repo, &recovery_wal, recovery_max_attempts).await {
        Ok(recovered) => info!(recovered, "startup WAL recovery complete"),
        Err(e) => warn!(error = %e, "startup WAL recovery failed"),
    }
    match tracker.recover_pending_buffers().await {
        Ok(recovered) => info!(recovered, "startup buffer recovery complete"),
        Err(e) => warn!(error = %e, "startup buffer recovery failed"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        let repo = Arc::clone(&repo);
        let mut shutdown_rx = shutdown_rx.clone();
        let interval_secs = config.recovery.interval_secs;
        async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.tick().await; // first tick fires immediately; startup pass already ran it once
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match nadia_orchestrator::recover_on_startup(&pipeline, &repo, &recovery_wal, recovery_max_attempts).await {
                            Ok(recovered) => info!(recovered, "periodic WAL recovery complete"),
                            Err(e) => warn!(error = %e, "periodic WAL recovery failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        }
    });

    let supervisor = Supervisor::new(Arc::clone(&pipeline), dispatch_rx);
    tokio::spawn(supervisor.run(shutdown_rx.clone()));

    let sender = Arc::new(nadia_sender::PacedSender::new(
        Arc::clone(&transport),
        Arc::clone(&resolver),
        kv.clone(),
        Arc::clone(&repo),
        config.sender.typing_words_per_minute,
    ));
    tokio::spawn({
        let sender = Arc::clone(&sender);
        let shutdown_rx = shutdown_rx.clone();
        async move { sender.run(shutdown_rx).await }
    });

    let dashboard = nadia_review::build_router(Arc::new(DashboardState {
        queue: Arc::clone(&review),
        api_key: config.dashboard.api_key.clone(),
    }));

    let bind = config.dashboard.bind.clone();
    let port = config.dashboard.port;

    let cognitive_router = nadia_core::CognitiveRouter::new(&config.router.fast_patterns);

    let state = Arc::new(app::AppState {
        config,
        router: cognitive_router,
        tracker,
        resolver,
        transport,
        kv,
    });

    let router = app::build_router(state, dashboard);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("nadia gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    let _ = shutdown_tx.send(true);

    Ok(())
}
