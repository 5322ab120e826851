//! Fedipress server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use fedipress_api::ApiState;
use fedipress_common::Config;
use fedipress_core::services::{
    ApContext, FeedProjection, NoOpQueue, NotificationProjection, OutboxService, QueueService,
    SiteService,
};
use fedipress_core::EventBus;
use fedipress_db::domain::EventSink;
use fedipress_db::repositories::{
    AccountRepository, DeliveryBackoffRepository, FeedRepository, GhostMappingRepository,
    KvRepository, NotificationRepository, PostRepository, SiteRepository,
};
use fedipress_federation::{
    actor_handler, followers_handler, following_handler, inbox_collection_handler, inbox_handler,
    liked_handler, nodeinfo_2_1, outbox_handler, thread_handler, webfinger_handler,
    well_known_nodeinfo, CollectionState, DocumentLoader, InboxState, NodeInfoState,
    WebfingerState,
};
use fedipress_queue::{DeliveryWorker, PubSubQueue, PubSubTopics, PushMessageHandler};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
    // Stop the queue listener; in-flight handlers finish.
    cancel.cancel();
}

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedipress=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting fedipress server...");

    let config = Config::load()?;

    // Error reporting (optional).
    let _sentry_guard = config.sentry.dsn.clone().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    // Database.
    let db = fedipress_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    fedipress_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // In-process event bus; repositories publish committed events here.
    let bus = Arc::new(EventBus::new());
    let sink: Arc<dyn EventSink> = bus.clone();

    // Repositories.
    let account_repo = AccountRepository::with_events(Arc::clone(&db), Arc::clone(&sink));
    let post_repo = PostRepository::with_events(Arc::clone(&db), Arc::clone(&sink));
    let site_repo = SiteRepository::new(Arc::clone(&db));
    let kv_repo = KvRepository::new(Arc::clone(&db));
    let mapping_repo = GhostMappingRepository::new(Arc::clone(&db));
    let feed_repo = FeedRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let backoff_repo = DeliveryBackoffRepository::new(Arc::clone(&db));

    // Projections subscribe before any request is served.
    let feed_projection = FeedProjection::new(
        post_repo.clone(),
        account_repo.clone(),
        site_repo.clone(),
        feed_repo.clone(),
    );
    bus.subscribe("feeds", move |event| {
        let projection = feed_projection.clone();
        Box::pin(async move { projection.handle_event(event).await })
    })
    .await;

    let notification_projection = NotificationProjection::new(
        account_repo.clone(),
        site_repo.clone(),
        post_repo.clone(),
        notification_repo.clone(),
    );
    bus.subscribe("notifications", move |event| {
        let projection = notification_projection.clone();
        Box::pin(async move { projection.handle_event(event).await })
    })
    .await;

    let user_agent = format!("fedipress/{}", env!("CARGO_PKG_VERSION"));
    let http_timeout = Duration::from_secs(config.federation.http_timeout_secs);
    let loader = DocumentLoader::new(kv_repo.clone(), user_agent.clone(), http_timeout);

    // Delivery queue and worker.
    let cancel = CancellationToken::new();
    let queue: QueueService = if config.federation.enabled {
        info!("Connecting queue pub/sub topics...");
        let topics = PubSubTopics::connect(
            &config.redis.url,
            &config.redis.prefix,
            config.federation.retry_topic.clone(),
        )
        .await?;

        let worker = DeliveryWorker::new(account_repo.clone(), user_agent.clone(), http_timeout);
        let push_handler = Arc::new(PushMessageHandler::new(
            Arc::new(worker),
            backoff_repo.clone(),
            Some(Arc::new(topics.clone())),
        ));

        let listener_topics = topics.clone();
        let listener_cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = listener_topics.listen(push_handler, listener_cancel).await {
                tracing::error!(error = %e, "Queue listener failed");
            }
        });
        info!("Delivery queue listener started");

        Arc::new(PubSubQueue::new(topics, backoff_repo.clone()))
    } else {
        info!("Federation disabled; deliveries are dropped");
        Arc::new(NoOpQueue)
    };

    // Services.
    let site_service = SiteService::new(site_repo.clone(), account_repo.clone());
    let outbox_service = OutboxService::new(
        account_repo.clone(),
        post_repo.clone(),
        site_repo.clone(),
        mapping_repo,
        kv_repo.clone(),
        queue.clone(),
        Arc::new(loader.clone()),
    );

    // Handler states.
    let webfinger_state = WebfingerState {
        site_service: site_service.clone(),
        account_repo: account_repo.clone(),
    };
    let nodeinfo_state = NodeInfoState {
        site_repo: site_repo.clone(),
        software_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let collection_state = CollectionState {
        site_service: site_service.clone(),
        account_repo: account_repo.clone(),
        post_repo: post_repo.clone(),
        kv: kv_repo.clone(),
    };
    let inbox_state = InboxState {
        site_service: site_service.clone(),
        account_repo: account_repo.clone(),
        post_repo: post_repo.clone(),
        site_repo: site_repo.clone(),
        kv: kv_repo.clone(),
        queue: queue.clone(),
        loader,
    };
    let api_state = ApiState {
        site_service,
        outbox: outbox_service,
        webhook_tolerance_secs: config.webhook.tolerance_secs,
    };

    // One tenant surface per host, under the federated path prefix.
    let federation_routes = Router::new()
        .route(
            "/users/{handle}",
            get(actor_handler).with_state(collection_state.clone()),
        )
        .route(
            "/inbox/{handle}",
            post(inbox_handler).with_state(inbox_state),
        )
        .route(
            "/inbox/{handle}",
            get(inbox_collection_handler).with_state(collection_state.clone()),
        )
        .route(
            "/outbox/{handle}",
            get(outbox_handler).with_state(collection_state.clone()),
        )
        .route(
            "/followers/{handle}",
            get(followers_handler).with_state(collection_state.clone()),
        )
        .route(
            "/following/{handle}",
            get(following_handler).with_state(collection_state.clone()),
        )
        .route(
            "/liked/{handle}",
            get(liked_handler).with_state(collection_state.clone()),
        )
        .route(
            "/thread/{encoded_url}",
            get(thread_handler).with_state(collection_state),
        )
        .merge(fedipress_api::router().with_state(api_state));

    let app = Router::new()
        .route(
            "/.well-known/webfinger",
            get(webfinger_handler).with_state(webfinger_state),
        )
        .route(
            "/.well-known/nodeinfo",
            get(well_known_nodeinfo).with_state(nodeinfo_state.clone()),
        )
        .route(
            "/nodeinfo/2.1",
            get(nodeinfo_2_1).with_state(nodeinfo_state),
        )
        .nest(ApContext::PREFIX, federation_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
