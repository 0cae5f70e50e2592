use std::{future::IntoFuture, process, sync::Arc};

use agora::{
    application::{
        analytics::AnalyticsService,
        auth::{IdentityVerifier, StaticTokenVerifier},
        error::AppError,
        events::EventService,
        locations::LocationService,
        mutation::MutationPipeline,
        repos::{
            AnalyticsRepo, EventsRepo, EventsWriteRepo, LocationsRepo, LocationsWriteRepo,
            StoreHealth,
        },
    },
    cache::{
        BoundedCacheStore, CacheAside, CacheConfig, CacheStore, InvalidationCoordinator,
        MemoryCacheStore, NullCacheStore,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        redis::RedisCacheStore,
        telemetry,
    },
    realtime::{ChangeNotifier, SessionRegistry},
};
use sqlx::PgPool;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_database(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "agora::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_database(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let cache_store = build_cache_store(&settings.cache)?;
    info!(
        target = "agora::serve",
        backend = cache_store.backend(),
        "cache store configured"
    );

    let sessions = SessionRegistry::new(settings.realtime.session_buffer);
    let (notifier, dispatcher_handle) = ChangeNotifier::spawn(Arc::clone(&sessions));

    let state = build_api_state(&settings, repositories, cache_store, sessions, notifier);
    let result = serve_http(&settings, state).await;

    dispatcher_handle.abort();
    let _ = dispatcher_handle.await;

    result
}

async fn connect_database(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.statement_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

fn build_cache_store(settings: &config::CacheSettings) -> Result<Arc<dyn CacheStore>, AppError> {
    match settings.backend {
        config::CacheBackend::Redis => {
            let redis = RedisCacheStore::new(&settings.redis_url, settings.key_prefix.clone())
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            Ok(Arc::new(BoundedCacheStore::new(
                Arc::new(redis),
                settings.operation_timeout,
            )))
        }
        config::CacheBackend::Memory => {
            Ok(Arc::new(MemoryCacheStore::new(settings.memory_capacity)))
        }
        config::CacheBackend::Disabled => Ok(Arc::new(NullCacheStore)),
    }
}

fn build_api_state(
    settings: &config::Settings,
    repositories: Arc<PostgresRepositories>,
    cache_store: Arc<dyn CacheStore>,
    sessions: Arc<SessionRegistry>,
    notifier: Arc<ChangeNotifier>,
) -> ApiState {
    let events_repo: Arc<dyn EventsRepo> = repositories.clone();
    let events_write_repo: Arc<dyn EventsWriteRepo> = repositories.clone();
    let locations_repo: Arc<dyn LocationsRepo> = repositories.clone();
    let locations_write_repo: Arc<dyn LocationsWriteRepo> = repositories.clone();
    let analytics_repo: Arc<dyn AnalyticsRepo> = repositories.clone();
    let health: Arc<dyn StoreHealth> = repositories;

    let cache = CacheAside::new(
        Arc::clone(&cache_store),
        CacheConfig::from(&settings.cache),
    );
    let invalidation = InvalidationCoordinator::new(Arc::clone(&cache_store));
    let pipeline = Arc::new(MutationPipeline::new(
        invalidation.clone(),
        notifier,
        settings.database.statement_timeout,
    ));

    let events = Arc::new(EventService::new(
        events_repo,
        events_write_repo,
        locations_repo.clone(),
        cache.clone(),
        pipeline.clone(),
    ));
    let locations = Arc::new(LocationService::new(
        locations_repo,
        locations_write_repo,
        cache.clone(),
        pipeline,
    ));
    let analytics = Arc::new(AnalyticsService::new(analytics_repo, cache));
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(StaticTokenVerifier::new(settings.auth.tokens.clone()));

    if settings.auth.tokens.is_empty() {
        warn!(
            target = "agora::serve",
            "no operator tokens configured; mutation routes will reject every request"
        );
    }

    ApiState {
        events,
        locations,
        analytics,
        invalidation,
        sessions,
        verifier,
        health,
        cache_store,
        keep_alive: settings.realtime.keep_alive,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "agora::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    let mut server = tokio::spawn(
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move { signal.notified().await })
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(target = "agora::serve", error = %err, "failed to listen for shutdown signal");
            }
        }
    }

    info!(target = "agora::serve", "shutdown requested, draining connections");
    shutdown.notify_one();

    // Live streams never finish on their own, so draining is bounded.
    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "agora::serve",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown deadline elapsed"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}
