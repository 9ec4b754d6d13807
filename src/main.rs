use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use volunteer_match::config::{LoggingSettings, Settings};
use volunteer_match::core::{InvitationManager, MatchRanker};
use volunteer_match::models::{ErrorResponse, WeightConfig};
use volunteer_match::routes::{self, AppState};
use volunteer_match::services::{
    AppwriteNotifier, CacheManager, LogNotifier, MatchStore, MemoryStore, Notifier, PostgresStore,
};

/// JSON error response for malformed payloads and queries
#[derive(Debug)]
struct PayloadError(ErrorResponse);

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl error::ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(&self.0)
    }
}

fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    PayloadError(ErrorResponse {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    })
    .into()
}

fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    PayloadError(ErrorResponse {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    })
    .into()
}

/// LOG_LEVEL and LOG_FORMAT override the `[logging]` section
fn init_logging(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    // RUST_LOG wins over LOG_LEVEL when both are set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

async fn connect_store(settings: &Settings) -> std::io::Result<Arc<dyn MatchStore>> {
    let Some(database) = &settings.database else {
        warn!("No database configured, using in-memory store; data is lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PostgresStore::from_settings(
        &database.url,
        database.max_connections,
        database.min_connections,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("PostgreSQL store initialized");
    Ok(Arc::new(store))
}

async fn connect_cache(settings: &Settings) -> Option<Arc<CacheManager>> {
    let redis_url = settings.cache.redis_url.as_deref()?;
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
        Ok(cache) => {
            let stats = cache.stats();
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, stats.ttl_secs);
            Some(Arc::new(cache))
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), running without cache", e);
            None
        }
    }
}

fn build_notifier(settings: &Settings) -> Arc<dyn Notifier> {
    let Some(appwrite) = &settings.appwrite else {
        info!("No Appwrite settings, invitation notifications are only logged");
        return Arc::new(LogNotifier);
    };

    match AppwriteNotifier::new(
        appwrite.endpoint.clone(),
        appwrite.api_key.clone(),
        appwrite.project_id.clone(),
        appwrite.database_id.clone(),
        appwrite.notifications_collection.clone(),
    ) {
        Ok(notifier) => {
            info!("Appwrite notifier initialized");
            Arc::new(notifier)
        }
        Err(e) => {
            warn!("Failed to build Appwrite notifier ({}), falling back to logging", e);
            Arc::new(LogNotifier)
        }
    }
}

/// Persist the configured weights when no administrator has saved any yet
async fn seed_weights(store: &dyn MatchStore, settings: &Settings) -> std::io::Result<()> {
    let existing = store
        .get_weight_config()
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    if existing.is_some() {
        return Ok(());
    }

    let weights = WeightConfig::from(&settings.scoring.weights);
    let mut config = volunteer_match::WeightConfiguration::default();
    config
        .set_weights(weights)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    config
        .save(store)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    info!("Seeded weights: {:?}", weights);
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Logging is configured from the settings, so a load failure surfaces
    // through the returned error
    let settings = Settings::load().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Configuration error: {}", e))
    })?;

    init_logging(&settings.logging);

    info!("Starting volunteer matching service...");
    info!("Configuration loaded successfully");

    let store = connect_store(&settings).await?;
    seed_weights(store.as_ref(), &settings).await?;

    let cache = connect_cache(&settings).await;
    let notifier = build_notifier(&settings);

    let ranker = MatchRanker::new(settings.scoring.comparators);
    info!("Ranker initialized with comparators: {:?}", settings.scoring.comparators);

    let invitations = InvitationManager::new(store.clone(), notifier)
        .with_link_base(settings.invitations.link_base.clone())
        .with_notify_timeout(std::time::Duration::from_millis(settings.invitations.notify_timeout_ms));

    let app_state = AppState {
        store,
        cache,
        ranker,
        invitations,
        matching: settings.matching.clone(),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
