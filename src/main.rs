use std::path::PathBuf;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use vote_ledger::api::{self, ApiDoc};
use vote_ledger::blockchain::Ledger;
use vote_ledger::config::{Config, CONFIG_PATH_ENV};
use vote_ledger::voting::{SlowVoteSource, VoteNameCache};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    info!("Loaded configuration: {:?}", config);

    let ledger = Ledger::new(config.difficulty).context("failed to create ledger")?;
    let ledger = web::Data::new(ledger);
    let vote_cache = web::Data::new(VoteNameCache::new(SlowVoteSource::new(
        Duration::from_millis(config.vote_lookup_delay_ms),
    )));

    info!("Starting HTTP server at http://{}:{}", config.host, config.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            .app_data(vote_cache.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
