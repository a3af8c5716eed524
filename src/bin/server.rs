//! Accounting engine HTTP server binary

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use reserve_engine::{api, metrics::Metrics, BankService, Config};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())
        .map_err(|err| anyhow::anyhow!("failed to load configuration: {err}"))?;
    config
        .validate()
        .map_err(|err| anyhow::anyhow!("invalid configuration: {err}"))?;

    let metrics = Metrics::new()?;
    let service = Arc::new(BankService::open(&config, metrics.clone())?);
    service.mint_root_token_if_absent()?;

    println!("Root tokens:");
    for (token_id, scopes) in service.root_tokens() {
        let scopes = scopes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("- {token_id} {scopes}");
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "starting reserve engine"
    );

    let app_service = service.clone();
    let app_metrics = metrics.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(app_service.clone()))
            .app_data(web::Data::new(app_metrics.clone()))
            .configure(api::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.clone(), config.server.port))?
    .run()
    .await?;

    tracing::info!("reserve engine stopped");
    Ok(())
}
