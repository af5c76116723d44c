use std::time::Duration;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};

use todoforge::auth::AuthMiddleware;
use todoforge::config::Config;
use todoforge::db::StoreClient;
use todoforge::error;
use todoforge::rate_limit::RateLimiter;
use todoforge::routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let bind_addr = (config.server_host.clone(), config.server_port);

    let store = web::Data::new(StoreClient::new(&config.database_url));
    let rate_limiter = web::Data::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));
    let config = web::Data::new(config);

    log::info!("Starting TodoForge server at {}", config.server_url());
    log::info!("Using document store at {}", config.database_url);

    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(rate_limiter.clone())
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
