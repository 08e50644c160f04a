use actix_web::{web, App, HttpServer};
use pairchat_service::{
    config, db, error, logging,
    middleware::{JwtVerifier, RequestId},
    routes,
    services::PresenceTracker,
    state::AppState,
    websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    let registry = ConnectionRegistry::new();
    let presence = PresenceTracker::new();
    let verifier = Arc::new(JwtVerifier::new(&cfg.jwt_secret));

    let state = AppState {
        db,
        registry,
        presence,
        config: cfg.clone(),
        verifier,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting pairchat-service");

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(RequestId::new())
            .app_data(web::Data::new(state.clone()))
            .service(routes::messages::send_message)
            .service(routes::messages::get_messages)
            .service(routes::wsroute::ws_handler)
            .route("/health", web::get().to(|| async { "OK" }))
    })
    .bind(&bind_addr)
    .map_err(|e| error::AppError::StartServer(format!("bind: {e}")))?
    .run()
    .await
    .map_err(|e| error::AppError::StartServer(format!("run: {e}")))
}
