use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer};
use env_logger::Env;
use quickpoll::app_config;
use quickpoll::backend::Backend;
use quickpoll::middleware::ClientCtx;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_lib_mods();
    app_config::init();

    let config = app_config::get_config();
    let backend: Arc<dyn Backend> = quickpoll::backend::from_config(&config).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Backend failed to initialize: {:#}", e),
        )
    })?;

    let bind_address = config.site.bind_address.clone();
    log::info!("{} listening on {}", config.site.name, bind_address);

    HttpServer::new(move || {
        let backend_data: Data<Arc<dyn Backend>> = Data::new(backend.clone());

        // Order of middleware IS IMPORTANT and is in REVERSE EXECUTION ORDER.
        App::new()
            .app_data(backend_data)
            // Security headers - applied to all responses
            .wrap(
                DefaultHeaders::new()
                    .add((header::X_FRAME_OPTIONS, "DENY"))
                    .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin")),
            )
            .wrap(ClientCtx::default())
            .wrap(Logger::new("%a %r %s %T"))
            .configure(quickpoll::web::configure)
            .default_service(web::to(quickpoll::web::not_found))
    })
    .bind(bind_address)?
    .run()
    .await
}

/// Initialize third party crates we rely on but don't have control over.
pub fn init_lib_mods() {
    // A missing .env is fine; the environment and config.toml still apply.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}
