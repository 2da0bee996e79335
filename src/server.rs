use std::path::Path;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{dev::Server, http::header, middleware, web, App, HttpServer};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    controller::{actions, loans, misc},
    error::Error,
};

pub async fn server_task(app_state: &AppState<State>) -> Result<(), Error> {
    let app = app_state.clone();
    tokio::spawn(async move {
        let server = init_server(app)?;
        server.await?;
        Ok(())
    })
    .await?
}

fn init_server(app_state: AppState<State>) -> Result<Server, Error> {
    let host = app_state.config.server_host.to_owned();
    let port = app_state.config.port;

    info!("http server listening on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let app = app_state.clone();
        let allowed_cors = String::from("*");
        let cors_access_all =
            app.config.allowed_origins.contains(&allowed_cors);
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                if cors_access_all {
                    return true;
                }
                let allowed = &app.config.allowed_origins;
                if let Ok(origin) = origin.to_str() {
                    return allowed.contains(&origin.to_owned());
                }
                false
            })
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
            .allowed_header(header::CONTENT_TYPE);

        // literal routes go ahead of /loans/{address}
        let mut service = App::new()
            .wrap(cors)
            .wrap(middleware::Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().limit(4096))
            .service(
                web::scope("/api")
                    .service(loans::loan_requests)
                    .service(loans::pending_requests)
                    .service(loans::approved_loans)
                    .service(loans::statistics)
                    .service(loans::preview)
                    .service(actions::request_loan)
                    .service(actions::repay_loan)
                    .service(actions::approve_loan)
                    .service(loans::loan_details)
                    .service(loans::activity)
                    .service(misc::owner)
                    .service(misc::status)
                    .service(misc::version),
            );

        if let Some(static_dir) = &app_state.config.static_dir {
            if Path::new(static_dir).is_dir() {
                service = service.service(
                    Files::new("/", static_dir).index_file("index.html"),
                );
            }
        }

        service
    })
    .bind((host, port))?
    .disable_signals()
    .run();
    Ok(server)
}
