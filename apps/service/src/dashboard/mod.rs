//! Read-only status dashboard served over HTTP.

pub mod routes;

use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, web};
use tracing::info;

use crate::status::StatusBoard;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("failed to render status page: {0}")]
    Render(#[from] tera::Error),
}

impl ResponseError for DashboardError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::InternalServerError().body(self.to_string())
    }
}

/// Build the dashboard server on an already bound listener.
///
/// The returned server does nothing until it is spawned or awaited. Signal
/// handling is left to the caller.
pub fn start(listener: TcpListener, board: StatusBoard) -> std::io::Result<Server> {
    let addr = listener.local_addr()?;
    let board = web::Data::new(board);

    let server = HttpServer::new(move || App::new().app_data(board.clone()).configure(routes::routes))
        .listen(listener)?
        .workers(1)
        .disable_signals()
        .run();

    info!("Listening on http://{}", addr);
    Ok(server)
}
