use actix_web::{HttpResponse, Responder, get, web};
use tera::{Context, Tera};

use super::DashboardError;
use crate::status::StatusBoard;

/// Status list page
const STATUS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="UTF-8">
    <title>HTTP monitor</title>
  </head>
  <body>
    <table>
      <tr>
        <th>URL</th>
        <th>Status</th>
        <th>Response time</th>
      </tr>
      {%- for row in rows %}
      <tr>
        <td>{{ row.url }}</td>
        <td>{{ row.status }}</td>
        <td>{{ row.response_time }}</td>
      </tr>
      {%- endfor %}
      {%- if rows | length == 0 %}
      <tr>
        <td><strong>no data</strong></td>
        <td></td>
        <td></td>
      </tr>
      {%- endif %}
    </table>
  </body>
</html>
"#;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(status_page).service(status_json).service(health_route);
}

/// Table of the latest result per URL
#[get("/")]
pub async fn status_page(board: web::Data<StatusBoard>) -> Result<HttpResponse, DashboardError> {
    let mut context = Context::new();
    context.insert("rows", &board.snapshot().await);

    let page = Tera::one_off(STATUS_TEMPLATE, &context, true)?;
    Ok(HttpResponse::Ok().content_type("text/html; charset=utf-8").body(page))
}

#[get("/api/status")]
pub async fn status_json(board: web::Data<StatusBoard>) -> impl Responder {
    HttpResponse::Ok().json(board.snapshot().await)
}

/// Health check route
/// This route returns no content, the response status is enough.
#[get("/health")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}
