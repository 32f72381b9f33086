use actix_web::{web, HttpRequest, HttpResponse, Result};
use askama::Template;
use chrono::Utc;
use serde_json::json;

use crate::{
    models::{Course, Service},
    state::AppState,
    store::{content, courses, services},
};

fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("template render error: {err}");
            // A page that fails to render still gets the storefront shell,
            // not a blank 500.
            HttpResponse::InternalServerError()
                .content_type("text/html; charset=utf-8")
                .body(
                    r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>Lumina Studio</title>
    <link rel="stylesheet" href="/static/styles.css" />
  </head>
  <body>
    <main>
      <section class="panel">
        <h1>Something went wrong</h1>
        <p>We could not load this page. Please try again in a moment, or head
        <a href="/">back to the studio</a>.</p>
      </section>
    </main>
  </body>
</html>"#,
                )
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    hero_html: String,
    about_html: String,
    services_html: String,
    courses_html: String,
    services: Vec<Service>,
    courses: Vec<Course>,
}

#[derive(Template)]
#[template(path = "courses.html")]
struct CoursesTemplate {
    courses: Vec<Course>,
}

#[derive(Template)]
#[template(path = "book.html")]
struct BookTemplate {
    services: Vec<Service>,
}

#[derive(Template)]
#[template(path = "cart.html")]
struct CartTemplate {}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/courses").route(web::get().to(courses_page)))
        .service(web::resource("/book").route(web::get().to(book)))
        .service(web::resource("/cart").route(web::get().to(cart)))
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/api").route(web::get().to(api_info)));
}

async fn home(state: web::Data<AppState>) -> Result<HttpResponse> {
    let hero_html = content::block_html(&state.db, "home_hero").await;
    let about_html = content::block_html(&state.db, "home_about").await;
    let services_html = content::block_html(&state.db, "home_services").await;
    let courses_html = content::block_html(&state.db, "home_courses").await;

    let services = services::list(&state.db, None)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(Service::from)
        .collect();
    let courses = courses::list(&state.db, None, None)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(Course::from)
        .collect();

    Ok(render(HomeTemplate {
        hero_html,
        about_html,
        services_html,
        courses_html,
        services,
        courses,
    }))
}

async fn courses_page(state: web::Data<AppState>) -> Result<HttpResponse> {
    let courses = courses::list(&state.db, None, None)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(Course::from)
        .collect();

    Ok(render(CoursesTemplate { courses }))
}

async fn book(state: web::Data<AppState>) -> Result<HttpResponse> {
    let services = services::list(&state.db, None)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(Service::from)
        .collect();

    Ok(render(BookTemplate { services }))
}

async fn cart() -> Result<HttpResponse> {
    Ok(render(CartTemplate {}))
}

async fn login() -> Result<HttpResponse> {
    Ok(render(LoginTemplate {}))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn api_info() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Lumina Studio API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(json!({
        "message": "endpoint not found",
        "path": req.path(),
        "method": req.method().as_str(),
    }))
}
