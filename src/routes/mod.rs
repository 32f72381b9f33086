pub mod appointments;
pub mod auth;
pub mod courses;
pub mod edge;
pub mod orders;
pub mod services;
pub mod site;

use actix_web::web;

/// Registers every HTTP surface. Shared between the binary and the
/// integration tests so both drive the exact same app.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    auth::configure(cfg);
    courses::configure(cfg);
    services::configure(cfg);
    appointments::configure(cfg);
    orders::configure(cfg);
    edge::configure(cfg);
    site::configure(cfg);
}
