//! Shared middleware for the bill-board API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// Request logging: remote-ip "request-line" status-code response-size.
pub fn request_logger() -> Logger {
    Logger::default()
}

/// CORS for setups where the UI lives on another origin. The identity
/// headers come from the reverse proxy, so credentials stay out of it.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .max_age(3600)
}
