//! # bb-api
//!
//! The web routing layer of the bill-board. Handlers translate HTTP into
//! service calls and domain errors into status codes; no business rule
//! lives here.

pub mod error;
pub mod handlers;
pub mod middleware;

pub use handlers::AppState;

use actix_web::web;

/// Configures the bill-board routes.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/billboard")
            .route("/entries", web::get().to(handlers::list_entries))
            .route("/entries", web::post().to(handlers::create_entry))
            .route("/entries/batch", web::post().to(handlers::batch_visibility))
            .route("/entry/{id}", web::get().to(handlers::show_entry))
            .route("/entry/{id}", web::put().to(handlers::update_entry))
            .route("/entry/{id}", web::delete().to(handlers::delete_entry))
            .route("/entry/{id}/lock", web::post().to(handlers::lock_entry))
            .route("/entry/{id}/unlock", web::post().to(handlers::unlock_entry))
            .route(
                "/entry/{id}/visibility",
                web::post().to(handlers::set_entry_visibility),
            )
            .route("/entry/{id}/comments", web::post().to(handlers::add_comment))
            .route(
                "/entry/{id}/images",
                web::post().to(handlers::upload_image),
            )
            .route(
                "/entry/{entry}/image/{image}/file",
                web::get().to(handlers::serve_image),
            )
            .route(
                "/comment/{id}/confirm",
                web::get().to(handlers::confirm_comment_deletion),
            )
            .route(
                "/comment/{id}/delete",
                web::post().to(handlers::delete_comment),
            )
            .route("/image/{id}", web::delete().to(handlers::delete_image))
            .route("/rules", web::get().to(handlers::get_rules))
            .route("/rules", web::put().to(handlers::put_rules))
            .route("/categories", web::get().to(handlers::list_categories))
            .route("/categories", web::post().to(handlers::create_category))
            .route("/category/{id}", web::put().to(handlers::update_category))
            .route(
                "/category/{id}",
                web::delete().to(handlers::delete_category),
            ),
    );
}
