pub mod bom;
pub mod health;
pub mod locations;
pub mod materials;
pub mod me;
pub mod projects;
pub mod templates;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Protected routes
        .route("/me", get(me::get_me))
        // Templates
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:template_id",
            get(templates::get_template)
                .patch(templates::update_template)
                .delete(templates::delete_template),
        )
        .route(
            "/templates/:template_id/categories/:category/materials",
            post(templates::add_material),
        )
        .route(
            "/templates/:template_id/categories/:category/materials/:description",
            delete(templates::remove_material),
        )
        // Pricing tables
        .route(
            "/locations",
            get(locations::list_locations).post(locations::create_location),
        )
        .route(
            "/locations/:location_id",
            get(locations::get_location)
                .patch(locations::update_location)
                .delete(locations::delete_location),
        )
        .route(
            "/materials",
            get(materials::list_materials).post(materials::create_material),
        )
        .route(
            "/materials/:material_id",
            get(materials::get_material)
                .patch(materials::update_material)
                .delete(materials::delete_material),
        )
        // BOM generation
        .route("/bom/generate", post(bom::generate_bom))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:project_id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:project_id/status", patch(projects::update_status))
        .route("/projects/:project_id/start", patch(projects::start_project))
        .route("/projects/:project_id/postpone", patch(projects::postpone_project))
        .route("/projects/:project_id/resume", patch(projects::resume_project))
        .route("/projects/:project_id/end", patch(projects::end_project))
        .route(
            "/projects/:project_id/progress-mode",
            patch(projects::set_mode),
        )
        .route("/projects/:project_id/boms", post(projects::attach_bom))
        .route(
            "/projects/:project_id/floors/:floor_id",
            patch(projects::update_floor_progress),
        )
        .route(
            "/projects/:project_id/floors/:floor_id/reset",
            post(projects::reset_floor),
        )
}
