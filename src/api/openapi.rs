//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers::{emissions, system, users};

/// Generated OpenAPI description served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "Carbon Footprint Tracker API",
        description = "Calculate and track personal carbon emissions, and subscribe to weekly sustainability tips."
    ),
    paths(
        system::root_handler,
        system::health_handler,
        emissions::list_activities,
        emissions::list_categories,
        emissions::calculate,
        emissions::history,
        users::subscribe,
        users::unsubscribe,
        users::send_tip,
        users::list_users,
    ),
    tags(
        (name = "System", description = "Service info and health"),
        (name = "Emissions", description = "Emission factors, calculation, and history"),
        (name = "Users", description = "Subscriptions and tips"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/health",
            "/api/emissions/activities",
            "/api/emissions/categories",
            "/api/emissions/calculate",
            "/api/emissions/history/{email}",
            "/api/users/subscribe",
            "/api/users/unsubscribe",
            "/api/users/send-tip",
            "/api/users/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
