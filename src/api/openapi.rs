//! OpenAPI document for the gateway's routes.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "vigilo",
        description = "Admin credential authentication gateway"
    ),
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::login::session,
        crate::api::handlers::auth::login::logout,
    ),
    components(schemas(
        crate::api::handlers::health::Health,
        crate::api::handlers::auth::types::LoginRequest,
        crate::api::handlers::auth::types::LoginResponse,
        crate::api::handlers::auth::types::SessionResponse,
    )),
    tags(
        (name = "auth", description = "Credential verification and sessions"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_lists_auth_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.contains(&&"/v1/auth/login".to_string()));
        assert!(paths.contains(&&"/v1/auth/session".to_string()));
        assert!(paths.contains(&&"/v1/auth/logout".to_string()));
        assert!(paths.contains(&&"/health".to_string()));
    }
}
