//! Admin API for managing modules at runtime.
//!
//! All routes live under `/admin`, which is a core path the gate never
//! blocks, and require a bearer API key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::registry::ModuleRegistry;
use crate::routing::RouteTable;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<ModuleRegistry>,
    pub routes: Arc<RouteTable>,
    api_key: Arc<str>,
}

impl AdminState {
    pub fn new(registry: Arc<ModuleRegistry>, routes: Arc<RouteTable>, api_key: &str) -> Self {
        Self {
            registry,
            routes,
            api_key: Arc::from(api_key),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

pub fn setup_admin_router<S>(state: AdminState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/modules", get(list_modules))
        .route("/admin/modules/{id}/install", post(install_module))
        .route("/admin/modules/{id}/uninstall", post(uninstall_module))
        .route("/admin/modules/{id}/upgrade", post(upgrade_module))
        .route("/admin/modules/{id}/path", put(update_module_path))
        .route("/admin/reload", post(force_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::OperationOutcome;
    use crate::notifier::ChangeNotifier;
    use crate::registry::{ModuleDescriptor, ModuleView};
    use crate::store::{MemoryStore, ModuleStatus};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn admin() -> (Router, Arc<ModuleRegistry>) {
        let registry = Arc::new(ModuleRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ChangeNotifier::in_memory()),
        ));
        registry.register(ModuleDescriptor::new("blog", "Blog", "1.0.0"));
        registry.register(ModuleDescriptor::new("shop", "Shop", "2.0.0").with_setup(|| async {
            Err("payment provider unreachable".to_string())
        }));
        let routes = Arc::new(RouteTable::new(registry.clone()));
        let router = setup_admin_router(AdminState::new(registry.clone(), routes, KEY));
        (router, registry)
    }

    fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn outcome(response: Response) -> OperationOutcome {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_requires_api_key() {
        let (router, _) = admin();
        let response = router
            .oneshot(Request::builder().uri("/admin/modules").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!outcome(response).await.success);
    }

    #[tokio::test]
    async fn test_install_with_base_path_and_list() {
        let (router, registry) = admin();
        let response = router
            .clone()
            .oneshot(request("POST", "/admin/modules/blog/install", r#"{"base_path":"news"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(outcome(response).await.success);
        assert_eq!(registry.snapshot().resolve_prefix("news"), Some("blog"));

        let response = router.oneshot(request("GET", "/admin/modules", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let views: Vec<ModuleView> = serde_json::from_slice(&body).unwrap();
        let blog = views.iter().find(|v| v.module_id == "blog").unwrap();
        assert_eq!(blog.status, ModuleStatus::Installed);
        assert_eq!(blog.base_path, "news");
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (router, _) = admin();

        let response = router
            .clone()
            .oneshot(request("POST", "/admin/modules/forum/install", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .clone()
            .oneshot(request("POST", "/admin/modules/blog/uninstall", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = router
            .clone()
            .oneshot(request("POST", "/admin/modules/shop/install", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(outcome(response).await.message.contains("payment provider unreachable"));

        let response = router
            .oneshot(request("POST", "/admin/modules/blog/install", r#"{"base_path":"a/b"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_path_and_reload() {
        let (router, registry) = admin();
        registry.install("blog", None).await.unwrap();
        let before = registry.notifier().generation();

        let response = router
            .clone()
            .oneshot(request("PUT", "/admin/modules/blog/path", r#"{"base_path":"journal"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(registry.snapshot().resolve_prefix("journal"), Some("blog"));

        let response = router.oneshot(request("POST", "/admin/reload", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(registry.notifier().generation() > before);
    }
}
