//! Install, uninstall and gating over HTTP against a single gateway.

use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_install_makes_module_reachable() {
    let gateway = common::spawn_gateway(common::memory_config()).await;

    assert_eq!(gateway.get("/blog").await.status(), StatusCode::NOT_FOUND);

    let response = gateway
        .admin(Method::POST, "/admin/modules/blog/install", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let response = gateway.get("/blog/posts/hello-world").await;
    assert_eq!(response.status(), StatusCode::OK);
    let post: serde_json::Value = response.json().await.unwrap();
    assert_eq!(post["slug"], "hello-world");
}

#[tokio::test]
async fn test_uninstall_hides_module_and_keeps_record() {
    let gateway = common::spawn_gateway(common::memory_config()).await;
    gateway
        .admin(Method::POST, "/admin/modules/wiki/install", None)
        .await;
    assert_eq!(gateway.get("/wiki/pages/home").await.status(), StatusCode::OK);

    let response = gateway
        .admin(Method::POST, "/admin/modules/wiki/uninstall", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(gateway.get("/wiki/pages/home").await.status(), StatusCode::NOT_FOUND);

    let modules: Vec<serde_json::Value> = gateway
        .admin(Method::GET, "/admin/modules", None)
        .await
        .json()
        .await
        .unwrap();
    let wiki = modules.iter().find(|m| m["module_id"] == "wiki").unwrap();
    assert_eq!(wiki["status"], "not_installed");
    assert!(wiki["installed_at"].is_u64());
}

#[tokio::test]
async fn test_custom_base_path_and_root_mount() {
    let gateway = common::spawn_gateway(common::memory_config()).await;

    gateway
        .admin(
            Method::POST,
            "/admin/modules/shop/install",
            Some(json!({ "base_path": "store" })),
        )
        .await;
    assert_eq!(gateway.get("/store/cart").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/shop/cart").await.status(), StatusCode::NOT_FOUND);

    let response = gateway
        .admin(
            Method::PUT,
            "/admin/modules/wiki/path",
            Some(json!({ "base_path": "/" })),
        )
        .await;
    // No record yet.
    assert_eq!(response.status(), StatusCode::CONFLICT);

    gateway
        .admin(
            Method::POST,
            "/admin/modules/wiki/install",
            Some(json!({ "base_path": "/" })),
        )
        .await;
    assert_eq!(gateway.get("/pages/start").await.status(), StatusCode::OK);
    assert_eq!(gateway.get("/store/cart").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_gate_table() {
    let mut config = common::memory_config();
    config.gate.allowed_modules = Some(vec!["blog".into(), "forum".into(), "shop".into()]);
    let gateway = common::spawn_gateway(config).await;
    gateway
        .admin(Method::POST, "/admin/modules/blog/install", None)
        .await;

    // Core path, bypassed.
    let status = gateway.get("/admin/status").await.status();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // Active module.
    assert_eq!(gateway.get("/blog").await.status(), StatusCode::OK);
    // Registered, not installed.
    assert_eq!(gateway.get("/shop/item").await.status(), StatusCode::NOT_FOUND);
    // Listed but not linked in.
    assert_eq!(gateway.get("/forum/thread").await.status(), StatusCode::NOT_FOUND);
    // Unrecognized, falls through to the (empty) root.
    assert_eq!(gateway.get("/unknown/page").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_errors() {
    let gateway = common::spawn_gateway(common::memory_config()).await;

    let response = gateway
        .admin(Method::POST, "/admin/modules/forum/install", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let response = gateway
        .admin(Method::POST, "/admin/modules/blog/upgrade", None)
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
