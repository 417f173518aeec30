use axum::{extract::Path, routing::get, Json, Router};
use serde::Serialize;

use crate::registry::ModuleDescriptor;

pub const MODULE_ID: &str = "blog";

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub slug: &'static str,
    pub title: &'static str,
}

const POSTS: &[Post] = &[
    Post {
        slug: "hello-world",
        title: "Hello, world",
    },
    Post {
        slug: "release-notes",
        title: "Release notes",
    },
];

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_ID, "Blog", "1.2.0")
        .with_description("Posts and announcements")
        .with_component("content")
        .with_routes(routes())
}

fn routes() -> Router {
    Router::new()
        .route("/", get(list_posts))
        .route("/posts/{slug}", get(show_post))
}

async fn list_posts() -> Json<&'static [Post]> {
    Json(POSTS)
}

async fn show_post(Path(slug): Path<String>) -> Result<Json<Post>, axum::http::StatusCode> {
    POSTS
        .iter()
        .find(|p| p.slug == slug)
        .cloned()
        .map(Json)
        .ok_or(axum::http::StatusCode::NOT_FOUND)
}
