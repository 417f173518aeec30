use axum::{extract::Path, routing::get, Router};

use crate::registry::ModuleDescriptor;

pub const MODULE_ID: &str = "wiki";

pub fn descriptor() -> ModuleDescriptor {
    ModuleDescriptor::new(MODULE_ID, "Wiki", "2.0.0")
        .with_description("Editable knowledge base")
        .with_routes(
            Router::new()
                .route("/", get(|| async { "Wiki: start at /pages/index" }))
                .route("/pages/{name}", get(show_page)),
        )
}

async fn show_page(Path(name): Path<String>) -> String {
    format!("# {name}\n\nThis page has no content yet.")
}
