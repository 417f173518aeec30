use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::registry::ModuleDescriptor;

pub const MODULE_ID: &str = "shop";

#[derive(Debug, Serialize)]
pub struct Product {
    pub sku: &'static str,
    pub name: &'static str,
    pub price_cents: u64,
}

const PRODUCTS: &[Product] = &[
    Product {
        sku: "mug-01",
        name: "Coffee mug",
        price_cents: 1200,
    },
    Product {
        sku: "tee-01",
        name: "T-shirt",
        price_cents: 2500,
    },
];

pub fn descriptor() -> ModuleDescriptor {
    let setups = Arc::new(AtomicUsize::new(0));
    ModuleDescriptor::new(MODULE_ID, "Shop", "0.9.1")
        .with_description("Product catalog and cart")
        .with_component("commerce")
        .with_setup(move || {
            let setups = setups.clone();
            async move {
                // Seeding the catalog is idempotent; a rerun after a crash
                // finds the same products.
                let run = setups.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(products = PRODUCTS.len(), run, "Shop catalog seeded");
                Ok(())
            }
        })
        .with_routes(routes())
}

fn routes() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/cart", get(|| async { Json(Vec::<&str>::new()) }))
}

async fn list_products() -> Json<&'static [Product]> {
    Json(PRODUCTS)
}
