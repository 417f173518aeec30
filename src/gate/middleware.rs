//! Gate middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gate::{GateDecision, ModuleGate};
use crate::http::response::not_found;
use crate::observability::metrics;

/// Reject requests addressed to modules that are not installed.
pub async fn gate_middleware(
    State(gate): State<Arc<ModuleGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let decision = gate.decide(request.uri().path());
    metrics::record_gate_outcome(decision.outcome());

    match decision {
        GateDecision::Deny(denial) => {
            tracing::debug!(path = %request.uri().path(), reason = %denial, "Request denied by module gate");
            metrics::record_gate_denial(denial.reason());
            not_found()
        }
        GateDecision::Allow { module_id } => {
            tracing::trace!(module_id = %module_id, "Request admitted by module gate");
            next.run(request).await
        }
        GateDecision::Bypass | GateDecision::PassThrough => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateSettings;
    use crate::notifier::ChangeNotifier;
    use crate::registry::{ModuleDescriptor, ModuleRegistry};
    use crate::store::MemoryStore;
    use axum::{http::StatusCode, middleware, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_denied_request_is_plain_not_found() {
        let registry = Arc::new(ModuleRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ChangeNotifier::in_memory()),
        ));
        registry.register(ModuleDescriptor::new("shop", "Shop", "1.0.0"));
        let gate = Arc::new(ModuleGate::new(registry, GateSettings::default()));

        let app = Router::new()
            .fallback(|| async { "reached" })
            .layer(middleware::from_fn_with_state(gate, gate_middleware));

        let denied = app
            .clone()
            .oneshot(Request::builder().uri("/shop/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::NOT_FOUND);

        let passed = app
            .oneshot(Request::builder().uri("/wiki").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(passed.status(), StatusCode::OK);
    }
}
