//! Test utilities for integration tests
use std::sync::{Arc, RwLock};

use axum::Router;
use mockito::ServerGuard;

use agendar::api::AppState;
use agendar::api::app;
use agendar::bitrix::RestBridge;
use agendar::core::{AppConfig, FormVariant};
use agendar::scheduling::Orchestrator;

/// Creates a test application router wired to a mockito stand-in for the
/// portal. The guard must be kept alive for the duration of the test or
/// the mocked endpoints disappear.
///
/// The acting user is pre-resolved as user 1, as if the host session had
/// already reported ready.
pub async fn test_app(variant: FormVariant) -> (Router, ServerGuard) {
    let (router, server, orchestrator) = test_app_disconnected(variant).await;
    orchestrator.host_ready(1);
    (router, server)
}

/// Same as [`test_app`] but without a resolved acting user, for exercising
/// the host-ready flow itself. Also hands back the orchestrator.
pub async fn test_app_disconnected(
    variant: FormVariant,
) -> (Router, ServerGuard, Arc<Orchestrator>) {
    let server = mockito::Server::new_async().await;

    let config = AppConfig {
        bitrix_webhook_url: server.url(),
        variant,
    };

    let bridge = Arc::new(RestBridge::new(&config.bitrix_webhook_url));
    let orchestrator = Arc::new(Orchestrator::new(bridge, config.variant));

    let app_state = AppState::new(orchestrator.clone(), config);
    let router = app(Arc::new(RwLock::new(app_state)));
    (router, server, orchestrator)
}
