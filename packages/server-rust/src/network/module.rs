//! Network module with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts requests until the shutdown future resolves. Binding
//! separately lets callers learn the OS-assigned port before serving.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    bulk_handler, bulk_report_handler, health_handler, liveness_handler, readiness_handler,
    schema_handler, validate_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;
use crate::service::DocumentService;

/// Owns the HTTP server lifecycle.
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    service: Arc<DocumentService>,
    shutdown: Arc<ShutdownController>,
    start_time: Instant,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, service: Arc<DocumentService>) -> Self {
        Self {
            config,
            listener: None,
            service,
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `GET /health/live`, `GET /health/ready`
    /// - `GET /collections/{name}/schema`
    /// - `POST /collections/{name}/documents/validate`
    /// - `POST /collections/{name}/documents/bulk`
    /// - `POST /collections/{name}/documents/bulk/report`
    pub fn build_router(&self) -> Router {
        let state = AppState {
            service: Arc::clone(&self.service),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/collections/{name}/schema", get(schema_handler))
            .route(
                "/collections/{name}/documents/validate",
                post(validate_handler),
            )
            .route("/collections/{name}/documents/bulk", post(bulk_handler))
            .route(
                "/collections/{name}/documents/bulk/report",
                post(bulk_report_handler),
            )
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let port = listener.local_addr()?.port();

        info!(host = %self.config.host, port, "TCP listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves, then drains running requests.
    ///
    /// # Errors
    ///
    /// Fails if `start()` was not called, TLS material cannot be loaded, or
    /// the server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .context("start() must be called before serve()")?;
        let router = self.build_router();
        let controller = Arc::clone(&self.shutdown);

        // Flip to draining as soon as the signal fires so new bulk runs are
        // refused while the listener winds down.
        let signal_controller = Arc::clone(&controller);
        let shutdown = async move {
            shutdown.await;
            signal_controller.trigger_shutdown();
        };

        controller.set_ready();

        match &self.config.tls {
            Some(tls) => serve_tls(listener, router, tls, shutdown).await?,
            None => serve_plain(listener, router, shutdown).await?,
        }

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with requests still running"
            );
        }
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("serving plain HTTP");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Serves TLS with `axum-server`, reusing the pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .context("failed to load TLS certificates")?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!(%addr, "serving TLS");
    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use bulkdoc_core::{CollectionSchema, FieldDefinition, FieldType};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::ServerConfig;
    use crate::storage::MemoryCollections;

    fn module() -> NetworkModule {
        let store = Arc::new(MemoryCollections::new());
        store
            .create_collection(CollectionSchema::new(
                "products",
                vec![
                    FieldDefinition::new("id", FieldType::String),
                    FieldDefinition::new("price", FieldType::Float),
                ],
            ))
            .unwrap();
        let service = Arc::new(DocumentService::new(store, ServerConfig::default()));
        NetworkModule::new(NetworkConfig::default(), service)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn new_does_not_bind() {
        assert!(module().listener.is_none());
    }

    #[tokio::test]
    async fn start_binds_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.unwrap();
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_fails() {
        let err = module().serve(std::future::pending::<()>()).await.unwrap_err();
        assert!(err.to_string().contains("start() must be called"));
    }

    #[tokio::test]
    async fn router_serves_bulk_and_sets_request_id() {
        let module = module();
        module.shutdown_controller().set_ready();
        let router = module.build_router();

        let body = json!({
            "operation": "upsert",
            "input": {"kind": "text", "content": "{\"id\": \"p1\", \"price\": 2.5}\n"}
        });
        let response = router
            .oneshot(post_json("/collections/products/documents/bulk", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let summary: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(summary["successCount"], 1);
    }

    #[tokio::test]
    async fn router_rejects_oversize_body() {
        let store = Arc::new(MemoryCollections::new());
        let service = Arc::new(DocumentService::new(store, ServerConfig::default()));
        let config = NetworkConfig {
            max_body_bytes: 64,
            ..NetworkConfig::default()
        };
        let module = NetworkModule::new(config, service);
        module.shutdown_controller().set_ready();

        let body = json!({
            "operation": "create",
            "input": {"kind": "text", "content": "x".repeat(256)}
        });
        let response = module
            .build_router()
            .oneshot(post_json("/collections/products/documents/bulk", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn router_serves_schema_and_health() {
        let module = module();
        let router = module.build_router();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/collections/products/schema")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
