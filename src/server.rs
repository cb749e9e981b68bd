use std::net::SocketAddr;
use std::sync::Arc;

use kube::Client;

use crate::config::Config;
use crate::engine::{Engine, MAX_DEPTH};
use crate::queryer::KubeQueryer;
use crate::registry::default_registry;
use crate::router;

/// Shared application state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub queryer: Arc<KubeQueryer>,
    pub default_namespace: String,
}

pub struct ConstellationServer {
    pub addr: SocketAddr,
    listener: tokio::net::TcpListener,
    router: axum::Router,
}

impl ConstellationServer {
    pub async fn new(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Client::try_default().await?;
        Self::new_with_client(config, client).await
    }

    pub async fn new_with_client(
        config: &Config,
        client: Client,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let queryer = Arc::new(KubeQueryer::new(client));
        let registry = default_registry()?;
        let max_depth = config.max_depth.unwrap_or(MAX_DEPTH);
        let engine = Engine::with_max_depth(queryer.clone(), registry, max_depth);

        let state = AppState {
            engine,
            queryer,
            default_namespace: config.default_namespace.clone(),
        };
        let router = router::new_router(state);
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
        let addr = listener.local_addr()?;

        Ok(ConstellationServer { addr, listener, router })
    }

    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    pub async fn serve_with_graceful_shutdown(
        self,
        signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }
}
