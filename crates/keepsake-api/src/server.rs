//! Server bootstrap: bind, layer, serve.

use crate::routes::{router, AppState};
use keepsake_types::error::{KeepsakeError, KeepsakeResult};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Bind the listen address and serve the API until the process exits.
pub async fn serve(state: Arc<AppState>, addr: &str) -> KeepsakeResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KeepsakeError::Config(format!("cannot bind {addr}: {e}")))?;
    tracing::info!(addr = %listener.local_addr()?, "keepsake api listening");

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    axum::serve(listener, app).await?;
    Ok(())
}
