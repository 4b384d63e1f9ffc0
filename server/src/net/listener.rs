use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::chat_engine::ChatEngine;

use super::connection::handle_connection;

/// Start the chat TCP listener. Accepts connections and spawns a handler
/// task for each. Stops accepting new connections when the cancellation
/// token is triggered.
pub async fn start_listener(bind_addr: &str, engine: Arc<ChatEngine>, cancel: CancellationToken) {
    let listener = TcpListener::bind(bind_addr)
        .await
        .expect("failed to bind chat listener");

    info!("chat listener started on {}", bind_addr);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("chat listener shutting down");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let engine = engine.clone();
                        let peer = addr.to_string();
                        tokio::spawn(async move {
                            handle_connection(stream, peer, engine).await;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                    }
                }
            }
        }
    }
}
