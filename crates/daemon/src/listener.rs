// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for the daemon socket.
//!
//! Each connection carries one request and one response. Console commands
//! run on the connection's task; this is the server's console activity.

use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::console::{self, Origin};
use crate::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use crate::server::ServerContext;

/// Listener task for accepting socket connections.
pub struct Listener {
    socket: UnixListener,
    ctx: Arc<ServerContext>,
    shutdown: Arc<Notify>,
}

impl Listener {
    pub fn new(socket: UnixListener, ctx: Arc<ServerContext>, shutdown: Arc<Notify>) -> Self {
        Self {
            socket,
            ctx,
            shutdown,
        }
    }

    /// Run the listener loop, spawning a task for each connection.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    let shutdown = Arc::clone(&self.shutdown);
                    tokio::spawn(async move {
                        match serve(stream, &ctx, &shutdown).await {
                            Ok(()) => {}
                            Err(ProtocolError::ConnectionClosed) => debug!("client hung up"),
                            Err(e @ ProtocolError::Timeout(_)) => warn!("console connection: {e}"),
                            Err(e) => error!("console connection: {e}"),
                        }
                    });
                }
                Err(e) => error!("accept failed: {e}"),
            }
        }
    }
}

/// Answer the single request on `stream`. A frame that arrives intact but
/// does not decode as a [`Request`] is answered with `Rejected`.
async fn serve(stream: UnixStream, ctx: &ServerContext, shutdown: &Notify) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();

    let payload = protocol::recv_frame(&mut reader, DEFAULT_TIMEOUT).await?;
    let response = match serde_json::from_slice::<Request>(&payload) {
        Ok(request) => {
            if matches!(request, Request::Ping) {
                debug!(?request, "console request");
            } else {
                info!(?request, "console request");
            }
            handle_request(request, ctx, shutdown)
        }
        Err(e) => {
            warn!(error = %e, bytes = payload.len(), "undecodable console request");
            Response::Rejected {
                reason: format!("malformed request: {e}"),
            }
        }
    };
    debug!(?response, "console response");
    protocol::send(&mut writer, &response, DEFAULT_TIMEOUT).await
}

/// Handle a single request and return a response.
pub(crate) fn handle_request(request: Request, ctx: &ServerContext, shutdown: &Notify) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, daemon = PROTOCOL_VERSION, "client version differs");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::Console { command } => {
            let mut origin = Origin::new();
            console::dispatch(ctx, &command, &mut origin);
            Response::Console {
                lines: origin.lines(),
            }
        }

        Request::Shutdown { mode } => {
            ctx.request_shutdown(mode.into());
            shutdown.notify_one();
            Response::ShuttingDown { mode }
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
