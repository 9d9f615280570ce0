//! Connection acceptance loop, in the shape of the teacher's
//! `hyper-util`-based JMAP HTTP listener: one `TcpListener`, one spawned
//! task per accepted connection.

use crate::router::handle;
use crate::state::AppState;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> trc::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| trc::Error::server(trc::ServerEvent::StartupError, "failed to bind management API listener").details(e.to_string()))?;
    trc::info!("server.startup", "management API listening");

    loop {
        let (stream, _peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                trc::warn!("server.accept", &format!("accept failed: {e}"));
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, std::convert::Infallible>(handle(req, state).await) }
            });
            if let Err(err) = hyper::server::conn::http1::Builder::new().serve_connection(io, service).await {
                trc::warn!("server.connection", &format!("connection error: {err}"));
            }
        });
    }
}
