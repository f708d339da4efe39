use std::{future::IntoFuture, net::SocketAddr, time::Duration};

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    Router,
};
use snafu::{ensure, OptionExt, ResultExt};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
};
use tower_http::trace::TraceLayer;

use crate::{
    error::{self, Error},
    OperatorInput, RedirectTarget,
};

const RECEIVED_PAGE: &str = "Authorization received. You may close this window.";

/// One-shot HTTP listener on a loopback address that captures the
/// provider's redirect after consent.
#[derive(Debug)]
pub struct LoopbackReceiver {
    listener: TcpListener,
    local_address: SocketAddr,
}

impl LoopbackReceiver {
    /// Binds the listener. Port `0` picks a free port.
    ///
    /// # Errors
    ///
    /// Returns an error if `address` is not a loopback address or cannot be
    /// bound.
    pub async fn bind(address: SocketAddr) -> Result<Self, Error> {
        ensure!(address.ip().is_loopback(), error::NotLoopbackSnafu { address: address.ip() });

        let listener =
            TcpListener::bind(address).await.context(error::BindLoopbackSnafu { address })?;
        let local_address = listener.local_addr().context(error::BindLoopbackSnafu { address })?;

        tracing::info!("Listening for the authorization redirect on {local_address}");
        Ok(Self { listener, local_address })
    }

    #[must_use]
    pub const fn local_address(&self) -> SocketAddr { self.local_address }

    #[must_use]
    pub const fn redirect_target(&self) -> RedirectTarget {
        RedirectTarget::Loopback(self.local_address)
    }

    /// Serves until the first request carrying a code or an error arrives,
    /// then shuts down gracefully and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoopbackTimedOut`] if nothing arrives within
    /// `timeout`, or an error if the listener fails.
    pub async fn receive(self, timeout: Duration) -> Result<OperatorInput, Error> {
        let (sender, mut receiver) = mpsc::channel::<OperatorInput>(1);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

        let router = Router::new()
            .fallback(capture_redirect)
            .with_state(sender)
            .layer(TraceLayer::new_for_http());
        let server = axum::serve(self.listener, router).with_graceful_shutdown(async move {
            let _unused = shutdown_receiver.await;
        });
        let server = tokio::spawn(server.into_future());

        let input = tokio::time::timeout(timeout, receiver.recv()).await;
        drop(shutdown_sender);

        match server.await {
            Ok(result) => result.context(error::ServeLoopbackSnafu)?,
            Err(err) => tracing::warn!(error = %err, "Loopback listener task did not finish"),
        }

        input
            .map_err(|_| Error::LoopbackTimedOut { seconds: timeout.as_secs() })?
            .context(error::LoopbackClosedSnafu)
    }
}

async fn capture_redirect(
    State(sender): State<mpsc::Sender<OperatorInput>>,
    uri: Uri,
) -> (StatusCode, &'static str) {
    let input = OperatorInput::from_query(uri.query().unwrap_or_default());
    if !input.is_provider_response() {
        tracing::debug!(path = %uri.path(), "Ignoring request without an authorization response");
        return (StatusCode::NOT_FOUND, "Waiting for the authorization redirect.");
    }

    if sender.try_send(input).is_err() {
        tracing::info!("Ignoring repeated authorization redirect");
    }
    (StatusCode::OK, RECEIVED_PAGE)
}
