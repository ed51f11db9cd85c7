mod error;
mod routes;

use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use masque_feed::Social;
use masque_util_error::WhateverResult;
use snafu::{ResultExt as _, Snafu, Whatever};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tower_http::CompressionLevel;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::SizeAbove;
use tower_http::cors::CorsLayer;
use tracing::info;

pub use self::error::{RequestError, RequestResult};
pub use self::routes::CALLER_HEADER;

const LOG_TARGET: &str = "masque::web";

#[derive(Clone, Debug)]
pub struct Opts {
    pub listen: String,
    pub cors_origin: Option<String>,
    pub reuseport: bool,
}

impl Opts {
    pub fn new(listen: String, cors_origin: Option<String>, reuseport: bool) -> Self {
        Self {
            listen,
            cors_origin,
            reuseport,
        }
    }

    pub fn cors_origin(&self, listen: SocketAddr) -> WhateverResult<HeaderValue> {
        self.cors_origin
            .clone()
            .unwrap_or_else(|| format!("http://{listen}"))
            .parse()
            .whatever_context("cors_origin does not parse as an http value")
    }
}

pub struct AppState {
    social: Social,
}

impl AppState {
    pub fn social(&self) -> &Social {
        &self.social
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Snafu)]
pub enum WebServerError {
    #[snafu(transparent)]
    IO { source: io::Error },

    ListenAddr { source: AddrParseError },

    Cors { source: Whatever },
}

pub type ServerResult<T> = std::result::Result<T, WebServerError>;

pub struct Server {
    listener: TcpListener,

    state: SharedState,
    opts: Opts,
}

impl Server {
    pub async fn init(opts: Opts, social: Social) -> ServerResult<Server> {
        let listener = Self::get_listener(&opts).await?;

        let state = Arc::new(AppState { social });

        info!(target: LOG_TARGET, addr = %listener.local_addr()?, "Listening");
        Ok(Self {
            listener,
            state,
            opts,
        })
    }

    pub async fn get_listener(opts: &Opts) -> ServerResult<TcpListener> {
        let socket = {
            let addr = SocketAddr::from_str(&opts.listen).context(ListenAddrSnafu)?;

            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            if opts.reuseport {
                #[cfg(unix)]
                socket.set_reuseport(true)?;
            }
            socket.set_nodelay(true)?;

            socket.bind(addr)?;

            socket
        };

        Ok(socket.listen(1024)?)
    }

    /// Serve until interrupted by Ctrl+C or SIGTERM
    pub async fn run(self) -> ServerResult<()> {
        self.run_until(shutdown_signal()).await
    }

    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let router = Router::new().merge(routes::route_handler(self.state.clone()));

        info!(target: LOG_TARGET, "Starting server");
        let listen = self.addr()?;
        let cors = cors_layer(&self.opts, listen)?;
        axum::serve(
            self.listener,
            router
                .layer(cors)
                .layer(compression_layer())
                .into_make_service(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        info!(target: LOG_TARGET, "Server stopped");
        Ok(())
    }

    pub fn addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

fn compression_layer() -> CompressionLayer<SizeAbove> {
    CompressionLayer::new()
        .quality(CompressionLevel::Precise(4))
        .compress_when(SizeAbove::new(512))
}

fn cors_layer(opts: &Opts, listen: SocketAddr) -> ServerResult<CorsLayer> {
    Ok(CorsLayer::new()
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(CALLER_HEADER)])
        .max_age(Duration::from_secs(86400))
        .allow_origin(opts.cors_origin(listen).context(CorsSnafu)?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
            Method::PATCH,
        ]))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
