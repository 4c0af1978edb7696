//! Opens the gateway WebSocket, directly or through a [`ProxyConfig`].

use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, client_async_tls_with_config};
use url::Url;

use super::proxy::ProxyConfig;
use crate::Result;
use crate::error::{Error, Kind};

/// Any byte stream the socket can run over: plain TCP, a TLS-wrapped proxy
/// tunnel or a SOCKS stream.
pub(crate) trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

pub(crate) type BoxedIo = Box<dyn Io>;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<BoxedIo>>;

static TLS_CONFIG: OnceLock<Arc<rustls::ClientConfig>> = OnceLock::new();

/// Process-wide rustls client configuration trusting the platform roots.
pub(crate) fn tls_config() -> Result<Arc<rustls::ClientConfig>> {
    if let Some(config) = TLS_CONFIG.get() {
        return Ok(Arc::clone(config));
    }

    let native = rustls_native_certs::load_native_certs();
    #[cfg(feature = "tracing")]
    for error in &native.errors {
        tracing::warn!(%error, "unable to load a native root certificate");
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, _ignored) = roots.add_parsable_certificates(native.certs);
    if added == 0 {
        return Err(Error::with_source(
            Kind::Internal,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no usable native root certificates",
            ),
        ));
    }

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(Arc::clone(TLS_CONFIG.get_or_init(|| Arc::new(config))))
}

/// Open a WebSocket to `url`, sending `user_agent` with the upgrade request.
pub(crate) async fn open(
    url: &Url,
    proxy: Option<&ProxyConfig>,
    user_agent: &str,
) -> Result<WsStream> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::validation(format!("gateway URL `{url}` has no host")))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| Error::validation(format!("gateway URL `{url}` has no port")))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let stream: BoxedIo = match proxy {
        Some(proxy) => proxy.tunnel(host, port).await?,
        None => {
            let tcp = TcpStream::connect((host, port)).await?;
            tcp.set_nodelay(true)?;
            Box::new(tcp)
        }
    };

    let mut request = url.as_str().into_client_request()?;
    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| Error::validation(format!("invalid user agent: {e}")))?;
    request.headers_mut().insert(USER_AGENT, user_agent);

    let connector = match url.scheme() {
        "wss" => Some(Connector::Rustls(tls_config()?)),
        _ => Some(Connector::Plain),
    };

    let (socket, response) = client_async_tls_with_config(request, stream, None, connector).await?;

    #[cfg(feature = "tracing")]
    tracing::debug!(%url, status = %response.status(), "gateway socket open");
    #[cfg(not(feature = "tracing"))]
    let _ = &response;

    Ok(socket)
}
