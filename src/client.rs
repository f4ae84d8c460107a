use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace, warn};
use regex::Regex;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

#[cfg(feature = "dtls")]
use std::sync::Arc;

use crate::codec::{MessageCodec, PacketCodec};
#[cfg(feature = "dtls")]
use crate::dtls::{psk_config, DtlsConnection, KeyProvider, StaticKey, UdpDtlsConfig};
use crate::error::{Error, Result};
use crate::request::{CoapRequest, CoapResponse, Method, Packet, RequestBuilder};

/// Well-known port for CoAP over DTLS.
pub const COAPS_PORT: u16 = 5684;

/// Size of the buffer a response datagram is read into.
pub const RECEIVE_BUFFER_SIZE: usize = 4096;

/// A datagram channel to one fixed peer.
#[async_trait]
pub trait ClientTransport: Send + Sync {
    async fn recv(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)>;
    async fn send(&self, buf: &[u8]) -> IoResult<usize>;

    /// Shuts the channel down. Transports without a teardown step keep the default.
    async fn close(&self) -> IoResult<()> {
        Ok(())
    }
}

/// SessionConfig for configuring a secure session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Destination port on the peer
    pub port: u16,
    /// Upper bound for the UDP dial plus DTLS handshake
    pub handshake_timeout: Duration,
    /// Bound on each call's write+read; `None` waits forever
    pub receive_timeout: Option<Duration>,
    /// Reject responses whose message id differs from the request's
    pub verify_message_id: bool,
    /// The first built message carries `message_id_seed + 1`
    pub message_id_seed: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: COAPS_PORT,
            handshake_timeout: Duration::from_secs(30),
            receive_timeout: None,
            verify_message_id: true,
            message_id_seed: 0,
        }
    }
}

/// A CoAP client bound to one secured session with a fixed peer.
///
/// Message ids are assigned when a request is built, not when it is sent, so a
/// request that is built and then dropped still consumes an id. Calls are
/// serialized: the write of a request and the read of its response happen under
/// one lock, so a client shared between tasks never has more than one exchange in
/// flight.
pub struct SecureSessionClient<T: ClientTransport, C: MessageCodec = PacketCodec> {
    transport: Mutex<T>,
    codec: C,
    peer_addr: SocketAddr,
    message_id: AtomicU16,
    receive_timeout: Option<Duration>,
    verify_message_id: bool,
}

#[cfg(feature = "dtls")]
impl SecureSessionClient<DtlsConnection> {
    /// Connects to `peer_address` on the CoAPS port and performs the PSK handshake.
    ///
    /// `peer_address` must be an IP literal; no name resolution is done.
    pub async fn connect<I, K>(peer_address: &str, identity: I, psk: K) -> Result<Self>
    where
        I: Into<Vec<u8>>,
        K: Into<Vec<u8>>,
    {
        Self::connect_with_config(peer_address, identity, psk, SessionConfig::default()).await
    }

    pub async fn connect_with_config<I, K>(
        peer_address: &str,
        identity: I,
        psk: K,
        config: SessionConfig,
    ) -> Result<Self>
    where
        I: Into<Vec<u8>>,
        K: Into<Vec<u8>>,
    {
        Self::connect_with_key_provider(
            peer_address,
            identity,
            Arc::new(StaticKey::new(psk)),
            config,
        )
        .await
    }

    /// Like [`connect_with_config`](Self::connect_with_config), but the key is
    /// looked up through `key_provider` whenever the handshake needs it.
    pub async fn connect_with_key_provider<I>(
        peer_address: &str,
        identity: I,
        key_provider: Arc<dyn KeyProvider>,
        config: SessionConfig,
    ) -> Result<Self>
    where
        I: Into<Vec<u8>>,
    {
        let ip: IpAddr = peer_address.parse()?;
        let peer_addr = SocketAddr::new(ip, config.port);
        let identity = identity.into();

        let dtls_config = UdpDtlsConfig {
            config: psk_config(&identity, key_provider),
            dest_addr: peer_addr,
            handshake_timeout: config.handshake_timeout,
        };
        let transport = DtlsConnection::try_new(dtls_config)
            .await
            .map_err(Error::Connection)?;
        debug!(
            "secure session with {} established as {:?}",
            peer_addr,
            String::from_utf8_lossy(&identity)
        );

        Ok(Self::from_transport(transport, peer_addr, config))
    }
}

impl<T: ClientTransport> SecureSessionClient<T> {
    /// Wraps an already established transport. No handshake is performed.
    pub fn from_transport(transport: T, peer_addr: SocketAddr, config: SessionConfig) -> Self {
        Self::from_transport_with_codec(transport, PacketCodec, peer_addr, config)
    }
}

impl<T: ClientTransport, C: MessageCodec> SecureSessionClient<T, C> {
    pub fn from_transport_with_codec(
        transport: T,
        codec: C,
        peer_addr: SocketAddr,
        config: SessionConfig,
    ) -> Self {
        SecureSessionClient {
            transport: Mutex::new(transport),
            codec,
            peer_addr,
            message_id: AtomicU16::new(config.message_id_seed),
            receive_timeout: config.receive_timeout,
            verify_message_id: config.verify_message_id,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The id carried by the most recently built message.
    pub fn last_message_id(&self) -> u16 {
        self.message_id.load(Ordering::Relaxed)
    }

    fn next_message_id(&self) -> u16 {
        self.message_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Builds a confirmable request carrying the next message id.
    pub fn build(&self, path: &str, method: Method, payload: Option<Vec<u8>>) -> CoapRequest<SocketAddr> {
        RequestBuilder::new(path, method)
            .data(payload)
            .message_id(self.next_message_id())
            .build()
    }

    pub fn build_get(&self, path: &str) -> CoapRequest<SocketAddr> {
        self.build(path, Method::Get, None)
    }

    pub fn build_put<P: Into<Vec<u8>>>(&self, path: &str, payload: P) -> CoapRequest<SocketAddr> {
        self.build(path, Method::Put, Some(payload.into()))
    }

    pub fn build_post<P: Into<Vec<u8>>>(&self, path: &str, payload: P) -> CoapRequest<SocketAddr> {
        self.build(path, Method::Post, Some(payload.into()))
    }

    /// Execute a get request
    pub async fn get(&self, path: &str) -> Result<CoapResponse> {
        let request = self.build_get(path);
        self.call(&request).await
    }

    /// Execute a put request
    pub async fn put<P: Into<Vec<u8>>>(&self, path: &str, payload: P) -> Result<CoapResponse> {
        let request = self.build_put(path, payload);
        self.call(&request).await
    }

    /// Execute a post request
    pub async fn post<P: Into<Vec<u8>>>(&self, path: &str, payload: P) -> Result<CoapResponse> {
        let request = self.build_post(path, payload);
        self.call(&request).await
    }

    /// Sends `request` and waits for its reply.
    ///
    /// There are no retransmissions. A transport error leaves the session in an
    /// unknown state and the caller should reconnect; a response that fails to
    /// decode does not. With message id verification on, datagrams answering an
    /// earlier request (for instance one that timed out) are discarded and the
    /// read is repeated.
    pub async fn call(&self, request: &CoapRequest<SocketAddr>) -> Result<CoapResponse> {
        self.exchange(request, self.receive_timeout).await
    }

    /// Like [`call`](Self::call), with `deadline` bounding the write+read.
    ///
    /// The deadline starts once this call owns the session; time spent waiting
    /// for another task's call to finish is not counted.
    pub async fn call_with_timeout(
        &self,
        request: &CoapRequest<SocketAddr>,
        deadline: Duration,
    ) -> Result<CoapResponse> {
        self.exchange(request, Some(deadline)).await
    }

    /// Shuts the secured channel down. Further calls fail with a transport error.
    pub async fn close(&self) -> Result<()> {
        debug!("closing session with {}", self.peer_addr);
        self.transport.lock().await.close().await.map_err(Error::Transport)
    }

    async fn exchange(
        &self,
        request: &CoapRequest<SocketAddr>,
        deadline: Option<Duration>,
    ) -> Result<CoapResponse> {
        let expected = request.message.header.message_id;
        let encoded = self
            .codec
            .encode(&request.message)
            .map_err(Error::Serialization)?;

        let transport = self.transport.lock().await;
        let message = match deadline {
            Some(deadline) => timeout(deadline, self.transact(&*transport, &encoded, expected))
                .await
                .map_err(|_| Error::Transport(IoError::new(ErrorKind::TimedOut, "no response")))??,
            None => self.transact(&*transport, &encoded, expected).await?,
        };
        drop(transport);

        Ok(CoapResponse { message })
    }

    /// Writes one datagram and reads until a reply that is not stale arrives.
    async fn transact(&self, transport: &T, encoded: &[u8], expected: u16) -> Result<Packet> {
        trace!("Transmit data: {:?}", encoded);
        let sent = transport.send(encoded).await.map_err(Error::Transport)?;
        if sent != encoded.len() {
            return Err(Error::Transport(IoError::new(
                ErrorKind::WriteZero,
                "send length error",
            )));
        }

        let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let (n, _src) = transport.recv(&mut buf).await.map_err(Error::Transport)?;
            trace!("Received data: {:?}", &buf[..n]);

            let message = self
                .codec
                .decode(&buf[..n])
                .map_err(Error::Deserialization)?;

            let actual = message.header.message_id;
            if !self.verify_message_id || actual == expected {
                return Ok(message);
            }
            if is_earlier(actual, expected) {
                debug!("discarding stale response {} while waiting for {}", actual, expected);
                continue;
            }
            warn!("response message id {} does not answer request {}", actual, expected);
            return Err(Error::MessageIdMismatch { expected, actual });
        }
    }
}

/// Whether message id `id` was issued before `current`, in serial number
/// arithmetic over the 16-bit id space.
fn is_earlier(id: u16, current: u16) -> bool {
    let distance = current.wrapping_sub(id);
    distance != 0 && distance < 0x8000
}

/// Splits a `coaps://<ip>[:port]/path` url into its peer address, port and path.
///
/// The host must be an IP literal; IPv6 hosts are written in brackets. A missing
/// port defaults to [`COAPS_PORT`].
pub fn parse_coaps_url(url: &str) -> Result<(IpAddr, u16, String)> {
    let url_params = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    if url_params.scheme() != "coaps" {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme {}",
            url_params.scheme()
        )));
    }

    let host = match url_params.host_str() {
        Some("") | None => return Err(Error::InvalidUrl("host error".to_string())),
        Some(h) => h,
    };
    let host = Regex::new(r"^\[(.*?)]$")
        .map_err(|e| Error::InvalidUrl(e.to_string()))?
        .replace(host, "$1")
        .to_string();
    let ip: IpAddr = host.parse()?;

    let port = url_params.port().unwrap_or(COAPS_PORT);
    let path = url_params.path().to_string();

    Ok((ip, port, path))
}
