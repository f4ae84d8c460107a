//! this file is included by enabling the "dtls" feature. It provides the PSK-secured DTLS
//! transport using webrtc-rs's dtls implementation.
use crate::client::ClientTransport;
use async_trait::async_trait;
use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use std::{
    io::{Error, ErrorKind, Result as IoResult},
    sync::Arc,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use webrtc_dtls::cipher_suite::CipherSuiteId;
use webrtc_dtls::config::Config;
use webrtc_dtls::conn::DTLSConn;
use webrtc_util::conn::Conn;

/// The cipher suites offered during the handshake, in order of preference.
pub const PSK_CIPHER_SUITES: [CipherSuiteId; 2] = [
    CipherSuiteId::Tls_Psk_With_Aes_128_Ccm_8,
    CipherSuiteId::Tls_Psk_With_Aes_128_Gcm_Sha256,
];

/// Supplies the pre-shared key when the handshake asks for it.
///
/// The handshake layer passes the identity hint the peer offered (possibly
/// empty); the returned bytes are used as the PSK.
pub trait KeyProvider: Send + Sync {
    fn psk(&self, identity_hint: &[u8]) -> Vec<u8>;
}

/// A [`KeyProvider`] that ignores the peer's hint and always answers with the
/// same key.
#[derive(Clone)]
pub struct StaticKey(Vec<u8>);

impl StaticKey {
    pub fn new<K: Into<Vec<u8>>>(key: K) -> Self {
        StaticKey(key.into())
    }
}

impl std::fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticKey(..)")
    }
}

impl KeyProvider for StaticKey {
    fn psk(&self, _identity_hint: &[u8]) -> Vec<u8> {
        self.0.clone()
    }
}

/// Builds a client handshake configuration offering only the PSK suites in
/// [`PSK_CIPHER_SUITES`].
pub fn psk_config(identity: &[u8], key_provider: Arc<dyn KeyProvider>) -> Config {
    Config {
        psk: Some(Arc::new(move |hint: &[u8]| {
            Ok::<_, webrtc_dtls::Error>(key_provider.psk(hint))
        })),
        psk_identity_hint: Some(identity.to_vec()),
        cipher_suites: PSK_CIPHER_SUITES.to_vec(),
        ..Default::default()
    }
}

pub struct UdpDtlsConfig {
    pub config: Config,
    pub dest_addr: SocketAddr,
    pub handshake_timeout: Duration,
}

/// An established DTLS session, usable as a [`ClientTransport`].
pub struct DtlsConnection {
    conn: Arc<DTLSConn>,
}

impl DtlsConnection {
    /// Runs the client side of the handshake over the given connection. This
    /// connection can be a tokio UDP socket or a user-created struct implementing
    /// Conn, Send, and Sync.
    ///
    /// # Errors
    ///
    /// This function will return an error if the handshake fails or if it times out
    ///
    /// The timeout only fires if the runtime gets to poll it. A `Conn` whose `recv`
    /// returns errors without ever yielding keeps the handshake's read loop spinning,
    /// and on a current-thread runtime that starves the timer; such connections
    /// need a multi-threaded runtime.
    pub async fn try_from_connection(
        connection: Arc<dyn Conn + Send + Sync>,
        dtls_config: Config,
        handshake_timeout: Duration,
    ) -> IoResult<Self> {
        let dtls_conn = timeout(
            handshake_timeout,
            DTLSConn::new(connection, dtls_config, true, None),
        )
        .await
        .map_err(|_| {
            Error::new(
                ErrorKind::TimedOut,
                "Received no response on DTLS handshake",
            )
        })?
        .map_err(|e| Error::new(ErrorKind::Other, e))?;
        Ok(DtlsConnection {
            conn: Arc::new(dtls_conn),
        })
    }

    /// Binds an ephemeral socket of the peer's address family, connects it to the
    /// peer and performs the handshake.
    pub async fn try_new(dtls_config: UdpDtlsConfig) -> IoResult<DtlsConnection> {
        let bind_addr = match dtls_config.dest_addr {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };
        let conn = UdpSocket::bind(bind_addr).await?;
        conn.connect(dtls_config.dest_addr).await?;
        debug!(
            "dialed {} from {}, starting DTLS handshake",
            dtls_config.dest_addr,
            conn.local_addr()?
        );
        let connection = Self::try_from_connection(
            Arc::new(conn),
            dtls_config.config,
            dtls_config.handshake_timeout,
        )
        .await?;
        debug!("DTLS session with {} established", dtls_config.dest_addr);
        Ok(connection)
    }
}

#[async_trait]
impl ClientTransport for DtlsConnection {
    async fn recv(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
        let read = self
            .conn
            .read(buf, None)
            .await
            .map_err(|e| Error::new(ErrorKind::Other, e))?;
        Ok((read, self.conn.remote_addr()))
    }

    async fn send(&self, buf: &[u8]) -> IoResult<usize> {
        self.conn
            .write(buf, None)
            .await
            .map_err(|e| Error::new(ErrorKind::Other, e))
    }

    async fn close(&self) -> IoResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| Error::new(ErrorKind::Other, e))
    }
}
