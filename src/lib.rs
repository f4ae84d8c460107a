//! A CoAP client over a PSK-secured DTLS session.
//!
//! The client owns exactly one DTLS connection to a gateway (UDP port 5684 by
//! default), assigns monotonically increasing message ids to the requests it
//! builds and performs one request/response exchange at a time over the
//! session.
//!
//! Features:
//! - CoAP core protocol [RFC 7252](https://tools.ietf.org/rfc/rfc7252.txt) messages via
//!   [coap-lite](https://github.com/martindisch/coap-lite)
//! - DTLS 1.2 with `TLS_PSK_WITH_AES_128_CCM_8` and `TLS_PSK_WITH_AES_128_GCM_SHA256`
//!   via [webrtc-rs](https://github.com/webrtc-rs/webrtc)
//! - Option to provide a custom transport or codec
//!
//! Not supported: retransmission, observe, block-wise transfers.
//!
//! # Example
//!
//! ```no_run
//! use dtlscoap::SecureSessionClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dtlscoap::Error> {
//!     let client = SecureSessionClient::connect("192.168.1.10", "client_id", "psk").await?;
//!
//!     let request = client.build_get("/15001");
//!     let response = client.call(&request).await?;
//!     println!("{}", String::from_utf8_lossy(&response.message.payload));
//!     Ok(())
//! }
//! ```

#[cfg(test)]
extern crate quickcheck;

pub use self::client::{ClientTransport, SecureSessionClient, SessionConfig};
pub use self::codec::{MessageCodec, PacketCodec};
pub use self::error::{Error, Result};
pub use self::request::RequestBuilder;

pub mod client;
pub mod codec;
#[cfg(feature = "dtls")]
pub mod dtls;
pub mod error;
pub mod request;
