use coap_lite::error::MessageError;
use std::io;
use std::net::AddrParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("peer address is not an IP literal: {0}")]
    InvalidAddress(#[from] AddrParseError),

    #[error("invalid coaps url: {0}")]
    InvalidUrl(String),

    /// The UDP dial or the DTLS handshake failed.
    #[error("could not establish secure session: {0}")]
    Connection(#[source] io::Error),

    #[error("could not encode request: {0}")]
    Serialization(#[source] MessageError),

    /// Writing to or reading from the secured channel failed, including timeouts.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),

    #[error("could not decode response: {0}")]
    Deserialization(#[source] MessageError),

    #[error("response message id {actual} does not match request message id {expected}")]
    MessageIdMismatch { expected: u16, actual: u16 },
}

impl Error {
    /// Whether the session should be considered unusable after this error.
    ///
    /// Callers are expected to reconnect rather than issue further calls when
    /// this returns true.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Transport(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_session_fatal() {
        assert!(Error::Transport(io::Error::new(ErrorKind::TimedOut, "no response")).is_session_fatal());
        assert!(Error::Connection(io::Error::new(ErrorKind::Other, "handshake")).is_session_fatal());
        assert!(!Error::Deserialization(MessageError::InvalidPacketLength).is_session_fatal());
        assert!(!Error::Serialization(MessageError::InvalidPacketLength).is_session_fatal());
        assert!(!Error::MessageIdMismatch { expected: 1, actual: 2 }.is_session_fatal());
    }

    #[test]
    fn test_invalid_address_from_parse() {
        let err: Error = "gateway.local".parse::<std::net::IpAddr>().unwrap_err().into();
        assert!(matches!(err, Error::InvalidAddress(_)));
    }
}
