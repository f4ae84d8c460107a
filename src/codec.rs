//! Wire encoding of CoAP messages.
//!
//! The client never touches the binary format itself; it hands packets to a
//! [`MessageCodec`]. [`PacketCodec`] is the default and simply defers to
//! `coap-lite`.
use coap_lite::error::MessageError;
use coap_lite::Packet;

pub trait MessageCodec: Send + Sync {
    /// Serializes a packet into a single datagram.
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, MessageError>;

    /// Parses exactly the bytes of one received datagram.
    fn decode(&self, buf: &[u8]) -> Result<Packet, MessageError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl MessageCodec for PacketCodec {
    fn encode(&self, packet: &Packet) -> Result<Vec<u8>, MessageError> {
        packet.to_bytes()
    }

    fn decode(&self, buf: &[u8]) -> Result<Packet, MessageError> {
        Packet::from_bytes(buf)
    }
}
