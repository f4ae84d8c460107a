use std::net::SocketAddr;

pub use coap_lite::{
    CoapOption, CoapRequest, CoapResponse, MessageClass, MessageType, Packet,
    RequestType as Method, ResponseType as Status,
};

/// A builder for the requests a session sends.
///
/// Requests are always confirmable and carry no token. The message id is left at
/// zero; the session stamps its own id when it builds through
/// [`SecureSessionClient`](crate::client::SecureSessionClient).
pub struct RequestBuilder<'a> {
    path: &'a str,
    method: Method,
    data: Option<Vec<u8>>,
    message_id: u16,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(path: &'a str, method: Method) -> Self {
        Self {
            path,
            method,
            data: None,
            message_id: 0,
        }
    }

    /// Set the payload of the request.
    pub fn data(mut self, data: Option<Vec<u8>>) -> Self {
        self.data = data;
        self
    }
    /// set the message id of the request.
    pub fn message_id(mut self, message_id: u16) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn build(self) -> CoapRequest<SocketAddr> {
        let mut request = CoapRequest::new();
        request.set_method(self.method);
        request.set_path(self.path);
        request.message.header.message_id = self.message_id;
        if let Some(data) = self.data {
            request.message.payload = data;
        }
        request.message.header.set_type(MessageType::Confirmable);
        request
    }
}

#[cfg(test)]
pub mod test {
    pub use super::*;

    #[test]
    fn test_request_has_payload() {
        let build = RequestBuilder::new("/15001", Method::Put)
            .data(Some(b"{\"3311\":[{\"5850\":1}]}".to_vec()))
            .build();
        assert_eq!(build.message.payload.as_slice(), b"{\"3311\":[{\"5850\":1}]}");
    }

    #[test]
    fn test_path_segments() {
        let build = RequestBuilder::new("/15001/65536", Method::Get).build();
        let segments = build.message.get_option(CoapOption::UriPath).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(*segments.front().unwrap(), b"15001".to_vec());
        assert_eq!(*segments.back().unwrap(), b"65536".to_vec());
        assert_eq!(build.get_path(), "15001/65536");
    }

    #[test]
    fn test_message_id() {
        let build = RequestBuilder::new("/", Method::Get).message_id(4711).build();
        assert_eq!(build.message.header.message_id, 4711);
    }

    #[test]
    fn test_confirmable_request() {
        let build = RequestBuilder::new("/", Method::Post).build();
        assert_eq!(build.message.header.get_type(), MessageType::Confirmable);
        assert_eq!(*build.get_method(), Method::Post);
        assert!(build.message.get_token().is_empty());
    }
}
