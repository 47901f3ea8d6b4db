//! Minimal HTTP/1.x responder over the resource registry.
//!
//! One request per connection. The handler waits for the end of the request
//! head, answers it, and closes; any request body is ignored.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::handlers::bound;
use crate::protocol::handler::Handler;
use crate::registry::ResourceRegistry;
use crate::transport::Transport;

/// Largest request head accepted before answering 431
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    HeaderFieldsTooLarge,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::HeaderFieldsTooLarge => 431,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::HeaderFieldsTooLarge => "Request Header Fields Too Large",
        }
    }
}

/// Parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub version: &'a str,
}

/// Parse `METHOD SP TARGET SP HTTP/x.y` from the start of a request head.
///
/// Query string and fragment are stripped from the target.
pub fn parse_request_line(head: &[u8]) -> Result<RequestLine<'_>> {
    let line_end = head
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(head.len());
    let line = std::str::from_utf8(&head[..line_end])
        .map_err(|_| ProtocolError::MalformedRequest("request line is not UTF-8".to_string()))?;

    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ProtocolError::MalformedRequest(format!(
            "invalid request line: {line:?}"
        )));
    };

    if method.is_empty() || !target.starts_with('/') || !version.starts_with("HTTP/") {
        return Err(ProtocolError::MalformedRequest(format!(
            "invalid request line: {line:?}"
        )));
    }

    let path = target
        .split(['?', '#'])
        .next()
        .unwrap_or(target);

    Ok(RequestLine {
        method,
        path,
        version,
    })
}

/// Serves `GET` for registry resources; the registry is read-only so `POST`
/// and `DELETE` are refused.
pub struct HttpHandler {
    registry: Arc<ResourceRegistry>,
    transport: Option<Arc<dyn Transport>>,
    buffer: BytesMut,
    responded: bool,
}

impl HttpHandler {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            transport: None,
            buffer: BytesMut::new(),
            responded: false,
        }
    }

    fn route(&self, request: &RequestLine<'_>) -> (Status, Option<Bytes>, &'static str) {
        let resource = self.registry.resolve(request.path);

        match (request.method, resource) {
            ("GET", Some(resource)) => (
                Status::Ok,
                Some(resource.content().clone()),
                resource.content_type(),
            ),
            ("GET", None) => (Status::NotFound, None, "text/plain"),
            ("POST" | "DELETE", Some(resource)) if resource.is_reserved() => {
                (Status::Forbidden, None, "text/plain")
            }
            _ => (Status::MethodNotAllowed, None, "text/plain"),
        }
    }

    fn respond(&mut self, status: Status, body: Option<Bytes>, content_type: &str) -> Result<()> {
        self.responded = true;
        let transport = bound(&self.transport)?;

        let content_length = body.as_ref().map_or(0, Bytes::len);
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status.code(),
            status.reason(),
            content_type,
            content_length
        );

        debug!(peer = %transport.peer(), status = status.code(), "HTTP response");
        transport.write(Bytes::from(head))?;
        if let Some(body) = body {
            transport.write(body)?;
        }
        transport.close();
        Ok(())
    }
}

impl Handler for HttpHandler {
    fn name(&self) -> &'static str {
        "http"
    }

    fn bind(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    fn deliver(&mut self, data: &[u8]) -> Result<()> {
        if self.responded {
            return Ok(());
        }

        self.buffer.extend_from_slice(data);

        let Some(end) = self
            .buffer
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)
        else {
            if self.buffer.len() > MAX_HEADER_BYTES {
                self.respond(Status::HeaderFieldsTooLarge, None, "text/plain")?;
            }
            return Ok(());
        };

        if end > MAX_HEADER_BYTES {
            return self.respond(Status::HeaderFieldsTooLarge, None, "text/plain");
        }

        let head = self.buffer.split_to(end).freeze();
        match parse_request_line(&head) {
            Ok(request) => {
                let (status, body, content_type) = self.route(&request);
                if let Some(transport) = self.transport.as_ref() {
                    debug!(
                        peer = %transport.peer(),
                        method = request.method,
                        path = request.path,
                        version = request.version,
                        "HTTP request"
                    );
                }
                self.respond(status, body, content_type)
            }
            Err(e) => {
                self.respond(Status::BadRequest, None, "text/plain")?;
                Err(e)
            }
        }
    }
}
