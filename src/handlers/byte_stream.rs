use std::sync::Arc;
use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::handlers::bound;
use crate::protocol::handler::Handler;
use crate::registry::{Resource, ResourceRegistry};
use crate::transport::Transport;

/// Writes a single resource to the peer and closes the connection.
///
/// Selected when the first fragment is a resource's magic token, giving
/// clients that cannot speak HTTP a one-line way to fetch it.
pub struct ByteStreamHandler {
    resource: Arc<Resource>,
    transport: Option<Arc<dyn Transport>>,
    served: bool,
}

impl ByteStreamHandler {
    /// Fails when `resource` is not the one `registry` publishes under its path.
    pub fn new(registry: &ResourceRegistry, resource: Arc<Resource>) -> Result<Self> {
        match registry.resolve(resource.path()) {
            Some(published) if published == resource => Ok(Self {
                resource: published,
                transport: None,
                served: false,
            }),
            _ => Err(ProtocolError::HandlerConstruction(format!(
                "Resource '{}' is not published by this registry",
                resource.path()
            ))),
        }
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }
}

impl Handler for ByteStreamHandler {
    fn name(&self) -> &'static str {
        "byte-stream"
    }

    fn bind(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    fn deliver(&mut self, _data: &[u8]) -> Result<()> {
        if self.served {
            return Ok(());
        }

        let transport = bound(&self.transport)?;
        debug!(
            peer = %transport.peer(),
            path = self.resource.path(),
            bytes = self.resource.content().len(),
            "Streaming resource"
        );
        transport.write(self.resource.content().clone())?;
        transport.close();
        self.served = true;
        Ok(())
    }
}
