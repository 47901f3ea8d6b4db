use std::sync::Arc;

use crate::error::Result;
use crate::handlers::{ByteStreamHandler, HttpHandler, NativeHandler};
use crate::protocol::detector::ProtocolVariant;
use crate::protocol::handler::Handler;
use crate::registry::ResourceRegistry;

/// Builds the handler for a classified connection.
///
/// Construction runs on the data-arrival path: no blocking and no I/O.
pub trait HandlerFactory: Send + Sync {
    fn build(&self, variant: &ProtocolVariant) -> Result<Box<dyn Handler>>;
}

/// Maps each variant to the handler bundled with this crate
#[derive(Debug, Clone)]
pub struct DefaultHandlerFactory {
    registry: Arc<ResourceRegistry>,
}

impl DefaultHandlerFactory {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self { registry }
    }
}

impl HandlerFactory for DefaultHandlerFactory {
    fn build(&self, variant: &ProtocolVariant) -> Result<Box<dyn Handler>> {
        Ok(match variant {
            ProtocolVariant::HttpLike => Box::new(HttpHandler::new(Arc::clone(&self.registry))),
            ProtocolVariant::MagicByteStream(resource) => Box::new(ByteStreamHandler::new(
                &self.registry,
                Arc::clone(resource),
            )?),
            ProtocolVariant::Native => Box::new(NativeHandler::new()),
        })
    }
}
