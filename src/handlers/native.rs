use bytes::BytesMut;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::codec::PacketCodec;
use crate::error::Result;
use crate::handlers::bound;
use crate::protocol::handler::Handler;
use crate::transport::Transport;

/// Native protocol endpoint: reassembles packets and echoes each one back.
#[derive(Default)]
pub struct NativeHandler {
    codec: PacketCodec,
    buffer: BytesMut,
    transport: Option<Arc<dyn Transport>>,
}

impl NativeHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for NativeHandler {
    fn name(&self) -> &'static str {
        "native"
    }

    fn bind(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    fn deliver(&mut self, data: &[u8]) -> Result<()> {
        let transport = bound(&self.transport)?;
        self.buffer.extend_from_slice(data);

        let mut out = BytesMut::new();
        while let Some(packet) = self.codec.decode(&mut self.buffer)? {
            trace!(peer = %transport.peer(), bytes = packet.payload.len(), "Native packet received");
            self.codec.encode(packet, &mut out)?;
        }

        if !out.is_empty() {
            transport.write(out.freeze())?;
        }
        Ok(())
    }
}
