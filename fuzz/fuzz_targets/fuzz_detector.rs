#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use protocol_switch::config::{DetectionConfig, SwitchConfig};
use protocol_switch::transport::{PeerIdentity, Transport};
use protocol_switch::{DefaultHandlerFactory, Multiplexer, ResourceRegistry, RuleDetector};
use std::sync::Arc;

struct NullTransport(PeerIdentity);

impl Transport for NullTransport {
    fn write(&self, _data: Bytes) -> protocol_switch::Result<()> {
        Ok(())
    }

    fn close(&self) {}

    fn is_closed(&self) -> bool {
        false
    }

    fn peer(&self) -> &PeerIdentity {
        &self.0
    }
}

fuzz_target!(|data: &[u8]| {
    let config = SwitchConfig::default();
    let Ok(registry) = ResourceRegistry::from_config(&config.resources) else {
        return;
    };
    let registry = Arc::new(registry);

    // Split the input into two fragments to exercise classification and forwarding
    let split = data.first().map_or(0, |b| *b as usize % (data.len() + 1));
    let (first, rest) = data.split_at(split);

    let mut multiplexer = Multiplexer::new(
        Arc::new(RuleDetector::new(DetectionConfig::default(), Arc::clone(&registry))),
        Arc::new(DefaultHandlerFactory::new(registry)),
    );
    let peer = PeerIdentity::new("fuzz");
    multiplexer.on_open(Arc::new(NullTransport(peer.clone())), peer);

    let _ = multiplexer.on_data(first);
    let _ = multiplexer.on_data(rest);
    multiplexer.on_close();
});
