#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use protocol_switch::core::codec::PacketCodec;
use protocol_switch::Packet;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Packet parsing must never panic on arbitrary input
    let _ = Packet::from_bytes(data);

    let mut buf = BytesMut::from(data);
    let mut codec = PacketCodec;
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
