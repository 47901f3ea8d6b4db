use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{parse_header, Packet, HEADER_SIZE};
use crate::error::ProtocolError;

/// Length-prefixed framing for native protocol packets
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, ProtocolError> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let len = parse_header(src)?;
        let total = HEADER_SIZE + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let version = src[4];
        src.advance(HEADER_SIZE);
        let payload = src.split_to(len).to_vec();

        Ok(Some(Packet { version, payload }))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if item.payload.len() > crate::config::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(item.payload.len()));
        }

        dst.reserve(HEADER_SIZE + item.payload.len());
        dst.put_slice(&crate::config::MAGIC_BYTES);
        dst.put_u8(item.version);
        dst.put_u32(item.payload.len() as u32);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_decode_waits_for_full_frame() {
        let bytes = Packet::new(b"hello".to_vec()).to_bytes();
        let mut codec = PacketCodec;
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&bytes[..4]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&bytes[4..11]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&bytes[11..]);
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.payload, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&Packet::new(vec![1]).to_bytes());
        buf.extend_from_slice(&Packet::new(vec![2, 2]).to_bytes());

        let mut codec = PacketCodec;
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().payload, vec![1]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().payload, vec![2, 2]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_foreign_bytes() {
        let mut buf = BytesMut::from(&b"\x00\x01handshake"[..]);
        assert!(matches!(
            PacketCodec.decode(&mut buf),
            Err(ProtocolError::InvalidHeader)
        ));
    }
}
