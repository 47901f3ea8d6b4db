use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::error::{ProtocolError, Result};

/// Size of the fixed header: magic, version and big-endian length
pub const HEADER_SIZE: usize = 9;

/// A single native protocol packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: u8,
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a packet without checking its size.
    ///
    /// Payloads over [`MAX_PAYLOAD_SIZE`] are rejected by every decoder; use
    /// [`Packet::try_new`] for untrusted input.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            payload,
        }
    }

    /// Build a packet, failing if the payload exceeds [`MAX_PAYLOAD_SIZE`]
    pub fn try_new(payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::OversizedPacket(payload.len()));
        }
        Ok(Self::new(payload))
    }

    /// Serialize into the wire format.
    ///
    /// A payload too long for the 32-bit length field is written with
    /// `u32::MAX` as its length, which every reader rejects as oversized.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = u32::try_from(self.payload.len()).unwrap_or(u32::MAX);
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&MAGIC_BYTES);
        out.push(self.version);
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parse a complete packet from `buf`
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let len = parse_header(buf)?;

        let payload = buf
            .get(HEADER_SIZE..HEADER_SIZE + len)
            .ok_or(ProtocolError::InvalidHeader)?
            .to_vec();

        Ok(Self {
            version: buf[4],
            payload,
        })
    }
}

/// Validate the header at the start of `buf` and return the payload length.
///
/// `buf` must hold at least [`HEADER_SIZE`] bytes.
pub(crate) fn parse_header(buf: &[u8]) -> Result<usize> {
    if buf.len() < HEADER_SIZE || buf[0..4] != MAGIC_BYTES {
        return Err(ProtocolError::InvalidHeader);
    }

    let version = buf[4];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let len = u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) as usize;
    if len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::OversizedPacket(len));
    }

    Ok(len)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = Packet::new(b"abc".to_vec()).to_bytes();
        assert_eq!(&bytes[0..4], b"PSWT");
        assert_eq!(bytes[4], PROTOCOL_VERSION);
        assert_eq!(&bytes[5..9], &[0, 0, 0, 3]);
        assert_eq!(&bytes[9..], b"abc");
    }

    #[test]
    fn test_rejects_bad_headers() {
        assert!(matches!(
            Packet::from_bytes(&[]),
            Err(ProtocolError::InvalidHeader)
        ));

        let mut bytes = Packet::new(vec![1]).to_bytes();
        bytes[4] = 9;
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ProtocolError::UnsupportedVersion(9))
        ));

        let mut oversized = MAGIC_BYTES.to_vec();
        oversized.push(PROTOCOL_VERSION);
        oversized.extend_from_slice(&(20_000_000u32).to_be_bytes());
        assert!(matches!(
            Packet::from_bytes(&oversized),
            Err(ProtocolError::OversizedPacket(20_000_000))
        ));
    }

    #[test]
    fn test_try_new_enforces_payload_limit() {
        assert!(Packet::try_new(vec![0; MAX_PAYLOAD_SIZE]).is_ok());
        assert!(matches!(
            Packet::try_new(vec![0; MAX_PAYLOAD_SIZE + 1]),
            Err(ProtocolError::OversizedPacket(len)) if len == MAX_PAYLOAD_SIZE + 1
        ));
    }

    #[test]
    fn test_oversized_payload_never_decodes() {
        let bytes = Packet::new(vec![0; MAX_PAYLOAD_SIZE + 1]).to_bytes();
        assert!(matches!(
            Packet::from_bytes(&bytes),
            Err(ProtocolError::OversizedPacket(_))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = Packet::new(vec![7; 10]).to_bytes();
        assert!(Packet::from_bytes(&bytes[..12]).is_err());
    }
}
