//! Frame fragmentation
//!
//! An encoded frame is split into datagrams that each fit within the
//! configured maximum datagram size:
//!
//! ```text
//! offset 0   u32 sequence_number   (big endian)
//! offset 4   u32 total_fragments
//! offset 8   u32 fragment_index
//! offset 12  payload chunk         (<= max_datagram_size - 12)
//! ```
//!
//! Every fragment of a frame carries the same sequence number and total, so
//! a receiver can size its reassembly buffer from the first fragment it sees
//! and detect losses from index gaps.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::constants::FRAGMENT_HEADER_SIZE;

/// Fragment header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Sequence number of the frame this fragment belongs to
    pub sequence: u32,
    /// Number of fragments the frame was split into
    pub total_fragments: u32,
    /// Position of this fragment, 0-based
    pub fragment_index: u32,
}

impl FragmentHeader {
    pub fn new(sequence: u32, total_fragments: u32, fragment_index: u32) -> Self {
        Self {
            sequence,
            total_fragments,
            fragment_index,
        }
    }

    /// Write the header in network byte order
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.sequence);
        buf.put_u32(self.total_fragments);
        buf.put_u32(self.fragment_index);
    }

    /// Read a header, consuming 12 bytes
    pub fn decode(buf: &mut Bytes) -> Result<Self, FragmentError> {
        if buf.remaining() < FRAGMENT_HEADER_SIZE {
            return Err(FragmentError::TooShort(buf.remaining()));
        }

        let header = Self {
            sequence: buf.get_u32(),
            total_fragments: buf.get_u32(),
            fragment_index: buf.get_u32(),
        };

        if header.total_fragments == 0 {
            return Err(FragmentError::ZeroTotal);
        }
        if header.fragment_index >= header.total_fragments {
            return Err(FragmentError::IndexOutOfRange {
                index: header.fragment_index,
                total: header.total_fragments,
            });
        }

        Ok(header)
    }
}

/// A decoded datagram: header plus payload chunk
#[derive(Debug, Clone)]
pub struct Fragment {
    pub header: FragmentHeader,
    pub payload: Bytes,
}

impl Fragment {
    /// Parse a received datagram
    pub fn parse(datagram: Bytes) -> Result<Self, FragmentError> {
        let mut buf = datagram;
        let header = FragmentHeader::decode(&mut buf)?;
        Ok(Self {
            header,
            payload: buf,
        })
    }
}

/// Error decoding a received datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// Datagram shorter than the header
    TooShort(usize),
    /// Header claims zero fragments
    ZeroTotal,
    /// Index not below total
    IndexOutOfRange { index: u32, total: u32 },
}

impl std::fmt::Display for FragmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentError::TooShort(len) => {
                write!(f, "Datagram too short for header: {} bytes", len)
            }
            FragmentError::ZeroTotal => write!(f, "Fragment header has zero total"),
            FragmentError::IndexOutOfRange { index, total } => {
                write!(f, "Fragment index {} out of range (total {})", index, total)
            }
        }
    }
}

impl std::error::Error for FragmentError {}

/// Number of fragments a payload of `len` bytes needs
///
/// Returns 0 for an empty payload or when the datagram cannot hold any
/// payload after the header.
pub fn fragment_count(len: usize, max_datagram_size: usize) -> usize {
    let capacity = max_datagram_size.saturating_sub(FRAGMENT_HEADER_SIZE);
    if len == 0 || capacity == 0 {
        return 0;
    }
    len.div_ceil(capacity)
}

/// Splits encoded frames into datagrams
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    max_datagram_size: usize,
}

impl Fragmenter {
    /// Create a fragmenter for the given maximum datagram size
    ///
    /// The size must exceed the header size; the server config validates
    /// this before a fragmenter is built.
    pub fn new(max_datagram_size: usize) -> Self {
        Self { max_datagram_size }
    }

    /// Payload bytes carried per datagram
    pub fn payload_capacity(&self) -> usize {
        self.max_datagram_size.saturating_sub(FRAGMENT_HEADER_SIZE)
    }

    /// Split `payload` into datagrams in index order
    ///
    /// An empty payload produces no datagrams.
    pub fn fragment(&self, sequence: u32, payload: &[u8]) -> Vec<Bytes> {
        let total = fragment_count(payload.len(), self.max_datagram_size);
        if total == 0 {
            return Vec::new();
        }

        let capacity = self.payload_capacity();
        let mut datagrams = Vec::with_capacity(total);

        for (index, chunk) in payload.chunks(capacity).enumerate() {
            let mut buf = BytesMut::with_capacity(FRAGMENT_HEADER_SIZE + chunk.len());
            FragmentHeader::new(sequence, total as u32, index as u32).encode(&mut buf);
            buf.put_slice(chunk);
            datagrams.push(buf.freeze());
        }

        datagrams
    }
}

/// Convenience wrapper over [`Fragmenter::fragment`]
pub fn fragment_frame(sequence: u32, payload: &[u8], max_datagram_size: usize) -> Vec<Bytes> {
    Fragmenter::new(max_datagram_size).fragment(sequence, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_header_layout() {
        let mut buf = BytesMut::new();
        FragmentHeader::new(0x01020304, 5, 2).encode(&mut buf);

        assert_eq!(
            &buf[..],
            &[0x01, 0x02, 0x03, 0x04, 0, 0, 0, 5, 0, 0, 0, 2]
        );
    }

    #[test]
    fn test_header_decode_rejects_short() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 1, 0, 0]);
        assert_eq!(
            FragmentHeader::decode(&mut buf),
            Err(FragmentError::TooShort(6))
        );
    }

    #[test]
    fn test_header_decode_rejects_bad_index() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 2]);
        assert_eq!(
            FragmentHeader::decode(&mut buf),
            Err(FragmentError::IndexOutOfRange { index: 2, total: 2 })
        );

        let mut zero = Bytes::from_static(&[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(FragmentHeader::decode(&mut zero), Err(FragmentError::ZeroTotal));
    }

    #[test]
    fn test_100k_frame_makes_four_fragments() {
        let data = payload(100_000);
        let datagrams = fragment_frame(7, &data, 32768);

        assert_eq!(datagrams.len(), 4);
        for (i, dgram) in datagrams.iter().enumerate() {
            let frag = Fragment::parse(dgram.clone()).unwrap();
            assert_eq!(frag.header.sequence, 7);
            assert_eq!(frag.header.total_fragments, 4);
            assert_eq!(frag.header.fragment_index, i as u32);
            assert!(dgram.len() <= 32768);
        }

        let last = Fragment::parse(datagrams[3].clone()).unwrap();
        assert_eq!(last.payload.len(), 100_000 - 3 * 32756);
    }

    #[test]
    fn test_chunks_concatenate_to_payload() {
        for &(len, max) in &[(1usize, 13usize), (12, 13), (99, 20), (4096, 1024), (5000, 32768)] {
            let data = payload(len);
            let datagrams = fragment_frame(1, &data, max);
            assert_eq!(datagrams.len(), len.div_ceil(max - FRAGMENT_HEADER_SIZE));

            let mut joined = Vec::with_capacity(len);
            for dgram in datagrams {
                joined.extend_from_slice(&Fragment::parse(dgram).unwrap().payload);
            }
            assert_eq!(joined, data);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail() {
        let data = payload(40);
        let datagrams = fragment_frame(3, &data, 22);

        assert_eq!(datagrams.len(), 4);
        assert!(datagrams.iter().all(|d| d.len() == 22));
    }

    #[test]
    fn test_empty_payload() {
        assert!(fragment_frame(1, &[], 32768).is_empty());
        assert_eq!(fragment_count(0, 32768), 0);
    }

    #[test]
    fn test_no_capacity() {
        assert_eq!(fragment_count(10, FRAGMENT_HEADER_SIZE), 0);
        assert!(fragment_frame(1, &[1, 2, 3], 8).is_empty());
    }
}
