//! Wire-format definitions for PTP segments.
//!
//! Every datagram exchanged between sender and receiver is a [`Segment`].
//! This module is responsible for:
//! - Defining the on-wire layout (type field, textual sequence number, payload).
//! - Serialising a [`Segment`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Segment`], returning errors
//!   for malformed or truncated input.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! ```text
//!  0       2                                           12
//! +-------+--------------------------------------------+------------------
//! | type  |  sequence number, 10 ASCII decimal digits  |  payload ...
//! | (u16) |  zero-padded                               |  (DATA only)
//! +-------+--------------------------------------------+------------------
//! ```
//!
//! The type field is big-endian.  The sequence number is *text*, so the
//! logical value is not limited to 16 bits on the wire; only its display form
//! is reduced modulo 65536 (see [`Segment::display_seq`]).

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 12;

/// Maximum payload carried by one DATA segment (maximum segment size).
pub const MSS: usize = 1000;

/// Number of ASCII digits used for the sequence number field.
pub const SEQ_DIGITS: usize = 10;

/// Largest sequence number that fits in [`SEQ_DIGITS`] decimal digits.
pub const MAX_SEQ: u64 = 9_999_999_999;

/// Modulus applied to sequence numbers when they are logged.
pub const DISPLAY_SEQ_MODULUS: u64 = 65_536;

const OFF_KIND: usize = 0;
const OFF_SEQ: usize = 2;

/// Segment type carried in the first two header bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Data = 0,
    Ack = 1,
    Syn = 2,
    Fin = 3,
    Abort = 4,
}

impl SegmentKind {
    /// Upper-case name used in trace lines.
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Data => "DATA",
            SegmentKind::Ack => "ACK",
            SegmentKind::Syn => "SYN",
            SegmentKind::Fin => "FIN",
            SegmentKind::Abort => "ABORT",
        }
    }
}

impl TryFrom<u16> for SegmentKind {
    type Error = SegmentError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SegmentKind::Data),
            1 => Ok(SegmentKind::Ack),
            2 => Ok(SegmentKind::Syn),
            3 => Ok(SegmentKind::Fin),
            4 => Ok(SegmentKind::Abort),
            other => Err(SegmentError::UnknownKind(other)),
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete PTP datagram: type, sequence number and payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl Segment {
    /// Build a payload-less control segment (SYN, ACK, FIN, ABORT).
    pub fn control(kind: SegmentKind, seq: u64) -> Self {
        Self {
            kind,
            seq,
            payload: Vec::new(),
        }
    }

    /// Build a DATA segment.
    pub fn data(seq: u64, payload: Vec<u8>) -> Self {
        Self {
            kind: SegmentKind::Data,
            seq,
            payload,
        }
    }

    /// Sequence number one past the last payload byte.
    ///
    /// A cumulative ACK for this segment carries exactly this value.
    pub fn end_seq(&self) -> u64 {
        self.seq + self.payload.len() as u64
    }

    /// Sequence number as shown in logs: reduced into a 16-bit space.
    pub fn display_seq(&self) -> u64 {
        self.seq % DISPLAY_SEQ_MODULUS
    }

    /// Serialise this segment into a newly allocated byte vector.
    ///
    /// Fails with [`SegmentError::SequenceOverflow`] when the sequence number
    /// needs more than [`SEQ_DIGITS`] digits.
    pub fn encode(&self) -> Result<Vec<u8>, SegmentError> {
        if self.seq > MAX_SEQ {
            return Err(SegmentError::SequenceOverflow(self.seq));
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&(self.kind as u16).to_be_bytes());
        buf.extend_from_slice(format!("{:0width$}", self.seq, width = SEQ_DIGITS).as_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a [`Segment`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the type field is not a known [`SegmentKind`], or
    /// - the sequence field is not exactly [`SEQ_DIGITS`] ASCII digits.
    pub fn decode(buf: &[u8]) -> Result<Self, SegmentError> {
        if buf.len() < HEADER_LEN {
            return Err(SegmentError::BufferTooShort(buf.len()));
        }

        let kind = SegmentKind::try_from(u16::from_be_bytes([buf[OFF_KIND], buf[OFF_KIND + 1]]))?;

        let digits = &buf[OFF_SEQ..HEADER_LEN];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(SegmentError::BadSequence);
        }
        // Ten ASCII digits always fit in a u64.
        let seq = digits
            .iter()
            .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0'));

        Ok(Segment {
            kind,
            seq,
            payload: buf[HEADER_LEN..].to_vec(),
        })
    }
}

/// Errors that can arise when building or parsing a raw datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    #[error("buffer of {0} bytes is too short to contain a header")]
    BufferTooShort(usize),
    #[error("unknown segment type {0}")]
    UnknownKind(u16),
    #[error("sequence field is not 10 ASCII digits")]
    BadSequence,
    #[error("sequence number {0} does not fit in 10 digits")]
    SequenceOverflow(u64),
}
