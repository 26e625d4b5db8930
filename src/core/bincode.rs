/*!
 * Binary Record Framing with bincode
 * Size-prefixed bincode records used by the trace segment format
 *
 * Format: [4-byte LE length][bincode payload]
 */

use serde::{de::DeserializeOwned, Serialize};
use std::io::{self, Read, Write};

use super::limits::MAX_TRACE_RECORD_SIZE;

/// Result type for bincode operations
pub type BincodeResult<T> = Result<T, BincodeError>;

/// Binary serialization errors
#[derive(Debug, thiserror::Error)]
pub enum BincodeError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    #[error("Record too large: {0} bytes")]
    TooLarge(usize),
    #[error("Truncated record: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serialize to binary bytes using bincode
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| BincodeError::Serialization(e.to_string()))
}

/// Deserialize from binary bytes using bincode
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> BincodeResult<T> {
    bincode::deserialize(bytes).map_err(|e| BincodeError::Deserialization(e.to_string()))
}

/// Serialize with size prefix
pub fn to_vec_with_size<T: Serialize>(value: &T) -> BincodeResult<Vec<u8>> {
    let data = to_vec(value)?;
    if data.len() > MAX_TRACE_RECORD_SIZE {
        return Err(BincodeError::TooLarge(data.len()));
    }
    let len = data.len() as u32;

    let mut result = Vec::with_capacity(4 + data.len());
    result.extend_from_slice(&len.to_le_bytes());
    result.extend_from_slice(&data);

    Ok(result)
}

/// Write one size-prefixed record to a stream
pub fn write_record<W: Write, T: Serialize>(writer: &mut W, value: &T) -> BincodeResult<usize> {
    let bytes = to_vec_with_size(value)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Read one size-prefixed record from a stream
///
/// Returns `Ok(None)` on a clean end of stream (no bytes of a new record read).
/// A record cut short anywhere after its first byte is `Truncated`.
pub fn read_record<R: Read, T: DeserializeOwned>(reader: &mut R) -> BincodeResult<Option<T>> {
    let mut prefix = [0u8; 4];
    let got = read_full(reader, &mut prefix)?;
    if got == 0 {
        return Ok(None);
    }
    if got < prefix.len() {
        return Err(BincodeError::Truncated { expected: 4, got });
    }

    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_TRACE_RECORD_SIZE {
        return Err(BincodeError::TooLarge(len));
    }

    let mut payload = vec![0u8; len];
    let got = read_full(reader, &mut payload)?;
    if got < len {
        return Err(BincodeError::Truncated { expected: len, got });
    }

    from_slice(&payload).map(Some)
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
