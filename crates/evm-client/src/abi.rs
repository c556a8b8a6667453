//! Minimal ABI codec for the marketplace's fixed call surface
//!
//! Every call the client makes takes only static arguments (addresses and
//! 256-bit words), so encoding is selector + packed 32-byte words. Dynamic
//! decoding exists solely for the `Error(string)` revert path in `revert`.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use surety_core::RpcError;

/// 4-byte function selector: leading bytes of keccak-256 over the signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata accumulator for static-argument calls
#[derive(Debug, Clone)]
pub struct CallData {
    buf: Vec<u8>,
}

impl CallData {
    /// Start calldata for the given function signature.
    pub fn new(signature: &str) -> Self {
        Self {
            buf: selector(signature).to_vec(),
        }
    }

    /// Append an address argument (left-padded to 32 bytes).
    pub fn address(mut self, value: Address) -> Self {
        self.buf.extend_from_slice(value.into_word().as_slice());
        self
    }

    /// Append a uint256 argument.
    pub fn uint(mut self, value: U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    /// Append a uint argument given as u64.
    pub fn uint64(self, value: u64) -> Self {
        self.uint(U256::from(value))
    }

    pub fn build(self) -> Bytes {
        Bytes::from(self.buf)
    }
}

/// Read the 32-byte word at the given index of return data.
pub fn word_at(data: &[u8], index: usize) -> Result<[u8; 32], RpcError> {
    let start = index * 32;
    let end = start + 32;
    if data.len() < end {
        return Err(RpcError::ParseError(format!(
            "return data too short: wanted word {}, have {} bytes",
            index,
            data.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&data[start..end]);
    Ok(word)
}

/// Decode the word at the given index as an unsigned 256-bit integer.
pub fn uint_at(data: &[u8], index: usize) -> Result<U256, RpcError> {
    Ok(U256::from_be_bytes(word_at(data, index)?))
}

/// Decode a single-word uint256 return value.
pub fn decode_uint(data: &[u8]) -> Result<U256, RpcError> {
    uint_at(data, 0)
}

/// Whether a word holds a negative two's-complement int256.
pub fn is_negative_int(word: &[u8; 32]) -> bool {
    word[0] & 0x80 != 0
}
