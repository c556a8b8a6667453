//! Revert-reason decoding
//!
//! Classification is strictly ordered: decode the revert payload against
//! known error ABIs first, then pattern-match the raw node/wallet message,
//! then preserve whatever we got verbatim. Tests assert the classification,
//! not substrings.

use alloy_primitives::{Address, B256};
use surety_core::DecodedError;

use crate::abi::{selector, uint_at, word_at};

/// Custom errors declared by the marketplace contract
const KNOWN_MARKET_ERRORS: [&str; 6] = [
    "ZeroAmount()",
    "InsufficientCollateral(uint256,uint256)",
    "UnsupportedDuration(uint256)",
    "RequestNotOpen(uint256)",
    "OfferNotOpen(uint256)",
    "StalePrice(address)",
];

/// Classify a revert from a simulation or a mined-but-failed transaction.
///
/// `data` is the raw revert payload when the node supplied one; `message` is
/// the error text that accompanied it.
pub fn decode_revert(data: Option<&[u8]>, message: &str) -> DecodedError {
    if let Some(data) = data {
        if let Some(decoded) = decode_revert_payload(data) {
            return decoded;
        }
        if !data.is_empty() && message.is_empty() {
            return DecodedError::unknown_from_bytes(data);
        }
    }

    if message.is_empty() {
        return DecodedError::Unknown {
            raw: "execution reverted".into(),
        };
    }
    DecodedError::from_message(message)
}

fn decode_revert_payload(data: &[u8]) -> Option<DecodedError> {
    if data.len() < 4 {
        return None;
    }
    let sel: [u8; 4] = data[..4].try_into().ok()?;
    let body = &data[4..];

    if sel == selector("Error(string)") {
        let reason = decode_abi_string(body)?;
        return Some(DecodedError::AbiDecoded {
            name: "Error".into(),
            args: vec![reason],
        });
    }

    if sel == selector("Panic(uint256)") {
        let code = uint_at(body, 0).ok()?;
        let code = u64::try_from(code).unwrap_or(u64::MAX);
        return Some(DecodedError::AbiDecoded {
            name: "Panic".into(),
            args: vec![format!("{} (code 0x{:02x})", panic_text(code), code)],
        });
    }

    for signature in KNOWN_MARKET_ERRORS {
        if sel == selector(signature) {
            return decode_known_error(signature, body);
        }
    }

    None
}

/// Decode a dynamic `string` laid out as offset word, length word, bytes.
fn decode_abi_string(body: &[u8]) -> Option<String> {
    let offset = usize::try_from(uint_at(body, 0).ok()?).ok()?;
    let len_word = body.get(offset..offset + 32)?;
    let len = usize::try_from(uint_at(len_word, 0).ok()?).ok()?;
    let bytes = body.get(offset + 32..offset + 32 + len)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Decode a custom error with static arguments against its signature.
fn decode_known_error(signature: &str, body: &[u8]) -> Option<DecodedError> {
    let paren = signature.find('(')?;
    let name = &signature[..paren];
    let params = &signature[paren + 1..signature.len() - 1];

    let mut args = Vec::new();
    if !params.is_empty() {
        for (index, param) in params.split(',').enumerate() {
            let arg = match param {
                "address" => {
                    let word = word_at(body, index).ok()?;
                    Address::from_word(B256::from(word)).to_string()
                }
                _ => uint_at(body, index).ok()?.to_string(),
            };
            args.push(arg);
        }
    }

    Some(DecodedError::AbiDecoded {
        name: name.into(),
        args,
    })
}

fn panic_text(code: u64) -> &'static str {
    match code {
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to uninitialized function",
        _ => "panic",
    }
}
