//! Minimal Solidity ABI support for argument-less view calls
//!
//! Only what the Entity and Manager reads need: 4-byte selectors, and
//! decoding of `address`, `bool`, `uint256`, `string`, `address[]` and
//! `uint256[]` return values.

use sha3::{Digest, Keccak256};

use crate::{Error, Result};

const WORD: usize = 32;

/// First four bytes of keccak-256 of the canonical signature, e.g. `name()`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `0x`-prefixed calldata for a call without arguments
pub fn encode_call(signature: &str) -> String {
    format!("0x{}", hex::encode(selector(signature)))
}

/// Parse `0x`-prefixed hex return data
pub fn decode_hex(data: &str) -> Result<Vec<u8>> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(digits).map_err(|e| Error::ParseError(format!("invalid hex return data: {}", e)))
}

pub fn decode_address(data: &[u8]) -> Result<String> {
    address_from_word(word(data, 0)?)
}

pub fn decode_bool(data: &[u8]) -> Result<bool> {
    let value = uint_from_word(word(data, 0)?)?;
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::ParseError(format!("invalid bool word {}", other))),
    }
}

pub fn decode_uint(data: &[u8]) -> Result<u128> {
    uint_from_word(word(data, 0)?)
}

pub fn decode_string(data: &[u8]) -> Result<String> {
    let (len, start) = dynamic_header(data)?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::ParseError("string data truncated".into()))?;
    String::from_utf8(data[start..end].to_vec())
        .map_err(|e| Error::ParseError(format!("string is not UTF-8: {}", e)))
}

pub fn decode_address_array(data: &[u8]) -> Result<Vec<String>> {
    let (len, start) = dynamic_header(data)?;
    (0..len)
        .map(|i| address_from_word(word(data, start + i * WORD)?))
        .collect()
}

pub fn decode_uint_array(data: &[u8]) -> Result<Vec<u128>> {
    let (len, start) = dynamic_header(data)?;
    (0..len)
        .map(|i| uint_from_word(word(data, start + i * WORD)?))
        .collect()
}

// ── Helpers ────────────────────────────────────────────────

fn word(data: &[u8], offset: usize) -> Result<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            Error::ParseError(format!(
                "return data too short: need a word at offset {}, have {} bytes",
                offset,
                data.len()
            ))
        })
}

/// Length and start of the element area of the first (dynamic) return value
fn dynamic_header(data: &[u8]) -> Result<(usize, usize)> {
    let offset = small_uint(word(data, 0)?)?;
    let len = small_uint(word(data, offset)?)?;
    if len > data.len() {
        return Err(Error::ParseError(format!("dynamic length {} exceeds return data", len)));
    }
    Ok((len, offset + WORD))
}

fn uint_from_word(w: &[u8]) -> Result<u128> {
    if w[..16].iter().any(|&b| b != 0) {
        return Err(Error::ParseError("uint256 value exceeds 128 bits".into()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&w[16..]);
    Ok(u128::from_be_bytes(buf))
}

fn small_uint(w: &[u8]) -> Result<usize> {
    usize::try_from(uint_from_word(w)?)
        .map_err(|_| Error::ParseError("offset or length out of range".into()))
}

fn address_from_word(w: &[u8]) -> Result<String> {
    if w[..12].iter().any(|&b| b != 0) {
        return Err(Error::ParseError("address word has non-zero padding".into()));
    }
    Ok(format!("0x{}", hex::encode(&w[12..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint_word(v: u128) -> String {
        format!("{:064x}", v)
    }

    fn addr_word(addr: &str) -> String {
        format!("{:0>64}", addr.trim_start_matches("0x"))
    }

    #[test]
    fn test_known_selectors() {
        assert_eq!(encode_call("name()"), "0x06fdde03");
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn test_decode_address() {
        let data = decode_hex(&format!("0x{}", addr_word("0x5FbDB2315678afecb367f032d93F642f64180aa3"))).unwrap();
        assert_eq!(
            decode_address(&data).unwrap(),
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        );
    }

    #[test]
    fn test_decode_bool() {
        assert!(decode_bool(&decode_hex(&uint_word(1)).unwrap()).unwrap());
        assert!(!decode_bool(&decode_hex(&uint_word(0)).unwrap()).unwrap());
        assert!(decode_bool(&decode_hex(&uint_word(2)).unwrap()).is_err());
    }

    #[test]
    fn test_decode_uint_array() {
        let hex = format!("0x{}{}{}{}{}", uint_word(32), uint_word(3), uint_word(100), uint_word(1_700_000_000), uint_word(1));
        let values = decode_uint_array(&decode_hex(&hex).unwrap()).unwrap();
        assert_eq!(values, vec![100, 1_700_000_000, 1]);
    }

    #[test]
    fn test_decode_address_array() {
        let hex = format!(
            "{}{}{}{}",
            uint_word(32),
            uint_word(2),
            addr_word("0x1111111111111111111111111111111111111111"),
            addr_word("0x2222222222222222222222222222222222222222")
        );
        let addrs = decode_address_array(&decode_hex(&hex).unwrap()).unwrap();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[1], "0x2222222222222222222222222222222222222222");
    }

    #[test]
    fn test_decode_empty_array() {
        let hex = format!("{}{}", uint_word(32), uint_word(0));
        assert!(decode_address_array(&decode_hex(&hex).unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_string() {
        let text = hex::encode("Acme Corp");
        let hex = format!("{}{}{:0<64}", uint_word(32), uint_word(9), text);
        assert_eq!(decode_string(&decode_hex(&hex).unwrap()).unwrap(), "Acme Corp");
    }

    #[test]
    fn test_truncated_data_rejected() {
        let hex = format!("{}{}", uint_word(32), uint_word(5));
        assert!(decode_uint_array(&decode_hex(&hex).unwrap()).is_err());
        assert!(decode_address(&[0u8; 10]).is_err());
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn test_uint_over_128_bits_rejected() {
        let data = decode_hex(&"ff".repeat(32)).unwrap();
        assert!(decode_uint(&data).is_err());
    }
}
