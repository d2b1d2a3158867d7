//! Address derivation from public keys.
//!
//! Address format: `<hrp>_` + base32(blake2b(public_key), 52 chars) + base32(checksum, 8 chars)
//!
//! Checksum: first 5 bytes of Blake2b-256(hrp ‖ payload), so an address copied
//! onto the wrong network fails validation.
//! Base32 alphabet: `13456789abcdefghijkmnopqrstuwxyz` (avoids ambiguous chars).

use tangle_types::{Address, PublicKey, TypesError};

/// Base32 alphabet (32 chars, avoids visually ambiguous 0/O, 2/Z, l/I, v).
const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let alpha = BASE32_ALPHABET;
    let mut i = 0;
    while i < 32 {
        table[alpha[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Expected length of the encoded part: 52 payload + 8 checksum.
const ENCODED_LEN: usize = 60;
/// Number of base32 characters for the payload (256 bits → ceil(256/5) = 52).
const PAYLOAD_CHARS: usize = 52;

fn encode_base32(bytes: &[u8]) -> String {
    let total_bits = bytes.len() * 8;
    let mut result = String::with_capacity(total_bits.div_ceil(5));

    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits_in_buffer += 8;
        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let idx = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[idx] as char);
        }
    }
    if bits_in_buffer > 0 {
        let idx = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[idx] as char);
    }

    result
}

/// Decode a base32 string into a fixed-size byte array. Returns `None` on
/// invalid characters or wrong length.
fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        if c >= 128 {
            return None;
        }
        let val = BASE32_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            if pos < N {
                result[pos] = (buffer >> bits_in_buffer) as u8;
                pos += 1;
            }
        }
    }

    if pos < N {
        return None;
    }
    Some(result)
}

fn checksum(hrp: &str, payload: &[u8; 32]) -> [u8; 5] {
    let hash = crate::blake2b_256(&[hrp.as_bytes(), &payload[..]]);
    let mut out = [0u8; 5];
    out.copy_from_slice(&hash[..5]);
    out
}

/// Derive the address controlled by `public_key` under the prefix `hrp`.
pub fn derive_address(public_key: &PublicKey, hrp: &str) -> Result<Address, TypesError> {
    let payload = crate::blake2b_256(&[&public_key.as_bytes()[..]]);
    Address::new(format!(
        "{}{}{}{}",
        hrp,
        Address::SEPARATOR,
        encode_base32(&payload),
        encode_base32(&checksum(hrp, &payload))
    ))
}

/// Extract the payload hash from a well-formed address.
///
/// Returns `None` if the address is malformed or has an invalid checksum.
pub fn decode_address(address: &str) -> Option<[u8; 32]> {
    let (hrp, encoded) = address.split_once(Address::SEPARATOR)?;
    if hrp.is_empty() || encoded.len() != ENCODED_LEN {
        return None;
    }

    let payload: [u8; 32] = decode_base32_fixed(&encoded[..PAYLOAD_CHARS])?;
    let check: [u8; 5] = decode_base32_fixed(&encoded[PAYLOAD_CHARS..])?;
    if check != checksum(hrp, &payload) {
        return None;
    }
    Some(payload)
}

/// Validate that an address string is well-formed and its checksum is correct.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}
