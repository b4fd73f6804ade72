//! Reduction of ten probe answers into a 62 character fingerprint.
//!
//! The first 30 characters encode, per answer, the chosen cipher suite
//! (two hex digits) and the TLS version (one letter). The last 32 are a
//! truncated SHA-256 over every answer's ALPN and extension list.

use sha2::{Digest, Sha256};

/// Length of a fingerprint.
pub const FINGERPRINT_LEN: usize = 62;

/// Cipher suites a server may pick, in the order used for the cipher index.
const CIPHER_INDEX: [&str; 69] = [
    "0004", "0005", "0007", "000a", "0016", "002f", "0033", "0035", "0039", "003c", "003d",
    "0041", "0045", "0067", "006b", "0084", "0088", "009a", "009c", "009d", "009e", "009f",
    "00ba", "00be", "00c0", "00c4", "c007", "c008", "c009", "c00a", "c011", "c012", "c013",
    "c014", "c023", "c024", "c027", "c028", "c02b", "c02c", "c02f", "c030", "c060", "c061",
    "c072", "c073", "c076", "c077", "c09c", "c09d", "c09e", "c09f", "c0a0", "c0a1", "c0a2",
    "c0a3", "c0ac", "c0ad", "c0ae", "c0af", "cc13", "cc14", "cca8", "cca9", "1301", "1302",
    "1303", "1304", "1305",
];

/// The fingerprint of a server that answered none of the probes.
pub fn zero_fingerprint() -> String {
    "0".repeat(FINGERPRINT_LEN)
}

/// Reduce comma-joined probe answers to a fingerprint.
pub fn fuzzy_hash(raw: &str) -> String {
    let answers: Vec<[&str; 4]> = raw.split(',').map(split_answer).collect();
    if answers.iter().all(|a| a.iter().all(|part| part.is_empty())) {
        return zero_fingerprint();
    }

    let mut fingerprint = String::with_capacity(FINGERPRINT_LEN);
    let mut alpns_and_extensions = String::new();
    for [cipher, version, alpn, extensions] in &answers {
        fingerprint.push_str(&cipher_bytes(cipher));
        fingerprint.push(version_byte(version));
        alpns_and_extensions.push_str(alpn);
        alpns_and_extensions.push_str(extensions);
    }

    let digest = Sha256::digest(alpns_and_extensions.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    fingerprint.push_str(&hex[..32]);
    fingerprint
}

/// An answer without exactly four fields counts as empty.
fn split_answer(answer: &str) -> [&str; 4] {
    let mut parts = answer.split('|');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), Some(c), Some(d), None) => [a, b, c, d],
        _ => ["", "", "", ""],
    }
}

/// Two hex digits for the 1-based position of `cipher` in the index, `00`
/// for no cipher and one past the end for an unknown one.
fn cipher_bytes(cipher: &str) -> String {
    if cipher.is_empty() {
        return "00".to_string();
    }
    let position = CIPHER_INDEX
        .iter()
        .position(|c| *c == cipher)
        .unwrap_or(CIPHER_INDEX.len());
    format!("{:02x}", position + 1)
}

/// `a` through `f` for TLS record versions 0300 to 0305, `0` otherwise.
fn version_byte(version: &str) -> char {
    version
        .chars()
        .nth(3)
        .and_then(|c| c.to_digit(10))
        .and_then(|d| "abcdef".chars().nth(d as usize))
        .unwrap_or('0')
}
