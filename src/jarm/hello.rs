//! ServerHello parsing.
//!
//! A probe answer has the form `cipher|version|alpn|extensions`, where
//! `cipher` and `version` are hex, `alpn` is the negotiated protocol and
//! `extensions` is a dash-separated list of hex extension types. A response
//! that is not a ServerHello answers `|||`.

use super::FingerprintError;

const CONTENT_ALERT: u8 = 21;
const CONTENT_HANDSHAKE: u8 = 22;
const HANDSHAKE_SERVER_HELLO: u8 = 2;
const EXT_ALPN: [u8; 2] = [0x00, 0x10];

/// The answer recorded for a probe that got no usable ServerHello.
pub const EMPTY_ANSWER: &str = "|||";

/// Parse the first bytes a server sent back into a probe answer.
///
/// Fails only when the data is a ServerHello cut off before its cipher suite.
pub fn parse_server_hello(data: &[u8]) -> Result<String, FingerprintError> {
    let Some(&content_type) = data.first() else {
        return Ok(EMPTY_ANSWER.to_string());
    };
    if content_type == CONTENT_ALERT {
        return Ok(EMPTY_ANSWER.to_string());
    }
    if content_type != CONTENT_HANDSHAKE || data.get(5) != Some(&HANDSHAKE_SERVER_HELLO) {
        return Ok(EMPTY_ANSWER.to_string());
    }

    if data.len() < 44 {
        return Err(FingerprintError::Truncated(data.len()));
    }
    let hello_length = u16::from_be_bytes([data[3], data[4]]) as usize;
    let session_id_len = data[43] as usize;
    let cipher_offset = session_id_len + 44;
    let Some(cipher) = data.get(cipher_offset..cipher_offset + 2) else {
        return Err(FingerprintError::Truncated(data.len()));
    };

    Ok(format!(
        "{}|{}|{}",
        hex(cipher),
        hex(&data[9..11]),
        extension_info(data, session_id_len, hello_length)
    ))
}

/// Extract `alpn|ext-ext-...` from the extension block, or `|` when absent
/// or malformed.
fn extension_info(data: &[u8], counter: usize, hello_length: usize) -> String {
    const NONE: &str = "|";

    // Certificate record right behind a ServerHello without extensions
    if data.get(counter + 47) == Some(&11) {
        return NONE.to_string();
    }
    if data.get(counter + 50..counter + 53) == Some(&[0x0e, 0xac, 0x0b][..])
        || data.get(82..85) == Some(&[0x0f, 0xf0, 0x0b][..])
    {
        return NONE.to_string();
    }
    if counter + 42 >= hello_length {
        return NONE.to_string();
    }

    let Some(length) = read_u16(data, counter + 47) else {
        return NONE.to_string();
    };
    let mut offset = counter + 49;
    let end = offset + length;

    let mut types: Vec<&[u8]> = Vec::new();
    let mut values: Vec<&[u8]> = Vec::new();
    while offset < end {
        let ext_type = data.get(offset..offset + 2);
        let (Some(ext_type), Some(ext_len)) = (ext_type, read_u16(data, offset + 2)) else {
            return NONE.to_string();
        };
        let Some(value) = data.get(offset + 4..offset + 4 + ext_len) else {
            return NONE.to_string();
        };
        types.push(ext_type);
        values.push(value);
        offset += ext_len + 4;
    }

    let alpn = types
        .iter()
        .position(|t| *t == EXT_ALPN)
        .and_then(|i| values[i].get(3..))
        .map(|proto| String::from_utf8_lossy(proto).into_owned())
        .unwrap_or_default();

    let extensions: Vec<String> = types.iter().map(|t| hex(t)).collect();
    format!("{}|{}", alpn, extensions.join("-"))
}

fn read_u16(data: &[u8], offset: usize) -> Option<usize> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
