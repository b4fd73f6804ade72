//! JARM probe plans and ClientHello construction.
//!
//! Each plan varies one aspect of an otherwise fixed ClientHello: protocol
//! version, cipher list and ordering, GREASE, ALPN list, supported versions
//! and extension ordering. Servers answer each variation differently, and
//! the ten answers together form the fingerprint.

use rand::seq::SliceRandom;
use rand::Rng;

/// Record/ClientHello protocol version offered by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    Tls11,
    Tls12,
    Tls13,
}

/// Which cipher list to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherList {
    /// Every cipher JARM knows about, TLS 1.3 suites included.
    All,
    /// The same list without TLS 1.3 suites.
    NoTls13,
}

/// Ordering applied to ciphers, ALPN protocols and supported versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Forward,
    Reverse,
    TopHalf,
    BottomHalf,
    MiddleOut,
}

/// Which ALPN protocols to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alpn {
    Common,
    /// Omits `h2` and `http/1.1`.
    Rare,
}

/// Contents of the supported_versions extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSupport {
    /// TLS 1.0 to 1.2.
    Tls12,
    /// TLS 1.0 to 1.3.
    Tls13,
    /// No extension unless the probe itself is TLS 1.3.
    None,
}

/// Parameters for one JARM probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub host: String,
    pub port: u16,
    pub version: TlsVersion,
    pub ciphers: CipherList,
    pub cipher_order: Order,
    pub grease: bool,
    pub alpn: Alpn,
    pub version_support: VersionSupport,
    pub extension_order: Order,
}

/// Cipher suites offered by [`CipherList::All`], in wire order.
const ALL_CIPHERS: &[u16] = &[
    0x0016, 0x0033, 0x0067, 0xc09e, 0xc0a2, 0x009e, 0x0039, 0x006b, 0xc09f, 0xc0a3, 0x009f,
    0x0045, 0x00be, 0x0088, 0x00c4, 0x009a, 0xc008, 0xc009, 0xc023, 0xc0ac, 0xc0ae, 0xc02b,
    0xc00a, 0xc024, 0xc0ad, 0xc0af, 0xc02c, 0xc072, 0xc073, 0xcca9, 0x1302, 0x1301, 0xcc14,
    0xc007, 0xc012, 0xc013, 0xc027, 0xc02f, 0xc014, 0xc028, 0xc030, 0xc060, 0xc061, 0xc076,
    0xc077, 0xcca8, 0x1305, 0x1304, 0x1303, 0xcc13, 0xc011, 0x000a, 0x002f, 0x003c, 0xc09c,
    0xc0a0, 0x009c, 0x0035, 0x003d, 0xc09d, 0xc0a1, 0x009d, 0x0041, 0x00ba, 0x0084, 0x00c0,
    0x0007, 0x0004, 0x0005,
];

const GREASE_VALUES: &[u16] = &[
    0x0a0a, 0x1a1a, 0x2a2a, 0x3a3a, 0x4a4a, 0x5a5a, 0x6a6a, 0x7a7a, 0x8a8a, 0x9a9a, 0xaaaa,
    0xbaba, 0xcaca, 0xdada, 0xeaea, 0xfafa,
];

const ALPN_COMMON: &[&[u8]] = &[
    b"http/0.9", b"http/1.0", b"http/1.1", b"spdy/1", b"spdy/2", b"spdy/3", b"h2", b"h2c", b"hq",
];

const ALPN_RARE: &[&[u8]] = &[
    b"http/0.9", b"http/1.0", b"spdy/1", b"spdy/2", b"spdy/3", b"h2c", b"hq",
];

/// Signature algorithms extension, sent verbatim.
const SIGNATURE_ALGORITHMS: &[u8] = &[
    0x00, 0x0d, 0x00, 0x14, 0x00, 0x12, 0x04, 0x03, 0x08, 0x04, 0x04, 0x01, 0x05, 0x03, 0x08,
    0x05, 0x05, 0x01, 0x08, 0x06, 0x06, 0x01, 0x02, 0x01,
];

/// The ten JARM probes for a host, in the order their answers are hashed.
pub fn probes(host: &str, port: u16) -> Vec<ProbePlan> {
    use Alpn::{Common, Rare};
    use CipherList::{All, NoTls13};
    use Order::*;
    use TlsVersion::*;

    let plan = |version, ciphers, cipher_order, grease, alpn, version_support, extension_order| {
        ProbePlan {
            host: host.to_string(),
            port,
            version,
            ciphers,
            cipher_order,
            grease,
            alpn,
            version_support,
            extension_order,
        }
    };

    vec![
        plan(Tls12, All, Forward, false, Common, VersionSupport::Tls12, Reverse),
        plan(Tls12, All, Reverse, false, Common, VersionSupport::Tls12, Forward),
        plan(Tls12, All, TopHalf, false, Common, VersionSupport::None, Forward),
        plan(Tls12, All, BottomHalf, false, Rare, VersionSupport::None, Forward),
        plan(Tls12, All, MiddleOut, true, Rare, VersionSupport::None, Reverse),
        plan(Tls11, All, Forward, false, Common, VersionSupport::None, Forward),
        plan(Tls13, All, Forward, false, Common, VersionSupport::Tls13, Reverse),
        plan(Tls13, All, Reverse, false, Common, VersionSupport::Tls13, Forward),
        plan(Tls13, NoTls13, Forward, false, Common, VersionSupport::Tls13, Forward),
        plan(Tls13, All, MiddleOut, true, Common, VersionSupport::Tls13, Reverse),
    ]
}

/// Reorder `items` according to `order`.
pub fn reorder<T: Clone>(items: &[T], order: Order) -> Vec<T> {
    let len = items.len();
    match order {
        Order::Forward => items.to_vec(),
        Order::Reverse => items.iter().rev().cloned().collect(),
        Order::BottomHalf => items[len / 2 + len % 2..].to_vec(),
        Order::TopHalf => {
            // The middle element of an odd-length list belongs to the top half
            let mut output = Vec::with_capacity(len / 2 + 1);
            if len % 2 == 1 {
                output.push(items[len / 2].clone());
            }
            output.extend(reorder(&reorder(items, Order::Reverse), Order::BottomHalf));
            output
        }
        Order::MiddleOut => {
            let middle = len / 2;
            let mut output = Vec::with_capacity(len);
            if len % 2 == 1 {
                output.push(items[middle].clone());
                for i in 1..=middle {
                    output.push(items[middle + i].clone());
                    output.push(items[middle - i].clone());
                }
            } else {
                for i in 1..=middle {
                    output.push(items[middle - 1 + i].clone());
                    output.push(items[middle - i].clone());
                }
            }
            output
        }
    }
}

/// Longest name a DNS host can have. Longer names are sent without SNI.
pub const MAX_SERVER_NAME: usize = 255;

/// Serialize the ClientHello record for a probe.
pub fn build(plan: &ProbePlan) -> Vec<u8> {
    let mut rng = rand::thread_rng();

    let (record_version, hello_version): ([u8; 2], [u8; 2]) = match plan.version {
        TlsVersion::Tls11 => ([0x03, 0x02], [0x03, 0x02]),
        TlsVersion::Tls12 => ([0x03, 0x03], [0x03, 0x03]),
        TlsVersion::Tls13 => ([0x03, 0x01], [0x03, 0x03]),
    };

    let mut hello = Vec::with_capacity(512);
    hello.extend_from_slice(&hello_version);

    let mut random = [0u8; 32];
    rng.fill(&mut random);
    hello.extend_from_slice(&random);

    let mut session_id = [0u8; 32];
    rng.fill(&mut session_id);
    hello.push(session_id.len() as u8);
    hello.extend_from_slice(&session_id);

    let ciphers = cipher_bytes(plan, &mut rng);
    push_u16(&mut hello, ciphers.len());
    hello.extend_from_slice(&ciphers);

    // One compression method: null
    hello.extend_from_slice(&[0x01, 0x00]);
    hello.extend_from_slice(&extensions(plan, &mut rng));

    let mut handshake = Vec::with_capacity(hello.len() + 4);
    handshake.push(0x01);
    handshake.push(0x00);
    push_u16(&mut handshake, hello.len());
    handshake.extend_from_slice(&hello);

    let mut record = Vec::with_capacity(handshake.len() + 5);
    record.push(0x16);
    record.extend_from_slice(&record_version);
    push_u16(&mut record, handshake.len());
    record.extend_from_slice(&handshake);
    record
}

fn cipher_bytes(plan: &ProbePlan, rng: &mut impl Rng) -> Vec<u8> {
    let list: Vec<u16> = match plan.ciphers {
        CipherList::All => ALL_CIPHERS.to_vec(),
        CipherList::NoTls13 => ALL_CIPHERS
            .iter()
            .copied()
            .filter(|&c| c >> 8 != 0x13)
            .collect(),
    };

    let mut list = reorder(&list, plan.cipher_order);
    if plan.grease {
        list.insert(0, random_grease(rng));
    }
    list.iter().flat_map(|c| c.to_be_bytes()).collect()
}

fn extensions(plan: &ProbePlan, rng: &mut impl Rng) -> Vec<u8> {
    let mut ext = Vec::with_capacity(384);

    if plan.grease {
        ext.extend_from_slice(&random_grease(rng).to_be_bytes());
        ext.extend_from_slice(&[0x00, 0x00]);
    }

    ext.extend_from_slice(&server_name(&plan.host));
    // extended_master_secret
    ext.extend_from_slice(&[0x00, 0x17, 0x00, 0x00]);
    // max_fragment_length
    ext.extend_from_slice(&[0x00, 0x01, 0x00, 0x01, 0x01]);
    // renegotiation_info
    ext.extend_from_slice(&[0xff, 0x01, 0x00, 0x01, 0x00]);
    // supported_groups: x25519, secp256r1, secp384r1, secp521r1
    ext.extend_from_slice(&[
        0x00, 0x0a, 0x00, 0x0a, 0x00, 0x08, 0x00, 0x1d, 0x00, 0x17, 0x00, 0x18, 0x00, 0x19,
    ]);
    // ec_point_formats
    ext.extend_from_slice(&[0x00, 0x0b, 0x00, 0x02, 0x01, 0x00]);
    // session_ticket
    ext.extend_from_slice(&[0x00, 0x23, 0x00, 0x00]);
    ext.extend_from_slice(&alpn(plan));
    ext.extend_from_slice(SIGNATURE_ALGORITHMS);
    ext.extend_from_slice(&key_share(plan.grease, rng));
    // psk_key_exchange_modes
    ext.extend_from_slice(&[0x00, 0x2d, 0x00, 0x02, 0x01, 0x01]);

    if plan.version == TlsVersion::Tls13 || plan.version_support == VersionSupport::Tls12 {
        ext.extend_from_slice(&supported_versions(plan, rng));
    }

    let mut out = Vec::with_capacity(ext.len() + 2);
    push_u16(&mut out, ext.len());
    out.extend_from_slice(&ext);
    out
}

fn server_name(host: &str) -> Vec<u8> {
    let name = host.as_bytes();
    if name.is_empty() || name.len() > MAX_SERVER_NAME {
        return Vec::new();
    }
    let mut ext = vec![0x00, 0x00];
    push_u16(&mut ext, name.len() + 5);
    push_u16(&mut ext, name.len() + 3);
    ext.push(0x00);
    push_u16(&mut ext, name.len());
    ext.extend_from_slice(name);
    ext
}

fn alpn(plan: &ProbePlan) -> Vec<u8> {
    let protocols = match plan.alpn {
        Alpn::Common => ALPN_COMMON,
        Alpn::Rare => ALPN_RARE,
    };

    let mut list = Vec::new();
    for proto in reorder(protocols, plan.extension_order) {
        list.push(proto.len() as u8);
        list.extend_from_slice(proto);
    }

    let mut ext = vec![0x00, 0x10];
    push_u16(&mut ext, list.len() + 2);
    push_u16(&mut ext, list.len());
    ext.extend_from_slice(&list);
    ext
}

fn key_share(grease: bool, rng: &mut impl Rng) -> Vec<u8> {
    let mut share = Vec::with_capacity(48);
    if grease {
        share.extend_from_slice(&random_grease(rng).to_be_bytes());
        share.extend_from_slice(&[0x00, 0x01, 0x00]);
    }
    // x25519 with a 32-byte random key
    share.extend_from_slice(&[0x00, 0x1d, 0x00, 0x20]);
    let mut key = [0u8; 32];
    rng.fill(&mut key);
    share.extend_from_slice(&key);

    let mut ext = vec![0x00, 0x33];
    push_u16(&mut ext, share.len() + 2);
    push_u16(&mut ext, share.len());
    ext.extend_from_slice(&share);
    ext
}

fn supported_versions(plan: &ProbePlan, rng: &mut impl Rng) -> Vec<u8> {
    let versions: &[u16] = if plan.version_support == VersionSupport::Tls12 {
        &[0x0301, 0x0302, 0x0303]
    } else {
        &[0x0301, 0x0302, 0x0303, 0x0304]
    };

    let mut list = Vec::with_capacity(10);
    if plan.grease {
        list.extend_from_slice(&random_grease(rng).to_be_bytes());
    }
    for version in reorder(versions, plan.extension_order) {
        list.extend_from_slice(&version.to_be_bytes());
    }

    let mut ext = vec![0x00, 0x2b];
    push_u16(&mut ext, list.len() + 1);
    ext.push(list.len() as u8);
    ext.extend_from_slice(&list);
    ext
}

fn random_grease(rng: &mut impl Rng) -> u16 {
    GREASE_VALUES.choose(rng).copied().unwrap_or(GREASE_VALUES[0])
}

/// Saturates at `u16::MAX`. With the server name capped no field gets close.
fn push_u16(buf: &mut Vec<u8>, value: usize) {
    let value = u16::try_from(value).unwrap_or(u16::MAX);
    buf.extend_from_slice(&value.to_be_bytes());
}
