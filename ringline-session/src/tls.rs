//! Client certificate checks made during the TLS handshake.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rustls::pki_types::CertificateDer;
use tracing::debug;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

/// Decide whether to accept one certificate of the client's chain.
///
/// `depth` counts from the client's own certificate (0) toward the root.
/// Chain certificates are accepted iff the TLS library already verified
/// them. The leaf must additionally name the connecting peer's address in
/// an IP subject-alternative-name entry.
pub fn verify_peer_certificate(
    depth: u32,
    preverified: bool,
    cert: &CertificateDer<'_>,
    peer: Option<IpAddr>,
) -> bool {
    if !preverified {
        return false;
    }
    if depth != 0 {
        return true;
    }
    let Some(peer) = peer else {
        debug!("no peer address to match against client certificate");
        return false;
    };
    certificate_ips(cert).contains(&peer.to_canonical())
}

/// Subject common name of `cert`, if it has one.
pub fn common_name(cert: &CertificateDer<'_>) -> Option<String> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref()).ok()?;
    let cn = parsed.subject().iter_common_name().next()?;
    cn.as_str().ok().map(str::to_owned)
}

fn certificate_ips(cert: &CertificateDer<'_>) -> Vec<IpAddr> {
    let Ok((_, parsed)) = X509Certificate::from_der(cert.as_ref()) else {
        debug!("unparseable client certificate");
        return Vec::new();
    };
    let Ok(Some(san)) = parsed.subject_alternative_name() else {
        return Vec::new();
    };
    san.value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::IPAddress(raw) => ip_from_bytes(raw),
            _ => None,
        })
        .collect()
}

fn ip_from_bytes(raw: &[u8]) -> Option<IpAddr> {
    let ip = match raw.len() {
        4 => IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(raw);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return None,
    };
    Some(ip.to_canonical())
}
