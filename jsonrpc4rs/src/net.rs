// net.rs
//
// Hostname autodetection for discovery registration (spec §4.6: "iterate
// non-loopback IPv4 addresses and pick the first").

use std::net::IpAddr;

use crate::error::{Error, Result};

pub fn detect_hostname() -> Result<String> {
    let interfaces = if_addrs::get_if_addrs()?;
    interfaces
        .into_iter()
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(v4) if !v4.is_loopback() => Some(v4.to_string()),
            _ => None,
        })
        .ok_or_else(|| Error::Discovery("no non-loopback IPv4 address found".to_string()))
}

#[cfg(test)]
mod net_tests {
    use super::*;

    #[test]
    fn detect_hostname_returns_an_ipv4_dotted_quad_or_fails_cleanly() {
        match detect_hostname() {
            Ok(hostname) => assert!(hostname.parse::<std::net::Ipv4Addr>().is_ok()),
            Err(Error::Discovery(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
