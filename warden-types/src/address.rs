// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping a caller's address to the network range it should be trusted from.

use oxnet::Ipv4Net;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Prefix width of the trust window granted to a caller.
///
/// Deliberately coarse: the administrator's address may shift within a /16
/// (DHCP renewals, mobile carrier NAT) and we would rather keep the
/// maintenance endpoint reachable than pin the rules to a single host.
pub const TRUST_WINDOW_WIDTH: u8 = 16;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum AddressError {
    #[error("not a valid IPv4 dotted-quad address: {addr:?}")]
    Malformed { addr: String },
    #[error("source address is not IPv4: {addr}")]
    NotIpv4 { addr: IpAddr },
}

/// Return the coarse network a caller at `source` should be trusted from:
/// the top two octets of the address, zero-filled, as a /16.
///
/// IPv6 callers are rejected; source networks are IPv4-only.
pub fn coarse_network(source: IpAddr) -> Result<Ipv4Net, AddressError> {
    let IpAddr::V4(source) = source else {
        return Err(AddressError::NotIpv4 { addr: source });
    };
    let octets = source.octets();
    Ok(Ipv4Net::new_unchecked(
        Ipv4Addr::new(octets[0], octets[1], 0, 0),
        TRUST_WINDOW_WIDTH,
    ))
}

/// Parse a source address delivered as a string (e.g. from a proxy header).
///
/// Anything that is not a well-formed IPv4 dotted-quad is a caller error,
/// not something we try to repair.
pub fn parse_source_address(addr: &str) -> Result<Ipv4Addr, AddressError> {
    addr.parse()
        .map_err(|_| AddressError::Malformed { addr: addr.to_string() })
}
