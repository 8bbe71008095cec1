// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The security group rule model as seen through the Rule Store.
//!
//! Rules are read fresh from the store on every reconciliation and discarded
//! afterwards; the store is the sole source of truth and nothing here is
//! cached across invocations.

use oxnet::{IpNet, Ipv4Net};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a security group (a named remote collection of rules).
#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize,
)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GroupId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(GroupId(s.to_string()))
    }
}

/// Identifier the Rule Store assigns to one rule.
///
/// Stable across reads, but invalidated by writes: revoking a rule destroys
/// its id and authorizing a replacement mints a new one. Ids are therefore
/// useless for addressing write operations; revocation matches on the full
/// rule tuple instead (see [`RuleSpec`]).
#[derive(
    Clone, Debug, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize,
)]
pub struct RuleId(pub String);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Transport protocol a rule matches on.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    JsonSchema,
    PartialEq,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => "tcp".fmt(f),
            Protocol::Udp => "udp".fmt(f),
            Protocol::Icmp => "icmp".fmt(f),
        }
    }
}

/// One rule of a remote security group, as returned by the Rule Store.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
pub struct IngressRule {
    pub id: RuleId,
    pub group: GroupId,
    /// True for egress rules, which this service never touches.
    pub egress: bool,
    pub protocol: Protocol,
    pub from_port: Option<u16>,
    pub to_port: Option<u16>,
    /// Currently allowed source network, if the rule has one. May be IPv6,
    /// in which case the rule is outside our management scope.
    pub source: Option<IpNet>,
}

impl IngressRule {
    /// Return the full tuple to revoke and reauthorize if this rule is
    /// eligible for replacement, or `None` if it is not.
    ///
    /// Eligible rules are ingress, TCP, have both port bounds present, and
    /// carry an IPv4 source network. Note that presence is what matters for
    /// the port bounds: port 0 is a bound like any other.
    pub fn replacement_spec(&self) -> Option<RuleSpec> {
        if self.egress || self.protocol != Protocol::Tcp {
            return None;
        }
        let (Some(from_port), Some(to_port)) = (self.from_port, self.to_port)
        else {
            return None;
        };
        let Some(IpNet::V4(source)) = self.source else {
            return None;
        };
        Some(RuleSpec { protocol: self.protocol, from_port, to_port, source })
    }
}

/// The full tuple describing one rule in a revoke or authorize request.
///
/// The Rule Store matches rules for revocation by tuple equality, so a
/// revoke spec must describe the rule exactly as currently stored.
#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, JsonSchema, PartialEq, Serialize,
)]
pub struct RuleSpec {
    pub protocol: Protocol,
    pub from_port: u16,
    pub to_port: u16,
    pub source: Ipv4Net,
}

impl RuleSpec {
    /// The same protocol and port bounds, repointed at a new source network.
    pub fn with_source(&self, source: Ipv4Net) -> RuleSpec {
        RuleSpec { source, ..*self }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;

    fn rule(
        egress: bool,
        protocol: Protocol,
        from_port: Option<u16>,
        to_port: Option<u16>,
        source: Option<IpNet>,
    ) -> IngressRule {
        IngressRule {
            id: RuleId("rule-0".to_string()),
            group: GroupId("group-0".to_string()),
            egress,
            protocol,
            from_port,
            to_port,
            source,
        }
    }

    fn v4(s: &str) -> Option<IpNet> {
        Some(IpNet::V4(s.parse().unwrap()))
    }

    #[test]
    fn test_replacement_spec_eligible() {
        let r = rule(false, Protocol::Tcp, Some(22), Some(22), v4("1.2.3.4/32"));
        let spec = r.replacement_spec().unwrap();
        assert_eq!(spec.protocol, Protocol::Tcp);
        assert_eq!(spec.from_port, 22);
        assert_eq!(spec.to_port, 22);
        assert_eq!(spec.source.to_string(), "1.2.3.4/32");
    }

    #[test]
    fn test_replacement_spec_port_zero_is_present() {
        let r = rule(false, Protocol::Tcp, Some(0), Some(0), v4("1.2.3.4/32"));
        assert!(r.replacement_spec().is_some());
    }

    #[test]
    fn test_replacement_spec_ineligible_shapes() {
        let source = v4("1.2.3.4/32");
        let cases = [
            rule(true, Protocol::Tcp, Some(22), Some(22), source),
            rule(false, Protocol::Udp, Some(53), Some(53), source),
            rule(false, Protocol::Icmp, Some(0), Some(0), source),
            rule(false, Protocol::Tcp, None, Some(22), source),
            rule(false, Protocol::Tcp, Some(22), None, source),
            rule(false, Protocol::Tcp, Some(22), Some(22), None),
            rule(
                false,
                Protocol::Tcp,
                Some(22),
                Some(22),
                Some(IpNet::V6("fd00::/64".parse().unwrap())),
            ),
        ];
        for case in cases {
            assert!(case.replacement_spec().is_none(), "{case:?}");
        }
    }

    #[test]
    fn test_with_source() {
        let spec = RuleSpec {
            protocol: Protocol::Tcp,
            from_port: 80,
            to_port: 443,
            source: "1.2.3.4/32".parse().unwrap(),
        };
        let allowed =
            Ipv4Net::new(Ipv4Addr::new(5, 6, 0, 0), 16).unwrap();
        let repointed = spec.with_source(allowed);
        assert_eq!(repointed.protocol, spec.protocol);
        assert_eq!(repointed.from_port, spec.from_port);
        assert_eq!(repointed.to_port, spec.to_port);
        assert_eq!(repointed.source, allowed);
    }

    #[test]
    fn test_protocol_serialization() {
        assert_eq!(
            serde_json::to_string(&Protocol::Tcp).unwrap(),
            "\"tcp\""
        );
        assert_eq!(
            serde_json::from_str::<Protocol>("\"udp\"").unwrap(),
            Protocol::Udp
        );
    }
}
