//! Provides helpers for turning user supplied targets into IPv4 addresses

#[cfg(test)]
use mockall::automock;

use std::{collections::HashSet, net::IpAddr, net::Ipv4Addr, str::FromStr};

use crate::error::{RArpLibError, Result};

/// Maps a human readable host identifier to an IPv4 address
#[cfg_attr(test, automock)]
pub trait TargetResolver: Send + Sync {
    /// Should return the IPv4 address for `host`
    fn resolve(&self, host: &str) -> Result<Ipv4Addr>;
}

/// Resolves host identifiers with the system resolver. Literal IPv4
/// addresses are returned without a lookup
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsTargetResolver;

impl TargetResolver for DnsTargetResolver {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
        if let Ok(ip) = Ipv4Addr::from_str(host) {
            return Ok(ip);
        }

        log::debug!("looking up {}", host);

        let ips =
            dns_lookup::lookup_host(host).map_err(|e| RArpLibError::Lookup {
                host: host.to_string(),
                error: e.to_string(),
            })?;

        ips.into_iter()
            .find_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| RArpLibError::Lookup {
                host: host.to_string(),
                error: "no IPv4 address found".into(),
            })
    }
}

fn expand_range(target: &str, begin: &str, end: &str) -> Result<Vec<Ipv4Addr>> {
    let begin = Ipv4Addr::from_str(begin)
        .map_err(|e| RArpLibError::from_net_addr_parse_error(target, e))?;

    let end = Ipv4Addr::from_str(end)
        .map_err(|e| RArpLibError::from_net_addr_parse_error(target, e))?;

    Ok(ipnet::Ipv4Subnets::new(begin, end, 32)
        .flat_map(|ip_net| ip_net.hosts())
        .collect())
}

fn expand_cidr(target: &str) -> Result<Vec<Ipv4Addr>> {
    let ip_net = ipnet::Ipv4Net::from_str(target)
        .map_err(|e| RArpLibError::from_ipnet_addr_parse_error(target, e))?;

    Ok(ip_net.hosts().collect())
}

fn is_ip_like(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Expands a list of targets into IPv4 addresses, removing duplicates while
/// keeping first-seen order. Each entry may be:
///
/// - an IPv4 address: `192.168.1.2`
/// - a range: `192.168.1.2-192.168.1.20`
/// - a CIDR block: `192.168.1.0/24`
/// - anything else is treated as a host name and handed to `resolver`
///
/// # Examples
///
/// ```
/// # use std::net::Ipv4Addr;
/// # use r_arplib::targets::{self, DnsTargetResolver};
/// let ips = targets::expand(
///     &["192.168.0.1".to_string(), "172.17.0.1-172.17.0.3".to_string()],
///     &DnsTargetResolver,
/// )
/// .unwrap();
/// assert_eq!(ips.len(), 4);
/// assert_eq!(ips[0], Ipv4Addr::new(192, 168, 0, 1));
/// ```
pub fn expand(
    list: &[String],
    resolver: &dyn TargetResolver,
) -> Result<Vec<Ipv4Addr>> {
    let mut seen = HashSet::new();
    let mut ips = Vec::new();

    for target in list.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let expanded = if let Ok(ip) = Ipv4Addr::from_str(target) {
            vec![ip]
        } else if target.contains('/') {
            expand_cidr(target)?
        } else if let Some((begin, end)) = target
            .split_once('-')
            .filter(|(b, e)| is_ip_like(b) && is_ip_like(e))
        {
            expand_range(target, begin, end)?
        } else if is_ip_like(target) {
            // looks like an address but isn't one, don't send it to DNS
            return Err(RArpLibError::Target {
                target: target.to_string(),
                error: "invalid IPv4 address".into(),
            });
        } else {
            vec![resolver.resolve(target)?]
        };

        for ip in expanded {
            if seen.insert(ip) {
                ips.push(ip);
            }
        }
    }

    Ok(ips)
}

#[cfg(test)]
#[path = "./targets_tests.rs"]
mod tests;
