//! Provides helpers for selecting the network interface to resolve on

use pnet::{datalink, ipnetwork::IpNetwork, util::MacAddr};
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{RArpLibError, Result};

/// Represents the local side of an ARP exchange: the interface frames are
/// sent and received on, along with its hardware and protocol addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// The name of the interface
    pub name: String,
    /// The interface description
    pub description: String,
    /// The interface index
    pub index: u32,
    /// MAC address of the interface
    pub mac: MacAddr,
    /// IPv4 address of the interface
    pub ipv4: Ipv4Addr,
    /// IPv4 address of the interface with its prefix i.e. 192.168.1.10/24
    pub cidr: String,
    /// Interface flags as reported by the OS
    pub flags: u32,
    /// Every address assigned to the interface, IPv6 included
    pub ips: Vec<IpNetwork>,
}

impl TryFrom<&datalink::NetworkInterface> for NetworkInterface {
    type Error = RArpLibError;

    fn try_from(value: &datalink::NetworkInterface) -> Result<Self> {
        let mac = value.mac.ok_or_else(|| {
            RArpLibError::Interface(format!(
                "interface {} has no MAC address",
                value.name
            ))
        })?;

        let (ipv4, prefix) = value
            .ips
            .iter()
            .find_map(|ip| match ip.ip() {
                IpAddr::V4(v4) => Some((v4, ip.prefix())),
                IpAddr::V6(_) => None,
            })
            .ok_or_else(|| {
                RArpLibError::Interface(format!(
                    "interface {} has no IPv4 address",
                    value.name
                ))
            })?;

        Ok(Self {
            name: value.name.clone(),
            description: value.description.clone(),
            index: value.index,
            mac,
            ipv4,
            cidr: format!("{ipv4}/{prefix}"),
            flags: value.flags,
            ips: value.ips.clone(),
        })
    }
}

impl From<&NetworkInterface> for datalink::NetworkInterface {
    fn from(value: &NetworkInterface) -> Self {
        Self {
            name: value.name.clone(),
            description: value.description.clone(),
            index: value.index,
            mac: Some(value.mac),
            ips: value.ips.clone(),
            flags: value.flags,
        }
    }
}

/// Finds the interface with the given name
pub fn get_interface(name: &str) -> Result<NetworkInterface> {
    let iface = datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| {
            RArpLibError::Interface(format!("no interface named {name}"))
        })?;

    NetworkInterface::try_from(&iface)
}

/// Finds the first interface that is up, is not a loopback, and carries an
/// IPv4 address
pub fn get_default_interface() -> Result<NetworkInterface> {
    let iface = datalink::interfaces()
        .into_iter()
        .find(|e| {
            e.is_up() && !e.is_loopback() && e.ips.iter().any(|i| i.is_ipv4())
        })
        .ok_or_else(|| {
            RArpLibError::Interface(
                "could not detect a default interface".into(),
            )
        })?;

    NetworkInterface::try_from(&iface)
}

#[cfg(test)]
#[path = "./network_tests.rs"]
mod tests;
