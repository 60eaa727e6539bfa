//! Encodes and decodes Ethernet framed ARP messages
//!
//! Every field of an Ethernet/IPv4 ARP exchange is fixed width, so frames are
//! always exactly [`FRAME_LEN`] bytes and live on the stack:
//!
//! ```text
//! [dst mac:6][src mac:6][ethertype:2 = 0x0806]
//! [htype:2 = 1][ptype:2 = 0x0800][hlen:1 = 6][plen:1 = 4][op:2]
//! [sender mac:6][sender ip:4][target mac:6][target ip:4]
//! ```

use derive_builder::Builder;
use pnet::{
    packet::{
        MutablePacket,
        arp::{self, ArpHardwareTypes, ArpOperations},
        ethernet::{self, EtherType, EtherTypes},
    },
    util::MacAddr,
};
use std::net::Ipv4Addr;
use thiserror::Error;

use super::{ETH_HEADER_LEN, FRAME_LEN};

const HW_ADDR_LEN: u8 = 6;
const PROTO_ADDR_LEN: u8 = 4;

/// Reasons a buffer is not an Ethernet/IPv4 ARP frame. Most of these simply
/// mean the frame belongs to some other traffic on the segment
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    /// Buffer is shorter than a full ARP frame
    #[error("frame is {len} bytes, expected at least {}", FRAME_LEN)]
    Truncated {
        /// Length of the rejected buffer
        len: usize,
    },

    /// Ethertype is not ARP
    #[error("ethertype {_0:#06x} is not ARP")]
    NotAddressResolution(u16),

    /// Hardware type is not Ethernet
    #[error("unsupported hardware type {_0}")]
    UnsupportedHardwareType(u16),

    /// Protocol type is not IPv4
    #[error("unsupported protocol type {_0:#06x}")]
    UnsupportedProtocolType(u16),

    /// Address length fields are not 6 and 4
    #[error("address lengths {hw}/{proto}, expected 6/4")]
    BadAddressLength {
        /// Hardware address length found in the frame
        hw: u8,
        /// Protocol address length found in the frame
        proto: u8,
    },

    /// Operation code is neither request nor reply
    #[error("unknown ARP operation {_0}")]
    UnknownOperation(u16),
}

/// ARP operation codes understood by this library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    /// "Who has" - opcode 1
    Request,
    /// "Is at" - opcode 2
    Reply,
}

impl From<ArpOperation> for arp::ArpOperation {
    fn from(value: ArpOperation) -> Self {
        match value {
            ArpOperation::Request => ArpOperations::Request,
            ArpOperation::Reply => ArpOperations::Reply,
        }
    }
}

impl TryFrom<arp::ArpOperation> for ArpOperation {
    type Error = FrameRejection;

    fn try_from(value: arp::ArpOperation) -> Result<Self, Self::Error> {
        if value == ArpOperations::Request {
            Ok(Self::Request)
        } else if value == ArpOperations::Reply {
            Ok(Self::Reply)
        } else {
            Err(FrameRejection::UnknownOperation(value.0))
        }
    }
}

/// The Ethernet envelope around an ARP message. The ethertype is always ARP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkFrame {
    /// Destination MAC, broadcast for ordinary requests
    pub destination: MacAddr,
    /// Source MAC
    pub source: MacAddr,
}

impl LinkFrame {
    /// Returns a new envelope
    pub fn new(destination: MacAddr, source: MacAddr) -> Self {
        Self {
            destination,
            source,
        }
    }

    /// The ethertype carried by every frame this library produces
    pub fn ethertype(&self) -> EtherType {
        EtherTypes::Arp
    }
}

/// A single Ethernet/IPv4 ARP message. Hardware and protocol types and their
/// lengths are constants of the protocol and so are not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct ArpMessage {
    /// Request or reply
    pub operation: ArpOperation,
    /// MAC address of the sender
    pub sender_mac: MacAddr,
    /// IPv4 address of the sender
    pub sender_ip: Ipv4Addr,
    /// MAC address of the target, all zero on a request
    #[builder(default = "MacAddr::zero()")]
    pub target_mac: MacAddr,
    /// IPv4 address of the target
    pub target_ip: Ipv4Addr,
}

impl ArpMessage {
    /// Returns builder for ArpMessage
    pub fn builder() -> ArpMessageBuilder {
        ArpMessageBuilder::default()
    }

    /// Returns a request asking who has `target_ip`
    pub fn request(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            operation: ArpOperation::Request,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::zero(),
            target_ip,
        }
    }

    /// Returns true if this is a reply in which `ip` announces its own MAC
    pub fn is_reply_from(&self, ip: Ipv4Addr) -> bool {
        self.operation == ArpOperation::Reply && self.sender_ip == ip
    }
}

/// Serializes the envelope followed by the message into a single frame
pub fn encode(frame: &LinkFrame, message: &ArpMessage) -> [u8; FRAME_LEN] {
    let mut pkt_buf = [0u8; FRAME_LEN];

    // buffer sizes are constant so neither of these can fail
    let mut pkt_eth = ethernet::MutableEthernetPacket::new(&mut pkt_buf)
        .expect("failed to generate ethernet packet");

    pkt_eth.set_destination(frame.destination);
    pkt_eth.set_source(frame.source);
    pkt_eth.set_ethertype(frame.ethertype());

    let mut pkt_arp = arp::MutableArpPacket::new(pkt_eth.payload_mut())
        .expect("failed to generate arp packet");

    pkt_arp.set_hardware_type(ArpHardwareTypes::Ethernet);
    pkt_arp.set_protocol_type(EtherTypes::Ipv4);
    pkt_arp.set_hw_addr_len(HW_ADDR_LEN);
    pkt_arp.set_proto_addr_len(PROTO_ADDR_LEN);
    pkt_arp.set_operation(message.operation.into());
    pkt_arp.set_sender_hw_addr(message.sender_mac);
    pkt_arp.set_sender_proto_addr(message.sender_ip);
    pkt_arp.set_target_hw_addr(message.target_mac);
    pkt_arp.set_target_proto_addr(message.target_ip);

    pkt_buf
}

/// Parses a frame off of the wire. Anything past the first [`FRAME_LEN`]
/// bytes (Ethernet padding) is ignored
pub fn decode(
    pkt: &[u8],
) -> Result<(LinkFrame, ArpMessage), FrameRejection> {
    // both views fit once a full frame is present, so the only way this
    // fails is a buffer shorter than FRAME_LEN
    let (eth, header) = pkt
        .get(..FRAME_LEN)
        .and_then(|bytes| {
            ethernet::EthernetPacket::new(bytes)
                .zip(arp::ArpPacket::new(&bytes[ETH_HEADER_LEN..]))
        })
        .ok_or(FrameRejection::Truncated { len: pkt.len() })?;

    let ethertype = eth.get_ethertype();

    if ethertype != EtherTypes::Arp {
        return Err(FrameRejection::NotAddressResolution(ethertype.0));
    }

    let hardware_type = header.get_hardware_type();

    if hardware_type != ArpHardwareTypes::Ethernet {
        return Err(FrameRejection::UnsupportedHardwareType(hardware_type.0));
    }

    let protocol_type = header.get_protocol_type();

    if protocol_type != EtherTypes::Ipv4 {
        return Err(FrameRejection::UnsupportedProtocolType(protocol_type.0));
    }

    let hw = header.get_hw_addr_len();
    let proto = header.get_proto_addr_len();

    if hw != HW_ADDR_LEN || proto != PROTO_ADDR_LEN {
        return Err(FrameRejection::BadAddressLength { hw, proto });
    }

    let operation = ArpOperation::try_from(header.get_operation())?;

    let frame = LinkFrame::new(eth.get_destination(), eth.get_source());

    let message = ArpMessage {
        operation,
        sender_mac: header.get_sender_hw_addr(),
        sender_ip: header.get_sender_proto_addr(),
        target_mac: header.get_target_hw_addr(),
        target_ip: header.get_target_proto_addr(),
    };

    Ok((frame, message))
}

#[cfg(test)]
#[doc(hidden)]
pub fn create_arp_reply(
    from_mac: MacAddr,
    from_ip: Ipv4Addr,
    to_mac: MacAddr,
    to_ip: Ipv4Addr,
) -> [u8; FRAME_LEN] {
    let message = ArpMessage {
        operation: ArpOperation::Reply,
        sender_mac: from_mac,
        sender_ip: from_ip,
        target_mac: to_mac,
        target_ip: to_ip,
    };

    encode(&LinkFrame::new(to_mac, from_mac), &message)
}

#[cfg(test)]
#[path = "./arp_packet_tests.rs"]
mod tests;
