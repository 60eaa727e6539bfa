//! Provides the ARP frame codec and the traits used to put frames on, and
//! take frames off of, the wire

use std::{io, time::Duration};

pub mod arp_packet;
pub mod wire;

/// Length of the Ethernet envelope: destination, source and ethertype
pub const ETH_HEADER_LEN: usize = 14;

/// Length of an Ethernet/IPv4 ARP message
pub const ARP_MESSAGE_LEN: usize = 28;

/// Total length of every frame produced or accepted by this library
pub const FRAME_LEN: usize = ETH_HEADER_LEN + ARP_MESSAGE_LEN;

/// Size of the receive buffer used while waiting for replies. Large enough
/// for a full untagged Ethernet frame, only the first [`FRAME_LEN`] bytes of
/// which are ever inspected
pub const RECV_BUFFER_LEN: usize = 1518;

/// Trait describing a packet reader
pub trait Reader: Send {
    /// Should copy the next frame off of the wire into `buffer`, returning the
    /// number of bytes written. Implementations must give up with
    /// [`io::ErrorKind::TimedOut`] once `timeout` has elapsed and may return
    /// [`io::ErrorKind::Interrupted`] when the underlying call was interrupted
    fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> io::Result<usize>;
}

/// Trait describing a packet sender
pub trait Sender: Send {
    /// Should send a packet over the wire, returning the number of bytes
    /// written
    fn send(&mut self, packet: &[u8]) -> io::Result<usize>;
}

#[cfg(test)]
#[path = "./packet_tests.rs"]
#[doc(hidden)]
pub mod mocks;
