//! Implements a default Wire using pnet

use pnet::datalink;
use std::{
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{
    error::{RArpLibError, Result},
    network::NetworkInterface,
    packet::{Reader, Sender},
};

/// Read timeout the underlying channel is opened with. A receive call gives
/// up at most this long after its own timeout has elapsed
pub const WIRE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Represents a packet Sender and packet Reader tuple
#[derive(Clone)]
pub struct Wire(pub Arc<Mutex<dyn Sender>>, pub Arc<Mutex<dyn Reader>>);

/// A PNetReader implementation of packet Reader
pub struct PNetReader {
    receiver: Box<dyn datalink::DataLinkReceiver>,
}

// Implements the Reader trait for our PNet implementation
impl Reader for PNetReader {
    fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> io::Result<usize> {
        let started = Instant::now();

        loop {
            match self.receiver.next() {
                Ok(pkt) => {
                    let len = pkt.len().min(buffer.len());
                    buffer[..len].copy_from_slice(&pkt[..len]);
                    return Ok(len);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    if started.elapsed() >= timeout {
                        return Err(io::ErrorKind::TimedOut.into());
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A PNetSender implementation of packet Sender
pub struct PNetSender {
    sender: Box<dyn datalink::DataLinkSender>,
}

// Implements the Sender trait for our PNet implementation
impl Sender for PNetSender {
    fn send(&mut self, packet: &[u8]) -> io::Result<usize> {
        match self.sender.send_to(packet, None) {
            Some(res) => res.map(|_| packet.len()),
            None => Err(io::Error::other("failed to send packet")),
        }
    }
}

/// Returns the default wire for the provided interface
///
/// Example
/// ```no_run
/// # use r_arplib::network;
/// # use r_arplib::packet::wire;
/// let interface = network::get_default_interface().unwrap();
/// let packet_wire = wire::default(&interface).unwrap();
/// ```
pub fn default(interface: &NetworkInterface) -> Result<Wire> {
    let cfg = datalink::Config {
        read_timeout: Some(WIRE_POLL_INTERVAL),
        ..Default::default()
    };

    let channel = match datalink::channel(&interface.into(), cfg) {
        Ok(datalink::Channel::Ethernet(tx, rx)) => Ok((tx, rx)),
        Ok(_) => {
            Err(RArpLibError::Wire("failed to create packet reader".into()))
        }
        Err(e) => Err(RArpLibError::Wire(e.to_string())),
    }?;

    log::debug!(
        "opened link-layer channel on {} (index {})",
        interface.name,
        interface.index
    );

    Ok(Wire(
        Arc::new(Mutex::new(PNetSender { sender: channel.0 })),
        Arc::new(Mutex::new(PNetReader {
            receiver: channel.1,
        })),
    ))
}

#[cfg(test)]
#[path = "./wire_tests.rs"]
mod tests;
