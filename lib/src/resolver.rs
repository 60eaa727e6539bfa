//! Provides the ARP resolution engine
//!
//! A resolution is a single request/await/match exchange: one request frame
//! is broadcast, then frames are read off of the wire until a reply from the
//! requested host arrives or the deadline passes. Everything else arriving on
//! the raw socket is ordinary traffic and is skipped.

use derive_builder::Builder;
use pnet::util::MacAddr;
use serde::{Deserialize, Serialize};
use std::{
    io,
    net::Ipv4Addr,
    time::{Duration, Instant},
};

use crate::{
    error::{RArpLibError, Result},
    packet::{
        FRAME_LEN, RECV_BUFFER_LEN, Reader, Sender,
        arp_packet::{self, ArpMessage, LinkFrame},
        wire::Wire,
    },
};

/// The default time to wait for a reply, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Inputs to a single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct ResolutionRequest {
    /// MAC address of the host performing the resolution
    pub source_mac: MacAddr,
    /// IPv4 address of the host performing the resolution
    pub source_ip: Ipv4Addr,
    /// IPv4 address being resolved
    pub target_ip: Ipv4Addr,
    /// Destination MAC of the outgoing frame, broadcast unless probing a
    /// known host directly
    #[builder(default = "MacAddr::broadcast()")]
    pub destination_mac: MacAddr,
}

impl ResolutionRequest {
    /// Returns builder for ResolutionRequest
    pub fn builder() -> ResolutionRequestBuilder {
        ResolutionRequestBuilder::default()
    }

    /// Returns the frame to transmit for this request
    pub fn to_raw(&self) -> [u8; FRAME_LEN] {
        let frame = LinkFrame::new(self.destination_mac, self.source_mac);
        let message =
            ArpMessage::request(self.source_mac, self.source_ip, self.target_ip);
        arp_packet::encode(&frame, &message)
    }
}

fn serialize_to_string<S, T>(
    val: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: std::fmt::Display,
{
    s.serialize_str(&val.to_string())
}

fn deserialize_from_str<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let s = String::deserialize(d)?;
    s.parse::<T>().map_err(serde::de::Error::custom)
}

/// Data structure representing a resolved host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// IPv4 of the host
    pub ip: Ipv4Addr,
    /// MAC address of the host
    #[serde(
        serialize_with = "serialize_to_string",
        deserialize_with = "deserialize_from_str"
    )]
    pub mac: MacAddr,
    /// Vendor of the host if known and requested
    pub vendor: String,
    /// Time between sending the request and accepting the reply
    pub latency_ms: u128,
}

impl Resolution {
    /// Returns a new Resolution without vendor information
    pub fn new(ip: Ipv4Addr, mac: MacAddr, latency: Duration) -> Self {
        Self {
            ip,
            mac,
            vendor: String::new(),
            latency_ms: latency.as_millis(),
        }
    }

    /// Fills in the vendor field from the OUI database
    pub fn with_vendor(mut self) -> Self {
        self.vendor = oui_data::lookup(&self.mac.to_string())
            .map(|v| v.organization().to_owned())
            .unwrap_or_default();
        self
    }
}

// Puts the request on the wire, treating any error or short write as fatal
pub(crate) fn transmit(
    sender: &mut dyn Sender,
    request: &ResolutionRequest,
) -> Result<()> {
    let pkt_buf = request.to_raw();

    let written = sender
        .send(&pkt_buf)
        .map_err(|e| RArpLibError::TransmitFailed(e.to_string()))?;

    if written != pkt_buf.len() {
        return Err(RArpLibError::TransmitFailed(format!(
            "short write: {} of {} bytes",
            written,
            pkt_buf.len()
        )));
    }

    log::debug!(
        "sent ARP request for {} to {}",
        request.target_ip,
        request.destination_mac
    );

    Ok(())
}

fn log_reply(frame: &LinkFrame, message: &ArpMessage) {
    log::debug!("accepted ARP reply:");
    log::debug!("  destination mac: {}", frame.destination);
    log::debug!("  source mac:      {}", frame.source);
    log::debug!("  operation:       {:?}", message.operation);
    log::debug!("  sender mac:      {}", message.sender_mac);
    log::debug!("  sender ip:       {}", message.sender_ip);
    log::debug!("  target mac:      {}", message.target_mac);
    log::debug!("  target ip:       {}", message.target_ip);
}

/// Performs one resolution over a borrowed sender and reader
///
/// Exactly one request is transmitted. Frames that do not decode as ARP, are
/// not replies, or are replies from some other host are discarded. Returns
/// the sender MAC of the first reply from `request.target_ip`, or
/// [`RArpLibError::ResolutionTimeout`] once `timeout` has elapsed.
///
/// # Errors
///
/// - [`RArpLibError::TransmitFailed`] if the request could not be sent
/// - [`RArpLibError::ReceiveFailed`] on any receive error other than an
///   interrupted call or a read timeout
/// - [`RArpLibError::ResolutionTimeout`] if no matching reply arrived
pub fn resolve(
    request: &ResolutionRequest,
    sender: &mut dyn Sender,
    reader: &mut dyn Reader,
    timeout: Duration,
) -> Result<MacAddr> {
    let deadline = Instant::now() + timeout;

    transmit(sender, request)?;

    let mut buffer = [0u8; RECV_BUFFER_LEN];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());

        if remaining.is_zero() {
            log::debug!("timed out waiting for {}", request.target_ip);
            return Err(RArpLibError::ResolutionTimeout {
                target: request.target_ip,
                timeout,
            });
        }

        let len = match reader.receive(&mut buffer, remaining) {
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                buffer.fill(0);
                continue;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                continue;
            }
            Err(e) => return Err(RArpLibError::ReceiveFailed(e.to_string())),
        };

        let (frame, message) = match arp_packet::decode(&buffer[..len]) {
            Ok(decoded) => decoded,
            Err(rejection) => {
                log::trace!("discarding frame: {}", rejection);
                continue;
            }
        };

        if !message.is_reply_from(request.target_ip) {
            log::trace!(
                "discarding ARP {:?} from {}",
                message.operation,
                message.sender_ip
            );
            continue;
        }

        log_reply(&frame, &message);

        return Ok(message.sender_mac);
    }
}

/// Data structure representing an ARP resolver bound to a wire
#[derive(Clone, Builder)]
#[builder(setter(into))]
pub struct ARPResolver {
    /// Wire for reading and sending packets on the wire
    wire: Wire,
    /// How long to wait for a reply on each call
    #[builder(default = "Duration::from_millis(DEFAULT_TIMEOUT_MS)")]
    timeout: Duration,
}

impl ARPResolver {
    /// Returns builder for ARPResolver
    pub fn builder() -> ARPResolverBuilder {
        ARPResolverBuilder::default()
    }

    /// Resolves a single request. The wire's sender and reader are held for
    /// the whole exchange, so concurrent calls on one wire are serialized.
    /// Use the [`Dispatcher`](crate::dispatcher::Dispatcher) to resolve many
    /// addresses at once
    pub fn resolve(&self, request: &ResolutionRequest) -> Result<Resolution> {
        let mut reader = self.wire.1.lock()?;
        let mut sender = self.wire.0.lock()?;

        let started = Instant::now();

        let mac = resolve(request, &mut *sender, &mut *reader, self.timeout)?;

        Ok(Resolution::new(request.target_ip, mac, started.elapsed()))
    }
}

#[cfg(test)]
#[path = "./resolver_tests.rs"]
mod tests;
