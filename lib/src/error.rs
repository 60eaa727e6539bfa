//! Custom Error and Result types for this library

use std::{
    any::Any,
    net::Ipv4Addr,
    sync::{MutexGuard, PoisonError},
    time::Duration,
};
use thiserror::Error;

use crate::{
    dispatcher::DispatcherBuilderError,
    packet::{
        Reader, Sender,
        arp_packet::{ArpMessageBuilderError, FrameRejection},
    },
    resolver::{ARPResolverBuilderError, ResolutionRequestBuilderError},
};

/// Custom Error type for this library
#[derive(Error, Debug)]
pub enum RArpLibError {
    /// Error opening or configuring the link-layer channel
    #[error("wire error: {_0}")]
    Wire(String),

    /// The requested network interface is missing or unusable
    #[error("interface error: {_0}")]
    Interface(String),

    /// The resolution request could not be put on the wire, either because
    /// the socket reported an error or because only part of the frame was
    /// written
    #[error("failed to transmit resolution request: {_0}")]
    TransmitFailed(String),

    /// A received frame was structurally rejected by the frame codec
    #[error("malformed frame: {_0}")]
    MalformedFrame(#[from] FrameRejection),

    /// No matching reply arrived before the deadline
    #[error("no reply from {target} within {timeout:?}")]
    ResolutionTimeout {
        /// Protocol address that was being resolved
        target: Ipv4Addr,
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The socket reported a receive error other than an interrupted call
    #[error("failed to receive frame: {_0}")]
    ReceiveFailed(String),

    /// The dispatcher stopped while a resolution was outstanding
    #[error("resolution of {_0} cancelled")]
    Cancelled(Ipv4Addr),

    /// Host identifier could not be mapped to a protocol address
    #[error("failed to look up {host}: {error}")]
    Lookup {
        /// The host identifier that failed to resolve
        host: String,
        /// The error message encountered
        error: String,
    },

    /// A target list entry is not a valid IP, range, or CIDR block
    #[error("invalid target {target}: {error}")]
    Target {
        /// The offending target string
        target: String,
        /// The error message encountered
        error: String,
    },

    /// Error obtaining lock on packet reader
    #[error("failed to get lock on packet reader: {_0}")]
    PacketReaderLock(String),

    /// Error obtaining lock on packet sender
    #[error("failed to get lock on packet sender: {_0}")]
    PacketSenderLock(String),

    /// Error obtaining lock on the dispatcher waiter table
    #[error("failed to get lock on waiter table: {_0}")]
    WaiterTableLock(String),

    /// Generic thread error
    #[error("thread error: {_0}")]
    ThreadError(String),

    /// Error generated during ARP message construction
    #[error("failed to build ARP message: {_0}")]
    ArpMessageBuild(#[from] ArpMessageBuilderError),

    /// Error generated during resolution request construction
    #[error("failed to build resolution request: {_0}")]
    ResolutionRequestBuild(#[from] ResolutionRequestBuilderError),

    /// Error resulting from failure to build ARP resolver
    #[error("failed to build arp resolver: {_0}")]
    ArpResolverBuild(#[from] ARPResolverBuilderError),

    /// Error resulting from failure to build dispatcher
    #[error("failed to build dispatcher: {_0}")]
    DispatcherBuild(#[from] DispatcherBuilderError),
}

impl From<Box<dyn Any + Send>> for RArpLibError {
    fn from(value: Box<dyn Any + Send>) -> Self {
        if let Some(s) = value.downcast_ref::<&'static str>() {
            Self::ThreadError(format!("Thread panicked with: {}", s))
        } else if let Some(s) = value.downcast_ref::<String>() {
            Self::ThreadError(format!("Thread panicked with: {}", s))
        } else {
            Self::ThreadError("Thread panicked with an unknown type".into())
        }
    }
}

impl<'a> From<PoisonError<MutexGuard<'a, dyn Reader + 'static>>>
    for RArpLibError
{
    fn from(value: PoisonError<MutexGuard<'a, dyn Reader + 'static>>) -> Self {
        Self::PacketReaderLock(value.to_string())
    }
}

impl<'a> From<PoisonError<MutexGuard<'a, dyn Sender + 'static>>>
    for RArpLibError
{
    fn from(value: PoisonError<MutexGuard<'a, dyn Sender + 'static>>) -> Self {
        Self::PacketSenderLock(value.to_string())
    }
}

impl RArpLibError {
    /// Converter for std::net::AddrParseError
    pub fn from_net_addr_parse_error(
        target: &str,
        error: std::net::AddrParseError,
    ) -> Self {
        Self::Target {
            target: target.to_string(),
            error: error.to_string(),
        }
    }

    /// Converter for ipnet::AddrParseError
    pub fn from_ipnet_addr_parse_error(
        target: &str,
        error: ipnet::AddrParseError,
    ) -> Self {
        Self::Target {
            target: target.to_string(),
            error: error.to_string(),
        }
    }

    /// Converter for a poisoned dispatcher waiter table
    pub fn from_waiter_table_poison<T>(error: PoisonError<T>) -> Self {
        Self::WaiterTableLock(error.to_string())
    }

    /// Returns true if this error is a [`RArpLibError::ResolutionTimeout`].
    /// Callers implementing their own retry policy use this to decide whether
    /// another attempt makes sense
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ResolutionTimeout { .. })
    }
}

/// Custom Result type for this library. All Errors exposed by this library
/// will be returned as [`RArpLibError`]
pub type Result<T> = std::result::Result<T, RArpLibError>;

#[cfg(test)]
#[path = "./error_tests.rs"]
mod tests;
