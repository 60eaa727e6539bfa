//! Library package for resolving the hardware (MAC) address of a host on the
//! local network segment with ARP
//!
//! A resolution broadcasts a single ARP request on a raw link-layer socket and
//! then reads frames until the requested host answers or the deadline passes.
//!
//! # Examples
//!
//! ## Resolve a single address
//!
//! See `lib/examples/resolve.rs`
//!
//! ```bash
//! sudo -E cargo run --example resolve -p r-arplib -- 192.168.1.1
//! ```

#![deny(missing_docs)]
pub mod dispatcher;
pub mod error;
pub mod network;
pub mod packet;
pub mod resolver;
pub mod targets;
