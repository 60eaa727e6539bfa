//! Provides a dispatcher for resolving many addresses over one wire
//!
//! [`resolve`](crate::resolver::resolve) owns the reader for the whole
//! exchange, so only one resolution can be in flight per wire. The dispatcher
//! instead runs a single reader thread and hands each ARP reply to whichever
//! callers are waiting on the replying address.

use derive_builder::Builder;
use pnet::util::MacAddr;
use std::{
    collections::HashMap,
    io,
    net::Ipv4Addr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, RecvTimeoutError, TryRecvError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    error::{RArpLibError, Result},
    packet::{
        RECV_BUFFER_LEN,
        arp_packet::{self, ArpMessage, ArpOperation},
        wire::{WIRE_POLL_INTERVAL, Wire},
    },
    resolver::{Resolution, ResolutionRequest, transmit},
};

struct Waiter {
    id: u64,
    notifier: mpsc::Sender<MacAddr>,
}

type WaiterTable = HashMap<Ipv4Addr, Vec<Waiter>>;

/// Data structure representing an ARP reply dispatcher
#[derive(Clone, Builder)]
#[builder(setter(into))]
pub struct Dispatcher {
    /// Wire for reading and sending packets on the wire
    wire: Wire,
    /// Callers waiting on a reply, keyed by the address being resolved
    #[builder(setter(skip), default = "Arc::new(Mutex::new(HashMap::new()))")]
    waiters: Arc<Mutex<WaiterTable>>,
    /// Source of waiter ids
    #[builder(setter(skip), default = "Arc::new(AtomicU64::new(0))")]
    next_id: Arc<AtomicU64>,
    /// Set once the reader thread has exited
    #[builder(setter(skip), default = "Arc::new(AtomicBool::new(false))")]
    stopped: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Returns builder for Dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Spawns the reader thread. It runs until `done` receives a message or
    /// its sender is dropped, or until a fatal receive error. Either way every
    /// outstanding call is woken with [`RArpLibError::Cancelled`] on exit,
    /// and later calls to [`Dispatcher::resolve`] fail the same way without
    /// transmitting
    pub fn start(&self, done: mpsc::Receiver<()>) -> JoinHandle<Result<()>> {
        let self_clone = self.clone();

        thread::spawn(move || -> Result<()> {
            let result = self_clone.read_frames(&done);

            // dropping the notifiers disconnects every waiting caller
            match self_clone.waiters.lock() {
                Ok(mut waiters) => {
                    self_clone.stopped.store(true, Ordering::SeqCst);
                    waiters.clear();
                }
                Err(e) => {
                    self_clone.stopped.store(true, Ordering::SeqCst);
                    log::error!("failed to clear waiters: {}", e);
                }
            }

            result
        })
    }

    /// Resolves a single request. Requires the reader thread to be running,
    /// see [`Dispatcher::start`]
    pub fn resolve(
        &self,
        request: &ResolutionRequest,
        timeout: Duration,
    ) -> Result<Resolution> {
        let target = request.target_ip;
        let (tx, rx) = mpsc::channel::<MacAddr>();

        // register before sending so a fast reply can't slip past us
        let id = self.register(target, tx)?;

        let started = Instant::now();

        let sent = self
            .wire
            .0
            .lock()
            .map_err(RArpLibError::from)
            .and_then(|mut sender| transmit(&mut *sender, request));

        if let Err(e) = sent {
            self.deregister(target, id)?;
            return Err(e);
        }

        match rx.recv_timeout(timeout) {
            Ok(mac) => Ok(Resolution::new(target, mac, started.elapsed())),
            Err(RecvTimeoutError::Timeout) => {
                self.deregister(target, id)?;
                log::debug!("timed out waiting for {}", target);
                Err(RArpLibError::ResolutionTimeout { target, timeout })
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(RArpLibError::Cancelled(target))
            }
        }
    }

    /// Returns the number of callers currently waiting on a reply
    pub fn outstanding(&self) -> Result<usize> {
        let waiters = self
            .waiters
            .lock()
            .map_err(RArpLibError::from_waiter_table_poison)?;

        Ok(waiters.values().map(Vec::len).sum())
    }

    fn register(
        &self,
        target: Ipv4Addr,
        notifier: mpsc::Sender<MacAddr>,
    ) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut waiters = self
            .waiters
            .lock()
            .map_err(RArpLibError::from_waiter_table_poison)?;

        // nobody is left to answer once the reader has exited
        if self.stopped.load(Ordering::SeqCst) {
            return Err(RArpLibError::Cancelled(target));
        }

        waiters
            .entry(target)
            .or_default()
            .push(Waiter { id, notifier });

        Ok(id)
    }

    fn deregister(&self, target: Ipv4Addr, id: u64) -> Result<()> {
        let mut waiters = self
            .waiters
            .lock()
            .map_err(RArpLibError::from_waiter_table_poison)?;

        if let Some(list) = waiters.get_mut(&target) {
            list.retain(|w| w.id != id);

            if list.is_empty() {
                waiters.remove(&target);
            }
        }

        Ok(())
    }

    fn dispatch(&self, message: &ArpMessage) -> Result<()> {
        let waiting = self
            .waiters
            .lock()
            .map_err(RArpLibError::from_waiter_table_poison)?
            .remove(&message.sender_ip);

        if let Some(list) = waiting {
            log::debug!(
                "dispatching reply from {} to {} waiter(s)",
                message.sender_ip,
                list.len()
            );

            for waiter in list {
                // the caller may have just given up, which is fine
                let _ = waiter.notifier.send(message.sender_mac);
            }
        }

        Ok(())
    }

    fn read_frames(&self, done: &mpsc::Receiver<()>) -> Result<()> {
        let mut reader = self.wire.1.lock()?;
        let mut buffer = [0u8; RECV_BUFFER_LEN];

        loop {
            match done.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    log::debug!("exiting dispatcher reader");
                    return Ok(());
                }
                Err(TryRecvError::Empty) => {}
            }

            let len = match reader.receive(&mut buffer, WIRE_POLL_INTERVAL) {
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
                Err(e) => {
                    log::error!("dispatcher reader failed: {}", e);
                    return Err(RArpLibError::ReceiveFailed(e.to_string()));
                }
            };

            match arp_packet::decode(&buffer[..len]) {
                Ok((_, message)) if message.operation == ArpOperation::Reply => {
                    self.dispatch(&message)?;
                }
                Ok(_) => {}
                Err(rejection) => {
                    log::trace!("discarding frame: {}", rejection);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "./dispatcher_tests.rs"]
mod tests;
