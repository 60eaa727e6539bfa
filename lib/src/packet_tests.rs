use mockall::mock;
use std::{io, time::Duration};

use super::{Reader, Sender};

mock! {
    pub PacketReader {}
    impl Reader for PacketReader {
        fn receive(
            &mut self,
            buffer: &mut [u8],
            timeout: Duration,
        ) -> io::Result<usize>;
    }
}

mock! {
    pub PacketSender {}
    impl Sender for PacketSender {
        fn send(&mut self, packet: &[u8]) -> io::Result<usize>;
    }
}

/// Copies `frame` into `buffer` the way a real reader would, returning the
/// number of bytes copied
pub fn deliver(frame: &[u8], buffer: &mut [u8]) -> io::Result<usize> {
    let len = frame.len().min(buffer.len());
    buffer[..len].copy_from_slice(&frame[..len]);
    Ok(len)
}
