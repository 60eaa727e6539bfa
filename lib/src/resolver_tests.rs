use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    thread,
};

use super::*;

use crate::packet::{
    arp_packet::create_arp_reply,
    mocks::{MockPacketReader, MockPacketSender, deliver},
};

fn local_mac() -> MacAddr {
    MacAddr::from_str("aa:bb:cc:dd:ee:ff").unwrap()
}

fn remote_mac() -> MacAddr {
    MacAddr::from_str("11:22:33:44:55:66").unwrap()
}

fn local_ip() -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, 10)
}

fn target_ip() -> Ipv4Addr {
    Ipv4Addr::new(93, 184, 216, 34)
}

fn request() -> ResolutionRequest {
    ResolutionRequest::builder()
        .source_mac(local_mac())
        .source_ip(local_ip())
        .target_ip(target_ip())
        .build()
        .unwrap()
}

fn matching_reply() -> [u8; FRAME_LEN] {
    create_arp_reply(remote_mac(), target_ip(), local_mac(), local_ip())
}

fn unrelated_frame() -> [u8; FRAME_LEN] {
    let mut pkt = matching_reply();
    // IPv4 ethertype
    pkt[12] = 0x08;
    pkt[13] = 0x00;
    pkt
}

fn accepting_sender() -> MockPacketSender {
    let mut sender = MockPacketSender::new();
    sender.expect_send().times(1).returning(|p| Ok(p.len()));
    sender
}

#[test]
fn request_defaults_to_broadcast() {
    assert_eq!(request().destination_mac, MacAddr::broadcast());
}

#[test]
fn resolves_reply_from_target() {
    let expected_request = request().to_raw();

    let mut sender = MockPacketSender::new();
    sender
        .expect_send()
        .withf(move |p| p == expected_request)
        .times(1)
        .returning(|p| Ok(p.len()));

    let mut reader = MockPacketReader::new();
    let mut frames = vec![
        unrelated_frame().to_vec(),
        // our own request echoed back by the socket
        expected_request.to_vec(),
        // a reply, but from some other host
        create_arp_reply(
            MacAddr::new(0xde, 0xad, 0xbe, 0xef, 0x00, 0x01),
            Ipv4Addr::new(192, 168, 1, 1),
            local_mac(),
            local_ip(),
        )
        .to_vec(),
        vec![0x01, 0x02, 0x03],
        matching_reply().to_vec(),
    ]
    .into_iter();

    reader
        .expect_receive()
        .times(5)
        .returning(move |buf, _| deliver(&frames.next().unwrap(), buf));

    let mac = resolve(
        &request(),
        &mut sender,
        &mut reader,
        Duration::from_secs(5),
    )
    .unwrap();

    assert_eq!(mac, remote_mac());
}

#[test]
fn times_out_on_unrelated_traffic() {
    let timeout = Duration::from_millis(200);

    let mut sender = accepting_sender();
    let mut reader = MockPacketReader::new();
    reader.expect_receive().returning(|buf, _| {
        thread::sleep(Duration::from_millis(5));
        deliver(&unrelated_frame(), buf)
    });

    let started = Instant::now();
    let result = resolve(&request(), &mut sender, &mut reader, timeout);
    let elapsed = started.elapsed();

    assert!(result.unwrap_err().is_timeout());
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(1));
}

#[test]
fn times_out_on_quiet_wire() {
    let timeout = Duration::from_millis(150);

    let mut sender = accepting_sender();
    let mut reader = MockPacketReader::new();
    reader.expect_receive().returning(|_, remaining| {
        thread::sleep(remaining.min(Duration::from_millis(20)));
        Err(io::ErrorKind::TimedOut.into())
    });

    let started = Instant::now();
    let result = resolve(&request(), &mut sender, &mut reader, timeout);

    match result {
        Err(RArpLibError::ResolutionTimeout { target, timeout: t }) => {
            assert_eq!(target, target_ip());
            assert_eq!(t, timeout);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(started.elapsed() >= timeout);
}

#[test]
fn retries_interrupted_receives() {
    let mut sender = accepting_sender();
    let mut reader = MockPacketReader::new();
    let mut calls = 0;

    reader.expect_receive().times(3).returning(move |buf, _| {
        calls += 1;
        if calls < 3 {
            // leave junk behind to prove it is not mistaken for a frame
            buf[..FRAME_LEN].copy_from_slice(&matching_reply());
            Err(io::ErrorKind::Interrupted.into())
        } else {
            deliver(&matching_reply(), buf)
        }
    });

    let mac = resolve(
        &request(),
        &mut sender,
        &mut reader,
        Duration::from_secs(5),
    )
    .unwrap();

    assert_eq!(mac, remote_mac());
}

#[test]
fn reports_receive_errors() {
    let mut sender = accepting_sender();
    let mut reader = MockPacketReader::new();
    reader
        .expect_receive()
        .times(1)
        .returning(|_, _| Err(io::Error::other("oh no a read error")));

    let result = resolve(
        &request(),
        &mut sender,
        &mut reader,
        Duration::from_secs(5),
    );

    assert!(matches!(result, Err(RArpLibError::ReceiveFailed(_))));
}

#[test]
fn reports_transmit_errors_without_listening() {
    let mut sender = MockPacketSender::new();
    sender
        .expect_send()
        .times(1)
        .returning(|_| Err(io::Error::other("oh no a send error")));

    let mut reader = MockPacketReader::new();
    reader.expect_receive().never();

    let result = resolve(
        &request(),
        &mut sender,
        &mut reader,
        Duration::from_secs(5),
    );

    assert!(matches!(result, Err(RArpLibError::TransmitFailed(_))));
}

#[test]
fn reports_short_writes() {
    let mut sender = MockPacketSender::new();
    sender.expect_send().times(1).returning(|_| Ok(12));

    let mut reader = MockPacketReader::new();
    reader.expect_receive().never();

    let result = resolve(
        &request(),
        &mut sender,
        &mut reader,
        Duration::from_secs(5),
    );

    assert!(matches!(result, Err(RArpLibError::TransmitFailed(_))));
}

#[test]
fn resolver_resolves_over_wire() {
    let mut reader = MockPacketReader::new();
    reader
        .expect_receive()
        .returning(|buf, _| deliver(&matching_reply(), buf));

    let wire = Wire(
        Arc::new(Mutex::new(accepting_sender())),
        Arc::new(Mutex::new(reader)),
    );

    let resolver = ARPResolver::builder()
        .wire(wire)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let resolution = resolver.resolve(&request()).unwrap();

    assert_eq!(resolution.ip, target_ip());
    assert_eq!(resolution.mac, remote_mac());
    assert!(resolution.vendor.is_empty());
}

#[test]
fn resolver_reports_error_on_packet_reader_lock() {
    let reader = Arc::new(Mutex::new(MockPacketReader::new()));
    let reader_clone = Arc::clone(&reader);

    // Spawn a thread that will panic while holding the lock
    let _ = thread::spawn(move || {
        let _guard = reader_clone.lock().unwrap();
        panic!("Simulated panic");
    })
    .join();

    let wire = Wire(Arc::new(Mutex::new(MockPacketSender::new())), reader);

    let resolver = ARPResolver::builder().wire(wire).build().unwrap();

    let result = resolver.resolve(&request());

    assert!(matches!(result, Err(RArpLibError::PacketReaderLock(_))));
}

#[test]
fn resolver_builder_requires_wire() {
    let result = ARPResolver::builder().build();
    assert!(result.is_err());
}
