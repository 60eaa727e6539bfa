use std::{
    net::Ipv4Addr,
    str::FromStr,
    sync::{Arc, Mutex},
    thread,
};

use super::*;

#[test]
fn identifies_timeouts() {
    let err = RArpLibError::ResolutionTimeout {
        target: Ipv4Addr::new(192, 168, 1, 2),
        timeout: Duration::from_millis(100),
    };
    assert!(err.is_timeout());
    assert!(!RArpLibError::ReceiveFailed("boom".into()).is_timeout());
}

#[test]
fn converts_thread_panics() {
    let handle = thread::spawn(|| -> u8 { panic!("oh no") });
    let err: RArpLibError = handle.join().unwrap_err().into();
    assert!(err.to_string().contains("oh no"));
}

#[test]
fn converts_address_parse_errors() {
    let parse_err = Ipv4Addr::from_str("not-an-ip").unwrap_err();
    let err = RArpLibError::from_net_addr_parse_error("not-an-ip", parse_err);
    match err {
        RArpLibError::Target { target, .. } => assert_eq!(target, "not-an-ip"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn converts_waiter_table_poison() {
    let table = Arc::new(Mutex::new(0u8));
    let table_clone = Arc::clone(&table);

    let _ = thread::spawn(move || {
        let _guard = table_clone.lock().unwrap();
        panic!("Simulated panic");
    })
    .join();

    let err = table
        .lock()
        .map_err(RArpLibError::from_waiter_table_poison)
        .unwrap_err();
    assert!(matches!(err, RArpLibError::WaiterTableLock(_)));
}
