use std::str::FromStr;

use super::*;

fn pnet_interface(cidrs: &[&str]) -> datalink::NetworkInterface {
    datalink::NetworkInterface {
        name: "eth0".to_string(),
        description: "description".to_string(),
        index: 2,
        mac: Some(MacAddr::from_str("aa:bb:cc:dd:ee:ff").unwrap()),
        ips: cidrs.iter().map(|c| c.parse().unwrap()).collect(),
        flags: 0,
    }
}

#[test]
fn returns_error_for_bogus_interface_name() {
    let res = get_interface("noop-not-a-real-interface");
    assert!(res.is_err());
}

#[test]
fn converts_pnet_interface() {
    let iface = pnet_interface(&["fe80::1/64", "192.168.1.10/24"]);

    let converted = NetworkInterface::try_from(&iface).unwrap();

    assert_eq!(converted.name, "eth0");
    assert_eq!(converted.index, 2);
    assert_eq!(converted.mac, iface.mac.unwrap());
    assert_eq!(converted.ipv4, Ipv4Addr::new(192, 168, 1, 10));
    assert_eq!(converted.cidr, "192.168.1.10/24");
}

#[test]
fn rejects_interface_without_ipv4() {
    let iface = pnet_interface(&["fe80::1/64"]);
    let res = NetworkInterface::try_from(&iface);
    assert!(matches!(res, Err(RArpLibError::Interface(_))));
}

#[test]
fn rejects_interface_without_mac() {
    let mut iface = pnet_interface(&["192.168.1.10/24"]);
    iface.mac = None;
    let res = NetworkInterface::try_from(&iface);
    assert!(matches!(res, Err(RArpLibError::Interface(_))));
}

#[test]
fn converts_back_to_pnet_interface() {
    let iface = pnet_interface(&["192.168.1.10/24"]);
    let converted = NetworkInterface::try_from(&iface).unwrap();

    let back = datalink::NetworkInterface::from(&converted);

    assert_eq!(back.name, iface.name);
    assert_eq!(back.index, iface.index);
    assert_eq!(back.mac, iface.mac);
    assert_eq!(back.ips, iface.ips);
}

#[test]
fn keeps_every_assigned_address() {
    let iface = pnet_interface(&["fe80::1/64", "192.168.1.10/24", "10.0.0.4/8"]);

    let converted = NetworkInterface::try_from(&iface).unwrap();

    assert_eq!(converted.ips, iface.ips);
    assert_eq!(converted.ipv4, Ipv4Addr::new(192, 168, 1, 10));

    let back = datalink::NetworkInterface::from(&converted);
    assert_eq!(back.ips.len(), 3);
}
