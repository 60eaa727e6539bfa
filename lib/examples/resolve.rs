use std::{env, time::Duration};

use r_arplib::{
    network, packet,
    resolver::{ARPResolver, ResolutionRequest},
    targets::{DnsTargetResolver, TargetResolver},
};

fn is_root() -> bool {
    match env::var("USER") {
        Ok(val) => val == "root",
        Err(_e) => false,
    }
}

fn main() {
    if !is_root() {
        panic!("permission denied: must run with root privileges");
    }

    let host = env::args().nth(1).expect("usage: resolve <host>");
    let target_ip = DnsTargetResolver
        .resolve(&host)
        .expect("failed to look up host");

    let interface =
        network::get_default_interface().expect("cannot find interface");
    let wire = packet::wire::default(&interface).expect("failed to create wire");

    let resolver = ARPResolver::builder()
        .wire(wire)
        .timeout(Duration::from_secs(3))
        .build()
        .expect("failed to build resolver");

    let request = ResolutionRequest::builder()
        .source_mac(interface.mac)
        .source_ip(interface.ipv4)
        .target_ip(target_ip)
        .build()
        .expect("failed to build request");

    match resolver.resolve(&request) {
        Ok(resolution) => {
            let resolution = resolution.with_vendor();
            println!(
                "{} is at {} ({}) in {}ms",
                resolution.ip,
                resolution.mac,
                resolution.vendor,
                resolution.latency_ms
            );
        }
        Err(e) => println!("failed to resolve {}: {}", target_ip, e),
    }
}
