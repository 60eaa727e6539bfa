//! CLI for resolving hardware addresses of hosts on a LAN with ARP
//!
//! # Examples
//!
//! ```bash
//! # help menu
//! sudo r-arpcli --help
//!
//! # resolve the gateway and a handful of hosts
//! sudo r-arpcli -t 192.168.1.1,192.168.1.20-192.168.1.30,printer.lan
//! ```
use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use itertools::Itertools;
use log::*;
use pnet::util::MacAddr;
use r_arplib::{
    dispatcher::Dispatcher,
    error::{RArpLibError, Result as LibResult},
    network::{self, NetworkInterface},
    packet::{self, wire::Wire},
    resolver::{ARPResolver, Resolution, ResolutionRequest},
    targets::{self, DnsTargetResolver},
};
use std::{
    net::Ipv4Addr,
    str::FromStr,
    sync::mpsc,
    time::Duration,
};
use threadpool::ThreadPool;

/// Upper bound on requests in flight at once when resolving many targets
const MAX_IN_FLIGHT: usize = 64;

#[doc(hidden)]
fn parse_mac(value: &str) -> std::result::Result<MacAddr, String> {
    MacAddr::from_str(value).map_err(|e| format!("invalid MAC address: {e:?}"))
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// CLI for resolving hardware addresses of hosts on a LAN with ARP
struct Args {
    /// Comma separated list of host names, IPs, IP ranges, and CIDR blocks to
    /// resolve
    #[arg(short, long, use_value_delimiter = true, required = true)]
    targets: Vec<String>,

    /// Choose a specific network interface to resolve on
    #[arg(short, long)]
    interface: Option<String>,

    /// Override the IPv4 address requests are sent from
    #[arg(long)]
    source_ip: Option<Ipv4Addr>,

    /// Destination MAC address of outgoing requests
    #[arg(long, default_value = "ff:ff:ff:ff:ff:ff", value_parser = parse_mac)]
    destination_mac: MacAddr,

    /// How long to wait for each reply i.e. 500ms, 3s
    #[arg(long, default_value = "3s", value_parser = humantime::parse_duration)]
    timeout: Duration,

    /// Number of times to re-send a request that timed out
    #[arg(long, default_value_t = 0)]
    retries: u8,

    /// Perform vendor lookups
    #[arg(long, default_value_t = false)]
    vendor: bool,

    /// Output final report in json instead of table text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Only print final output nothing else
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Prints debug logs including those from r-arplib
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[doc(hidden)]
fn initialize_logger(args: &Args) -> Result<()> {
    let filter = if args.quiet {
        simplelog::LevelFilter::Error
    } else if args.debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    simplelog::TermLogger::init(
        filter,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[doc(hidden)]
fn print_args(args: &Args, interface: &NetworkInterface) {
    info!("configuration:");
    info!("targets:         {:?}", args.targets);
    info!("json:            {}", args.json);
    info!("vendor:          {}", args.vendor);
    info!("quiet:           {}", args.quiet);
    info!("timeout:         {}", humantime::format_duration(args.timeout));
    info!("retries:         {}", args.retries);
    info!("destination_mac: {}", args.destination_mac);
    info!("interface:       {}", interface.name);
    info!("cidr:            {}", interface.cidr);
    info!("user_mac:        {}", interface.mac);
    info!(
        "user_ip:         {}",
        args.source_ip.unwrap_or(interface.ipv4)
    );
}

#[doc(hidden)]
fn build_request(
    args: &Args,
    interface: &NetworkInterface,
    target_ip: Ipv4Addr,
) -> LibResult<ResolutionRequest> {
    Ok(ResolutionRequest::builder()
        .source_mac(interface.mac)
        .source_ip(args.source_ip.unwrap_or(interface.ipv4))
        .target_ip(target_ip)
        .destination_mac(args.destination_mac)
        .build()?)
}

// Each attempt gets a fresh deadline. Only timeouts are retried, every
// other failure is returned as is
#[doc(hidden)]
fn resolve_with_retries<F>(
    target: Ipv4Addr,
    retries: u8,
    mut attempt: F,
) -> LibResult<Resolution>
where
    F: FnMut() -> LibResult<Resolution>,
{
    let mut tries = 0;

    loop {
        match attempt() {
            Err(e) if e.is_timeout() && tries < retries => {
                tries += 1;
                debug!("retrying {} ({}/{})", target, tries, retries);
            }
            res => return res,
        }
    }
}

#[doc(hidden)]
fn resolve_single(
    args: &Args,
    interface: &NetworkInterface,
    wire: Wire,
    target: Ipv4Addr,
) -> LibResult<Resolution> {
    let resolver = ARPResolver::builder()
        .wire(wire)
        .timeout(args.timeout)
        .build()?;

    let request = build_request(args, interface, target)?;

    resolve_with_retries(target, args.retries, || resolver.resolve(&request))
}

#[doc(hidden)]
fn resolve_many(
    args: &Args,
    interface: &NetworkInterface,
    wire: Wire,
    targets: &[Ipv4Addr],
) -> LibResult<Vec<(Ipv4Addr, LibResult<Resolution>)>> {
    let dispatcher = Dispatcher::builder().wire(wire).build()?;
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let reader_handle = dispatcher.start(done_rx);

    let pool = ThreadPool::new(MAX_IN_FLIGHT.min(targets.len()).max(1));
    let (result_tx, result_rx) = mpsc::channel();

    for (idx, &target) in targets.iter().enumerate() {
        let request = build_request(args, interface, target)?;
        let dispatcher = dispatcher.clone();
        let result_tx = result_tx.clone();
        let (timeout, retries) = (args.timeout, args.retries);

        pool.execute(move || {
            let result = resolve_with_retries(target, retries, || {
                dispatcher.resolve(&request, timeout)
            });

            if let Err(e) = result_tx.send((idx, result)) {
                error!("failed to report result for {}: {}", target, e);
            }
        });
    }

    drop(result_tx);

    // ends once every job has run and dropped its sender
    let mut results = result_rx.iter().collect::<Vec<_>>();

    pool.join();

    // ignore errors here as the reader may already be dead due to error
    // we'll catch any errors from that thread below and report
    let _ = done_tx.send(());

    reader_handle.join()??;

    if pool.panic_count() > 0 {
        return Err(RArpLibError::ThreadError(format!(
            "{} resolution job(s) panicked",
            pool.panic_count()
        )));
    }

    results.sort_by_key(|(idx, _)| *idx);

    Ok(results
        .into_iter()
        .map(|(idx, result)| (targets[idx], result))
        .collect())
}

#[doc(hidden)]
fn process(
    args: &Args,
    interface: &NetworkInterface,
    wire: Wire,
    targets: &[Ipv4Addr],
) -> LibResult<Vec<Resolution>> {
    info!("resolving {} target(s)...", targets.len());

    let outcomes = match targets {
        [target] => {
            vec![(*target, resolve_single(args, interface, wire, *target))]
        }
        _ => resolve_many(args, interface, wire, targets)?,
    };

    let mut resolved = Vec::new();

    for (target, outcome) in outcomes {
        match outcome {
            Ok(r) => {
                debug!("resolved {} to {}", r.ip, r.mac);
                resolved.push(if args.vendor { r.with_vendor() } else { r });
            }
            Err(e) if e.is_timeout() => warn!("{}", e),
            Err(e) => error!("failed to resolve {}: {}", target, e),
        }
    }

    resolved.sort_by_key(|r| r.ip);

    Ok(resolved)
}

#[doc(hidden)]
fn print_results(args: &Args, resolutions: &[Resolution]) -> Result<()> {
    info!("arp results:");

    if args.json {
        let j: String = serde_json::to_string(&resolutions)?;
        println!("{}", j);
    } else {
        let mut arp_table = prettytable::Table::new();

        arp_table.add_row(prettytable::row![
            "IP", "MAC", "VENDOR", "LATENCY",
        ]);

        for r in resolutions.iter().sorted_by_key(|r| r.ip) {
            arp_table.add_row(prettytable::row![
                r.ip,
                r.mac,
                r.vendor,
                format!("{}ms", r.latency_ms)
            ]);
        }

        arp_table.printstd();
    }

    Ok(())
}

#[doc(hidden)]
#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[doc(hidden)]
#[cfg(windows)]
fn is_root() -> bool {
    // On Windows, check if running as Administrator
    // This is a simplified check - raw socket operations require admin privileges
    use std::process::Command;
    Command::new("net")
        .args(["session"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[doc(hidden)]
fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    initialize_logger(&args)?;

    if !is_root() {
        return Err(eyre!("permission denied: must run with root privileges"));
    }

    let interface = match &args.interface {
        Some(name) => network::get_interface(name)?,
        None => network::get_default_interface()?,
    };

    print_args(&args, &interface);

    let targets = targets::expand(&args.targets, &DnsTargetResolver)?;

    if targets.is_empty() {
        return Err(eyre!("no targets to resolve"));
    }

    let wire = packet::wire::default(&interface)?;

    let resolutions = process(&args, &interface, wire, &targets)?;

    if resolutions.is_empty() {
        return Err(eyre!("none of the {} target(s) replied", targets.len()));
    }

    print_results(&args, &resolutions)?;

    Ok(())
}

#[cfg(test)]
#[path = "./main_tests.rs"]
mod tests;
