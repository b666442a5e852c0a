mod clock;
mod packet;
mod ping;
mod transport;
mod util;

use colored::*;

use clap::{App, AppSettings, Arg};

use std::net::Ipv4Addr;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clock::SystemClock;
use ping::{PingError, PingSession, SessionConfig};
use transport::RawSocket;

struct Options {
    destination: Ipv4Addr,
    timeout: Duration,
    interval: Duration,
    ttl: Option<u32>,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let matches = App::new("echoping")
        .setting(AppSettings::ColoredHelp)
        .version("v0.1")
        .about("Sends ICMP echo requests to an IPv4 host once a second and prints each reply.")
        .arg(Arg::with_name("DESTINATION")
            .help("Dotted-decimal IPv4 address")
            .index(1))
        .arg(Arg::with_name("timeout")
            .help("Set how long each receive waits for a reply (Default 100ms)")
            .short("W")
            .takes_value(true))
        .arg(Arg::with_name("interval")
            .help("Set how long to wait in between pings (Default 1s)")
            .short("I")
            .takes_value(true))
        .arg(Arg::with_name("ttl")
            .help("Set ttl on outgoing packets")
            .short("t")
            .takes_value(true))
        .get_matches();

    // A missing or malformed address is a usage error, not a failure.
    let destination = match matches.value_of("DESTINATION").and_then(util::parse_ipv4) {
        Some(d) => d,
        None => {
            print_usage();
            return;
        }
    };

    let options = match parse_options(destination, &matches) {
        Ok(o) => o,
        Err(message) => fail(&message),
    };

    println!("Start pinging {}:", destination.to_string().bold());

    if let Err(e) = run(&options) {
        fail(&e.to_string());
    }
}

fn print_usage() {
    println!("Please supply a valid IPv4 address.");
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", "error:".red().bold(), message);
    process::exit(1);
}

fn parse_options(destination: Ipv4Addr, matches: &clap::ArgMatches) -> Result<Options, String> {
    let timeout = matches.value_of("timeout").unwrap_or("100ms");
    let timeout = humantime::parse_duration(timeout)
        .map_err(|e| format!("Invalid duration for timeout (ex: 100ms, 1s) : {}", e))?;

    let interval = matches.value_of("interval").unwrap_or("1s");
    let interval = humantime::parse_duration(interval)
        .map_err(|e| format!("Invalid duration for interval (ex: 1s, 400ms, 1m) : {}", e))?;

    let ttl = match matches.value_of("ttl") {
        Some(ttl) => Some(ttl.parse::<u32>()
            .map_err(|e| format!("Invalid ttl (ex: 64) : {}", e))?),
        None => None,
    };

    Ok(Options { destination, timeout, interval, ttl })
}

fn run(options: &Options) -> Result<(), PingError> {
    let mut socket = RawSocket::new(options.timeout).map_err(PingError::Setup)?;
    if let Some(t) = options.ttl {
        socket.set_ttl(t).map_err(PingError::Setup)?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let identifier = process::id() as u16;
    let config = SessionConfig { interval: options.interval };
    let mut session = PingSession::new(socket, SystemClock, options.destination, identifier, config);
    log::debug!("session identifier {}", session.identifier());

    session.run(&running, |report| println!("{}", report))
}
