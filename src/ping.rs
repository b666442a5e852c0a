use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::clock::Clock;
use crate::packet;
use crate::transport::Transport;

/// Large enough for any datagram on an ethernet link.
const RECV_BUFFER_LEN: usize = 1500;

#[derive(Debug, Error)]
pub enum PingError {
    #[error("could not set up the socket: {0}")]
    Setup(#[source] io::Error),
    #[error("could not send echo request: {0}")]
    Send(#[source] io::Error),
    #[error("could not install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Time between two echo requests.
    pub interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            interval: Duration::from_secs(1),
        }
    }
}

/// One correlated echo reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub size: usize,
    pub source: Ipv4Addr,
    pub sequence: u16,
    pub ttl: u8,
    pub latency_ms: f64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes from {}: icmp_seq={} ttl={} time={:.6} ms",
            self.size, self.source, self.sequence, self.ttl, self.latency_ms
        )
    }
}

/// What happened during one tick.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tick {
    /// Sequence number of the request sent this tick, if one was due.
    pub sent: Option<u16>,
    pub report: Option<Report>,
}

/// Sends an echo request every interval and reports replies carrying our
/// identifier.
///
/// Replies are matched on identifier alone. Any sequence number is accepted
/// and reply checksums are not verified.
pub struct PingSession<T, C> {
    transport: T,
    clock: C,
    destination: Ipv4Addr,
    interval: f64,

    identifier: u16, // Used as 'identifier' word to match echo requests/replies
    sequence: u16,   // Sequence number of the next request, starting at 1
    next_send_deadline: f64,
}

impl<T: Transport, C: Clock> PingSession<T, C> {
    pub fn new(
        transport: T,
        clock: C,
        destination: Ipv4Addr,
        identifier: u16,
        config: SessionConfig,
    ) -> Self {
        let next_send_deadline = clock.now();
        PingSession {
            transport,
            clock,
            destination,
            interval: config.interval.as_secs_f64(),
            identifier,
            sequence: 1,
            next_send_deadline,
        }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    #[cfg(test)]
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }

    #[cfg(test)]
    pub fn next_send_deadline(&self) -> f64 {
        self.next_send_deadline
    }

    /// Send a request if one is due, then wait once for a reply.
    ///
    /// Only a failed send is an error. Timeouts, receive errors and packets
    /// that are not our echo replies all end the tick without a report.
    pub fn tick(&mut self) -> Result<Tick, PingError> {
        let now = self.clock.now();
        let sent = if now >= self.next_send_deadline {
            Some(self.send(now)?)
        } else {
            None
        };

        Ok(Tick {
            sent,
            report: self.listen(),
        })
    }

    /// Tick until `running` is cleared or a send fails.
    pub fn run<F>(&mut self, running: &AtomicBool, mut on_report: F) -> Result<(), PingError>
    where
        F: FnMut(&Report),
    {
        while running.load(Ordering::SeqCst) {
            if let Some(report) = self.tick()?.report {
                on_report(&report);
            }
        }

        Ok(())
    }

    fn send(&mut self, now: f64) -> Result<u16, PingError> {
        let sequence = self.sequence;
        let request = packet::encode_request(self.identifier, sequence, now);
        self.transport
            .send(&request, self.destination)
            .map_err(PingError::Send)?;
        debug!("sent icmp_seq={} to {}", sequence, self.destination);

        self.sequence = self.sequence.wrapping_add(1);
        self.next_send_deadline = now + self.interval;
        Ok(sequence)
    }

    fn listen(&mut self) -> Option<Report> {
        let mut buf = [0u8; RECV_BUFFER_LEN];
        let size = match self.transport.recv(&mut buf) {
            Ok(Some(size)) => size,
            Ok(None) => return None,
            Err(e) => {
                warn!("error receiving reply: {}", e);
                return None;
            }
        };

        let reply = packet::decode_reply(&buf[..size]).ok()?;
        if reply.identifier() != self.identifier {
            return None;
        }

        Some(Report {
            size,
            source: reply.source(),
            sequence: reply.sequence(),
            ttl: reply.ttl(),
            latency_ms: (self.clock.now() - reply.timestamp) * 1000.0,
        })
    }
}
