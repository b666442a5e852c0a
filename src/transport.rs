use std::io::{ErrorKind, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use log::debug;
use socket2::{Domain, Protocol, SockAddr, Socket};

/// Datagram I/O used by a ping session.
pub trait Transport {
    /// Send one datagram to `destination`.
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> Result<()>;

    /// Wait for one datagram. `Ok(None)` means nothing arrived before the
    /// timeout.
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
}

/// A raw ICMPv4 socket. Received datagrams include the IPv4 header.
pub struct RawSocket {
    socket: Socket,
}

impl RawSocket {
    pub fn new(timeout: Duration) -> Result<Self> {
        let stype = socket2::Type::raw().cloexec();
        let socket = Socket::new(Domain::ipv4(), stype, Some(Protocol::icmpv4()))?;
        socket.set_read_timeout(Some(timeout))?;
        debug!("opened raw icmp socket, receive timeout {:?}", timeout);

        Ok(RawSocket { socket })
    }

    pub fn set_ttl(&mut self, ttl: u32) -> Result<()> {
        self.socket.set_ttl(ttl)
    }
}

impl Transport for RawSocket {
    fn send(&mut self, packet: &[u8], destination: Ipv4Addr) -> Result<()> {
        let address = SockAddr::from(SocketAddr::from((destination, 0)));
        self.socket.send_to(packet, &address).map(|_| ())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.socket.recv_from(buf) {
            Ok((bytes, _from)) => Ok(Some(bytes)),
            // Timeouts surface as EAGAIN on unix and WSAETIMEDOUT on windows.
            // Interrupts are treated the same so a Ctrl-C is noticed promptly.
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
