use std::convert::TryInto;
use std::net::Ipv4Addr;

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util;

pub const ECHO_REQUEST: u8 = 8;
pub const ECHO_REPLY: u8 = 0;

/// Fixed IPv4 header length. Raw ICMP sockets hand us packets without options.
pub const IPV4_HEADER_LEN: usize = 20;
pub const ICMP_HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 8;
pub const ECHO_REQUEST_LEN: usize = ICMP_HEADER_LEN + TIMESTAMP_LEN;

/// Smallest buffer `decode_reply` will look at.
pub const MIN_REPLY_LEN: usize = IPV4_HEADER_LEN + ICMP_HEADER_LEN;

/// Type, code, checksum, identifier and sequence number. All fields are
/// big endian on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IcmpEchoHeader {
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_num: u16,
}

/// The first 20 bytes of a received IPv4 datagram. All multi-byte fields
/// are big endian.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IpHeaderView {
    pub version_and_header_len: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags_and_frag_offset: u16, // flags are the top 3 bits
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source_ip: u32,
    pub destination_ip: u32,
}

impl IpHeaderView {
    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.source_ip)
    }
}

/// A decoded echo reply together with the IP header that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoReply {
    pub ip: IpHeaderView,
    pub icmp: IcmpEchoHeader,
    /// Send time reflected back by the peer, in seconds.
    pub timestamp: f64,
}

impl EchoReply {
    pub fn identifier(&self) -> u16 {
        self.icmp.identifier
    }

    pub fn sequence(&self) -> u16 {
        self.icmp.sequence_num
    }

    pub fn source(&self) -> Ipv4Addr {
        self.ip.source()
    }

    pub fn ttl(&self) -> u8 {
        self.ip.ttl
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("truncated packet ({len} bytes)")]
    Truncated { len: usize },
    #[error("not an echo reply (type {icmp_type}, code {code})")]
    NotEchoReply { icmp_type: u8, code: u8 },
    #[error("malformed header: {0}")]
    Malformed(#[from] bincode::Error),
}

// IP and ICMP headers use network byte order with fixed-width integers.
fn coder() -> impl Options {
    bincode::DefaultOptions::new()
        .with_big_endian()
        .with_fixint_encoding()
}

// The timestamp only ever travels from this host back to this host, so it is
// carried in native byte order. Swap these two to change the representation.
fn encode_timestamp(timestamp: f64) -> [u8; TIMESTAMP_LEN] {
    timestamp.to_ne_bytes()
}

fn decode_timestamp(bytes: [u8; TIMESTAMP_LEN]) -> f64 {
    f64::from_ne_bytes(bytes)
}

/// Build the wire form of an echo request carrying `timestamp` as payload.
pub fn encode_request(identifier: u16, sequence: u16, timestamp: f64) -> [u8; ECHO_REQUEST_LEN] {
    let header = IcmpEchoHeader {
        message_type: ECHO_REQUEST,
        message_code: 0,
        checksum: 0,
        identifier,
        sequence_num: sequence,
    };

    let mut packet = [0u8; ECHO_REQUEST_LEN];
    coder()
        .serialize_into(&mut packet[..ICMP_HEADER_LEN], &header)
        .unwrap();
    packet[ICMP_HEADER_LEN..].copy_from_slice(&encode_timestamp(timestamp));
    util::set_checksum(&mut packet).unwrap();
    packet
}

/// Decode an IPv4 datagram as read from a raw ICMP socket.
///
/// Only the type and code are checked. Identifier matching and checksum
/// verification are left to the caller.
pub fn decode_reply(buf: &[u8]) -> Result<EchoReply, DecodeError> {
    if buf.len() < MIN_REPLY_LEN {
        return Err(DecodeError::Truncated { len: buf.len() });
    }

    let ip: IpHeaderView = coder().deserialize(&buf[..IPV4_HEADER_LEN])?;
    let icmp: IcmpEchoHeader = coder().deserialize(&buf[IPV4_HEADER_LEN..MIN_REPLY_LEN])?;

    if icmp.message_type != ECHO_REPLY || icmp.message_code != 0 {
        return Err(DecodeError::NotEchoReply {
            icmp_type: icmp.message_type,
            code: icmp.message_code,
        });
    }

    let timestamp = buf
        .get(MIN_REPLY_LEN..MIN_REPLY_LEN + TIMESTAMP_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .map(decode_timestamp)
        .ok_or(DecodeError::Truncated { len: buf.len() })?;

    Ok(EchoReply { ip, icmp, timestamp })
}
