//! Decoders for the IP Helper owner-PID table layouts
//!
//! Both tables start with a `u32` row count followed by packed rows of
//! `u32` fields. Addresses and ports are stored in network byte order.
//! Decoding reads byte slices, so the buffer needs no particular alignment.

use std::net::Ipv4Addr;

use tracing::warn;

use super::connection::{ConnectionInfo, ConnectionState, Protocol};

const COUNT_BYTES: usize = 4;

/// `MIB_TCPROW_OWNER_PID`: state, local addr, local port, remote addr,
/// remote port, owning pid
pub const TCP_ROW_BYTES: usize = 24;

/// `MIB_UDPROW_OWNER_PID`: local addr, local port, owning pid
pub const UDP_ROW_BYTES: usize = 12;

fn field(row: &[u8], index: usize) -> [u8; 4] {
    let start = index * 4;
    [row[start], row[start + 1], row[start + 2], row[start + 3]]
}

fn native_u32(row: &[u8], index: usize) -> u32 {
    u32::from_ne_bytes(field(row, index))
}

fn addr(row: &[u8], index: usize) -> Ipv4Addr {
    Ipv4Addr::from(field(row, index))
}

fn port(row: &[u8], index: usize) -> u16 {
    let raw = field(row, index);
    u16::from_be_bytes([raw[0], raw[1]])
}

/// Splits a table into its rows, clamping a row count that overruns the buffer.
fn rows<'a>(buffer: &'a [u8], row_bytes: usize, table: &str) -> Vec<&'a [u8]> {
    if buffer.len() < COUNT_BYTES {
        return Vec::new();
    }

    let declared = native_u32(buffer, 0) as usize;
    let available = (buffer.len() - COUNT_BYTES) / row_bytes;
    if declared > available {
        warn!(declared, available, "{} table truncated", table);
    }

    buffer[COUNT_BYTES..]
        .chunks_exact(row_bytes)
        .take(declared.min(available))
        .collect()
}

pub fn decode_tcp_table(buffer: &[u8]) -> Vec<ConnectionInfo> {
    rows(buffer, TCP_ROW_BYTES, "TCP")
        .into_iter()
        .map(|row| ConnectionInfo {
            state: ConnectionState::from_mib(native_u32(row, 0)),
            local_addr: addr(row, 1),
            local_port: port(row, 2),
            remote_addr: addr(row, 3),
            remote_port: port(row, 4),
            protocol: Protocol::Tcp,
            pid: native_u32(row, 5),
        })
        .collect()
}

pub fn decode_udp_table(buffer: &[u8]) -> Vec<ConnectionInfo> {
    rows(buffer, UDP_ROW_BYTES, "UDP")
        .into_iter()
        .map(|row| ConnectionInfo::udp(addr(row, 0), port(row, 1), native_u32(row, 2)))
        .collect()
}
