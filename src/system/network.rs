//! Connection tables using the IP Helper API
//!
//! GetExtendedTcpTable / GetExtendedUdpTable fill a caller-supplied
//! buffer with the owner-PID tables for IPv4. "Buffer too small" is
//! reported back so the monitor can grow and retry.

use std::ffi::c_void;

use windows::Win32::Foundation::{ERROR_INSUFFICIENT_BUFFER, NO_ERROR};
use windows::Win32::NetworkManagement::IpHelper::{
    GetExtendedTcpTable, GetExtendedUdpTable, TCP_TABLE_OWNER_PID_ALL, UDP_TABLE_OWNER_PID,
};
use windows::Win32::Networking::WinSock::AF_INET;

use crate::error::{NetworkError, NetworkResult};
use crate::network::table::{decode_tcp_table, decode_udp_table};
use crate::network::{ConnectionTableSource, Protocol, TableFetch};

/// `ConnectionTableSource` over the system-wide IPv4 tables
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32ConnectionTable;

impl Win32ConnectionTable {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionTableSource for Win32ConnectionTable {
    fn fetch(&self, protocol: Protocol, buffer: &mut [u8]) -> NetworkResult<TableFetch> {
        let mut size = buffer.len() as u32;
        let table = Some(buffer.as_mut_ptr() as *mut c_void);

        // SAFETY: `size` is the real length of `buffer`, so the API never
        // writes past it; on "too small" it only updates `size`.
        let (api, result) = unsafe {
            match protocol {
                Protocol::Tcp => (
                    "GetExtendedTcpTable",
                    GetExtendedTcpTable(
                        table,
                        &mut size,
                        false,
                        AF_INET.0 as u32,
                        TCP_TABLE_OWNER_PID_ALL,
                        0,
                    ),
                ),
                Protocol::Udp => (
                    "GetExtendedUdpTable",
                    GetExtendedUdpTable(
                        table,
                        &mut size,
                        false,
                        AF_INET.0 as u32,
                        UDP_TABLE_OWNER_PID,
                        0,
                    ),
                ),
            }
        };

        if result == ERROR_INSUFFICIENT_BUFFER.0 {
            return Ok(TableFetch::InsufficientBuffer {
                required: size as usize,
            });
        }
        if result != NO_ERROR.0 {
            return Err(NetworkError::TableQuery { api, code: result });
        }

        let rows = match protocol {
            Protocol::Tcp => decode_tcp_table(buffer),
            Protocol::Udp => decode_udp_table(buffer),
        };
        Ok(TableFetch::Rows(rows))
    }
}
