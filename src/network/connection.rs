//! Connection rows shared by every table source

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

/// TCP connection state, numbered as the IP Helper MIB numbers it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Unknown = 0,
    Closed = 1,
    Listen = 2,
    SynSent = 3,
    SynReceived = 4,
    Established = 5,
    FinWait1 = 6,
    FinWait2 = 7,
    CloseWait = 8,
    Closing = 9,
    LastAck = 10,
    TimeWait = 11,
    DeleteTcb = 12,
}

impl ConnectionState {
    /// Maps a raw `MIB_TCP_STATE` value. Anything unrecognized is `Unknown`.
    pub fn from_mib(state: u32) -> Self {
        match state {
            1 => ConnectionState::Closed,
            2 => ConnectionState::Listen,
            3 => ConnectionState::SynSent,
            4 => ConnectionState::SynReceived,
            5 => ConnectionState::Established,
            6 => ConnectionState::FinWait1,
            7 => ConnectionState::FinWait2,
            8 => ConnectionState::CloseWait,
            9 => ConnectionState::Closing,
            10 => ConnectionState::LastAck,
            11 => ConnectionState::TimeWait,
            12 => ConnectionState::DeleteTcb,
            _ => ConnectionState::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Unknown => "UNKNOWN",
            ConnectionState::Closed => "CLOSED",
            ConnectionState::Listen => "LISTEN",
            ConnectionState::SynSent => "SYN_SENT",
            ConnectionState::SynReceived => "SYN_RCVD",
            ConnectionState::Established => "ESTABLISHED",
            ConnectionState::FinWait1 => "FIN_WAIT1",
            ConnectionState::FinWait2 => "FIN_WAIT2",
            ConnectionState::CloseWait => "CLOSE_WAIT",
            ConnectionState::Closing => "CLOSING",
            ConnectionState::LastAck => "LAST_ACK",
            ConnectionState::TimeWait => "TIME_WAIT",
            ConnectionState::DeleteTcb => "DELETE_TCB",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport protocol of a connection row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// One TCP connection or UDP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub local_addr: Ipv4Addr,
    /// Host byte order
    pub local_port: u16,
    /// `0.0.0.0` for UDP endpoints
    pub remote_addr: Ipv4Addr,
    /// Host byte order, 0 for UDP endpoints
    pub remote_port: u16,
    pub state: ConnectionState,
    pub protocol: Protocol,
    /// Owning process ID
    pub pid: u32,
}

impl ConnectionInfo {
    /// A UDP endpoint: no remote side and no state
    pub fn udp(local_addr: Ipv4Addr, local_port: u16, pid: u32) -> Self {
        Self {
            local_addr,
            local_port,
            remote_addr: Ipv4Addr::UNSPECIFIED,
            remote_port: 0,
            state: ConnectionState::Unknown,
            protocol: Protocol::Udp,
            pid,
        }
    }

    /// "addr:port" of the local side
    pub fn local_endpoint(&self) -> String {
        format!("{}:{}", self.local_addr, self.local_port)
    }

    /// "addr:port" of the remote side
    pub fn remote_endpoint(&self) -> String {
        format!("{}:{}", self.remote_addr, self.remote_port)
    }
}
