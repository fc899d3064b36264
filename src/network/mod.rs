//! Connection table snapshots
//!
//! `ConnectionMonitor` rebuilds the TCP/UDP connection list from a raw
//! table source. A refresh holds the lock for the whole rebuild, and reads
//! take the same lock, so readers never see a half-built list.

mod connection;
pub mod table;

pub use connection::{ConnectionInfo, ConnectionState, Protocol};

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::constants::{
    INITIAL_CONNECTION_CAPACITY, INITIAL_TABLE_BUFFER_BYTES, MAX_TABLE_FETCH_ATTEMPTS,
    TABLE_BUFFER_GROWTH_BYTES,
};
use crate::error::{NetworkError, NetworkResult};

/// Outcome of one attempt to read a raw table into a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFetch {
    /// The table fit and was decoded
    Rows(Vec<ConnectionInfo>),
    /// The buffer is too small; `required` is the size the OS asked for
    InsufficientBuffer { required: usize },
}

/// Raw connection table capability.
pub trait ConnectionTableSource {
    /// Reads the table for `protocol` into `buffer`.
    fn fetch(&self, protocol: Protocol, buffer: &mut [u8]) -> NetworkResult<TableFetch>;
}

impl<T: ConnectionTableSource + ?Sized> ConnectionTableSource for std::sync::Arc<T> {
    fn fetch(&self, protocol: Protocol, buffer: &mut [u8]) -> NetworkResult<TableFetch> {
        (**self).fetch(protocol, buffer)
    }
}

struct TableState {
    connections: Vec<ConnectionInfo>,
    tcp_buffer: Vec<u8>,
    udp_buffer: Vec<u8>,
}

/// Holds the latest connection list for the whole machine
pub struct ConnectionMonitor<T> {
    source: T,
    state: Mutex<TableState>,
}

impl<T: ConnectionTableSource> ConnectionMonitor<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            state: Mutex::new(TableState {
                connections: Vec::with_capacity(INITIAL_CONNECTION_CAPACITY),
                tcp_buffer: vec![0u8; INITIAL_TABLE_BUFFER_BYTES],
                udp_buffer: vec![0u8; INITIAL_TABLE_BUFFER_BYTES],
            }),
        }
    }

    /// Rebuilds both tables. Both are attempted; the first error is returned.
    pub fn refresh(&self) -> NetworkResult<()> {
        let mut state = self.lock_state();
        state.connections.clear();

        let tcp = self.rebuild(&mut state, Protocol::Tcp);
        let udp = self.rebuild(&mut state, Protocol::Udp);
        tcp.and(udp)
    }

    /// Rebuilds the list from the TCP table only.
    pub fn refresh_tcp(&self) -> NetworkResult<()> {
        let mut state = self.lock_state();
        state.connections.clear();
        self.rebuild(&mut state, Protocol::Tcp)
    }

    /// Rebuilds the list from the UDP table only.
    pub fn refresh_udp(&self) -> NetworkResult<()> {
        let mut state = self.lock_state();
        state.connections.clear();
        self.rebuild(&mut state, Protocol::Udp)
    }

    pub fn connection_count(&self) -> usize {
        self.lock_state().connections.len()
    }

    /// Copies at most `max` rows of the current list.
    pub fn copy_connections(&self, max: usize) -> Vec<ConnectionInfo> {
        let state = self.lock_state();
        state.connections.iter().take(max).copied().collect()
    }

    /// Copies the whole current list.
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        self.lock_state().connections.clone()
    }

    fn rebuild(&self, state: &mut TableState, protocol: Protocol) -> NetworkResult<()> {
        let buffer = match protocol {
            Protocol::Tcp => &mut state.tcp_buffer,
            Protocol::Udp => &mut state.udp_buffer,
        };

        match fetch_with_growth(&self.source, protocol, buffer) {
            Ok(rows) => {
                debug!(protocol = protocol.name(), rows = rows.len(), "connection table rebuilt");
                state.connections.extend(rows);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to read {} table: {}", protocol.name(), e);
                Err(e)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TableState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Probes with the current buffer and grows it on "too small", up to
/// `MAX_TABLE_FETCH_ATTEMPTS` tries.
fn fetch_with_growth<T: ConnectionTableSource + ?Sized>(
    source: &T,
    protocol: Protocol,
    buffer: &mut Vec<u8>,
) -> NetworkResult<Vec<ConnectionInfo>> {
    let mut required = buffer.len();

    for _ in 0..MAX_TABLE_FETCH_ATTEMPTS {
        match source.fetch(protocol, buffer.as_mut_slice())? {
            TableFetch::Rows(rows) => return Ok(rows),
            TableFetch::InsufficientBuffer { required: needed } => {
                required = needed;
                buffer.resize(needed + TABLE_BUFFER_GROWTH_BYTES, 0);
            }
        }
    }

    Err(NetworkError::BufferRetriesExhausted {
        attempts: MAX_TABLE_FETCH_ATTEMPTS,
        required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers "too small" until the buffer reaches `needed` bytes.
    struct GrowingTable {
        tcp_needed: AtomicUsize,
        growth_per_call: usize,
        calls: AtomicUsize,
        fail_udp: bool,
    }

    impl GrowingTable {
        fn new(tcp_needed: usize) -> Self {
            Self {
                tcp_needed: AtomicUsize::new(tcp_needed),
                growth_per_call: 0,
                calls: AtomicUsize::new(0),
                fail_udp: false,
            }
        }
    }

    fn tcp_row(port: u16, pid: u32) -> ConnectionInfo {
        ConnectionInfo {
            local_addr: Ipv4Addr::LOCALHOST,
            local_port: port,
            remote_addr: Ipv4Addr::new(10, 0, 0, 1),
            remote_port: 443,
            state: ConnectionState::Established,
            protocol: Protocol::Tcp,
            pid,
        }
    }

    impl ConnectionTableSource for GrowingTable {
        fn fetch(&self, protocol: Protocol, buffer: &mut [u8]) -> NetworkResult<TableFetch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match protocol {
                Protocol::Tcp => {
                    let needed = self
                        .tcp_needed
                        .fetch_add(self.growth_per_call, Ordering::SeqCst);
                    if buffer.len() < needed {
                        return Ok(TableFetch::InsufficientBuffer { required: needed });
                    }
                    Ok(TableFetch::Rows(vec![tcp_row(8080, 1), tcp_row(8081, 2)]))
                }
                Protocol::Udp if self.fail_udp => Err(NetworkError::TableQuery {
                    api: "GetExtendedUdpTable",
                    code: 87,
                }),
                Protocol::Udp => Ok(TableFetch::Rows(vec![ConnectionInfo::udp(
                    Ipv4Addr::UNSPECIFIED,
                    53,
                    3,
                )])),
            }
        }
    }

    #[test]
    fn test_refresh_collects_tcp_then_udp() {
        let monitor = ConnectionMonitor::new(GrowingTable::new(16));
        monitor.refresh().unwrap();

        let rows = monitor.connections();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].protocol, Protocol::Tcp);
        assert_eq!(rows[2].protocol, Protocol::Udp);
        assert_eq!(monitor.connection_count(), 3);
    }

    #[test]
    fn test_buffer_grows_and_retries() {
        let needed = INITIAL_TABLE_BUFFER_BYTES * 3;
        let monitor = ConnectionMonitor::new(GrowingTable::new(needed));

        monitor.refresh_tcp().unwrap();
        assert_eq!(monitor.connection_count(), 2);
        // one "too small" answer, then success
        assert_eq!(monitor.source.calls.load(Ordering::SeqCst), 2);
        assert!(monitor.lock_state().tcp_buffer.len() >= needed);
    }

    #[test]
    fn test_runaway_growth_is_capped() {
        let mut table = GrowingTable::new(INITIAL_TABLE_BUFFER_BYTES + 1);
        table.growth_per_call = TABLE_BUFFER_GROWTH_BYTES * 2;
        let monitor = ConnectionMonitor::new(table);

        match monitor.refresh_tcp() {
            Err(NetworkError::BufferRetriesExhausted { attempts, .. }) => {
                assert_eq!(attempts, MAX_TABLE_FETCH_ATTEMPTS)
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            monitor.source.calls.load(Ordering::SeqCst),
            MAX_TABLE_FETCH_ATTEMPTS
        );
        assert_eq!(monitor.connection_count(), 0);
    }

    #[test]
    fn test_refresh_keeps_tcp_rows_when_udp_fails() {
        let mut table = GrowingTable::new(16);
        table.fail_udp = true;
        let monitor = ConnectionMonitor::new(table);

        assert!(matches!(
            monitor.refresh(),
            Err(NetworkError::TableQuery { .. })
        ));
        assert_eq!(monitor.connection_count(), 2);
    }

    #[test]
    fn test_single_table_refresh_replaces_list() {
        let monitor = ConnectionMonitor::new(GrowingTable::new(16));
        monitor.refresh().unwrap();
        assert_eq!(monitor.connection_count(), 3);

        monitor.refresh_udp().unwrap();
        let rows = monitor.connections();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].local_port, 53);
    }

    #[test]
    fn test_copy_is_bounded() {
        let monitor = ConnectionMonitor::new(GrowingTable::new(16));
        monitor.refresh().unwrap();

        assert_eq!(monitor.copy_connections(2).len(), 2);
        assert_eq!(monitor.copy_connections(100).len(), 3);
        assert!(monitor.copy_connections(0).is_empty());
    }
}
