//! Plain-text tables for the one-shot commands

use std::io::{self, Write};

use ironsight_sampler::{ConnectionInfo, DerivedMetric, MemoryConsumer, MetricAccess};

use super::utils::{format_mb, format_rate, truncate_string};

const NAME_WIDTH: usize = 32;

pub fn metric_header() -> String {
    format!(
        "{:>7}  {:>6}  {:>10}  {:>5}  {:>6}  {:>10}  {:>10}  {}",
        "PID", "CPU%", "Private", "Thrd", "Hndls", "Read/s", "Write/s", "Name"
    )
}

pub fn metric_row(metric: &DerivedMetric) -> String {
    let name = match metric.access {
        MetricAccess::Sampled => truncate_string(&metric.name, NAME_WIDTH),
        MetricAccess::Denied => format!("{} [denied]", truncate_string(&metric.name, NAME_WIDTH)),
        MetricAccess::Gone => format!("{} [exited]", truncate_string(&metric.name, NAME_WIDTH)),
    };
    format!(
        "{:>7}  {:>6.1}  {:>10}  {:>5}  {:>6}  {:>10}  {:>10}  {}",
        metric.pid,
        metric.cpu_percent,
        format_mb(metric.memory_mb),
        metric.thread_count,
        metric.handle_count,
        format_rate(metric.read_mb_per_sec),
        format_rate(metric.write_mb_per_sec),
        name
    )
}

pub fn consumer_header() -> String {
    format!("{:>4}  {:>7}  {:>10}  {}", "#", "PID", "Working", "Name")
}

pub fn consumer_row(rank: usize, consumer: &MemoryConsumer) -> String {
    format!(
        "{:>4}  {:>7}  {:>10}  {}",
        rank,
        consumer.pid,
        format_mb(consumer.memory_mb),
        truncate_string(&consumer.name, NAME_WIDTH)
    )
}

pub fn connection_header() -> String {
    format!(
        "{:<5}  {:<21}  {:<21}  {:<12}  {:>7}",
        "Proto", "Local", "Remote", "State", "PID"
    )
}

pub fn connection_row(conn: &ConnectionInfo) -> String {
    format!(
        "{:<5}  {:<21}  {:<21}  {:<12}  {:>7}",
        conn.protocol.name(),
        conn.local_endpoint(),
        conn.remote_endpoint(),
        conn.state.name(),
        conn.pid
    )
}

pub fn write_metrics<W: Write>(out: &mut W, metrics: &[DerivedMetric]) -> io::Result<()> {
    writeln!(out, "{}", metric_header())?;
    for metric in metrics {
        writeln!(out, "{}", metric_row(metric))?;
    }
    Ok(())
}

pub fn write_consumers<W: Write>(out: &mut W, consumers: &[MemoryConsumer]) -> io::Result<()> {
    writeln!(out, "{}", consumer_header())?;
    for (i, consumer) in consumers.iter().enumerate() {
        writeln!(out, "{}", consumer_row(i + 1, consumer))?;
    }
    Ok(())
}

pub fn write_connections<W: Write>(out: &mut W, connections: &[ConnectionInfo]) -> io::Result<()> {
    writeln!(out, "{}", connection_header())?;
    for conn in connections {
        writeln!(out, "{}", connection_row(conn))?;
    }
    Ok(())
}
