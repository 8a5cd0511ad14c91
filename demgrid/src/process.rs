//! Process-level resource readings for health reporting.
//!
//! On Linux these come from `/proc/self/status`. Elsewhere memory reads as 0
//! and the thread count as 1.

/// Resident set size of the current process in bytes.
pub fn resident_memory_bytes() -> u64 {
    status_field("VmRSS:").map(|kb| kb * 1024).unwrap_or(0)
}

/// Number of OS threads in the current process.
pub fn thread_count() -> usize {
    status_field("Threads:")
        .map(|n| n as usize)
        .unwrap_or(1)
        .max(1)
}

/// Read the first numeric value of a `/proc/self/status` line.
fn status_field(name: &str) -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_status_field(&status, name)
}

fn parse_status_field(status: &str, name: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with(name))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "Name:\tdemgrid-service\nVmPeak:\t  204800 kB\nVmRSS:\t   51200 kB\nThreads:\t9\n";

    #[test]
    fn test_parse_status_fields() {
        assert_eq!(parse_status_field(STATUS, "VmRSS:"), Some(51200));
        assert_eq!(parse_status_field(STATUS, "Threads:"), Some(9));
        assert_eq!(parse_status_field(STATUS, "VmSwap:"), None);
    }

    #[test]
    fn test_thread_count_is_positive() {
        assert!(thread_count() >= 1);
    }
}
