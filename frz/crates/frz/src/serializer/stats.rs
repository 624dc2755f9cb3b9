//! Run Statistics

use crate::walker::LayoutCacheStats;
use std::fmt;
use std::time::{Duration, Instant};

/// RunTimer - wall-clock timer for one serialization run
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for RunTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters of one completed run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SerializeStats {
    /// Records written
    pub objects: u64,
    /// Blob length in bytes
    pub bytes: u64,
    /// Reference slots rewritten on disk
    pub references_patched: u64,
    /// Reference slots left as zero
    pub null_references: u64,
    pub distinct_types: usize,
    pub fixups: usize,
    pub layout_cache: LayoutCacheStats,
    pub elapsed: Duration,
}

impl SerializeStats {
    /// Throughput in MB/s
    pub fn throughput_mb_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / (1024.0 * 1024.0) / secs
    }
}

impl fmt::Display for SerializeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} objects, {} bytes, {} references ({} null), {} types, {} fixups in {:.3}ms",
            self.objects,
            self.bytes,
            self.references_patched,
            self.null_references,
            self.distinct_types,
            self.fixups,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let stats = SerializeStats {
            objects: 2,
            bytes: 48,
            references_patched: 2,
            distinct_types: 1,
            ..Default::default()
        };
        let line = stats.to_string();
        assert!(line.starts_with("2 objects, 48 bytes, 2 references (0 null), 1 types"));
        assert_eq!(stats.throughput_mb_s(), 0.0);
    }
}
