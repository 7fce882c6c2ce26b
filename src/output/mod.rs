//! Fix persistence.
//!
//! One record per fix, fixed width: the anchor-id and range columns always
//! span four slots, with unused slots left empty so the record layout never
//! depends on how many anchors participated.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::Fix;
use crate::error::Result;

/// Number of anchor/range column slots in every record.
const RECORD_SLOTS: usize = 4;

/// Destination for computed fixes. Implementations own their medium; the
/// pipeline only ever appends.
pub trait FixSink {
    fn record(&mut self, fix: &Fix) -> Result<()>;
}

/// Append-only CSV file sink.
pub struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Create (or truncate) the file and write the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "anchor_count,a1,a2,a3,a4,r1,r2,r3,r4,x,y,timestamp_ms"
        )?;
        Ok(Self { writer })
    }
}

impl FixSink for CsvSink {
    fn record(&mut self, fix: &Fix) -> Result<()> {
        writeln!(self.writer, "{}", format_row(fix))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink, used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub fixes: Vec<Fix>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FixSink for MemorySink {
    fn record(&mut self, fix: &Fix) -> Result<()> {
        self.fixes.push(fix.clone());
        Ok(())
    }
}

fn format_row(fix: &Fix) -> String {
    let mut columns = Vec::with_capacity(3 + 2 * RECORD_SLOTS);
    columns.push(fix.anchor_count.to_string());

    for slot in 0..RECORD_SLOTS {
        columns.push(fix.anchor_ids.get(slot).cloned().unwrap_or_default());
    }
    for slot in 0..RECORD_SLOTS {
        columns.push(
            fix.ranges_m
                .get(slot)
                .map(|r| format!("{:.3}", r))
                .unwrap_or_default(),
        );
    }

    columns.push(format!("{:.3}", fix.x));
    columns.push(format!("{:.3}", fix.y));
    columns.push(unix_millis(fix.captured_at).to_string());
    columns.join(",")
}

fn unix_millis(at: SystemTime) -> u128 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    fn fix_with(ids: &[&str], ranges: &[f64]) -> Fix {
        Fix {
            anchor_count: ids.len(),
            anchor_ids: ids.iter().map(|s| s.to_string()).collect(),
            ranges_m: ranges.to_vec(),
            x: 1.25,
            y: 2.5,
            captured_at: UNIX_EPOCH + Duration::from_millis(1_700_000_000_000),
        }
    }

    #[test]
    fn test_row_is_fixed_width_when_padded() {
        let row = format_row(&fix_with(&["1782", "1783"], &[2.5, 3.125]));
        assert_eq!(
            row,
            "2,1782,1783,,,2.500,3.125,,,1.250,2.500,1700000000000"
        );
    }

    #[test]
    fn test_row_with_four_anchors() {
        let row = format_row(&fix_with(
            &["1782", "1783", "1784", "1785"],
            &[1.0, 2.0, 3.0, 4.0],
        ));
        assert_eq!(row.split(',').count(), 12);
        assert!(row.starts_with("4,1782,1783,1784,1785,"));
    }

    #[test]
    fn test_csv_sink_writes_header_and_rows() {
        let path = PathBuf::from("test_fixes_out.csv");
        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.record(&fix_with(&["1782", "1783", "1784"], &[1.0, 2.0, 3.0]))
                .unwrap();
        }
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("anchor_count,"));
        assert!(lines[1].starts_with("3,1782,1783,1784,"));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_memory_sink_accumulates() {
        let mut sink = MemorySink::new();
        sink.record(&fix_with(&["1782", "1783"], &[1.0, 2.0])).unwrap();
        sink.record(&fix_with(&["1782", "1783"], &[1.1, 2.1])).unwrap();
        assert_eq!(sink.fixes.len(), 2);
        assert_eq!(sink.fixes[1].ranges_m, vec![1.1, 2.1]);
    }
}
