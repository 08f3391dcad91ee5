//! Report output
//!
//! Writes per-target lines and the grand total with buffering.

use crate::aggregate::Report;

use std::io::{BufWriter, Write};

/// Default buffer size for result output (64KB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Buffered writer for count lines
pub struct ReportWriter<W: Write> {
    writer: BufWriter<W>,
    lines_written: u64,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, inner)
    }

    pub fn with_capacity(buffer_size: usize, inner: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(buffer_size, inner),
            lines_written: 0,
        }
    }

    /// Write one `<count> <label>` line
    pub fn write_count(&mut self, count: u64, label: &str) -> anyhow::Result<()> {
        writeln!(self.writer, "{} {}", count, label)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Write the grand total on its own line
    pub fn write_total(&mut self, total: u64) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", total)?;
        self.lines_written += 1;
        Ok(())
    }

    /// Write a whole report.
    ///
    /// Per-target lines appear only when more than one target was submitted;
    /// failed targets get no line here. The total line is always written.
    pub fn write_report(&mut self, report: &Report) -> anyhow::Result<()> {
        if report.submitted() > 1 {
            for result in report.results() {
                if let Some(count) = result.count() {
                    self.write_count(count, &result.label())?;
                }
            }
        }
        self.write_total(report.total())
    }

    /// Flush the buffer
    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Get number of lines written
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TargetCount;
    use crate::error::CountError;
    use crate::target::Target;
    use std::path::PathBuf;

    fn render(report: &Report) -> String {
        let mut out = Vec::new();
        let mut writer = ReportWriter::new(&mut out);
        writer.write_report(report).unwrap();
        writer.flush().unwrap();
        drop(writer);
        String::from_utf8(out).unwrap()
    }

    fn file(name: &str) -> Target {
        Target::File(PathBuf::from(name))
    }

    #[test]
    fn test_multiple_targets() {
        let report = Report::new(
            vec![
                TargetCount::counted(file("a"), 2),
                TargetCount::counted(file("b"), 3),
            ],
            2,
        );

        assert_eq!(render(&report), "2 a\n3 b\n5\n");
    }

    #[test]
    fn test_single_target_prints_only_total() {
        let report = Report::new(vec![TargetCount::counted(file("a"), 7)], 1);
        assert_eq!(render(&report), "7\n");

        let report = Report::new(vec![TargetCount::counted(Target::Stdin, 5)], 1);
        assert_eq!(render(&report), "5\n");
    }

    #[test]
    fn test_stdin_label_is_empty() {
        let report = Report::new(
            vec![
                TargetCount::counted(Target::Stdin, 1),
                TargetCount::counted(file("x"), 2),
            ],
            2,
        );

        assert_eq!(render(&report), "1 \n2 x\n3\n");
    }

    #[test]
    fn test_failed_targets_are_skipped() {
        let report = Report::new(
            vec![
                TargetCount::counted(file("a"), 4),
                TargetCount::failed(file("gone"), CountError::WorkerUnavailable { name: "gone".into() }),
            ],
            2,
        );

        let mut out = Vec::new();
        let mut writer = ReportWriter::new(&mut out);
        writer.write_report(&report).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.lines_written(), 2);
        drop(writer);
        assert_eq!(String::from_utf8(out).unwrap(), "4 a\n4\n");
    }
}
