//! Command-line interface definition for wcl
//!
//! Provides argument parsing and validation for the line counter.

use crate::engine::CountMode;
use crate::kernel::Backend;
use crate::reader::{ReadStrategy, MAX_CHUNK_SIZE};

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Parallel newline counter
///
/// Counts newline bytes (or bytes) in every given file using all CPU cores
/// and a vectorized scanning kernel.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wcl",
    author = "m0h1nd4",
    version,
    about = "Count newlines across many files in parallel",
    long_about = r#"
Count newline bytes in files (or standard input) in parallel.

With more than one file, one "<count> <file>" line is printed per file,
followed by the grand total. With a single file (or stdin) only the total
is printed.

EXAMPLES:
    # Lines on standard input
    cat log.txt | wcl

    # Lines in several files, per file and total
    wcl a.txt b.txt c.txt

    # Bytes instead of lines
    wcl -b data.bin

    # Every file under a directory, 4 workers, memory-mapped reads
    wcl -r -t 4 -s mmap ./logs
"#
)]
pub struct Args {
    /// Files to count; standard input when none are given (`-` also means stdin)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Count bytes instead of newlines
    #[arg(short, long, default_value_t = false)]
    pub bytes: bool,

    /// Number of worker threads (default: auto-detect)
    #[arg(short = 't', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// How file contents are read
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Stream)]
    pub strategy: StrategyArg,

    /// Chunk size for streaming reads (at most 1GB)
    #[arg(long, value_name = "SIZE", default_value = "160KB")]
    pub chunk_size: String,

    /// Counting kernel (default: widest the CPU supports)
    #[arg(short, long, value_enum, default_value_t = KernelArg::Auto)]
    pub kernel: KernelArg,

    /// Expand directory arguments to the files beneath them
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Print run statistics to stderr
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    /// Show a progress bar on stderr
    #[arg(long, default_value_t = false)]
    pub progress: bool,

    /// Quiet mode - errors only
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Read strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Fixed-size chunks through a reusable buffer
    Stream,
    /// One buffer sized to the whole file
    Whole,
    /// Memory-mapped file
    Mmap,
}

/// Kernel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KernelArg {
    Auto,
    Avx2,
    Sse2,
    Neon,
    Swar,
    Memchr,
    Scalar,
}

impl Args {
    pub fn count_mode(&self) -> CountMode {
        if self.bytes {
            CountMode::Bytes
        } else {
            CountMode::Lines
        }
    }

    /// Parse the chunk size string to bytes
    pub fn parse_chunk_size(&self) -> anyhow::Result<usize> {
        let size = parse_size(&self.chunk_size)?;
        if size == 0 {
            anyhow::bail!("Chunk size must be greater than zero");
        }
        if size > MAX_CHUNK_SIZE {
            anyhow::bail!("Chunk size must not exceed 1GB, got '{}'", self.chunk_size);
        }
        Ok(size)
    }

    pub fn read_strategy(&self) -> anyhow::Result<ReadStrategy> {
        Ok(match self.strategy {
            StrategyArg::Stream => ReadStrategy::Streaming {
                chunk_size: self.parse_chunk_size()?,
            },
            StrategyArg::Whole => ReadStrategy::WholeBuffer,
            StrategyArg::Mmap => ReadStrategy::Mapped,
        })
    }

    /// Requested kernel backend, `None` for auto-detection
    pub fn backend(&self) -> Option<Backend> {
        match self.kernel {
            KernelArg::Auto => None,
            KernelArg::Avx2 => Some(Backend::Avx2),
            KernelArg::Sse2 => Some(Backend::Sse2),
            KernelArg::Neon => Some(Backend::Neon),
            KernelArg::Swar => Some(Backend::Swar),
            KernelArg::Memchr => Some(Backend::Memchr),
            KernelArg::Scalar => Some(Backend::Scalar),
        }
    }

    /// Default log filter implied by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Parse human-readable size string to bytes
fn parse_size(size_str: &str) -> anyhow::Result<usize> {
    let size_str = size_str.trim().to_uppercase();

    let (num_str, multiplier) = if size_str.ends_with("GB") {
        (&size_str[..size_str.len() - 2], 1024 * 1024 * 1024)
    } else if size_str.ends_with("MB") {
        (&size_str[..size_str.len() - 2], 1024 * 1024)
    } else if size_str.ends_with("KB") {
        (&size_str[..size_str.len() - 2], 1024)
    } else if size_str.ends_with('B') {
        (&size_str[..size_str.len() - 1], 1)
    } else {
        (size_str.as_str(), 1)
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size format: '{}'", size_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size too large: '{}'", size_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DEFAULT_CHUNK_SIZE;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["wcl"]).unwrap();

        assert!(args.files.is_empty());
        assert_eq!(args.count_mode(), CountMode::Lines);
        assert_eq!(
            args.read_strategy().unwrap(),
            ReadStrategy::Streaming { chunk_size: DEFAULT_CHUNK_SIZE }
        );
        assert_eq!(args.backend(), None);
        assert_eq!(args.threads, None);
        assert_eq!(args.log_level(), "warn");
    }

    #[test]
    fn test_files_and_flags() {
        let args = Args::try_parse_from([
            "wcl", "-b", "-t", "4", "-s", "mmap", "-k", "scalar", "-r", "a.txt", "b.txt",
        ])
        .unwrap();

        assert_eq!(args.files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(args.count_mode(), CountMode::Bytes);
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.read_strategy().unwrap(), ReadStrategy::Mapped);
        assert_eq!(args.backend(), Some(Backend::Scalar));
        assert!(args.recursive);
    }

    #[test]
    fn test_chunk_size() {
        let args = Args::try_parse_from(["wcl", "--chunk-size", "1MB"]).unwrap();
        assert_eq!(
            args.read_strategy().unwrap(),
            ReadStrategy::Streaming { chunk_size: 1024 * 1024 }
        );

        let args = Args::try_parse_from(["wcl", "--chunk-size", "0"]).unwrap();
        assert!(args.read_strategy().is_err());
    }

    #[test]
    fn test_chunk_size_limit() {
        let args = Args::try_parse_from(["wcl", "--chunk-size", "1GB"]).unwrap();
        assert_eq!(
            args.read_strategy().unwrap(),
            ReadStrategy::Streaming { chunk_size: MAX_CHUNK_SIZE }
        );

        for size in ["2GB", "4GB", "1025MB"] {
            let args = Args::try_parse_from(["wcl", "--chunk-size", size]).unwrap();
            let err = args.read_strategy().unwrap_err();
            assert!(err.to_string().contains("must not exceed"), "{size}: {err}");
        }
    }

    #[test]
    fn test_unknown_kernel_rejected() {
        assert!(Args::try_parse_from(["wcl", "--kernel", "avx512"]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("160KB").unwrap(), 160 * 1024);
        assert_eq!(parse_size("64mb").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("512B").unwrap(), 512);
        assert!(parse_size("lots").is_err());
    }
}
