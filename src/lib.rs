//! # wcl
//!
//! Parallel newline counter.
//!
//! ## Features
//!
//! - **Vectorized kernel**: AVX2 / SSE2 / NEON compares with a portable SWAR fallback,
//!   picked once at startup
//! - **Worker pool**: one worker per core draining a shared target queue
//! - **Read strategies**: streaming chunks, whole-file buffers, or memory maps
//! - **Per-target failures**: an unreadable file is reported, never fatal
//!
//! ## Usage
//!
//! ```bash
//! # Newlines on stdin
//! cat file.txt | wcl
//!
//! # Per-file counts and a total
//! wcl a.txt b.txt
//!
//! # Bytes instead of newlines
//! wcl -b a.txt b.txt
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use wcl::engine::{Engine, EngineConfig};
//! use wcl::target::TargetSet;
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let targets = TargetSet::from_args(&["a.txt", "b.txt"], false);
//! let report = engine.run(targets).unwrap();
//!
//! for result in report.results() {
//!     println!("{:?} {}", result.count(), result.label());
//! }
//! println!("{}", report.total());
//! ```

pub mod aggregate;
pub mod cli;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod output;
pub mod progress;
pub mod reader;
pub mod target;

pub use cli::Args;
pub use engine::{CountMode, Engine, EngineConfig};
pub use error::CountError;
pub use kernel::Counter;
