//! Report assembly and persistence.
//!
//! [`build_report`] evaluates every channel's metrics, then adds the
//! latency and SOH sections when their data is available. The finished
//! [`Report`] is written by [`write_report`].

pub mod builder;
pub mod output;
pub mod types;

pub use builder::{ReportInputs, build_report};
pub use output::{DEFAULT_OUTPUT_DIR, print_json, report_file_name, write_report};
pub use types::{ChannelReport, Report};
