//! gmdc tool library
//!
//! The commands behind the `gmdc` binary, usable from other tools and tests.

pub mod export;
pub mod extract;
pub mod inspect;

pub use export::{export_objs, parse_shape_key_arg, ExportSettings, ExportSummary};
pub use extract::{extract, ExtractSettings};
pub use inspect::{info_report, load, load_skeleton, verify_bytes, VerifyReport};
