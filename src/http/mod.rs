//! HTTP protocol layer module
//!
//! Protocol helpers shared by the file handlers, decoupled from how requests are routed.

pub mod cache;
pub mod mime;
pub mod path;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use path::canonicalize;
pub use range::{is_completion_probe, parse_range_header, RangeParseResult, RangeRequest};
pub use response::{send_304, send_404, send_416};
