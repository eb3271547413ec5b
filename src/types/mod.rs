pub mod component;
pub mod error;
pub mod repository;
pub mod signal;
pub mod utils;

pub use component::*;
pub use error::{
    DiscoveryError, ErrorCategory, ErrorClassifier, LlmError, Result, ResultExt, exit_code,
};
pub use repository::*;
pub use signal::*;
pub use utils::{
    ParseWithDefault, head_lines, json_string, json_string_array, json_string_or,
    log_filter_warn, truncate_chars,
};
