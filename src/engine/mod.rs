//! Engine: digest provider, CLI surface, and path helpers.

pub mod arg_parser;
pub mod cli;
pub mod digest;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use digest::{DigestFn, digest_bytes, digest_file, resolve, resolve_named};
pub use tools::{glob_match, is_excluded, running_as_root, validate_root};
