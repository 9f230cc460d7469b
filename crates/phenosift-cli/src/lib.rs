//! Library surface of the phenosift command-line tool.
//!
//! The binary in `main.rs` only parses arguments and dispatches; everything
//! testable lives here.
pub mod pipeline;
