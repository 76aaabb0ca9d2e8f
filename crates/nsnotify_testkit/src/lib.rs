//! # nsnotify Testkit
//!
//! Test utilities for nsnotify.
//!
//! This crate provides:
//! - Operation builders and canned mutation scripts
//! - Property-based generators for operations using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nsnotify_testkit::prelude::*;
//!
//! #[test]
//! fn mkdir_is_create() {
//!     init_tracing();
//!     let ops = sequenced(1, vec![mkdir("/dir", 10)]);
//!     // ...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
}

pub use fixtures::*;
pub use generators::*;

static TRACING: Once = Once::new();

/// Installs a test-writer tracing subscriber once per process.
///
/// Verbosity follows `RUST_LOG` and defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
