//! # nsnotify Stream
//!
//! Resumable change-event stream over a namespace edit log.
//!
//! This crate provides:
//! - Cursor management (a cursor never points inside one operation's events)
//! - Non-blocking, deadline-bound and async polling
//! - Lag estimation
//! - Redirect following and failover across the authorities of a nameservice
//! - Gap detection when the authority no longer retains history
//! - Transport abstraction with an RPC/CBOR implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nsnotify_stream::{EventStream, StreamConfig};
//!
//! let config = StreamConfig::new(["nn0:8020", "nn1:8020"]);
//! let mut stream = EventStream::open(connector, config)?;
//! while let Some(event) = stream.poll_timeout(Duration::from_secs(5))? {
//!     println!("{:?} {}", event.event_type(), event.path());
//! }
//! ```
//!
//! ## Key Invariants
//!
//! - Events are delivered in commit order
//! - The cursor advances past an operation only after its last event
//! - Redirects and failovers resume from the same cursor
//! - Missing history is reported, never skipped

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod rpc;
mod stream;
mod transport;

pub use config::StreamConfig;
pub use error::{StreamError, StreamResult};
pub use rpc::{LoopbackClient, LoopbackNetwork, LoopbackServer, RpcClient, RpcFetcher};
pub use stream::{CancelHandle, EventStream, StreamStats};
pub use transport::{AuthorityConnector, BatchFetcher, MockConnector, MockFetcher};
