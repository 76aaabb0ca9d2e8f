//! # nsnotify Authority
//!
//! In-process namespace authority for nsnotify.
//!
//! This crate provides:
//! - A shared edit journal with epoch fencing and retention
//! - Authority nodes with active/standby/stopped roles
//! - A nameservice registry driving failover
//! - CBOR endpoints (`/inotify/edits`, `/inotify/position`)
//!
//! # Architecture
//!
//! Every node of a nameservice writes to the same `SharedJournal`. Making
//! a node active promises the journal a new epoch, which fences the
//! previous writer: its later syncs are rejected and its unsynced edits
//! are lost. Each node serves reads only up to the highest sequence number
//! it committed or recovered itself, so a fenced node never exposes edits
//! written by its successor.
//!
//! ```rust,ignore
//! use nsnotify_authority::{AuthorityConfig, Nameservice};
//!
//! let ns = Nameservice::with_nodes(["nn0", "nn1"], AuthorityConfig::default());
//! ns.transition_to_active("nn0")?;
//! ns.node("nn0")?.commit(edits)?;
//! ns.failover("nn0", "nn1")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod journal;
mod nameservice;
mod node;
mod server;

pub use config::AuthorityConfig;
pub use error::{AuthorityError, AuthorityResult};
pub use journal::SharedJournal;
pub use nameservice::Nameservice;
pub use node::{AuthorityNode, NodeRole};
pub use server::AuthorityServer;
