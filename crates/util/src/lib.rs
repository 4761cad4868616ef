//! Utility helpers shared across provschema crates.
//!
//! - [`block_on_future`] / [`OwnedRuntime`]: drive async I/O from the
//!   synchronous schema store.
//! - [`extract_zip`] and [`find_entry_with_prefix`]: unpack a provider package
//!   and locate its executable.
//! - [`expand_tilde`]: config path expansion.

pub mod archive;
pub mod async_runtime;
pub mod locate;
pub mod path_processing;

pub use archive::{ArchiveError, extract_zip};
pub use async_runtime::{OwnedRuntime, block_on_future};
pub use locate::find_entry_with_prefix;
pub use path_processing::{expand_tilde, strip_extension};
