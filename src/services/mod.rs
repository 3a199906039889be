//! Built-in backends.
//!
//! | Scheme | Accessor | Notes |
//! |--------|----------|-------|
//! | `memory` | [`MemoryAccessor`] | ordered, declares every capability |
//! | `fs` | [`FsAccessor`] | local directory via `tokio::fs`; no content type or user metadata |

mod fs;
mod memory;

pub use fs::FsAccessor;
pub use memory::MemoryAccessor;
