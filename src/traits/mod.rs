//! # Backend Traits
//!
//! The interface every storage backend implements.
//!
//! ## Overview
//!
//! | Trait / type | Role |
//! |--------------|------|
//! | [`Accessor`] | async physical operations plus a static [`AccessorInfo`](crate::AccessorInfo) |
//! | [`Lister`] | lazy stream of listed entries |
//! | [`Pager`] | optional page source a backend can hand to [`Lister::from_pager`] |
//!
//! Layers implement [`Accessor`] too, by wrapping an inner accessor, so a
//! chain of layers is indistinguishable from a plain backend.
//!
//! ## Thread Safety
//!
//! `Accessor` requires `Send + Sync + 'static`. Methods take `&self` to enable
//! concurrent access from cloned operators.

mod accessor;
mod lister;

pub use accessor::{Accessor, DynAccessor};
pub use lister::{Lister, Pager};
