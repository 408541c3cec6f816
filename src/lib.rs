//! Network-key lifecycle orchestration for points on a two-tier ledger.
//!
//! Points live either on the authoritative chain (L1) or on a rollup (L2);
//! this crate resolves identifiers, decides per point which ledger holds
//! authority, assembles canonical snapshots, generates and caches network
//! key material, and routes configure-keys and continuity-breach mutations
//! to the right backend.
//!
//! Layers, lowest first:
//! - [`foundation`]: error taxonomy, identifier types, the phonemic name codec
//! - [`config`]: TOML-backed runtime configuration
//! - [`domain`]: canonical models, point resolution, key derivation
//! - [`infrastructure`]: ledger backends and durable artifact storage
//! - [`application`]: the orchestration workflows themselves

pub mod application;
pub mod config;
pub mod domain;
pub mod foundation;
pub mod infrastructure;

pub use foundation::{Result, TillerError};
