//! Foundation layer: error taxonomy, identifier types, point-name codec.

pub mod error;
pub mod name;
pub mod types;

pub use error::{ErrorCode, Result, TillerError};
pub use types::{Dominion, EthAddress, Point, ShipClass};

/// Version of the key suite submitted alongside every configure-keys
/// mutation, identical in meaning on both ledgers.
pub const CRYPTO_SUITE_VERSION: u32 = 1;
