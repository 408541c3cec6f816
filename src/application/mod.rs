//! Orchestration layer: the per-point workflows that tie ledgers, storage
//! and key derivation together.

pub mod aggregator;
pub mod bootstrap;
pub mod breach;
pub mod dispatcher;
pub mod key_cache;
pub mod sponsorship;

pub use aggregator::PointInfoAggregator;
pub use bootstrap::{build, Orchestrator};
pub use breach::BreachOrchestrator;
pub use dispatcher::KeyConfigurationDispatcher;
pub use key_cache::{KeyMaterialSource, NetworkKeyCache};
pub use sponsorship::{SponsorshipService, TransferOutcome};
