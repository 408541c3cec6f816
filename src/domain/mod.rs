//! Domain layer: canonical models, point resolution, key derivation.

pub mod keys;
pub mod model;
pub mod resolver;
pub mod wallet;

pub use keys::{derive_keyfile, KeyDeriver, TicketKeyDeriver};
pub use model::{
    AuthorityCheck, BatchReport, BreachOutcome, ConfigureOutcome, ConfiguredKeys, KeyFile, KeyHalf, NetworkKeyPair,
    PointFailure, PointInfo, Receipt, SigningIdentity, SubmittedConfiguration,
};
pub use resolver::{resolve, PointSource, RejectedPoint, ResolvedPoints};
pub use wallet::{load_wallets, WalletNetworkKeys, WalletRecord};
