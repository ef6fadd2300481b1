//! External collaborator interfaces: wallet, coin enumeration, name service.
//!
//! The engine treats everything on-ledger as a capability injected at
//! construction time. Implementations live with the caller (RPC clients,
//! wallet-extension bridges, test stubs); the engine only depends on these
//! traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::LedgerTransaction;
use crate::types::{Address, AssetKey, TxId};

/// One externally-owned value object (coin) of a single asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: CoinId,
    pub amount: u64,
}

/// Ledger object id of a coin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinId(pub String);

impl From<&str> for CoinId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Failure while talking to the ledger for read-only data.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LedgerFetchError {
    pub message: String,
}

impl LedgerFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Enumerates the signer's holdings of an asset.
#[async_trait]
pub trait CoinSource: Send + Sync {
    async fn coins_of(
        &self,
        owner: &Address,
        asset: &AssetKey,
    ) -> Result<Vec<Coin>, LedgerFetchError>;
}

/// Submission failure, split so the engine can treat a deliberate user
/// rejection differently from a ledger-level rejection.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The user declined the signature prompt. Not surfaced as an error
    /// toast; it is a deliberate action.
    #[error("signature rejected by user")]
    Rejected,

    /// The ledger refused the transaction (or the RPC failed).
    #[error("ledger rejected transaction: {message}")]
    Ledger { message: String },
}

/// The active signer: one wallet per run.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Current signer address.
    fn address(&self) -> Address;

    /// Sign and submit one atomic transaction, returning its identifier.
    async fn sign_and_submit(&self, tx: LedgerTransaction) -> Result<TxId, SubmitError>;
}

/// Failure resolving a human-readable alias to a canonical address.
#[derive(Debug, Error)]
#[error("could not resolve name {name:?}: {message}")]
pub struct ResolveError {
    pub name: String,
    pub message: String,
}

/// Name-service lookup. Aliases are resolved exactly once per run, before
/// assembly, so a name cannot change meaning mid-run.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Address, ResolveError>;
}
