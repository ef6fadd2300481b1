//! Core identifier types shared across the ledgerflow crate.
//!
//! These newtypes exist so the compiler, assembler, and orchestrator cannot
//! accidentally mix up the many stringly-typed identities flowing through the
//! system (node ids from the editor, asset identities, chain names, provider
//! names from the routing service). All of them serialize as plain strings so
//! editor snapshots and status payloads stay simple JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a node within one editor graph snapshot.
///
/// Ids are opaque strings minted by the editor's injected id generator; the
/// engine never creates or mutates them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

/// Canonical asset identity, e.g. `"0x2::sui::SUI"` or `"USDC"`.
///
/// Used as the key of the intermediate resource pool: two steps exchange
/// value through the pool exactly when their `AssetKey`s are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(pub String);

/// A canonical (already resolved) on-ledger address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

/// Chain identity for bridge endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub String);

/// Ledger transaction identifier returned after submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub String);

/// Bridge route provider identity, as reported by the routing service.
///
/// Accumulated in the orchestrator's denylist when a provider's route fails
/// pre-flight simulation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

macro_rules! string_newtype {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_newtype!(NodeId);
string_newtype!(AssetKey);
string_newtype!(Address);
string_newtype!(ChainId);
string_newtype!(TxId);
string_newtype!(ProviderId);
