// Channel settlement library resolving lightning channel closings onchain
// by LNP/BP Association (https://lnp-bp.org)
//
// Written in 2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// This software is distributed without any warranty.
//
// You should have received a copy of the Apache-2.0 License
// along with this software.
// If not, see <https://opensource.org/licenses/Apache-2.0>.

//! Library working with onchain data of lightning channel closings: parsing
//! closing and sweeping transactions, classifying how each of their inputs
//! resolves a channel output and accounting the fees paid to close a channel.

// Coding conventions
#![recursion_limit = "256"]
#![deny(dead_code, missing_docs)]

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate tracing;
#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_crate as serde;

pub mod blockchain;
pub mod classify;
pub mod fees;
mod resolvers;

pub use blockchain::{CloseTx, RawTx, TxParseError};
pub use classify::{classify, classify_all, ClassifyError, ClassifyInput};
pub use fees::{
    attribute_close_fees, attribute_fees_with, CloseAccounting, CloseFees, FeeAttribution,
    FeeError,
};
pub use resolvers::{CloseTxSet, ResolveTx, ResolveTxFee, TxResolverError};
