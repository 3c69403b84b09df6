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

//! Script-level part of the channel settlement library: BOLT 3 script
//! templates, witness resolution matching and address to `scriptPubkey`
//! conversion.

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

pub mod address;
pub mod bolt3;
mod network;
mod resolution;

pub use address::{
    address_for_script, resolve_output_script, AddressScriptError, ResolutionRoute,
    ResolvedScript, StandardAddressError,
};
pub use bolt3::ScriptTemplate;
pub use network::{ChainNetwork, NetworkParams, UnknownNetwork};
pub use resolution::{Resolution, ResolutionRecord, UnknownResolution, WitnessStack};
