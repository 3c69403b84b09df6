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

//! Settlement of closed lightning channels onchain: how each channel output
//! got resolved, what the closing has cost and which scripts the funds were
//! sent to.

// Coding conventions
#![recursion_limit = "256"]
#![deny(dead_code, missing_docs)]

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate tracing;

pub extern crate bitcoin;
pub extern crate settlement_onchain as onchain;
pub extern crate settlement_scripts as scripts;

pub use onchain::{
    attribute_close_fees, classify, classify_all, CloseAccounting, CloseFees, CloseTx,
    ClassifyError, FeeAttribution, FeeError,
};
pub use scripts::{
    resolve_output_script, AddressScriptError, ChainNetwork, Resolution, ResolutionRecord,
    ResolvedScript, UnknownNetwork,
};

/// Errors of the settlement operations invoked with network names coming
/// from the outside world
#[derive(Debug, Display, Error, From)]
#[display(inner)]
pub enum Error {
    /// Network name is not known
    #[from]
    Network(UnknownNetwork),

    /// Address can't be converted into a script
    #[from]
    Address(AddressScriptError),

    /// Transaction input can't be classified
    #[from]
    Classify(ClassifyError),

    /// Close fees can't be computed
    #[from]
    Fees(FeeError),
}

/// Converts address into hex-encoded output script for a network given by
/// its name (`mainnet`, `testnet`, `signet`, `regtest` or one of their
/// aliases).
pub fn output_script_hex(address: &str, network: &str) -> Result<String, Error> {
    let network = network.parse::<ChainNetwork>()?;
    let resolved = resolve_output_script(address, network)?;
    debug!("`{}` pays to {} on {} via {}", address, resolved, network, resolved.route);
    Ok(resolved.to_hex())
}
