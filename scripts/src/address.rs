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

//! Conversion of destination addresses into the `scriptPubkey` they commit
//! to.
//!
//! Standard (pre-SegWit and SegWit v0) addresses are handled by the
//! rust-bitcoin address codec. Whatever it rejects is retried as a generic
//! bech32 string, which is how taproot (SegWit v1) outputs get resolved.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use bitcoin::bech32::{self, FromBase32};
use bitcoin::blockdata::opcodes::all::OP_PUSHNUM_1;
use bitcoin::blockdata::script::Builder;
use bitcoin::hashes::hex::ToHex;
use bitcoin::util::address::{self, Payload};
use bitcoin::util::base58;
use bitcoin::{Address, Script};

use crate::ChainNetwork;

/// Witness version of taproot outputs
pub const TAPROOT_WITNESS_VERSION: u8 = 1;

/// Length of the taproot output key serialized in the address payload
pub const TAPROOT_PAYLOAD_LEN: usize = 32;

/// Address format
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum AddressFormat {
    /// Pay-to-public key hash
    #[display("P2PKH")]
    P2pkh,

    /// Pay-to-script hash
    #[display("P2SH")]
    P2sh,

    /// Pay-to-witness public key hash
    #[display("P2WPKH")]
    P2wpkh,

    /// Pay-to-witness script hash
    #[display("P2WSH")]
    P2wsh,

    /// Pay-to-taproot
    #[display("P2TR")]
    P2tr,

    /// Future witness address, or a witness address with a program length
    /// not matching its version
    #[display("P2W{0}")]
    Future(u8),
}

impl AddressFormat {
    /// Returns witness version used by the address format.
    /// Returns `None` for pre-SegWit address formats.
    pub fn witness_version(self) -> Option<u8> {
        match self {
            AddressFormat::P2pkh | AddressFormat::P2sh => None,
            AddressFormat::P2wpkh | AddressFormat::P2wsh => Some(0),
            AddressFormat::P2tr => Some(TAPROOT_WITNESS_VERSION),
            AddressFormat::Future(ver) => Some(ver),
        }
    }

    /// Detects formats covered by the standard address codec: legacy base58
    /// and SegWit v0 bech32 addresses.
    pub fn is_standard(self) -> bool {
        matches!(
            self,
            AddressFormat::P2pkh
                | AddressFormat::P2sh
                | AddressFormat::P2wpkh
                | AddressFormat::P2wsh
        )
    }
}

impl From<&Payload> for AddressFormat {
    fn from(payload: &Payload) -> Self {
        match payload {
            Payload::PubkeyHash(_) => AddressFormat::P2pkh,
            Payload::ScriptHash(_) => AddressFormat::P2sh,
            Payload::WitnessProgram { version, program }
                if version.to_num() == 0 && program.len() == 20 =>
            {
                AddressFormat::P2wpkh
            }
            Payload::WitnessProgram { version, program }
                if version.to_num() == 0 && program.len() == 32 =>
            {
                AddressFormat::P2wsh
            }
            Payload::WitnessProgram { version, program }
                if version.to_num() == TAPROOT_WITNESS_VERSION
                    && program.len() == TAPROOT_PAYLOAD_LEN =>
            {
                AddressFormat::P2tr
            }
            Payload::WitnessProgram { version, .. } => AddressFormat::Future(version.to_num()),
        }
    }
}

/// Errors of the standard address codec.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum StandardAddressError {
    /// invalid address: {0}
    #[from]
    Codec(address::Error),

    /// address belongs to {found} network while {expected} was requested
    NetworkMismatch {
        /// network the address was resolved against
        expected: ChainNetwork,
        /// network the address is encoded for
        found: ChainNetwork,
    },

    /// {0} addresses are not covered by the standard address codec
    UnsupportedFormat(AddressFormat),
}

/// Errors converting address into `scriptPubkey`.
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum AddressScriptError {
    /// Address is neither a valid standard address nor a valid bech32 string;
    /// the error reported by the standard codec is preserved.
    #[from]
    #[display(inner)]
    Standard(StandardAddressError),

    /// address prefix `{found}` does not match `{expected}` used by {network}
    WrongNetworkForAddress {
        /// network the address was resolved against
        network: ChainNetwork,
        /// bech32 human-readable part required by the network
        expected: &'static str,
        /// bech32 human-readable part found in the address
        found: String,
    },

    /// witness version {0} is not supported; only taproot (v1) addresses are
    /// resolved from generic bech32 strings
    UnsupportedAddressWitnessVersion(u8),

    /// taproot address payload must be 32 bytes long, while it has {0} bytes
    InvalidTaprootPayloadLength(usize),
}

/// Which of the codecs produced the script
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "camelCase")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum ResolutionRoute {
    /// Standard base58 or SegWit v0 address codec
    #[display("standard")]
    Standard,

    /// Generic bech32 decoding with a taproot script template
    #[display("taproot-fallback")]
    TaprootFallback,
}

/// Output script matching some address.
///
/// Displays as a lowercase hex string of the script bytes.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ResolvedScript {
    /// Resolved `scriptPubkey`
    pub script: Script,

    /// Codec which has resolved the script
    pub route: ResolutionRoute,
}

impl ResolvedScript {
    /// Returns lowercase hex encoding of the script
    pub fn to_hex(&self) -> String { self.script.as_bytes().to_hex() }
}

impl Display for ResolvedScript {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

/// Witness program extracted from a generic bech32 string
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct Bech32Program {
    hrp: String,
    version: u8,
    program: Vec<u8>,
}

impl Bech32Program {
    fn decode(s: &str) -> Result<Self, bech32::Error> {
        let (hrp, data, _) = bech32::decode(s)?;
        let (version, payload) = data.split_first().ok_or(bech32::Error::InvalidLength)?;
        Ok(Bech32Program {
            hrp,
            version: version.to_u8(),
            program: Vec::<u8>::from_base32(payload)?,
        })
    }
}

/// Result of the bech32 fallback attempt
#[derive(Debug)]
enum FallbackOutcome {
    /// Address is a taproot address for the requested network
    Resolved(Script),

    /// Address is not a bech32 string at all, so the failure of the standard
    /// codec stands
    NotBech32(bech32::Error),

    /// Address is a bech32 string which can't be used on the network
    Failed(AddressScriptError),
}

// Version byte of a base58check-encoded address
fn base58_prefix(address: &str) -> Result<u8, address::Error> {
    let data = base58::from_check(address).map_err(address::Error::Base58)?;
    data.first()
        .copied()
        .ok_or(address::Error::Base58(base58::Error::TooShort(0)))
}

/// Resolves address with the standard address codec, accepting P2PKH, P2SH,
/// P2WPKH and P2WSH addresses valid for the given network.
pub fn resolve_standard(
    address: &str,
    network: ChainNetwork,
) -> Result<Script, StandardAddressError> {
    let parsed = Address::from_str(address)?;
    let params = network.params();
    let valid = match parsed.payload {
        Payload::PubkeyHash(_) => base58_prefix(address)? == params.p2pkh_prefix,
        Payload::ScriptHash(_) => base58_prefix(address)? == params.p2sh_prefix,
        Payload::WitnessProgram { .. } => parsed.is_valid_for_network(params.network),
    };
    if !valid {
        return Err(StandardAddressError::NetworkMismatch {
            expected: network,
            found: parsed.network.into(),
        });
    }
    let format = AddressFormat::from(&parsed.payload);
    if !format.is_standard() {
        return Err(StandardAddressError::UnsupportedFormat(format));
    }
    Ok(parsed.script_pubkey())
}

fn resolve_taproot(address: &str, network: ChainNetwork) -> FallbackOutcome {
    let decoded = match Bech32Program::decode(address) {
        Ok(decoded) => decoded,
        Err(err) => return FallbackOutcome::NotBech32(err),
    };
    let expected = network.bech32_hrp();
    if decoded.hrp != expected {
        return FallbackOutcome::Failed(AddressScriptError::WrongNetworkForAddress {
            network,
            expected,
            found: decoded.hrp,
        });
    }
    if decoded.version != TAPROOT_WITNESS_VERSION {
        return FallbackOutcome::Failed(AddressScriptError::UnsupportedAddressWitnessVersion(
            decoded.version,
        ));
    }
    if decoded.program.len() != TAPROOT_PAYLOAD_LEN {
        return FallbackOutcome::Failed(AddressScriptError::InvalidTaprootPayloadLength(
            decoded.program.len(),
        ));
    }
    FallbackOutcome::Resolved(
        Builder::new()
            .push_opcode(OP_PUSHNUM_1)
            .push_slice(&decoded.program)
            .into_script(),
    )
}

/// Converts address into the output script it pays to.
///
/// The standard codec is tried first. If it fails, the address is decoded as
/// a generic bech32 string and, when it carries a taproot program for the
/// requested network, the `OP_1 <32-byte key>` script is constructed
/// directly. Strings which are not bech32 at all report the error of the
/// standard codec.
pub fn resolve_output_script(
    address: &str,
    network: ChainNetwork,
) -> Result<ResolvedScript, AddressScriptError> {
    let primary = match resolve_standard(address, network) {
        Ok(script) => {
            return Ok(ResolvedScript {
                script,
                route: ResolutionRoute::Standard,
            })
        }
        Err(err) => err,
    };
    debug!("standard codec rejected `{}` for {}: {}", address, network, primary);

    match resolve_taproot(address, network) {
        FallbackOutcome::Resolved(script) => {
            trace!("`{}` resolved as taproot output on {}", address, network);
            Ok(ResolvedScript {
                script,
                route: ResolutionRoute::TaprootFallback,
            })
        }
        FallbackOutcome::NotBech32(err) => {
            trace!("`{}` is not a bech32 string: {}", address, err);
            Err(primary.into())
        }
        FallbackOutcome::Failed(err) => Err(err),
    }
}

/// Constructs address for a given `scriptPubkey`. Fails if the script has no
/// address form.
pub fn address_for_script(
    script: &Script,
    network: ChainNetwork,
) -> Result<Address, address::Error> {
    Address::from_script(script, network.bitcoin_network())
}
