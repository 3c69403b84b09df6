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

//! Resolution types of channel outputs, matched from the shape of the witness
//! stack spending them.

use std::str::FromStr;

use bitcoin::hashes::hex::ToHex;
use bitcoin::Witness;
#[cfg(feature = "serde")]
use serde_with::{As, DisplayFromStr};

use crate::bolt3::{is_preimage, is_pubkey, is_signature, ScriptTemplate};

/// The way a channel output was resolved onchain
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "kebab-case")
)]
pub enum Resolution {
    /// Funding output spent by a cooperative closing transaction
    #[display("mutual-close")]
    MutualClose,

    /// Funding output spent by a commitment transaction broadcast by either
    /// party
    #[display("force-close")]
    ForceClose,

    /// Delayed `to_local` output (or second-level HTLC output) swept by its
    /// owner after the CSV delay
    #[display("local-force-close-delivery")]
    LocalForceCloseDelivery,

    /// `to_remote` output swept by the counterparty of the commitment owner
    #[display("remote-force-close-delivery")]
    RemoteForceCloseDelivery,

    /// HTLC received by the commitment owner reclaimed by the counterparty
    /// after the HTLC expiry
    #[display("htlc-timeout")]
    HtlcTimeout,

    /// HTLC offered by the commitment owner claimed by the counterparty with
    /// the payment preimage
    #[display("htlc-success")]
    HtlcSuccess,

    /// Offered HTLC spent by the owner's HTLC-timeout transaction
    #[display("htlc-timeout-second-level")]
    HtlcTimeoutSecondLevel,

    /// Received HTLC spent by the owner's HTLC-success transaction
    #[display("htlc-success-second-level")]
    HtlcSuccessSecondLevel,

    /// Output of a revoked commitment claimed with the revocation key
    #[display("revoked-commitment-penalty")]
    RevokedCommitmentPenalty,

    /// Anchor output swept by its owner or, after 16 blocks, by anyone
    #[display("anchor-sweep")]
    AnchorSweep,

    /// Witness does not match any of the known BOLT 3 spending paths
    #[display("unrecognized")]
    Unrecognized,
}

impl Resolution {
    /// All resolution types
    pub const ALL: [Resolution; 11] = [
        Resolution::MutualClose,
        Resolution::ForceClose,
        Resolution::LocalForceCloseDelivery,
        Resolution::RemoteForceCloseDelivery,
        Resolution::HtlcTimeout,
        Resolution::HtlcSuccess,
        Resolution::HtlcTimeoutSecondLevel,
        Resolution::HtlcSuccessSecondLevel,
        Resolution::RevokedCommitmentPenalty,
        Resolution::AnchorSweep,
        Resolution::Unrecognized,
    ];

    /// Matches witness stack against BOLT 3 spending paths.
    ///
    /// `commitment_encoded` tells whether the spending transaction carries the
    /// obscured commitment number in its locktime and input sequence; it is
    /// used only to tell commitment transactions from cooperative closings
    /// when the funding output is spent.
    pub fn from_witness(witness: &WitnessStack, commitment_encoded: bool) -> Resolution {
        let stack = witness.as_slice();
        let Some((script, args)) = stack.split_last() else {
            return Resolution::Unrecognized;
        };
        let template = ScriptTemplate::detect(script);

        match (template, args) {
            (Some(ScriptTemplate::Funding), [empty, sig1, sig2])
                if empty.is_empty() && is_signature(sig1) && is_signature(sig2) =>
            {
                if commitment_encoded {
                    Resolution::ForceClose
                } else {
                    Resolution::MutualClose
                }
            }

            (Some(ScriptTemplate::ToLocal), [sig, selector]) if is_signature(sig) => {
                match selector.as_slice() {
                    [] => Resolution::LocalForceCloseDelivery,
                    [0x01] => Resolution::RevokedCommitmentPenalty,
                    _ => Resolution::Unrecognized,
                }
            }

            (Some(template), [sig, key])
                if template.is_htlc() && is_signature(sig) && is_pubkey(key) =>
            {
                Resolution::RevokedCommitmentPenalty
            }
            (Some(ScriptTemplate::OfferedHtlc { .. }), [sig, preimage])
                if is_signature(sig) && is_preimage(preimage) =>
            {
                Resolution::HtlcSuccess
            }
            (Some(ScriptTemplate::ReceivedHtlc { .. }), [sig, empty])
                if is_signature(sig) && empty.is_empty() =>
            {
                Resolution::HtlcTimeout
            }
            (Some(ScriptTemplate::OfferedHtlc { .. }), [empty, sig1, sig2, last])
                if empty.is_empty()
                    && is_signature(sig1)
                    && is_signature(sig2)
                    && last.is_empty() =>
            {
                Resolution::HtlcTimeoutSecondLevel
            }
            (Some(ScriptTemplate::ReceivedHtlc { .. }), [empty, sig1, sig2, preimage])
                if empty.is_empty()
                    && is_signature(sig1)
                    && is_signature(sig2)
                    && is_preimage(preimage) =>
            {
                Resolution::HtlcSuccessSecondLevel
            }

            (Some(ScriptTemplate::Anchor), [sig]) if sig.is_empty() || is_signature(sig) => {
                Resolution::AnchorSweep
            }
            (Some(ScriptTemplate::ToRemoteAnchored), [sig]) if is_signature(sig) => {
                Resolution::RemoteForceCloseDelivery
            }

            // Pre-anchor `to_remote` outputs are plain P2WPKH
            (None, [sig]) if is_signature(sig) && is_pubkey(script) => {
                Resolution::RemoteForceCloseDelivery
            }

            _ => Resolution::Unrecognized,
        }
    }
}

/// Error parsing resolution type name
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, Error)]
#[display(doc_comments)]
/// unknown resolution type `{0}`
pub struct UnknownResolution(pub String);

impl FromStr for Resolution {
    type Err = UnknownResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|resolution| resolution.to_string() == s)
            .ok_or_else(|| UnknownResolution(s.to_owned()))
    }
}

/// Resolution of a specific transaction input
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[display("#{input}: {resolution}")]
pub struct ResolutionRecord {
    /// Index of the input within the transaction
    pub input: usize,

    /// Resolution type of the output spent by the input
    #[cfg_attr(feature = "serde", serde(with = "As::<DisplayFromStr>"))]
    pub resolution: Resolution,
}

/// Ordered witness stack of a transaction input
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", transparent)
)]
#[derive(Wrapper, Clone, PartialEq, Eq, Hash, Debug, Default, From)]
pub struct WitnessStack(Vec<Vec<u8>>);

impl WitnessStack {
    /// Returns witness elements
    #[inline]
    pub fn as_slice(&self) -> &[Vec<u8>] { &self.0 }

    /// Returns witness elements as lowercase hex strings
    pub fn to_hex_elements(&self) -> Vec<String> {
        self.0.iter().map(|element| element.to_hex()).collect()
    }

    /// Counts witness elements
    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    /// Detects empty witness
    #[inline]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<&Witness> for WitnessStack {
    fn from(witness: &Witness) -> Self { WitnessStack(witness.to_vec()) }
}

#[cfg(test)]
mod test {
    use bitcoin::Script;

    use super::*;
    use crate::bolt3::test::*;

    fn sig() -> Vec<u8> {
        let mut sig = vec![0x30; 72];
        sig[71] = 0x01;
        sig
    }

    fn stack(elements: &[&[u8]], script: &Script) -> WitnessStack {
        let mut stack: Vec<Vec<u8>> = elements.iter().map(|e| e.to_vec()).collect();
        stack.push(script.to_bytes());
        WitnessStack::from(stack)
    }

    fn check(witness: WitnessStack, expected: Resolution) {
        assert_eq!(Resolution::from_witness(&witness, false), expected);
    }

    #[test]
    fn funding_spends() {
        let witness = stack(&[&[], &sig(), &sig()], &funding_script());
        assert_eq!(Resolution::from_witness(&witness, false), Resolution::MutualClose);
        assert_eq!(Resolution::from_witness(&witness, true), Resolution::ForceClose);
    }

    #[test]
    fn to_local_spends() {
        let script = to_local_script(144);
        check(stack(&[&sig(), &[]], &script), Resolution::LocalForceCloseDelivery);
        check(stack(&[&sig(), &[0x01]], &script), Resolution::RevokedCommitmentPenalty);
        check(stack(&[&sig(), &[0x02]], &script), Resolution::Unrecognized);
    }

    #[test]
    fn to_remote_spends() {
        check(stack(&[&sig()], &to_remote_anchored_script()), Resolution::RemoteForceCloseDelivery);
        let witness = WitnessStack::from(vec![sig(), pubkey(9).to_vec()]);
        check(witness, Resolution::RemoteForceCloseDelivery);
    }

    #[test]
    fn anchor_spends() {
        check(stack(&[&sig()], &anchor_script()), Resolution::AnchorSweep);
        check(stack(&[&[]], &anchor_script()), Resolution::AnchorSweep);
    }

    #[test]
    fn htlc_spends() {
        let preimage = [0x42u8; 32];
        let key = pubkey(10);
        for anchors in [false, true] {
            let offered = offered_htlc_script(anchors);
            let received = received_htlc_script(anchors);

            check(stack(&[&sig(), &preimage], &offered), Resolution::HtlcSuccess);
            check(stack(&[&sig(), &[]], &received), Resolution::HtlcTimeout);
            check(stack(&[&sig(), &key], &offered), Resolution::RevokedCommitmentPenalty);
            check(stack(&[&sig(), &key], &received), Resolution::RevokedCommitmentPenalty);
            check(
                stack(&[&[], &sig(), &sig(), &[]], &offered),
                Resolution::HtlcTimeoutSecondLevel,
            );
            check(
                stack(&[&[], &sig(), &sig(), &preimage], &received),
                Resolution::HtlcSuccessSecondLevel,
            );

            // paths not present in the scripts
            check(stack(&[&sig(), &[]], &offered), Resolution::Unrecognized);
            check(stack(&[&sig(), &preimage], &received), Resolution::Unrecognized);
        }
    }

    #[test]
    fn unrecognized() {
        check(WitnessStack::default(), Resolution::Unrecognized);
        check(WitnessStack::from(vec![vec![0xde, 0xad]]), Resolution::Unrecognized);
        check(stack(&[&sig()], &funding_script()), Resolution::Unrecognized);
    }

    #[test]
    fn names() {
        for resolution in Resolution::ALL {
            assert_eq!(Resolution::from_str(&resolution.to_string()), Ok(resolution));
        }
        assert_eq!(Resolution::HtlcTimeoutSecondLevel.to_string(), "htlc-timeout-second-level");
        assert_eq!(
            Resolution::from_str("breach"),
            Err(UnknownResolution(s!("breach")))
        );
    }

    #[test]
    fn hex_elements() {
        let witness = WitnessStack::from(vec![vec![], vec![0xAB, 0x01]]);
        assert_eq!(witness.to_hex_elements(), vec![s!(""), s!("ab01")]);
        assert_eq!(witness.len(), 2);
    }
}
