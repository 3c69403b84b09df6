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

//! Transaction data as it comes from the channel-close reporting layer.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use amplify::Wrapper;
use bitcoin::consensus;
use bitcoin::hashes::hex::{self, FromHex, ToHex};
use bitcoin::{Transaction, Txid};

/// Error parsing hex-encoded transaction
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum TxParseError {
    /// transaction is not a valid hex string: {0}
    #[from]
    Hex(hex::Error),

    /// transaction data are malformed: {0}
    #[from]
    Consensus(consensus::encode::Error),
}

/// Transaction parsed from its consensus serialization.
///
/// Parses from and displays as a lowercase hex string.
#[derive(Wrapper, Clone, PartialEq, Eq, Debug, From)]
pub struct RawTx(Transaction);

impl RawTx {
    /// Returns transaction id
    #[inline]
    pub fn txid(&self) -> Txid { self.0.txid() }

    /// Computes total value of all transaction outputs, in satoshis. Returns
    /// `None` on overflow.
    pub fn output_value(&self) -> Option<u64> {
        self.0
            .output
            .iter()
            .try_fold(0u64, |sum, txout| sum.checked_add(txout.value))
    }
}

impl FromStr for RawTx {
    type Err = TxParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = Vec::<u8>::from_hex(s)?;
        Ok(RawTx(consensus::deserialize(&data)?))
    }
}

impl Display for RawTx {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&consensus::serialize(&self.0).to_hex())
    }
}

/// Transaction related to a channel closing, as known to the reporting layer
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CloseTx {
    /// Transaction id
    pub id: Txid,

    /// Fee paid by the transaction, if known
    pub fee: Option<u64>,

    /// Hex-encoded consensus serialization of the transaction, if known
    pub hex: Option<String>,
}

impl CloseTx {
    /// Constructs entry for a parsed transaction
    pub fn with(tx: &Transaction, fee: Option<u64>) -> CloseTx {
        CloseTx {
            id: tx.txid(),
            fee,
            hex: Some(RawTx::from(tx.clone()).to_string()),
        }
    }
}
