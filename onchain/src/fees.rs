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

//! Accounting of the fees paid onchain for closing a channel.

use bitcoin::Txid;

use crate::blockchain::{CloseTx, RawTx, TxParseError};
use crate::resolvers::{CloseTxSet, ResolveTx, ResolveTxFee, TxResolverError};

/// Errors happening during close fee computation
#[derive(Debug, Display, Error)]
#[display(doc_comments)]
pub enum FeeError {
    /// closing transaction {txid} is malformed: {err}
    MalformedTransaction {
        /// id of the closing transaction
        txid: Txid,
        /// parse error
        err: TxParseError,
    },

    /// channel value accounting overflows
    ValueOverflow,
}

/// Party bearing the fees of a channel closing
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "lowercase")
)]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum FeeAttribution {
    /// The peer has closed the channel and paid for the closing transaction;
    /// only fees of transactions spending our settled balance are ours
    #[display("peer")]
    Peer,

    /// We have closed the channel and paid for the closing transaction
    #[display("local")]
    Local,

    /// Not enough data to compute the fees
    #[display("unknown")]
    Unknown,
}

/// Information about a closed channel required to account its closing fees
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CloseAccounting {
    /// Channel capacity, in satoshis, if known
    pub capacity: Option<u64>,

    /// Transaction which has spent our settled balance output, if any
    pub close_balance_spent_by: Option<Txid>,

    /// Transaction which has closed the channel
    pub close_transaction_id: Txid,

    /// Whether the channel close was initiated by the peer
    pub is_partner_initiated: bool,

    /// Transactions related to the channel closing
    pub transactions: Vec<CloseTx>,
}

/// Fees paid onchain to close a channel
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct CloseFees {
    /// Total fees, in satoshis; `None` if they can't be computed from the
    /// available data, which differs from known zero fees.
    ///
    /// The value is negative when the provided channel capacity is less than
    /// the value of the closing transaction outputs.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub fees: Option<i64>,

    /// Party which has paid for the closing transaction
    pub attribution: FeeAttribution,
}

impl Default for FeeAttribution {
    fn default() -> Self { FeeAttribution::Unknown }
}

impl CloseFees {
    /// Fees which can't be computed
    pub fn unknown() -> CloseFees { CloseFees::default() }
}

fn signed(value: u64) -> Result<i64, FeeError> {
    i64::try_from(value).map_err(|_| FeeError::ValueOverflow)
}

/// Computes fees paid to close the channel over transaction data provided by
/// some resolver.
///
/// The closing transaction fee is deduced from the channel capacity and the
/// value of the closing transaction outputs; the fee of the transaction which
/// has spent our settled balance is taken as it is reported by the resolver.
/// If the peer has initiated the close, only the latter fee is accounted for
/// and the closing transaction is never looked up.
pub fn attribute_fees_with<R>(
    resolver: &R,
    capacity: Option<u64>,
    close_transaction_id: Txid,
    close_balance_spent_by: Option<Txid>,
    is_partner_initiated: bool,
) -> Result<CloseFees, FeeError>
where
    R: ResolveTx + ResolveTxFee,
{
    let balance_spend_fee = close_balance_spent_by
        .and_then(|txid| resolver.resolve_tx_fee(txid).ok())
        .flatten();

    if is_partner_initiated {
        debug!(
            "channel closed by the peer with {}; fees of sweeping the balance: {:?}",
            close_transaction_id, balance_spend_fee
        );
        return Ok(CloseFees {
            fees: Some(signed(balance_spend_fee.unwrap_or_default())?),
            attribution: FeeAttribution::Peer,
        });
    }

    let Some(capacity) = capacity else {
        debug!("unknown capacity of the channel closed with {}", close_transaction_id);
        return Ok(CloseFees::unknown());
    };

    let closer = match resolver.resolve_tx(close_transaction_id) {
        Ok(tx) => tx,
        Err(TxResolverError::Unknown(txid)) => {
            debug!("closing transaction {} data are not available", txid);
            return Ok(CloseFees::unknown());
        }
        Err(TxResolverError::Malformed { txid, err }) => {
            return Err(FeeError::MalformedTransaction { txid, err })
        }
    };

    let outputs = RawTx::from(closer)
        .output_value()
        .ok_or(FeeError::ValueOverflow)?;
    let balance_spend_fee = signed(balance_spend_fee.unwrap_or_default())?;
    let fees = signed(capacity)?
        .checked_sub(signed(outputs)?)
        .and_then(|fee| fee.checked_add(balance_spend_fee))
        .ok_or(FeeError::ValueOverflow)?;
    if fees < 0 {
        warn!(
            "capacity {} of the channel closed with {} is below its outputs value {}",
            capacity, close_transaction_id, outputs
        );
    }

    trace!("channel closed with {} has cost {} sats", close_transaction_id, fees);
    Ok(CloseFees {
        fees: Some(fees),
        attribution: FeeAttribution::Local,
    })
}

/// Computes fees paid to close the channel
pub fn attribute_close_fees(input: &CloseAccounting) -> Result<CloseFees, FeeError> {
    attribute_fees_with(
        &CloseTxSet::new(&input.transactions),
        input.capacity,
        input.close_transaction_id,
        input.close_balance_spent_by,
        input.is_partner_initiated,
    )
}

impl CloseAccounting {
    /// Computes fees paid to close the channel
    #[inline]
    pub fn close_fees(&self) -> Result<CloseFees, FeeError> { attribute_close_fees(self) }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;
    use bitcoin::Transaction;

    use super::*;
    use crate::blockchain::test::tx;

    const CAPACITY: u64 = 1_000_000;

    fn sweep_id() -> Txid { Txid::from_inner([0xAA; 32]) }

    fn closing() -> Transaction { tx(&[600_000, 399_500]) }

    fn accounting(transactions: Vec<CloseTx>) -> CloseAccounting {
        CloseAccounting {
            capacity: Some(CAPACITY),
            close_balance_spent_by: None,
            close_transaction_id: closing().txid(),
            is_partner_initiated: false,
            transactions,
        }
    }

    fn sweep(fee: Option<u64>) -> CloseTx {
        CloseTx {
            id: sweep_id(),
            fee,
            hex: None,
        }
    }

    #[test]
    fn closing_fee() {
        let input = accounting(vec![CloseTx::with(&closing(), None)]);
        assert_eq!(attribute_close_fees(&input).unwrap(), CloseFees {
            fees: Some(500),
            attribution: FeeAttribution::Local
        });
    }

    #[test]
    fn closing_and_sweep_fees() {
        let mut input = accounting(vec![CloseTx::with(&closing(), None), sweep(Some(200))]);
        input.close_balance_spent_by = Some(sweep_id());
        assert_eq!(input.close_fees().unwrap().fees, Some(700));
    }

    #[test]
    fn sweep_without_fee() {
        let mut input = accounting(vec![CloseTx::with(&closing(), None), sweep(None)]);
        input.close_balance_spent_by = Some(sweep_id());
        assert_eq!(input.close_fees().unwrap().fees, Some(500));

        input.transactions.pop();
        assert_eq!(input.close_fees().unwrap().fees, Some(500));
    }

    #[test]
    fn partner_initiated() {
        let mut input = accounting(vec![sweep(Some(200))]);
        input.is_partner_initiated = true;
        input.close_balance_spent_by = Some(sweep_id());
        assert_eq!(input.close_fees().unwrap(), CloseFees {
            fees: Some(200),
            attribution: FeeAttribution::Peer
        });

        input.close_balance_spent_by = None;
        assert_eq!(input.close_fees().unwrap().fees, Some(0));

        // closing transaction data are never parsed
        input.capacity = None;
        input.transactions = vec![CloseTx {
            id: input.close_transaction_id,
            fee: None,
            hex: Some(s!("not a transaction")),
        }];
        assert_eq!(input.close_fees().unwrap().fees, Some(0));
    }

    #[test]
    fn unknown_capacity() {
        let mut input = accounting(vec![CloseTx::with(&closing(), None)]);
        input.capacity = None;
        assert_eq!(input.close_fees().unwrap(), CloseFees::unknown());
        assert_eq!(input.close_fees().unwrap().attribution, FeeAttribution::Unknown);
    }

    #[test]
    fn unknown_closing_tx() {
        let mut input = accounting(vec![]);
        assert_eq!(input.close_fees().unwrap().fees, None);

        input.transactions.push(CloseTx {
            id: input.close_transaction_id,
            fee: Some(500),
            hex: None,
        });
        assert_eq!(input.close_fees().unwrap().fees, None);

        input.transactions.push(sweep(Some(200)));
        input.close_balance_spent_by = Some(sweep_id());
        assert_eq!(input.close_fees().unwrap().fees, None);
    }

    #[test]
    fn malformed_closing_tx() {
        let mut input = accounting(vec![]);
        input.transactions.push(CloseTx {
            id: input.close_transaction_id,
            fee: None,
            hex: Some(s!("0200000001")),
        });
        assert!(matches!(input.close_fees(), Err(FeeError::MalformedTransaction { .. })));
    }

    #[test]
    fn misreported_capacity() {
        let mut input = accounting(vec![CloseTx::with(&closing(), None)]);
        input.capacity = Some(900_000);
        assert_eq!(input.close_fees().unwrap().fees, Some(-99_500));
    }

    #[test]
    fn overflow() {
        let mut input = accounting(vec![CloseTx::with(&closing(), None)]);
        input.capacity = Some(u64::MAX);
        assert!(matches!(input.close_fees(), Err(FeeError::ValueOverflow)));
    }
}
