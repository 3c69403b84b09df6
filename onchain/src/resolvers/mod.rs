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

//! Resolvers are traits allow accessing information from a set of
//! transactions related to a channel closing (coming from a node, an index,
//! a channel database etc).

use amplify::Wrapper;
use bitcoin::{Transaction, Txid};

use crate::blockchain::{CloseTx, RawTx, TxParseError};

/// Errors resolving transaction data
#[derive(Debug, Display, Error)]
#[display(doc_comments)]
pub enum TxResolverError {
    /// unable to locate transaction {0}
    Unknown(Txid),

    /// transaction {txid} can't be parsed: {err}
    Malformed {
        /// transaction id causing the error
        txid: Txid,
        /// parse error
        err: TxParseError,
    },
}

impl TxResolverError {
    /// Detects whether the transaction is simply not known to the resolver
    #[inline]
    pub fn is_unknown(&self) -> bool { matches!(self, TxResolverError::Unknown(_)) }
}

/// Transaction resolver
pub trait ResolveTx {
    /// Tries to find a transaction by transaction id ([`Txid`])
    fn resolve_tx(&self, txid: Txid) -> Result<Transaction, TxResolverError>;
}

/// Transaction fee resolver
pub trait ResolveTxFee {
    /// Tries to find a fee paid by a transaction with a given id ([`Txid`]).
    /// Returns `Ok(None)` if the transaction is known but its fee is not.
    fn resolve_tx_fee(&self, txid: Txid) -> Result<Option<u64>, TxResolverError>;
}

/// Set of transactions related to a channel closing.
///
/// Lookups match the first entry with the requested id; transaction data are
/// resolved only from entries carrying raw transaction hex.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CloseTxSet<'txs>(&'txs [CloseTx]);

impl<'txs> CloseTxSet<'txs> {
    /// Wraps a list of transactions
    #[inline]
    pub fn new(txs: &'txs [CloseTx]) -> Self { CloseTxSet(txs) }

    /// Finds the first entry with a given id
    pub fn entry(&self, txid: Txid) -> Option<&'txs CloseTx> {
        self.0.iter().find(|tx| tx.id == txid)
    }

    /// Finds the first entry with a given id which carries transaction hex
    pub fn entry_with_hex(&self, txid: Txid) -> Option<(&'txs CloseTx, &'txs str)> {
        self.0
            .iter()
            .filter(|tx| tx.id == txid)
            .find_map(|tx| tx.hex.as_deref().map(|hex| (tx, hex)))
    }
}

impl<'txs> ResolveTx for CloseTxSet<'txs> {
    fn resolve_tx(&self, txid: Txid) -> Result<Transaction, TxResolverError> {
        let (_, hex) = self
            .entry_with_hex(txid)
            .ok_or(TxResolverError::Unknown(txid))?;
        hex.parse::<RawTx>()
            .map(RawTx::into_inner)
            .map_err(|err| TxResolverError::Malformed { txid, err })
    }
}

impl<'txs> ResolveTxFee for CloseTxSet<'txs> {
    fn resolve_tx_fee(&self, txid: Txid) -> Result<Option<u64>, TxResolverError> {
        self.entry(txid)
            .map(|tx| tx.fee)
            .ok_or(TxResolverError::Unknown(txid))
    }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;

    use super::*;
    use crate::blockchain::test::tx;

    #[test]
    fn lookups() {
        let closing = tx(&[1000]);
        let txid = closing.txid();
        let other = Txid::from_inner([7u8; 32]);
        let txs = vec![
            CloseTx {
                id: txid,
                fee: None,
                hex: None,
            },
            CloseTx::with(&closing, Some(500)),
        ];
        let set = CloseTxSet::new(&txs);

        assert_eq!(set.entry(txid), Some(&txs[0]));
        assert_eq!(set.entry_with_hex(txid).map(|(entry, _)| entry), Some(&txs[1]));
        assert_eq!(set.resolve_tx(txid).unwrap(), closing);
        assert_eq!(set.resolve_tx_fee(txid).unwrap(), None);

        assert!(set.resolve_tx(other).unwrap_err().is_unknown());
        assert!(set.resolve_tx_fee(other).unwrap_err().is_unknown());
    }

    #[test]
    fn malformed_hex() {
        let txid = Txid::from_inner([1u8; 32]);
        let txs = vec![CloseTx {
            id: txid,
            fee: Some(10),
            hex: Some(s!("deadbeef")),
        }];
        let set = CloseTxSet::new(&txs);
        assert!(matches!(
            set.resolve_tx(txid),
            Err(TxResolverError::Malformed { .. })
        ));
        assert_eq!(set.resolve_tx_fee(txid).unwrap(), Some(10));
    }
}
