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

//! Classification of channel output resolutions from transaction inputs.

use amplify::Wrapper;
use bitcoin::{Transaction, TxIn};
use settlement_scripts::bolt3::is_commitment_encoded;
use settlement_scripts::{Resolution, ResolutionRecord, WitnessStack};

use crate::blockchain::{RawTx, TxParseError};

/// Errors classifying transaction inputs
#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ClassifyError {
    /// malformed transaction: {0}
    #[from]
    MalformedTransaction(TxParseError),

    /// transaction has {count} inputs, so input #{index} does not exist
    InputIndexOutOfRange {
        /// requested input index
        index: usize,
        /// number of transaction inputs
        count: usize,
    },
}

/// Classification of the outputs spent by transaction inputs
pub trait ClassifyInput {
    /// Returns witness stack of the input with a given index
    fn witness_stack(&self, index: usize) -> Result<WitnessStack, ClassifyError>;

    /// Classifies resolution type of the output spent by the input with a
    /// given index
    fn classify_input(&self, index: usize) -> Result<Resolution, ClassifyError>;

    /// Classifies all inputs, in order
    fn classify_inputs(&self) -> Vec<ResolutionRecord>;
}

impl ClassifyInput for Transaction {
    fn witness_stack(&self, index: usize) -> Result<WitnessStack, ClassifyError> {
        self.input
            .get(index)
            .map(|txin| WitnessStack::from(&txin.witness))
            .ok_or(ClassifyError::InputIndexOutOfRange {
                index,
                count: self.input.len(),
            })
    }

    fn classify_input(&self, index: usize) -> Result<Resolution, ClassifyError> {
        let txin = self
            .input
            .get(index)
            .ok_or(ClassifyError::InputIndexOutOfRange {
                index,
                count: self.input.len(),
            })?;
        Ok(resolve_input(self, index, txin))
    }

    fn classify_inputs(&self) -> Vec<ResolutionRecord> {
        self.input
            .iter()
            .enumerate()
            .map(|(input, txin)| ResolutionRecord {
                input,
                resolution: resolve_input(self, input, txin),
            })
            .collect()
    }
}

fn resolve_input(tx: &Transaction, index: usize, txin: &TxIn) -> Resolution {
    let commitment_encoded = is_commitment_encoded(tx.lock_time.0, txin.sequence.0);
    let witness = WitnessStack::from(&txin.witness);
    let resolution = Resolution::from_witness(&witness, commitment_encoded);
    trace!("input #{} of {} resolves {}", index, tx.txid(), resolution);
    resolution
}

/// Classifies resolution type of the channel output spent by the input
/// `input_index` of a hex-encoded transaction.
pub fn classify(transaction_hex: &str, input_index: usize) -> Result<Resolution, ClassifyError> {
    let tx = transaction_hex.parse::<RawTx>()?;
    tx.as_inner().classify_input(input_index)
}

/// Classifies resolution types for all inputs of a hex-encoded transaction.
pub fn classify_all(transaction_hex: &str) -> Result<Vec<ResolutionRecord>, ClassifyError> {
    let tx = transaction_hex.parse::<RawTx>()?;
    Ok(tx.as_inner().classify_inputs())
}
