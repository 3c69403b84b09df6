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

//! Recognition of BOLT 3 witness script templates.
//!
//! Templates are detected from opcodes found at fixed offsets; public keys,
//! hashes and signatures are never validated.

use bitcoin::blockdata::opcodes::all::*;
use bitcoin::blockdata::opcodes::All as Opcode;

/// Upper byte of the locktime of a commitment transaction
pub const COMMITMENT_LOCKTIME_MARKER: u8 = 0x20;

/// Upper byte of the funding input `nSequence` of a commitment transaction
pub const COMMITMENT_SEQUENCE_MARKER: u8 = 0x80;

const PUSH_PUBKEY: u8 = 33;

/// Length of the 2-of-2 funding witness script
pub const FUNDING_SCRIPT_LEN: usize = 71;
/// Length of the anchor output witness script
pub const ANCHOR_SCRIPT_LEN: usize = 40;
/// Length of the `to_remote` witness script of anchor channels
pub const TO_REMOTE_ANCHORED_SCRIPT_LEN: usize = 37;

// Common HTLC script prefix up to (excluding) the opcode distinguishing
// offered from received HTLCs
const HTLC_MARKERS: [(usize, Opcode); 13] = [
    (0, OP_DUP),
    (1, OP_HASH160),
    (2, OP_PUSHBYTES_20),
    (23, OP_EQUAL),
    (24, OP_IF),
    (25, OP_CHECKSIG),
    (26, OP_ELSE),
    (27, OP_PUSHBYTES_33),
    (61, OP_SWAP),
    (62, OP_SIZE),
    (63, OP_PUSHBYTES_1),
    (64, OP_PUSHBYTES_32),
    (65, OP_EQUAL),
];
const HTLC_BRANCH_OFFSET: usize = 66;
const HTLC_MIN_LEN: usize = 133;

// `1 OP_CHECKSEQUENCEVERIFY OP_DROP OP_ENDIF` closing HTLC scripts of anchor
// channels
const HTLC_ANCHORS_SUFFIX: [u8; 4] = [0x51, 0xb2, 0x75, 0x68];

/// Witness script templates defined by BOLT 3
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
pub enum ScriptTemplate {
    /// `2 <pubkey1> <pubkey2> 2 OP_CHECKMULTISIG` funding output
    #[display("funding")]
    Funding,

    /// Revocable `to_local` output of a commitment transaction, also used by
    /// the outputs of second-level HTLC transactions
    #[display("to_local")]
    ToLocal,

    /// CSV-locked `to_remote` output of anchor channels
    #[display("to_remote")]
    ToRemoteAnchored,

    /// Anchor output
    #[display("anchor")]
    Anchor,

    /// HTLC offered by the commitment transaction owner
    #[display("offered_htlc")]
    OfferedHtlc {
        /// Whether the script carries the anchor channel CSV lock
        anchors: bool,
    },

    /// HTLC received by the commitment transaction owner
    #[display("received_htlc")]
    ReceivedHtlc {
        /// Whether the script carries the anchor channel CSV lock
        anchors: bool,
    },
}

impl ScriptTemplate {
    /// Detects which BOLT 3 template the witness script follows, if any.
    pub fn detect(script: &[u8]) -> Option<ScriptTemplate> {
        if is_funding(script) {
            Some(ScriptTemplate::Funding)
        } else if is_to_local(script) {
            Some(ScriptTemplate::ToLocal)
        } else if is_to_remote_anchored(script) {
            Some(ScriptTemplate::ToRemoteAnchored)
        } else if is_anchor(script) {
            Some(ScriptTemplate::Anchor)
        } else {
            detect_htlc(script)
        }
    }

    /// Detects whether the template locks an HTLC
    pub fn is_htlc(self) -> bool {
        matches!(self, ScriptTemplate::OfferedHtlc { .. } | ScriptTemplate::ReceivedHtlc { .. })
    }
}

#[inline]
fn op(code: Opcode) -> u8 { code.to_u8() }

fn is_funding(s: &[u8]) -> bool {
    s.len() == FUNDING_SCRIPT_LEN
        && s[0] == op(OP_PUSHNUM_2)
        && s[1] == PUSH_PUBKEY
        && s[35] == PUSH_PUBKEY
        && s[69] == op(OP_PUSHNUM_2)
        && s[70] == op(OP_CHECKMULTISIG)
}

// OP_IF <revocationpubkey> OP_ELSE <to_self_delay> OP_CSV OP_DROP
// <local_delayedpubkey> OP_ENDIF OP_CHECKSIG
fn is_to_local(s: &[u8]) -> bool {
    let len = s.len();
    (75..=78).contains(&len)
        && s[0] == op(OP_IF)
        && s[1] == PUSH_PUBKEY
        && s[35] == op(OP_ELSE)
        && s[len - 38] == op(OP_CSV)
        && s[len - 37] == op(OP_DROP)
        && s[len - 36] == PUSH_PUBKEY
        && s[len - 2] == op(OP_ENDIF)
        && s[len - 1] == op(OP_CHECKSIG)
}

// <remotepubkey> OP_CHECKSIGVERIFY 1 OP_CSV
fn is_to_remote_anchored(s: &[u8]) -> bool {
    s.len() == TO_REMOTE_ANCHORED_SCRIPT_LEN
        && s[0] == PUSH_PUBKEY
        && s[34] == op(OP_CHECKSIGVERIFY)
        && s[35] == op(OP_PUSHNUM_1)
        && s[36] == op(OP_CSV)
}

// <local_funding_pubkey> OP_CHECKSIG OP_IFDUP OP_NOTIF OP_16 OP_CSV OP_ENDIF
fn is_anchor(s: &[u8]) -> bool {
    s.len() == ANCHOR_SCRIPT_LEN
        && s[0] == PUSH_PUBKEY
        && s[34..] == [
            op(OP_CHECKSIG),
            op(OP_IFDUP),
            op(OP_NOTIF),
            op(OP_PUSHNUM_16),
            op(OP_CSV),
            op(OP_ENDIF),
        ]
}

fn detect_htlc(s: &[u8]) -> Option<ScriptTemplate> {
    if s.len() < HTLC_MIN_LEN || s[s.len() - 1] != op(OP_ENDIF) {
        return None;
    }
    if !HTLC_MARKERS.iter().all(|(pos, code)| s[*pos] == op(*code)) {
        return None;
    }
    let anchors = s.ends_with(&HTLC_ANCHORS_SUFFIX);
    match s[HTLC_BRANCH_OFFSET] {
        code if code == op(OP_NOTIF) => Some(ScriptTemplate::OfferedHtlc { anchors }),
        code if code == op(OP_IF) => Some(ScriptTemplate::ReceivedHtlc { anchors }),
        _ => None,
    }
}

/// Detects obscured commitment number encoding, which distinguishes
/// commitment transactions from other spends of the funding output.
pub fn is_commitment_encoded(lock_time: u32, sequence: u32) -> bool {
    (lock_time >> 24) as u8 == COMMITMENT_LOCKTIME_MARKER
        && (sequence >> 24) as u8 == COMMITMENT_SEQUENCE_MARKER
}

/// Detects witness elements looking like DER-encoded signatures with a
/// sighash flag.
pub fn is_signature(element: &[u8]) -> bool {
    (9..=73).contains(&element.len()) && element[0] == 0x30
}

/// Detects witness elements looking like compressed public keys.
pub fn is_pubkey(element: &[u8]) -> bool {
    element.len() == PUSH_PUBKEY as usize && matches!(element[0], 0x02 | 0x03)
}

/// Detects witness elements holding 32-byte payment preimages.
pub fn is_preimage(element: &[u8]) -> bool { element.len() == 32 }
