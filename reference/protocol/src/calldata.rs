//! Decoding of the call payload embedded in an exchange order.
//!
//! Payloads are a 4-byte function selector followed by 32-byte ABI words.
//! Only the transfer shapes below are understood; anything else cannot be
//! tied to a custodied asset and is refused.

use std::sync::OnceLock;

use custodian_common::{Address, AssetRef, Bytes32, TokenId};
use sha3::{Digest, Keccak256};
use thiserror::Error;

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;

/// Known transfer payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Merkle-validator criteria transfer of a single-token asset.
    CriteriaTransfer,
    /// Same as [`TransferKind::CriteriaTransfer`] using a safe transfer.
    CriteriaSafeTransfer,
    /// Direct `transferFrom` on the collection contract.
    TransferFrom,
    /// Direct `safeTransferFrom` on the collection contract.
    SafeTransferFrom,
}

impl TransferKind {
    const ALL: [TransferKind; 4] = [
        TransferKind::CriteriaTransfer,
        TransferKind::CriteriaSafeTransfer,
        TransferKind::TransferFrom,
        TransferKind::SafeTransferFrom,
    ];

    /// Canonical function signature.
    pub fn signature(&self) -> &'static str {
        match self {
            TransferKind::CriteriaTransfer => {
                "matchERC721UsingCriteria(address,address,address,uint256,bytes32,bytes32[])"
            }
            TransferKind::CriteriaSafeTransfer => {
                "matchERC721WithSafeTransferUsingCriteria(address,address,address,uint256,bytes32,bytes32[])"
            }
            TransferKind::TransferFrom => "transferFrom(address,address,uint256)",
            TransferKind::SafeTransferFrom => "safeTransferFrom(address,address,uint256)",
        }
    }

    /// Minimum number of ABI words following the selector.
    fn min_words(&self) -> usize {
        match self {
            // from, to, token, tokenId, root, proof offset
            TransferKind::CriteriaTransfer | TransferKind::CriteriaSafeTransfer => 6,
            // from, to, tokenId
            TransferKind::TransferFrom | TransferKind::SafeTransferFrom => 3,
        }
    }

    fn from_selector(sel: [u8; 4]) -> Option<Self> {
        static TABLE: OnceLock<Vec<([u8; 4], TransferKind)>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                TransferKind::ALL
                    .iter()
                    .map(|kind| (selector(kind.signature()), *kind))
                    .collect()
            })
            .iter()
            .find(|(s, _)| *s == sel)
            .map(|(_, kind)| *kind)
    }
}

/// Compute the 4-byte function selector for a canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Reasons a call payload cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload of {len} bytes is shorter than the {required} bytes required")]
    Truncated { len: usize, required: usize },

    #[error("unrecognized function selector 0x{}", hex_selector(.0))]
    UnknownSelector([u8; 4]),

    #[error("{field} is not a canonical address word")]
    NonCanonicalAddress { field: &'static str },
}

fn hex_selector(sel: &[u8; 4]) -> String {
    sel.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A decoded transfer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    pub kind: TransferKind,
    /// Transfer source. May be zero when left for the counter-order to fill.
    pub from: Address,
    /// Transfer destination. May be zero when left for the counter-order to fill.
    pub to: Address,
    /// Asset being transferred.
    pub asset: AssetRef,
}

fn word(args: &[u8], index: usize) -> Bytes32 {
    // Bounds are checked by the caller against min_words.
    Bytes32::from_slice(&args[index * WORD_LEN..]).unwrap_or_default()
}

fn address_word(args: &[u8], index: usize, field: &'static str) -> Result<Address, PayloadError> {
    Address::from_word(&word(args, index)).ok_or(PayloadError::NonCanonicalAddress { field })
}

/// Decode the asset transfer carried by an order's call payload.
///
/// `target` is the contract the payload is executed against; for direct
/// transfers it is the collection itself.
pub fn decode_transfer(target: &Address, calldata: &[u8]) -> Result<TransferCall, PayloadError> {
    if calldata.len() < SELECTOR_LEN {
        return Err(PayloadError::Truncated {
            len: calldata.len(),
            required: SELECTOR_LEN,
        });
    }

    let mut sel = [0u8; 4];
    sel.copy_from_slice(&calldata[..SELECTOR_LEN]);
    let kind = TransferKind::from_selector(sel).ok_or(PayloadError::UnknownSelector(sel))?;

    let required = SELECTOR_LEN + kind.min_words() * WORD_LEN;
    if calldata.len() < required {
        return Err(PayloadError::Truncated {
            len: calldata.len(),
            required,
        });
    }

    let args = &calldata[SELECTOR_LEN..];
    let from = address_word(args, 0, "from")?;
    let to = address_word(args, 1, "to")?;

    let (collection, id_word) = match kind {
        TransferKind::CriteriaTransfer | TransferKind::CriteriaSafeTransfer => {
            (address_word(args, 2, "token")?, word(args, 3))
        }
        TransferKind::TransferFrom | TransferKind::SafeTransferFrom => (*target, word(args, 2)),
    };

    Ok(TransferCall {
        kind,
        from,
        to,
        asset: AssetRef::new(collection, TokenId::from_word(&id_word)),
    })
}

/// Encode a criteria transfer payload with an empty proof.
pub fn encode_criteria_transfer(from: &Address, to: &Address, asset: &AssetRef) -> Vec<u8> {
    let mut out = Vec::with_capacity(SELECTOR_LEN + 7 * WORD_LEN);
    out.extend_from_slice(&selector(TransferKind::CriteriaTransfer.signature()));
    out.extend_from_slice(from.to_word().as_bytes());
    out.extend_from_slice(to.to_word().as_bytes());
    out.extend_from_slice(asset.collection.to_word().as_bytes());
    out.extend_from_slice(asset.token_id.to_word().as_bytes());
    // merkle root
    out.extend_from_slice(Bytes32::ZERO.as_bytes());
    // offset of the proof array, then its zero length
    out.extend_from_slice(TokenId::from(6 * WORD_LEN as u128).to_word().as_bytes());
    out.extend_from_slice(Bytes32::ZERO.as_bytes());
    out
}

/// Encode a direct `transferFrom` payload.
pub fn encode_transfer_from(from: &Address, to: &Address, token_id: TokenId) -> Vec<u8> {
    let mut out = Vec::with_capacity(SELECTOR_LEN + 3 * WORD_LEN);
    out.extend_from_slice(&selector(TransferKind::TransferFrom.signature()));
    out.extend_from_slice(from.to_word().as_bytes());
    out.extend_from_slice(to.to_word().as_bytes());
    out.extend_from_slice(token_id.to_word().as_bytes());
    out
}
