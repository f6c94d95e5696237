//! Custodian Exchange Protocol
//!
//! Order structures accepted by the external order-matching exchange,
//! decoding of the call payload an order carries, and the structural
//! checks the custodian runs before forwarding an order pair.
//!
//! Cryptographic validity of orders (signatures, order hashing) is the
//! exchange's concern and is absent here.

pub mod order;
pub mod calldata;
pub mod validation;

pub use order::*;
pub use calldata::{
    decode_transfer, encode_criteria_transfer, encode_transfer_from, selector, PayloadError,
    TransferCall, TransferKind,
};
pub use validation::{validate_order_pair, OrderDefect};
