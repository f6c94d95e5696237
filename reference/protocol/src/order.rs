//! Exchange order types.
//!
//! These mirror the order structure the external order-matching exchange
//! accepts. Enum fields travel as their numeric wire codes.

use custodian_common::{Address, Bytes, Bytes32, Uint256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unknown numeric code for an order enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: u8,
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl TryFrom<u8> for $name {
            type Error = UnknownCode;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(UnknownCode { kind: $kind, code }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

wire_enum!(
    /// Which side of the trade an order is on.
    Side, "side" {
        /// Order offers payment for the asset.
        Buy = 0,
        /// Order offers the asset for payment.
        Sell = 1,
    }
);

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

wire_enum!(
    /// Pricing model of an order.
    SaleKind, "sale kind" {
        FixedPrice = 0,
        DutchAuction = 1,
    }
);

wire_enum!(
    /// How fees are charged.
    FeeMethod, "fee method" {
        ProtocolFee = 0,
        SplitFee = 1,
    }
);

wire_enum!(
    /// How the exchange invokes the order's call payload.
    HowToCall, "call kind" {
        Call = 0,
        DelegateCall = 1,
    }
);

/// A single exchange order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Exchange the order is bound to.
    pub exchange: Address,
    /// Order maker.
    pub maker: Address,
    /// Order taker; zero means anyone.
    pub taker: Address,
    pub maker_relayer_fee: Uint256,
    pub taker_relayer_fee: Uint256,
    pub maker_protocol_fee: Uint256,
    pub taker_protocol_fee: Uint256,
    /// Fee recipient.
    pub fee_recipient: Address,
    pub fee_method: FeeMethod,
    pub side: Side,
    pub sale_kind: SaleKind,
    /// Contract the call payload is executed against.
    pub target: Address,
    pub how_to_call: HowToCall,
    /// Call payload; names the asset being traded.
    #[serde(alias = "bCalldata")]
    pub calldata: Bytes,
    /// Mask of payload bytes the counter-order may replace.
    pub replacement_pattern: Bytes,
    pub static_target: Address,
    pub static_extradata: Bytes,
    /// Payment token; zero means the native currency.
    pub payment_token: Address,
    pub base_price: Uint256,
    pub extra: Uint256,
    pub listing_time: u64,
    pub expiration_time: u64,
    /// Uniqueness salt.
    pub salt: Uint256,
}

/// Buy and sell orders submitted together for atomic matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPair {
    pub buy: Order,
    pub sell: Order,
}

impl OrderPair {
    pub fn new(buy: Order, sell: Order) -> Self {
        Self { buy, sell }
    }
}

/// Signature material for an order pair.
///
/// Opaque to the custodian; forwarded verbatim to the exchange, which
/// performs the actual signature recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    /// Recovery ids for the buy and sell signatures.
    pub vs: [u8; 2],
    /// Buy r, buy s, sell r, sell s, metadata.
    pub rss_metadata: [Bytes32; 5],
}

impl ProofBundle {
    pub fn new(vs: [u8; 2], rss_metadata: [Bytes32; 5]) -> Self {
        Self { vs, rss_metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUY_ORDER_JSON: &str = r#"{
        "exchange": "0x7f268357a8c2552623316e2562d90e642bb538e5",
        "maker": "0x00000000000000000000000000000000000000c1",
        "taker": "0x0000000000000000000000000000000000000000",
        "makerRelayerFee": 0,
        "takerRelayerFee": 250,
        "makerProtocolFee": 0,
        "takerProtocolFee": 0,
        "feeRecipient": "0x5b3256965e7c3cf26e11fcaf296dfc8807c01073",
        "feeMethod": 1,
        "side": 0,
        "saleKind": 0,
        "target": "0x45b594792a5cdc008d0de1c1d69faa3d16b3ddc1",
        "howToCall": 1,
        "bCalldata": "0xfb16a595",
        "replacementPattern": "0x00000000",
        "staticTarget": "0x0000000000000000000000000000000000000000",
        "staticExtradata": "0x",
        "paymentToken": "0xc778417e063141139fce010982780140aa0cd5ab",
        "basePrice": 6000000000000000,
        "extra": 0,
        "listingTime": 1653963516,
        "expirationTime": 1654222805,
        "salt": "46283856062284117332718487320173134166179297852652433828828758657181924533959"
    }"#;

    #[test]
    fn test_order_from_wire_json() {
        let order: Order = serde_json::from_str(BUY_ORDER_JSON).unwrap();
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.fee_method, FeeMethod::SplitFee);
        assert_eq!(order.how_to_call, HowToCall::DelegateCall);
        assert_eq!(order.calldata.as_slice(), &[0xfb, 0x16, 0xa5, 0x95]);
        assert!(order.static_extradata.is_empty());
        assert_eq!(order.base_price, Uint256::from(6_000_000_000_000_000u64));
    }

    #[test]
    fn test_unknown_side_code_rejected() {
        let json = BUY_ORDER_JSON.replace("\"side\": 0", "\"side\": 7");
        let err = serde_json::from_str::<Order>(&json).unwrap_err();
        assert!(err.to_string().contains("Unknown side code: 7"));
    }

    #[test]
    fn test_enums_serialize_as_codes() {
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "1");
        assert_eq!(serde_json::to_string(&SaleKind::DutchAuction).unwrap(), "1");
        assert_eq!(Side::try_from(0).unwrap(), Side::Buy);
    }

    #[test]
    fn test_proof_bundle_json() {
        let json = r#"{"vs":[28,27],"rssMetadata":[
            "0x127b6f4d96c568600b3160d525a9bb19b8692c088591916072f33ac66ae157e0",
            "0x3e2956c9157fa1913696705edc397df469edacdb60c8172808397acde3e0601b",
            "0xd4802879c117987f77dce27216d737632b601c22e0c4974225f4747d14cb995c",
            "0x51ab2120203646814d1d31dca24a23d4a97c9b7a5d81a720ae60428fd57bf184",
            "0x0000000000000000000000000000000000000000000000000000000000000000"]}"#;
        let proof: ProofBundle = serde_json::from_str(json).unwrap();
        assert_eq!(proof.vs, [28, 27]);
        assert!(proof.rss_metadata[4].is_zero());
    }
}
