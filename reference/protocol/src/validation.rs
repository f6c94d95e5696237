//! Structural checks on an order pair before it is forwarded.
//!
//! These establish referential integrity only: the pair must be bound to
//! the configured exchange and must move the asset under consideration.
//! Signatures, prices and fees are left to the exchange.

use custodian_common::{Address, AssetRef, CustodianError};
use thiserror::Error;
use tracing::debug;

use crate::calldata::{decode_transfer, PayloadError};
use crate::order::{Order, OrderPair, Side};

/// A structural defect found in a submitted order pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderDefect {
    /// Order is bound to a different exchange.
    #[error("{leg} order targets exchange {actual}, expected {expected}")]
    WrongExchange {
        leg: Side,
        expected: Address,
        actual: Address,
    },

    /// Order sits on the wrong side of the pair.
    #[error("{leg} order has side {actual}")]
    WrongSide { leg: Side, actual: Side },

    /// Call payload could not be decoded.
    #[error("{leg} order payload: {source}")]
    Payload {
        leg: Side,
        #[source]
        source: PayloadError,
    },

    /// Call payload moves a different asset.
    #[error("{leg} order moves {actual}, expected {expected}")]
    AssetMismatch {
        leg: Side,
        expected: AssetRef,
        actual: AssetRef,
    },
}

impl From<OrderDefect> for CustodianError {
    fn from(defect: OrderDefect) -> Self {
        CustodianError::MalformedOrder {
            reason: defect.to_string(),
        }
    }
}

fn check_leg(leg: Side, order: &Order, asset: &AssetRef, exchange: &Address) -> Result<(), OrderDefect> {
    if order.exchange != *exchange {
        return Err(OrderDefect::WrongExchange {
            leg,
            expected: *exchange,
            actual: order.exchange,
        });
    }

    if order.side != leg {
        return Err(OrderDefect::WrongSide {
            leg,
            actual: order.side,
        });
    }

    let call = decode_transfer(&order.target, order.calldata.as_slice())
        .map_err(|source| OrderDefect::Payload { leg, source })?;

    if call.asset != *asset {
        return Err(OrderDefect::AssetMismatch {
            leg,
            expected: *asset,
            actual: call.asset,
        });
    }

    debug!(leg = %leg, kind = ?call.kind, asset = %asset, "Order leg verified");
    Ok(())
}

/// Verify that both orders of `pair` are bound to `exchange` and move `asset`.
pub fn validate_order_pair(pair: &OrderPair, asset: &AssetRef, exchange: &Address) -> Result<(), OrderDefect> {
    check_leg(Side::Buy, &pair.buy, asset, exchange)?;
    check_leg(Side::Sell, &pair.sell, asset, exchange)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calldata::{encode_criteria_transfer, encode_transfer_from};
    use crate::order::{FeeMethod, HowToCall, SaleKind};
    use custodian_common::{Bytes, TokenId, Uint256};

    fn exchange() -> Address {
        Address::from_low_u8(0xe0)
    }

    fn asset() -> AssetRef {
        AssetRef::new(Address::from_low_u8(0xc0), 1u128)
    }

    fn order(side: Side, calldata: Vec<u8>) -> Order {
        Order {
            exchange: exchange(),
            maker: Address::from_low_u8(0x01),
            taker: Address::ZERO,
            maker_relayer_fee: Uint256::zero(),
            taker_relayer_fee: Uint256::from(250u64),
            maker_protocol_fee: Uint256::zero(),
            taker_protocol_fee: Uint256::zero(),
            fee_recipient: Address::from_low_u8(0xfe),
            fee_method: FeeMethod::SplitFee,
            side,
            sale_kind: SaleKind::FixedPrice,
            target: Address::from_low_u8(0x45),
            how_to_call: HowToCall::DelegateCall,
            calldata: Bytes::new(calldata),
            replacement_pattern: Bytes::default(),
            static_target: Address::ZERO,
            static_extradata: Bytes::default(),
            payment_token: Address::ZERO,
            base_price: Uint256::from(5_000_000_000_000_000u64),
            extra: Uint256::zero(),
            listing_time: 0,
            expiration_time: 0,
            salt: Uint256::from(7u64),
        }
    }

    fn pair_for(asset: &AssetRef) -> OrderPair {
        let payload = encode_criteria_transfer(&Address::ZERO, &Address::ZERO, asset);
        OrderPair::new(order(Side::Buy, payload.clone()), order(Side::Sell, payload))
    }

    #[test]
    fn test_valid_pair_passes() {
        assert!(validate_order_pair(&pair_for(&asset()), &asset(), &exchange()).is_ok());
    }

    #[test]
    fn test_wrong_token_id_rejected() {
        let other = AssetRef::new(asset().collection, 2u128);
        let err = validate_order_pair(&pair_for(&other), &asset(), &exchange()).unwrap_err();
        assert_eq!(
            err,
            OrderDefect::AssetMismatch {
                leg: Side::Buy,
                expected: asset(),
                actual: other,
            }
        );
    }

    #[test]
    fn test_sell_leg_checked_independently() {
        let mut pair = pair_for(&asset());
        let other = AssetRef::new(Address::from_low_u8(0xc1), 1u128);
        pair.sell.calldata = Bytes::new(encode_criteria_transfer(&Address::ZERO, &Address::ZERO, &other));
        let err = validate_order_pair(&pair, &asset(), &exchange()).unwrap_err();
        assert!(matches!(err, OrderDefect::AssetMismatch { leg: Side::Sell, .. }));
    }

    #[test]
    fn test_wrong_exchange_rejected() {
        let mut pair = pair_for(&asset());
        pair.sell.exchange = Address::from_low_u8(0xee);
        let err = validate_order_pair(&pair, &asset(), &exchange()).unwrap_err();
        assert!(matches!(err, OrderDefect::WrongExchange { leg: Side::Sell, .. }));
    }

    #[test]
    fn test_swapped_sides_rejected() {
        let pair = pair_for(&asset());
        let swapped = OrderPair::new(pair.sell, pair.buy);
        let err = validate_order_pair(&swapped, &asset(), &exchange()).unwrap_err();
        assert_eq!(
            err,
            OrderDefect::WrongSide {
                leg: Side::Buy,
                actual: Side::Sell
            }
        );
    }

    #[test]
    fn test_direct_transfer_checks_target_collection() {
        let payload = encode_transfer_from(&Address::ZERO, &Address::ZERO, TokenId::from(1u128));
        let mut pair = OrderPair::new(order(Side::Buy, payload.clone()), order(Side::Sell, payload));
        // target is not the collection
        assert!(validate_order_pair(&pair, &asset(), &exchange()).is_err());

        pair.buy.target = asset().collection;
        pair.sell.target = asset().collection;
        assert!(validate_order_pair(&pair, &asset(), &exchange()).is_ok());
    }

    #[test]
    fn test_defect_maps_to_malformed_order() {
        let mut pair = pair_for(&asset());
        pair.buy.calldata = Bytes::new(vec![0xde, 0xad, 0xbe, 0xef]);
        let err: CustodianError = validate_order_pair(&pair, &asset(), &exchange()).unwrap_err().into();
        assert_eq!(err.error_code(), "MALFORMED_ORDER");
        assert!(err.to_string().contains("unrecognized function selector 0xdeadbeef"));
    }
}
