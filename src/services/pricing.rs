use rust_decimal::{Decimal, RoundingStrategy};

use crate::entities::status::DiscountType;

/// Price a plan after its discount.
///
/// Without a discount type or value the list price is returned unchanged. The result
/// never drops below zero and is rounded to cents, midpoint away from zero.
#[must_use]
pub fn final_price(
    price: Decimal,
    discount_type: Option<DiscountType>,
    discount_value: Option<Decimal>,
) -> Decimal {
    let discounted = match (discount_type, discount_value) {
        (Some(DiscountType::Fixed), Some(value)) => price - value,
        (Some(DiscountType::Percentage), Some(value)) => price - price * value / Decimal::ONE_HUNDRED,
        _ => price,
    };

    discounted
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
