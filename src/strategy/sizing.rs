use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Shares to buy so that at least `budget` is invested.
///
/// Returns 0 when the price is unknown, zero or negative; callers treat that
/// as "cannot size", never as "buy nothing".
pub fn quantity(budget: Decimal, issue_price: Option<Decimal>) -> u64 {
    match issue_price {
        Some(price) if price > Decimal::ZERO && budget > Decimal::ZERO => {
            (budget / price).ceil().to_u64().unwrap_or(0)
        }
        _ => 0,
    }
}

/// Stop-loss and target prices around a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPrices {
    pub stop_loss: Decimal,
    pub target: Decimal,
}

/// stop = fill × (1 − sl%), target = fill × (1 + tp%), both at 2 dp
pub fn bracket_prices(
    fill_price: Decimal,
    stop_loss_percent: Decimal,
    target_profit_percent: Decimal,
) -> BracketPrices {
    let stop_loss = fill_price * (Decimal::ONE - stop_loss_percent / Decimal::ONE_HUNDRED);
    let target = fill_price * (Decimal::ONE + target_profit_percent / Decimal::ONE_HUNDRED);

    // Half a paisa rounds away from zero: 99.485 -> 99.49
    BracketPrices {
        stop_loss: stop_loss.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        target: target.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    }
}
