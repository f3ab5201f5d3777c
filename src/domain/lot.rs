//! Venue lot-size, tick-size and minimum-notional rounding.

/// Trading constraints of one venue pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotConstraints {
    pub step_quantity: f64,
    pub step_price: f64,
    pub min_notional: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizedOrder {
    Sized {
        quantity: f64,
        price: f64,
        notional: f64,
    },
    BelowMinimum {
        notional: f64,
        min_notional: f64,
    },
}

/// Round `value` down onto the `step` grid. A non-positive step leaves the
/// value unchanged. Result is cleaned to 10 decimal places.
pub fn floor_to_step(value: f64, step: f64) -> f64 {
    let raw = if step > 0.0 {
        let steps = (value / step + 1e-9).floor();
        steps * step
    } else {
        value
    };
    round_decimals(raw, 10)
}

fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fits a raw quantity and price onto the pair's grid and checks the
/// minimum notional.
pub fn size_order(quantity: f64, price: f64, constraints: &LotConstraints) -> SizedOrder {
    let quantity = floor_to_step(quantity, constraints.step_quantity);
    let price = floor_to_step(price, constraints.step_price);
    let notional = round_decimals(quantity * price, 10);

    if quantity <= 0.0 || price <= 0.0 || notional < constraints.min_notional {
        return SizedOrder::BelowMinimum {
            notional,
            min_notional: constraints.min_notional,
        };
    }
    SizedOrder::Sized {
        quantity,
        price,
        notional,
    }
}
