use crate::config::ShippingRates;
use crate::models::product::DEFAULT_WEIGHT_GRAMS;

/// Total parcel weight; lines without a recorded weight count as 500 g per unit.
pub fn total_weight_grams<I>(lines: I) -> i64
where
  I: IntoIterator<Item = (Option<i32>, i32)>,
{
  lines
    .into_iter()
    .map(|(weight, qty)| i64::from(weight.unwrap_or(DEFAULT_WEIGHT_GRAMS).max(0)) * i64::from(qty.max(0)))
    .sum()
}

/// Shipping fee in đồng for a parcel of `weight_grams` worth `subtotal - discount`.
pub fn shipping_fee(rates: &ShippingRates, subtotal: i64, discount: i64, weight_grams: i64) -> i64 {
  if subtotal - discount >= rates.free_shipping_threshold {
    return 0;
  }
  // Every started kilogram after the first costs `per_kg_fee`.
  let kilograms = ((weight_grams.max(0) + 999) / 1000).max(1);
  rates.base_fee + (kilograms - 1) * rates.per_kg_fee
}

/// Tax is not charged on specialty food orders.
pub fn tax_amount(_taxable: i64) -> i64 {
  0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn free_above_threshold_after_discount() {
    let rates = ShippingRates::default();
    assert_eq!(shipping_fee(&rates, 520_000, 0, 4_000), 0);
    assert_eq!(shipping_fee(&rates, 520_000, 30_000, 4_000), 60_000);
  }

  #[test]
  fn per_started_kilogram() {
    let rates = ShippingRates::default();
    assert_eq!(shipping_fee(&rates, 100_000, 0, 0), 30_000);
    assert_eq!(shipping_fee(&rates, 100_000, 0, 1_000), 30_000);
    assert_eq!(shipping_fee(&rates, 100_000, 0, 1_001), 40_000);
    assert_eq!(shipping_fee(&rates, 100_000, 0, 2_500), 50_000);
  }

  #[test]
  fn missing_weights_default_to_half_a_kilo() {
    assert_eq!(total_weight_grams([(None, 3), (Some(200), 2)]), 1_900);
  }
}
