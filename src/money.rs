//! Cent-level helpers for euro amounts

/// Round to cents, half away from zero
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split `total` into `parts` cent amounts summing exactly to the rounded total
///
/// Leftover cents go to the first share.
pub fn split_cents(total: f64, parts: u32) -> Vec<f64> {
    if parts == 0 {
        return Vec::new();
    }
    let total_cents = (total * 100.0).round() as i64;
    let share = total_cents / parts as i64;
    let remainder = total_cents - share * parts as i64;

    (0..parts)
        .map(|i| {
            let cents = if i == 0 { share + remainder } else { share };
            cents as f64 / 100.0
        })
        .collect()
}
