//! RCD tariff coefficients
//!
//! Band tables are `(upper bound inclusive, coefficient)` pairs scanned in
//! order; the last entry uses `f64::INFINITY` / `u32::MAX` as its bound.

/// Rates per mille of revenue by activity code
pub const ACTIVITY_RATES: &[(&str, f64)] = &[
    ("GROS_OEUVRE", 22.0),
    ("MACONNERIE", 20.0),
    ("CHARPENTE", 18.0),
    ("COUVERTURE", 19.0),
    ("ETANCHEITE", 25.0),
    ("TERRASSEMENT", 11.0),
    ("PLOMBERIE", 12.0),
    ("CHAUFFAGE", 13.0),
    ("ELECTRICITE", 10.0),
    ("ISOLATION", 14.0),
    ("MENUISERIE", 9.0),
    ("PLATRERIE", 8.0),
    ("CARRELAGE", 9.5),
    ("PEINTURE", 6.0),
];

/// Applied to unknown activity codes and to an empty activity list
pub const DEFAULT_ACTIVITY_RATE: f64 = 15.0;

/// Degressivity on declared revenue (EUR)
pub const REVENUE_BANDS: &[(f64, f64)] = &[
    (150_000.0, 1.00),
    (500_000.0, 0.95),
    (1_000_000.0, 0.90),
    (3_000_000.0, 0.85),
    (f64::INFINITY, 0.80),
];

/// Revenue per staff-equivalent (EUR); high ratios indicate heavy subcontracting
pub const STAFF_INTENSITY_BANDS: &[(f64, f64)] = &[
    (80_000.0, 1.00),
    (200_000.0, 1.05),
    (f64::INFINITY, 1.15),
];

/// Whole years since incorporation
pub const COMPANY_AGE_BANDS: &[(u32, f64)] = &[
    (0, 1.25),
    (2, 1.15),
    (4, 1.05),
    (u32::MAX, 1.00),
];

/// Used when the incorporation date is missing or after the reference date
pub const UNKNOWN_COMPANY_AGE_FACTOR: f64 = 1.25;

/// Years of trade experience of the manager
pub const EXPERIENCE_BANDS: &[(u32, f64)] = &[
    (2, 1.20),
    (5, 1.10),
    (10, 1.00),
    (u32::MAX, 0.95),
];

pub const UNKNOWN_EXPERIENCE_FACTOR: f64 = 1.20;

/// Years of uninterrupted RCD cover
pub const CONTINUOUS_COVERAGE_BANDS: &[(u32, f64)] = &[
    (0, 1.10),
    (2, 1.05),
    (4, 1.00),
    (u32::MAX, 0.95),
];

pub const QUALIFIED_FACTOR: f64 = 0.95;

/// Previous insurer in liquidation or withdrawn from the market
pub const PRIOR_INSURER_DEFAULT_FACTOR: f64 = 1.10;

pub const UNINSURED_ACTIVITY_FACTOR: f64 = 1.20;

/// Minimum premium excluding tax and fees
pub const MINIMUM_PREMIUM: f64 = 1_200.0;

pub const MANAGEMENT_FEE: f64 = 60.0;

/// Taxe sur les conventions d'assurance
pub const INSURANCE_TAX_RATE: f64 = 0.09;

pub fn activity_rate(code: &str) -> f64 {
    ACTIVITY_RATES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code.trim()))
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_ACTIVITY_RATE)
}

pub fn band_f64(bands: &[(f64, f64)], value: f64) -> f64 {
    bands
        .iter()
        .find(|(upper, _)| value <= *upper)
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0)
}

pub fn band_u32(bands: &[(u32, f64)], value: u32) -> f64 {
    bands
        .iter()
        .find(|(upper, _)| value <= *upper)
        .map(|(_, factor)| *factor)
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_rate_lookup() {
        assert_eq!(activity_rate("PEINTURE"), 6.0);
        assert_eq!(activity_rate(" peinture "), 6.0);
        assert_eq!(activity_rate("PISCINISTE"), DEFAULT_ACTIVITY_RATE);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(band_f64(REVENUE_BANDS, 150_000.0), 1.00);
        assert_eq!(band_f64(REVENUE_BANDS, 150_000.01), 0.95);
        assert_eq!(band_f64(REVENUE_BANDS, 50_000_000.0), 0.80);
        assert_eq!(band_u32(EXPERIENCE_BANDS, 2), 1.20);
        assert_eq!(band_u32(EXPERIENCE_BANDS, 3), 1.10);
        assert_eq!(band_u32(EXPERIENCE_BANDS, 40), 0.95);
    }
}
