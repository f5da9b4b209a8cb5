use crate::oracle::PriceBounds;

use super::config::ReconstructConfig;
use super::reconcile::{Candidate, DiscardReason};

/// OCR regularly drops the leading group of a long total ("1,085,585,000"
/// read as "85,585,000"). Try adding back one digit's worth of each chunk
/// larger than the total and accept the first total that divides evenly by
/// the quantity with an acceptable unit price.
pub fn recover_leading_digits<F>(total: u64, quantity: u32, chunks: &[u64], accept_unit: F) -> Option<u64>
where
    F: Fn(u64) -> bool,
{
    if quantity == 0 {
        return None;
    }
    let quantity = quantity as u64;

    let mut chunks: Vec<u64> = chunks.iter().copied().filter(|c| *c > total).collect();
    chunks.sort_unstable();

    for chunk in chunks {
        for digit in 1..=9u64 {
            let Some(candidate) = chunk.checked_mul(digit).and_then(|v| v.checked_add(total)) else {
                break;
            };
            if candidate % quantity == 0 && accept_unit(candidate / quantity) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Unit price check against the configured sanity range and, when known,
/// the oracle's bounds widened by the tolerance.
pub fn unit_price_plausible(
    price: u64,
    quantity: u32,
    bounds: Option<&PriceBounds>,
    config: &ReconstructConfig,
) -> bool {
    if quantity == 0 {
        return false;
    }
    let unit = price as f64 / quantity as f64;
    if unit < config.min_unit_price as f64 || unit > config.max_unit_price as f64 {
        return false;
    }
    bounds.map_or(true, |b| b.admits(unit, config.oracle_tolerance))
}

/// Final gate before a candidate may be stored. A unit price outside the
/// oracle's bounds gets one leading-digit correction attempt before being
/// dropped. Without bounds nothing can confirm a correction, so the total
/// is judged as read.
pub fn validate(
    mut candidate: Candidate,
    bounds: Option<&PriceBounds>,
    config: &ReconstructConfig,
) -> Result<Candidate, DiscardReason> {
    if candidate.price == 0 {
        return Err(DiscardReason::ZeroPrice);
    }
    if !config.quantity_in_bounds(candidate.quantity as u64) {
        return Err(DiscardReason::QuantityOutOfBounds);
    }
    if unit_price_plausible(candidate.price, candidate.quantity, bounds, config) {
        return Ok(candidate);
    }

    let Some(bounds) = bounds else {
        return Err(DiscardReason::ImplausibleUnitPrice);
    };
    let corrected = recover_leading_digits(
        candidate.price,
        candidate.quantity,
        &config.leading_chunks,
        |unit| unit_price_plausible(unit, 1, Some(bounds), config),
    );
    match corrected {
        Some(price) => {
            candidate.price = price;
            Ok(candidate)
        }
        None => Err(DiscardReason::ImplausibleUnitPrice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Case, Provenance, Side};
    use chrono::NaiveDate;

    fn candidate(quantity: u32, price: u64) -> Candidate {
        Candidate {
            item_name: "Magical Shard".into(),
            quantity,
            price,
            timestamp: NaiveDate::from_ymd_opt(2025, 10, 12)
                .unwrap()
                .and_hms_opt(4, 4, 0)
                .unwrap(),
            side: Side::Sell,
            case: Case::Collect,
            provenance: Provenance::ParsedFromLog,
            anchor: None,
            member_texts: Vec::new(),
        }
    }

    fn shard_bounds() -> PriceBounds {
        PriceBounds {
            min_price: 2_700_000,
            max_price: 3_200_000,
            base_price: 2_927_925,
        }
    }

    #[test]
    fn recovery_picks_smallest_divisible_total() {
        let recovered = recover_leading_digits(85_585_000, 200, &[10_000_000, 100_000_000], |_| true);
        // The 10M chunk is smaller than the total and is skipped.
        assert_eq!(recovered, Some(185_585_000));
    }

    #[test]
    fn recovery_respects_unit_filter() {
        let recovered = recover_leading_digits(
            85_585_000,
            200,
            &[10_000_000, 100_000_000, 1_000_000_000],
            |unit| (2_700_000..=3_200_000).contains(&unit),
        );
        assert_eq!(recovered, Some(585_585_000));
    }

    #[test]
    fn truncated_total_is_discarded() {
        let result = validate(
            candidate(200, 126_184),
            Some(&shard_bounds()),
            &ReconstructConfig::default(),
        );
        assert_eq!(result.unwrap_err(), DiscardReason::ImplausibleUnitPrice);
    }

    #[test]
    fn implausible_total_is_corrected_when_possible() {
        let accepted = validate(
            candidate(200, 85_585_000),
            Some(&shard_bounds()),
            &ReconstructConfig::default(),
        )
        .unwrap();
        assert_eq!(accepted.price, 585_585_000);
    }

    #[test]
    fn unknown_item_passes_sanity_range_only() {
        let accepted = validate(candidate(200, 585_585_000), None, &ReconstructConfig::default());
        assert!(accepted.is_ok());
        let zero = validate(candidate(1, 0), None, &ReconstructConfig::default());
        assert_eq!(zero.unwrap_err(), DiscardReason::ZeroPrice);
    }

    #[test]
    fn no_correction_without_bounds() {
        // 5 for 7 units is below the sanity range. 30,000,005 would divide
        // evenly, but nothing confirms that digit.
        let result = validate(candidate(7, 5), None, &ReconstructConfig::default());
        assert_eq!(result.unwrap_err(), DiscardReason::ImplausibleUnitPrice);
    }

    #[test]
    fn quantity_bounds_enforced() {
        let result = validate(candidate(200_000, 585_585_000), None, &ReconstructConfig::default());
        assert_eq!(result.unwrap_err(), DiscardReason::QuantityOutOfBounds);
    }
}
