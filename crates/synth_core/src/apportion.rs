//! Integer-conserving apportionment (largest-remainder / Hamilton method).
//!
//! Used both to split a locale's accepted sales across salespeople and to split
//! a salesperson's sales across products.

use crate::error::InvariantViolation;

/// Split `total` into integer shares proportional to `weights`.
///
/// Every share is `floor(total * w_i / sum(w))` plus at most one extra unit.
/// Leftover units go to the largest fractional remainders; ties are broken by
/// position, so the result is fully deterministic for a given input order.
/// Non-positive or non-finite weights receive nothing. If no weight is
/// positive, all shares are zero and the total is not conserved; callers that
/// need conservation must check for that case first.
pub fn apportion(total: u64, weights: &[f64]) -> Result<Vec<u64>, InvariantViolation> {
    let usable: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let weight_sum: f64 = usable.iter().sum();
    if total == 0 || weight_sum <= 0.0 {
        return Ok(vec![0; weights.len()]);
    }

    let mut shares = Vec::with_capacity(usable.len());
    let mut remainders = Vec::with_capacity(usable.len());
    for (idx, weight) in usable.iter().enumerate() {
        let quota = total as f64 * weight / weight_sum;
        let floor = quota.floor();
        shares.push(floor as u64);
        if *weight > 0.0 {
            remainders.push((idx, quota - floor));
        }
    }

    let assigned: u64 = shares.iter().sum();
    if assigned > total {
        return Err(InvariantViolation {
            stage: "apportion floor",
            expected: total,
            actual: assigned,
        });
    }

    // Stable sort keeps index order among equal remainders.
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
    let leftover = (total - assigned) as usize;
    for (idx, _) in remainders.iter().cycle().take(leftover) {
        shares[*idx] += 1;
    }

    check_conserved("apportion", total, &shares)?;
    Ok(shares)
}

/// Split `total` as evenly as possible over `count` slots: [`apportion`]
/// with equal weights, so earlier slots take the remainder.
pub fn apportion_evenly(total: u64, count: usize) -> Result<Vec<u64>, InvariantViolation> {
    apportion(total, &vec![1.0; count])
}

/// Verify that `shares` sum to `expected`.
pub fn check_conserved(
    stage: &'static str,
    expected: u64,
    shares: &[u64],
) -> Result<(), InvariantViolation> {
    let actual: u64 = shares.iter().sum();
    if actual != expected {
        return Err(InvariantViolation {
            stage,
            expected,
            actual,
        });
    }
    Ok(())
}
