//! Overflow/underflow-checked arithmetic
//!
//! Every ledger mutation in this crate routes through these helpers; no
//! balance field is ever touched by raw arithmetic. Amounts are capped at
//! [`MAX_ASSET_AMOUNT`], a protocol ceiling well below `i64::MAX` that
//! leaves headroom for accumulation.

use crate::error::{Error, Result};

/// Protocol-wide ceiling on any single asset amount (2^62 - 1).
pub const MAX_ASSET_AMOUNT: i64 = 4_611_686_018_427_387_903;

/// Unsigned view of [`MAX_ASSET_AMOUNT`].
pub const MAX_ASSET_AMOUNT_U64: u64 = 4_611_686_018_427_387_903;

/// Checked addition of two non-negative signed amounts.
///
/// Fails with [`Error::Overflow`] if the sum exceeds the asset ceiling.
pub fn checked_add_i64(a: i64, b: i64) -> Result<i64> {
    if a < 0 || b < 0 {
        return Err(Error::InvalidAmount(a.min(b)));
    }

    if MAX_ASSET_AMOUNT - a < b {
        return Err(Error::Overflow);
    }

    Ok(a + b)
}

/// Checked subtraction of two non-negative signed amounts.
///
/// Subtracting a nonzero amount from zero is an underflow, as is any
/// subtraction that would go negative.
pub fn checked_sub_i64(a: i64, b: i64) -> Result<i64> {
    if a < 0 || b < 0 {
        return Err(Error::InvalidAmount(a.min(b)));
    }

    if a == 0 {
        if b != 0 {
            return Err(Error::Underflow);
        }
        return Ok(0);
    }

    if b > a {
        return Err(Error::Underflow);
    }

    Ok(a - b)
}

/// Checked multiplication of unsigned 64-bit amounts.
///
/// Widens to 128 bits before multiplying; fails with [`Error::Overflow`]
/// when either input or the product exceeds the asset ceiling.
pub fn checked_mul_u64(a: u64, b: u64) -> Result<u64> {
    if a == 0 || b == 0 {
        return Ok(0);
    }

    if a > MAX_ASSET_AMOUNT_U64 || b > MAX_ASSET_AMOUNT_U64 {
        return Err(Error::Overflow);
    }

    let product = (a as u128) * (b as u128);
    if product > MAX_ASSET_AMOUNT_U64 as u128 {
        return Err(Error::Overflow);
    }

    Ok(product as u64)
}

/// Checked multiplication of unsigned 128-bit amounts.
pub fn checked_mul_u128(a: u128, b: u128) -> Result<u128> {
    if a == 0 || b == 0 {
        return Ok(0);
    }

    if a > MAX_ASSET_AMOUNT_U64 as u128 || b > MAX_ASSET_AMOUNT_U64 as u128 {
        return Err(Error::Overflow);
    }

    a.checked_mul(b).ok_or(Error::Overflow)
}

/// Checked unsigned division.
pub fn checked_div_u64(a: u64, b: u64) -> Result<u64> {
    if b == 0 {
        return Err(Error::DivideByZero);
    }
    Ok(a / b)
}

/// Range-checked floating multiplication of non-negative quantities.
pub fn mul_f64(a: f64, b: f64) -> Result<f64> {
    if a < 0.0 || b < 0.0 {
        return Err(Error::InvalidAmount(-1));
    }

    if a == 0.0 || b == 0.0 {
        return Ok(0.0);
    }

    let ceiling = MAX_ASSET_AMOUNT as f64;
    if a > ceiling || b > ceiling {
        return Err(Error::Overflow);
    }

    if a > ceiling / b {
        return Err(Error::Overflow);
    }

    Ok(a * b)
}

/// Floating division; fails with [`Error::DivideByZero`] on a zero divisor.
pub fn div_f64(a: f64, b: f64) -> Result<f64> {
    if b == 0.0 {
        return Err(Error::DivideByZero);
    }
    Ok(a / b)
}

/// The single reviewed float-to-integer truncation point.
///
/// Share allocation is computed in floating arithmetic and then truncated
/// (never rounded) to an integer amount. Every such cast in the crate goes
/// through here.
pub fn truncate_to_i64(value: f64) -> Result<i64> {
    if value < 0.0 {
        return Err(Error::InvalidAmount(-1));
    }

    if value > MAX_ASSET_AMOUNT as f64 {
        return Err(Error::Overflow);
    }

    Ok(value as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_basic() {
        assert_eq!(checked_add_i64(2, 3).unwrap(), 5);
        assert_eq!(checked_add_i64(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_add_overflow() {
        assert_eq!(checked_add_i64(MAX_ASSET_AMOUNT, 1), Err(Error::Overflow));
        assert_eq!(checked_add_i64(MAX_ASSET_AMOUNT, 0).unwrap(), MAX_ASSET_AMOUNT);
    }

    #[test]
    fn test_sub_basic() {
        assert_eq!(checked_sub_i64(5, 3).unwrap(), 2);
        assert_eq!(checked_sub_i64(5, 5).unwrap(), 0);
    }

    #[test]
    fn test_sub_from_zero_is_underflow() {
        assert_eq!(checked_sub_i64(0, 1), Err(Error::Underflow));
        assert_eq!(checked_sub_i64(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_sub_underflow() {
        assert_eq!(checked_sub_i64(3, 5), Err(Error::Underflow));
    }

    #[test]
    fn test_mul_u64() {
        assert_eq!(checked_mul_u64(0, 99).unwrap(), 0);
        assert_eq!(checked_mul_u64(7, 6).unwrap(), 42);
        assert_eq!(
            checked_mul_u64(MAX_ASSET_AMOUNT_U64, 2),
            Err(Error::Overflow)
        );
        assert_eq!(
            checked_mul_u64(u64::MAX, 1),
            Err(Error::Overflow)
        );
    }

    #[test]
    fn test_mul_u128() {
        assert_eq!(checked_mul_u128(0, 5).unwrap(), 0);
        assert_eq!(checked_mul_u128(1 << 40, 1 << 20).unwrap(), 1 << 60);
        assert_eq!(
            checked_mul_u128(u128::MAX, 2),
            Err(Error::Overflow)
        );
    }

    #[test]
    fn test_div() {
        assert_eq!(checked_div_u64(10, 3).unwrap(), 3);
        assert_eq!(checked_div_u64(10, 0), Err(Error::DivideByZero));
        assert_eq!(div_f64(1.0, 0.0), Err(Error::DivideByZero));
    }

    #[test]
    fn test_float_truncation() {
        assert_eq!(truncate_to_i64(99.999).unwrap(), 99);
        assert_eq!(truncate_to_i64(0.4).unwrap(), 0);
        assert!(truncate_to_i64(-0.5).is_err());
    }

    #[test]
    fn test_mul_f64_range() {
        assert_eq!(mul_f64(0.0, 1e18).unwrap(), 0.0);
        assert!(mul_f64(1e18, 1e18).is_err());
        assert!(mul_f64(-1.0, 2.0).is_err());
        assert_eq!(mul_f64(0.85, 1000.0).unwrap(), 850.0);
    }
}
