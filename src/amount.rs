//! Base-unit integer <-> human-readable decimal conversion.
//!
//! Amounts travel through the pipeline as base-unit integer strings
//! (wei-equivalent). Conversion to and from decimal representation happens
//! only at formatting boundaries, never mid-pipeline.

use ethers::types::U256;

use crate::error::Error;

fn pow10(decimals: u8) -> Result<U256, Error> {
    // 10^78 overflows 256 bits; no real token comes close
    if decimals > 77 {
        return Err(Error::Amount(format!("unsupported decimals {}", decimals)));
    }
    Ok(U256::from(10u64).pow(U256::from(decimals)))
}

/// Convert a base-unit integer string into a human-readable decimal string,
/// adjusted for the token's decimals. Trailing fractional zeros are trimmed.
pub fn normalize(base_units: &str, decimals: u8) -> Result<String, Error> {
    let value = U256::from_dec_str(base_units.trim())
        .map_err(|e| Error::Amount(format!("invalid base-unit amount '{}': {}", base_units, e)))?;

    if decimals == 0 {
        return Ok(value.to_string());
    }

    let divisor = pow10(decimals)?;
    let whole = value / divisor;
    let frac = value % divisor;

    if frac.is_zero() {
        return Ok(whole.to_string());
    }

    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let frac = frac.trim_end_matches('0');
    Ok(format!("{}.{}", whole, frac))
}

/// Convert a human-readable decimal string into a base-unit integer string.
/// Fails if the fractional part carries more precision than the token allows.
pub fn denormalize(value: &str, decimals: u8) -> Result<String, Error> {
    let value = value.trim();
    let (whole, frac) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(Error::Amount("empty amount".to_string()));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Amount(format!("invalid decimal amount '{}'", value)));
    }
    if frac.len() > decimals as usize {
        return Err(Error::Amount(format!(
            "amount '{}' exceeds {} decimal places",
            value, decimals
        )));
    }

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole)
            .map_err(|e| Error::Amount(format!("invalid decimal amount '{}': {}", value, e)))?
    };

    let scale = pow10(decimals)?;
    let frac_units = if frac.is_empty() {
        U256::zero()
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        U256::from_dec_str(&padded)
            .map_err(|e| Error::Amount(format!("invalid decimal amount '{}': {}", value, e)))?
    };

    let total = whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| Error::Amount(format!("amount '{}' overflows", value)))?;

    Ok(total.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_with_decimals() {
        assert_eq!(normalize("1800000", 6).unwrap(), "1.8");
        assert_eq!(normalize("1000000000000000000", 18).unwrap(), "1");
        assert_eq!(normalize("1500000000000000000", 18).unwrap(), "1.5");
        assert_eq!(normalize("0", 18).unwrap(), "0");
        assert_eq!(normalize("123", 0).unwrap(), "123");
        assert_eq!(normalize("1", 6).unwrap(), "0.000001");
    }

    #[test]
    fn denormalizes_with_decimals() {
        assert_eq!(denormalize("1.8", 6).unwrap(), "1800000");
        assert_eq!(denormalize("1", 18).unwrap(), "1000000000000000000");
        assert_eq!(denormalize(".5", 6).unwrap(), "500000");
        assert_eq!(denormalize("0", 6).unwrap(), "0");
    }

    #[test]
    fn round_trips_base_units() {
        for (units, decimals) in [
            ("1800000", 6u8),
            ("1000000000000000000", 18),
            ("123456789", 8),
            ("1", 18),
        ] {
            let human = normalize(units, decimals).unwrap();
            assert_eq!(denormalize(&human, decimals).unwrap(), units);
        }
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(denormalize("1.1234567", 6).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(normalize("1.5", 6).is_err());
        assert!(normalize("abc", 6).is_err());
        assert!(denormalize("1.2.3", 6).is_err());
        assert!(denormalize("-4", 6).is_err());
        assert!(denormalize("", 6).is_err());
    }
}
