//! Request validation at the API boundary.
//!
//! The store trusts its callers; everything it receives over HTTP is
//! checked here first.

use rust_decimal::Decimal;

use super::error::{ApiError, ApiResult};

/// Longest history window a client may ask for (one year).
pub const MAX_HISTORY_HOURS: u32 = 8760;

/// Default history window.
pub const DEFAULT_HISTORY_HOURS: u32 = 24;

/// Largest page of cryptocurrencies a client may ask for.
pub const MAX_LIST_LIMIT: usize = 250;

pub fn non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub fn positive(field: &str, value: Decimal) -> ApiResult<()> {
    if value <= Decimal::ZERO {
        return Err(ApiError::Validation(format!("{field} must be positive, got {value}")));
    }
    Ok(())
}

/// Resolve the `hours` query parameter.
pub fn history_hours(hours: Option<u32>) -> ApiResult<u32> {
    let hours = hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        return Err(ApiError::Validation(format!(
            "hours must be in [1, {MAX_HISTORY_HOURS}], got {hours}"
        )));
    }
    Ok(hours)
}

/// Check the optional `limit` query parameter.
pub fn list_limit(limit: Option<usize>) -> ApiResult<Option<usize>> {
    match limit {
        Some(n) if !(1..=MAX_LIST_LIMIT).contains(&n) => Err(ApiError::Validation(format!(
            "limit must be in [1, {MAX_LIST_LIMIT}], got {n}"
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blank_strings_rejected() {
        assert!(non_empty("username", "alice").is_ok());
        assert!(non_empty("username", "").is_err());
        assert!(non_empty("username", "   ").is_err());
    }

    #[test]
    fn test_target_must_be_positive() {
        assert!(positive("targetValue", dec!(0.0001)).is_ok());
        assert!(positive("targetValue", dec!(0)).is_err());
        assert!(positive("targetValue", dec!(-5)).is_err());
    }

    #[test]
    fn test_history_hours_bounds() {
        assert_eq!(history_hours(None).unwrap(), 24);
        assert_eq!(history_hours(Some(8760)).unwrap(), 8760);
        assert!(history_hours(Some(0)).is_err());
        assert!(history_hours(Some(8761)).is_err());
    }

    #[test]
    fn test_list_limit_bounds() {
        assert_eq!(list_limit(None).unwrap(), None);
        assert_eq!(list_limit(Some(1)).unwrap(), Some(1));
        assert!(list_limit(Some(0)).is_err());
        assert!(list_limit(Some(251)).is_err());
    }
}
