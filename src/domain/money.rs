use super::LedgerError;

/// Money is represented as integer cents (or pence) to avoid floating-point precision issues.
/// For EUR/GBP, 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// Only the format is checked here; use [`ensure_positive`] to reject zero or
/// negative amounts.
pub fn parse_cents(input: &str) -> Result<Cents, LedgerError> {
    let invalid = || LedgerError::InvalidAmount(format!("'{}' is not a number", input.trim()));

    let trimmed = input.trim();
    let negative = trimmed.starts_with('-');
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);

    let (units_str, decimal_str) = match unsigned.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (unsigned, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(invalid());
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| invalid())?
    };

    // Pad to two digits, anything past the second decimal is truncated
    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        1 => decimal_str.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => decimal_str[..2].parse().map_err(|_| invalid())?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or_else(invalid)?;

    Ok(if negative { -cents } else { cents })
}

/// Reject amounts that are zero or negative.
pub fn ensure_positive(amount: Cents) -> Result<Cents, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }
    Ok(amount)
}
