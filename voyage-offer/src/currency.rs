use crate::models::Money;
use crate::normalizer::NormalizationError;

/// Currency symbols seen in provider payloads. Longer symbols first so
/// `A$` wins over `$`.
const SYMBOLS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("A$", "AUD"),
    ("C$", "CAD"),
    ("NZ$", "NZD"),
    ("HK$", "HKD"),
    ("S$", "SGD"),
    ("R$", "BRL"),
    ("MX$", "MXN"),
    ("$", "USD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("₩", "KRW"),
    ("₺", "TRY"),
    ("฿", "THB"),
    ("₱", "PHP"),
    ("zł", "PLN"),
    ("Fr.", "CHF"),
];

const ISO_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "INR", "AUD", "CAD", "CHF", "CNY", "NZD", "HKD", "SGD", "BRL",
    "KRW", "TRY", "THB", "PHP", "MXN", "SEK", "NOK", "DKK", "PLN", "AED", "ZAR",
];

/// Map a symbol or ISO code to an ISO-4217 code
pub fn resolve_currency(token: &str) -> Option<&'static str> {
    let token = token.trim();
    if let Some(code) = ISO_CODES.iter().find(|code| code.eq_ignore_ascii_case(token)) {
        return Some(code);
    }
    SYMBOLS.iter().find(|(symbol, _)| *symbol == token).map(|(_, code)| *code)
}

/// Parse a display price such as `"$1,234.50"`, `"120 EUR"` or `"99"`.
///
/// Amounts are converted to minor units without going through a float.
/// A price with no currency marker takes `default_currency`.
pub fn parse_price(raw: &str, default_currency: &str) -> Result<Money, NormalizationError> {
    let raw = raw.trim();
    let invalid = || NormalizationError::InvalidField { field: "price", value: raw.to_string() };

    let start = raw.find(|c: char| c.is_ascii_digit()).ok_or_else(invalid)?;
    let end = raw[start..]
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .map(|offset| start + offset)
        .unwrap_or(raw.len());

    let prefix = raw[..start].trim();
    let suffix = raw[end..].trim();

    // Prices are never negative
    if prefix.contains('-') {
        return Err(invalid());
    }

    let mut currency: Option<&'static str> = None;
    for token in [prefix, suffix] {
        if token.is_empty() {
            continue;
        }
        let code = resolve_currency(token).ok_or_else(|| NormalizationError::UnknownCurrency(token.to_string()))?;
        match currency {
            Some(existing) if existing != code => return Err(invalid()),
            _ => currency = Some(code),
        }
    }

    let amount_minor = parse_decimal_minor(&raw[start..end]).ok_or_else(invalid)?;
    let currency = currency.map(str::to_string).unwrap_or_else(|| default_currency.to_string());
    Ok(Money::new(amount_minor, currency))
}

/// Numeric JSON prices carry no currency marker
pub fn money_from_number(value: f64, default_currency: &str) -> Result<Money, NormalizationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(NormalizationError::InvalidField { field: "price", value: value.to_string() });
    }
    Ok(Money::new((value * 100.0).round() as i64, default_currency))
}

/// `"1,234.5"` -> 123450. Commas are thousands separators; at most two decimals.
fn parse_decimal_minor(number: &str) -> Option<i64> {
    let cleaned: String = number.chars().filter(|c| *c != ',').collect();
    let mut parts = cleaned.splitn(2, '.');
    let whole = parts.next()?;
    let fraction = parts.next().unwrap_or("");

    if whole.is_empty() || fraction.len() > 2 || fraction.contains('.') {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_prices() {
        assert_eq!(parse_price("$1,234.50", "USD").unwrap(), Money::new(123450, "USD"));
        assert_eq!(parse_price("€89", "USD").unwrap(), Money::new(8900, "EUR"));
        assert_eq!(parse_price("A$ 210.5", "USD").unwrap(), Money::new(21050, "AUD"));
        assert_eq!(parse_price("£0.99", "USD").unwrap(), Money::new(99, "GBP"));
    }

    #[test]
    fn test_iso_code_prices() {
        assert_eq!(parse_price("120 EUR", "USD").unwrap(), Money::new(12000, "EUR"));
        assert_eq!(parse_price("usd 75.25", "EUR").unwrap(), Money::new(7525, "USD"));
        assert_eq!(parse_price("$120 USD", "EUR").unwrap(), Money::new(12000, "USD"));
    }

    #[test]
    fn test_bare_number_uses_default_currency() {
        assert_eq!(parse_price("150", "USD").unwrap(), Money::new(15000, "USD"));
        assert_eq!(money_from_number(99.99, "EUR").unwrap(), Money::new(9999, "EUR"));
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        assert_eq!(
            parse_price("₿0.5", "USD"),
            Err(NormalizationError::UnknownCurrency("₿".to_string()))
        );
        assert!(matches!(parse_price("12 doubloons", "USD"), Err(NormalizationError::UnknownCurrency(_))));
    }

    #[test]
    fn test_malformed_and_negative_prices() {
        assert!(parse_price("free", "USD").is_err());
        assert!(parse_price("-$20", "USD").is_err());
        assert!(parse_price("$12.345", "USD").is_err());
        assert!(parse_price("$120 EUR", "USD").is_err());
        assert!(money_from_number(-1.0, "USD").is_err());
    }
}
