use std::{fmt, str::FromStr};

use crate::EngineError;

/// Values below this threshold typed in quick entry are read as thousands.
const SHORTHAND_THRESHOLD: i64 = 1_000;

/// Signed money amount represented as integer **minor units**.
///
/// The ledger currency has no fractional unit, so one minor unit is one đồng
/// and every balance, amount and debt figure is a whole number.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(1_250_000);
/// assert_eq!(amount.minor(), 1_250_000);
/// assert_eq!(amount.to_string(), "1.250.000");
/// ```
///
/// Parsing accepts `.` and `,` as thousands separators. Quick entry also
/// understands the "thousands shorthand":
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("1.500.000".parse::<Money>().unwrap().minor(), 1_500_000);
/// assert_eq!(Money::parse_shorthand("45").unwrap().minor(), 45_000);
/// assert!("12x".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount from minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Parses a quick-entry amount.
    ///
    /// Same rules as [`FromStr`], then a positive value below 1 000 is
    /// multiplied by 1 000 (`"45"` is `45.000`).
    pub fn parse_shorthand(s: &str) -> Result<Self, EngineError> {
        let parsed: Money = s.parse()?;
        if parsed.0 > 0 && parsed.0 < SHORTHAND_THRESHOLD {
            return Ok(Money(parsed.0 * SHORTHAND_THRESHOLD));
        }
        Ok(parsed)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        write!(f, "{sign}{grouped}")
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a whole-unit amount.
    ///
    /// Accepts an optional leading `+`/`-` and `.`, `,` or spaces as
    /// thousands separators. Anything else is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let digits: String = rest
            .chars()
            .filter(|c| !matches!(c, '.' | ',' | ' '))
            .collect();
        if digits.is_empty() {
            return Err(empty());
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let value: i64 = digits.parse().map_err(|_| overflow())?;
        Ok(Money(if negative { -value } else { value }))
    }
}
