//! Structural validation of request payloads.
//!
//! Checks collect into a [`Validator`]; a payload is rejected with every
//! failing field listed at once.

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{AppError, FieldErrors};

lazy_static::lazy_static! {
    /// Letters, digits and underscore
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();

    /// ISO 4217 style code
    static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Z]{3}$").unwrap();

    /// `#rrggbb`
    static ref COLOR_REGEX: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

/// Exclusive upper bound for prices.
pub const MAX_PRICE: i64 = 10_000_000_000;

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Character count must lie within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            if min == 1 {
                self.error(field, "Required");
            } else {
                self.error(field, format!("Must be at least {} characters", min));
            }
        } else if value.chars().count() > max {
            self.error(field, format!("Must be at most {} characters", max));
        }
    }

    pub fn username(&mut self, field: &str, value: &str) {
        self.length(field, value, 3, 50);
        if !USERNAME_REGEX.is_match(value) {
            self.error(field, "Only letters, numbers and underscore are allowed");
        }
    }

    /// Absolute http(s) URL.
    pub fn url(&mut self, field: &str, value: &str) {
        match url::Url::parse(value) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => self.error(field, "Must be a valid http(s) URL"),
        }
    }

    pub fn currency(&mut self, field: &str, value: &str) {
        if !CURRENCY_REGEX.is_match(value) {
            self.error(field, "Must be a 3-letter uppercase currency code");
        }
    }

    pub fn color(&mut self, field: &str, value: &str) {
        if !COLOR_REGEX.is_match(value) {
            self.error(field, "Must be a hex color like #3b82f6");
        }
    }

    pub fn priority(&mut self, field: &str, value: i16) {
        if !(0..=2).contains(&value) {
            self.error(field, "Must be 0 (low), 1 (medium) or 2 (high)");
        }
    }

    /// Positive amount that fits a NUMERIC(12, 2) column.
    pub fn positive_price(&mut self, field: &str, value: Decimal) {
        if value <= Decimal::ZERO {
            self.error(field, "Must be greater than zero");
        }
        if value.normalize().scale() > 2 {
            self.error(field, "At most 2 decimal places");
        }
        if value >= Decimal::from(MAX_PRICE) {
            self.error(field, format!("Must be less than {}", MAX_PRICE));
        }
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(self.errors))
        }
    }
}

/// Deserialize helper: a present field, including an explicit `null`,
/// becomes `Some(..)`; an absent one stays `None` through `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
