//! Validated primitive types shared across the laboratory portal crates.
//!
//! Values of these types are checked once at construction, so code that receives them can rely
//! on the invariant without re-validating.

use std::num::NonZeroU32;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when creating validated quantities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// The number of samples was zero, negative, or too large to represent
    #[error("number of samples must be between 1 and {max}, got {given}", max = u32::MAX)]
    InvalidQuantity { given: i64 },
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Number of samples submitted for a study, guaranteed to be at least one.
///
/// Every per-sample price is a division by this value, so a zero count is rejected here
/// rather than surfacing later as an infinite or NaN price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "openapi",
    derive(utoipa::ToSchema),
    schema(value_type = u32)
)]
pub struct SampleCount(NonZeroU32);

impl SampleCount {
    /// Creates a `SampleCount` from a raw, possibly signed, count.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::InvalidQuantity`] if `value` is below 1 or above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        u32::try_from(value)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
            .ok_or(QuantityError::InvalidQuantity { given: value })
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// The count as a float, for use as a price divisor.
    pub fn as_f64(self) -> f64 {
        f64::from(self.0.get())
    }
}

impl std::fmt::Display for SampleCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for SampleCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.get())
    }
}

impl<'de> serde::Deserialize<'de> for SampleCount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        SampleCount::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Zone of Inhibition (ZOI) ").expect("valid text");
        assert_eq!(text.as_str(), "Zone of Inhibition (ZOI)");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
    }

    #[test]
    fn sample_count_rejects_zero_and_negative() {
        assert_eq!(
            SampleCount::new(0),
            Err(QuantityError::InvalidQuantity { given: 0 })
        );
        assert_eq!(
            SampleCount::new(-3),
            Err(QuantityError::InvalidQuantity { given: -3 })
        );
        assert!(SampleCount::new(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn sample_count_accepts_positive() {
        let count = SampleCount::new(4).expect("valid count");
        assert_eq!(count.get(), 4);
        assert_eq!(count.as_f64(), 4.0);
    }

    #[test]
    fn sample_count_deserialises_with_validation() {
        let count: SampleCount = serde_json::from_str("2").expect("deserialise");
        assert_eq!(count.get(), 2);

        let err = serde_json::from_str::<SampleCount>("0").expect_err("zero must fail");
        assert!(err.to_string().contains("number of samples"));
    }
}
