//! Response body read limits.

use derive_more::{Display, Error};

/// Read limit applied by [`Api`](crate::Api) unless configured otherwise.
pub const DEFAULT_READ_LIMIT: u64 = 1 << 16;

/// How many bytes of a response body handlers are allowed to read.
///
/// Converting from an `i64` follows the usual convention: a negative number
/// disables the limit, zero defers to the declared content length and a
/// positive number is a byte cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReadLimit {
    /// No limit.
    Unlimited,
    /// Use the declared content length, or read nothing if none was declared.
    #[default]
    ContentLength,
    /// At most this many bytes. A response declaring more is rejected.
    Bytes(u64),
}

/// A response declared a content length above the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[display("content length {content_length} is above read limit {limit}")]
pub struct LimitExceeded {
    /// Declared content length.
    pub content_length: u64,
    /// Configured limit.
    pub limit: u64,
}

impl ReadLimit {
    /// Byte cap to apply to a body given its declared content length.
    ///
    /// `Ok(None)` means the body is read without limit.
    ///
    /// # Errors
    ///
    /// Returns [`LimitExceeded`] when a byte cap is below the declared length.
    pub const fn effective(self, declared: Option<u64>) -> Result<Option<u64>, LimitExceeded> {
        match (self, declared) {
            (Self::Unlimited, _) => Ok(None),
            (Self::ContentLength, None) => Ok(Some(0)),
            (Self::Bytes(limit), None) => Ok(Some(limit)),
            (Self::ContentLength, Some(content_length)) => Ok(Some(content_length)),
            (Self::Bytes(limit), Some(content_length)) if limit < content_length => {
                Err(LimitExceeded {
                    content_length,
                    limit,
                })
            }
            (Self::Bytes(_), Some(content_length)) => Ok(Some(content_length)),
        }
    }
}

impl From<i64> for ReadLimit {
    fn from(value: i64) -> Self {
        match u64::try_from(value) {
            Err(_) => Self::Unlimited,
            Ok(0) => Self::ContentLength,
            Ok(limit) => Self::Bytes(limit),
        }
    }
}

impl From<u64> for ReadLimit {
    fn from(limit: u64) -> Self {
        Self::Bytes(limit)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn from_signed_limit() {
        check!(ReadLimit::from(-1_i64) == ReadLimit::Unlimited);
        check!(ReadLimit::from(0_i64) == ReadLimit::ContentLength);
        check!(ReadLimit::from(20_i64) == ReadLimit::Bytes(20));
        check!(ReadLimit::default() == ReadLimit::ContentLength);
    }

    #[test]
    fn unlimited_ignores_declared_length() {
        check!(ReadLimit::Unlimited.effective(None) == Ok(None));
        check!(ReadLimit::Unlimited.effective(Some(1 << 40)) == Ok(None));
    }

    #[test]
    fn content_length_follows_declaration() {
        check!(ReadLimit::ContentLength.effective(None) == Ok(Some(0)));
        check!(ReadLimit::ContentLength.effective(Some(14)) == Ok(Some(14)));
    }

    #[test]
    fn byte_cap_without_declaration() {
        check!(ReadLimit::Bytes(20).effective(None) == Ok(Some(20)));
    }

    #[test]
    fn byte_cap_within_declaration() {
        check!(ReadLimit::Bytes(20).effective(Some(14)) == Ok(Some(14)));
        check!(ReadLimit::Bytes(14).effective(Some(14)) == Ok(Some(14)));
    }

    #[test]
    fn byte_cap_below_declaration() {
        let_assert!(Err(exceeded) = ReadLimit::Bytes(2).effective(Some(14)));
        check!(exceeded.content_length == 14);
        check!(exceeded.limit == 2);
        check!(exceeded.to_string() == "content length 14 is above read limit 2");
    }
}
