// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {
    std::fmt::{Display, Formatter},
    thiserror::Error,
};

/// Broad classification of a [CardCryptoError].
///
/// Callers that only need to decide how to react (reject the input, retry
/// with a larger buffer, treat as a hard policy failure) can match on this
/// instead of on individual variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Input bytes are structurally malformed.
    Format,
    /// A length or value precondition was violated.
    Range,
    /// Well-formed input that violates a required convention.
    Policy,
    /// Failure of something outside the input data, such as the system RNG.
    Environment,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Format => "format",
            Self::Range => "range",
            Self::Policy => "policy",
            Self::Environment => "environment",
        })
    }
}

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum CardCryptoError {
    #[error("BER data truncated while reading {0}")]
    BerTruncated(&'static str),

    #[error("BER tag number encoding is unterminated")]
    BerUnterminatedTag,

    #[error("BER tag number exceeds the supported maximum of {0}")]
    BerTagOverflow(u32),

    #[error("BER length uses {0} length octets; at most 4 are supported")]
    BerLengthOverflow(usize),

    #[error("BER indefinite length encoding is not supported")]
    BerUnexpectedIndefiniteLength,

    #[error("BER content length {declared} exceeds the {available} bytes available")]
    BerLengthExceedsBuffer { declared: usize, available: usize },

    #[error("{0} trailing bytes after BER element")]
    BerTrailingData(usize),

    #[error("BER nesting exceeds the maximum depth of {0}")]
    BerNestingTooDeep(usize),

    #[error("operation requires a primitive BER element")]
    BerNotPrimitive,

    #[error("operation requires a constructed BER element")]
    BerNotConstructed,

    #[error("expected {expected}; got {actual}")]
    BerUnexpectedTag {
        expected: &'static str,
        actual: String,
    },

    #[error("malformed object identifier: {0}")]
    OidMalformed(String),

    #[error("object identifier sub-identifier overflows 64 bits")]
    OidOverflow,

    #[error("malformed time value: {0}")]
    TimeMalformed(String),

    #[error("year {0} is outside the encodable range 1950-9999")]
    TimeYearOutOfRange(u32),

    #[error("string value is not valid {0}")]
    StringDecode(&'static str),

    #[error("certificate format error: {0}")]
    CertificateFormat(&'static str),

    #[error("certificate extension {oid} appears {count} times; expected exactly one")]
    ExtensionCardinality { oid: String, count: usize },

    #[error("unsupported public key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedSignatureAlgorithm(String),

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("{algorithm} digest must be {expected} bytes, got {actual}")]
    DigestLength {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("PEM decoding error: {0}")]
    Pem(#[from] pem::PemError),

    #[error("PEM tag {0} is not supported here")]
    PemUnexpectedTag(String),

    #[error("RSA key component {0} is invalid")]
    RsaKeyComponent(&'static str),

    #[error("RSA modulus of {0} bits exceeds the supported maximum")]
    RsaModulusTooLarge(usize),

    #[error("RSA input of {actual} bytes is longer than the {modulus}-byte modulus")]
    RsaInputLength { actual: usize, modulus: usize },

    #[error("message of {message} bytes does not fit a {modulus}-byte modulus with PKCS#1 padding")]
    RsaMessageTooLong { message: usize, modulus: usize },

    #[error("output buffer of {actual} bytes is smaller than the required {required}")]
    RsaOutputTooSmall { actual: usize, required: usize },

    #[error("RSA input is not less than the modulus")]
    RsaDataOutOfRange,

    #[error("PKCS#1 block type {actual} does not match expected type {expected}")]
    RsaBlockType { expected: u8, actual: u8 },

    #[error("PKCS#1 block lacks a padding separator")]
    RsaMissingSeparator,

    #[error("PKCS#1 padding is shorter than the 8 byte minimum")]
    RsaPaddingTooShort,

    #[error("random generator has not received enough seed material; {0} more bytes needed")]
    RandomNotSeeded(usize),

    #[error("system random number generator failure")]
    RandomFailure,
}

impl CardCryptoError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BerTruncated(_)
            | Self::BerUnterminatedTag
            | Self::BerUnexpectedIndefiniteLength
            | Self::BerLengthExceedsBuffer { .. }
            | Self::BerTrailingData(_)
            | Self::BerUnexpectedTag { .. }
            | Self::OidMalformed(_)
            | Self::TimeMalformed(_)
            | Self::StringDecode(_)
            | Self::CertificateFormat(_)
            | Self::Pem(_)
            | Self::PemUnexpectedTag(_)
            | Self::RsaKeyComponent(_)
            | Self::BerTagOverflow(_)
            | Self::BerLengthOverflow(_)
            | Self::BerNestingTooDeep(_)
            | Self::OidOverflow
            | Self::RsaMissingSeparator
            | Self::RsaPaddingTooShort => ErrorKind::Format,

            Self::BerNotPrimitive
            | Self::BerNotConstructed
            | Self::TimeYearOutOfRange(_)
            | Self::RsaModulusTooLarge(_)
            | Self::RsaInputLength { .. }
            | Self::RsaMessageTooLong { .. }
            | Self::RsaOutputTooSmall { .. }
            | Self::RsaDataOutOfRange
            | Self::DigestLength { .. } => ErrorKind::Range,

            Self::ExtensionCardinality { .. }
            | Self::UnsupportedKeyAlgorithm(_)
            | Self::UnsupportedSignatureAlgorithm(_)
            | Self::UnsupportedDigestAlgorithm(_)
            | Self::SignatureVerificationFailed
            | Self::RsaBlockType { .. } => ErrorKind::Policy,

            Self::RandomNotSeeded(_) | Self::RandomFailure => ErrorKind::Environment,
        }
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, CardCryptoError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(CardCryptoError::RsaDataOutOfRange.kind(), ErrorKind::Range);
        assert_eq!(
            CardCryptoError::RsaBlockType {
                expected: 2,
                actual: 1
            }
            .kind(),
            ErrorKind::Policy
        );
        assert_eq!(
            CardCryptoError::BerTruncated("length").kind(),
            ErrorKind::Format
        );
        assert_eq!(
            CardCryptoError::ExtensionCardinality {
                oid: "2.5.29.15".into(),
                count: 0
            }
            .kind(),
            ErrorKind::Policy
        );
    }

    #[test]
    fn hostile_encodings_are_format_errors() {
        for err in [
            CardCryptoError::BerTagOverflow(4),
            CardCryptoError::BerLengthOverflow(5),
            CardCryptoError::BerNestingTooDeep(65),
            CardCryptoError::OidOverflow,
            CardCryptoError::RsaMissingSeparator,
            CardCryptoError::RsaPaddingTooShort,
        ] {
            assert_eq!(err.kind(), ErrorKind::Format, "{}", err);
        }

        for err in [
            CardCryptoError::RsaOutputTooSmall {
                actual: 4,
                required: 14,
            },
            CardCryptoError::RsaMessageTooLong {
                message: 118,
                modulus: 128,
            },
        ] {
            assert_eq!(err.kind(), ErrorKind::Range, "{}", err);
        }
    }

    #[test]
    fn messages_name_the_stage() {
        assert_eq!(
            CardCryptoError::BerTruncated("identifier").to_string(),
            "BER data truncated while reading identifier"
        );
        assert_eq!(
            CardCryptoError::CertificateFormat("validity").to_string(),
            "certificate format error: validity"
        );
    }
}
