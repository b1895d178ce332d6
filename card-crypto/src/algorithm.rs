// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::error::{CardCryptoError, Result},
    ring::digest,
    std::{
        convert::TryFrom,
        fmt::{Display, Formatter},
    },
};

/// SHA-1 digest algorithm.
///
/// 1.3.14.3.2.26
pub const OID_SHA1: &str = "1.3.14.3.2.26";

/// SHA-256 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: &str = "2.16.840.1.101.3.4.2.1";

/// SHA-384 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.2
pub const OID_SHA384: &str = "2.16.840.1.101.3.4.2.2";

/// SHA-512 digest algorithm.
///
/// 2.16.840.1.101.3.4.2.3
pub const OID_SHA512: &str = "2.16.840.1.101.3.4.2.3";

/// RSA encryption.
///
/// 1.2.840.113549.1.1.1
pub const OID_RSA: &str = "1.2.840.113549.1.1.1";

/// SHA-1 with RSA encryption.
///
/// 1.2.840.113549.1.1.5
pub const OID_SHA1_RSA: &str = "1.2.840.113549.1.1.5";

/// SHA-256 with RSA encryption.
///
/// 1.2.840.113549.1.1.11
pub const OID_SHA256_RSA: &str = "1.2.840.113549.1.1.11";

/// SHA-384 with RSA encryption.
///
/// 1.2.840.113549.1.1.12
pub const OID_SHA384_RSA: &str = "1.2.840.113549.1.1.12";

/// SHA-512 with RSA encryption.
///
/// 1.2.840.113549.1.1.13
pub const OID_SHA512_RSA: &str = "1.2.840.113549.1.1.13";

/// A hashing algorithm used for digesting data.
///
/// Instances can be converted to and from dotted OIDs and into a
/// [digest::Context] capable of computing digests.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1.
    ///
    /// Corresponds to OID 1.3.14.3.2.26.
    Sha1,
    /// SHA-256.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.1.
    Sha256,
    /// SHA-384.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.2.
    Sha384,
    /// SHA-512.
    ///
    /// Corresponds to OID 2.16.840.1.101.3.4.2.3.
    Sha512,
}

impl TryFrom<&str> for DigestAlgorithm {
    type Error = CardCryptoError;

    fn try_from(oid: &str) -> Result<Self> {
        match oid {
            OID_SHA1 => Ok(Self::Sha1),
            OID_SHA256 => Ok(Self::Sha256),
            OID_SHA384 => Ok(Self::Sha384),
            OID_SHA512 => Ok(Self::Sha512),
            _ => Err(CardCryptoError::UnsupportedDigestAlgorithm(oid.to_string())),
        }
    }
}

impl From<DigestAlgorithm> for digest::Context {
    fn from(alg: DigestAlgorithm) -> Self {
        digest::Context::new(alg.ring_algorithm())
    }
}

impl DigestAlgorithm {
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Sha1 => OID_SHA1,
            Self::Sha256 => OID_SHA256,
            Self::Sha384 => OID_SHA384,
            Self::Sha512 => OID_SHA512,
        }
    }

    fn ring_algorithm(&self) -> &'static digest::Algorithm {
        match self {
            Self::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => &digest::SHA256,
            Self::Sha384 => &digest::SHA384,
            Self::Sha512 => &digest::SHA512,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Size of a digest in bytes.
    pub fn output_len(&self) -> usize {
        self.ring_algorithm().output_len
    }

    /// Obtain an object that can be used to digest content using this algorithm.
    pub fn digester(&self) -> digest::Context {
        digest::Context::from(*self)
    }

    /// Digest `data` in one shot.
    pub fn digest_data(&self, data: &[u8]) -> Vec<u8> {
        digest::digest(self.ring_algorithm(), data).as_ref().to_vec()
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An algorithm used to digitally sign content.
///
/// Only the PKCS#1 v1.5 RSA family is understood.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignatureAlgorithm {
    /// SHA-1 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.5.
    Sha1Rsa,
    /// SHA-256 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.11.
    Sha256Rsa,
    /// SHA-384 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.12.
    Sha384Rsa,
    /// SHA-512 with RSA encryption.
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.13.
    Sha512Rsa,
}

impl TryFrom<&str> for SignatureAlgorithm {
    type Error = CardCryptoError;

    fn try_from(oid: &str) -> Result<Self> {
        match oid {
            OID_SHA1_RSA => Ok(Self::Sha1Rsa),
            OID_SHA256_RSA => Ok(Self::Sha256Rsa),
            OID_SHA384_RSA => Ok(Self::Sha384Rsa),
            OID_SHA512_RSA => Ok(Self::Sha512Rsa),
            _ => Err(CardCryptoError::UnsupportedSignatureAlgorithm(
                oid.to_string(),
            )),
        }
    }
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Sha1Rsa => OID_SHA1_RSA,
            Self::Sha256Rsa => OID_SHA256_RSA,
            Self::Sha384Rsa => OID_SHA384_RSA,
            Self::Sha512Rsa => OID_SHA512_RSA,
        }
    }

    /// The digest computed over the message before it is signed.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Sha1Rsa => DigestAlgorithm::Sha1,
            Self::Sha256Rsa => DigestAlgorithm::Sha256,
            Self::Sha384Rsa => DigestAlgorithm::Sha384,
            Self::Sha512Rsa => DigestAlgorithm::Sha512,
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sha1Rsa => "sha1WithRSAEncryption",
            Self::Sha256Rsa => "sha256WithRSAEncryption",
            Self::Sha384Rsa => "sha384WithRSAEncryption",
            Self::Sha512Rsa => "sha512WithRSAEncryption",
        })
    }
}

/// Cryptographic algorithm of a subject public key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyAlgorithm {
    /// RSA
    ///
    /// Corresponds to OID 1.2.840.113549.1.1.1.
    Rsa,
}

impl TryFrom<&str> for KeyAlgorithm {
    type Error = CardCryptoError;

    fn try_from(oid: &str) -> Result<Self> {
        match oid {
            OID_RSA => Ok(Self::Rsa),
            _ => Err(CardCryptoError::UnsupportedKeyAlgorithm(oid.to_string())),
        }
    }
}

impl KeyAlgorithm {
    pub fn oid(&self) -> &'static str {
        match self {
            Self::Rsa => OID_RSA,
        }
    }

    /// Obtain the default signature algorithm for this key algorithm.
    pub fn default_signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Rsa => SignatureAlgorithm::Sha256Rsa,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn oid_mapping() -> Result<()> {
        for alg in [
            SignatureAlgorithm::Sha1Rsa,
            SignatureAlgorithm::Sha256Rsa,
            SignatureAlgorithm::Sha384Rsa,
            SignatureAlgorithm::Sha512Rsa,
        ] {
            assert_eq!(SignatureAlgorithm::try_from(alg.oid())?, alg);
            let digest = alg.digest_algorithm();
            assert_eq!(DigestAlgorithm::try_from(digest.oid())?, digest);
        }

        assert_eq!(KeyAlgorithm::try_from(OID_RSA)?, KeyAlgorithm::Rsa);
        assert!(matches!(
            KeyAlgorithm::try_from("1.2.840.10045.2.1"),
            Err(CardCryptoError::UnsupportedKeyAlgorithm(_))
        ));
        assert!(matches!(
            SignatureAlgorithm::try_from("1.2.840.10045.4.3.2"),
            Err(CardCryptoError::UnsupportedSignatureAlgorithm(_))
        ));

        Ok(())
    }

    #[test]
    fn digests() {
        assert_eq!(DigestAlgorithm::Sha1.output_len(), 20);
        assert_eq!(DigestAlgorithm::Sha512.output_len(), 64);
        assert_eq!(
            hex::encode(DigestAlgorithm::Sha256.digest_data(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let mut digester = DigestAlgorithm::Sha256.digester();
        digester.update(b"a");
        digester.update(b"bc");
        assert_eq!(
            digester.finish().as_ref(),
            DigestAlgorithm::Sha256.digest_data(b"abc").as_slice()
        );
        assert_eq!(
            SignatureAlgorithm::Sha256Rsa.to_string(),
            "sha256WithRSAEncryption"
        );
    }
}
