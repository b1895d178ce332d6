// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PKCS#1 v1.5 signatures over the software RSA layer.

use {
    crate::{
        algorithm::SignatureAlgorithm,
        error::{CardCryptoError, Result},
        rfc3447::encode_digest_info,
        rsa::{RsaPrivateKey, RsaPublicKey},
    },
    log::debug,
    signature::{Signature as SignatureTrait, Signer, Verifier},
};

#[derive(Clone, Debug)]
pub struct Signature(Vec<u8>);

impl From<Vec<u8>> for Signature {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<Signature> for Vec<u8> {
    fn from(v: Signature) -> Vec<u8> {
        v.0
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl SignatureTrait for Signature {
    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, signature::Error> {
        Ok(Self(bytes.to_vec()))
    }
}

fn check_digest_length(algorithm: SignatureAlgorithm, digest: &[u8]) -> Result<()> {
    let digest_algorithm = algorithm.digest_algorithm();

    if digest.len() != digest_algorithm.output_len() {
        return Err(CardCryptoError::DigestLength {
            algorithm: digest_algorithm.name(),
            expected: digest_algorithm.output_len(),
            actual: digest.len(),
        });
    }

    Ok(())
}

/// Produces PKCS#1 v1.5 signatures with an in-memory RSA private key.
///
/// The message digest is wrapped in a `DigestInfo` and sealed in a type 1
/// block.
#[derive(Clone, Debug)]
pub struct RsaSigner {
    key: RsaPrivateKey,
    algorithm: SignatureAlgorithm,
}

impl RsaSigner {
    pub fn new(key: RsaPrivateKey, algorithm: SignatureAlgorithm) -> Self {
        Self { key, algorithm }
    }

    /// Construct an instance from a PEM encoded PKCS#1 or PKCS#8 private key.
    pub fn from_pem(data: impl AsRef<[u8]>, algorithm: SignatureAlgorithm) -> Result<Self> {
        Ok(Self::new(RsaPrivateKey::from_pem(data)?, algorithm))
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.public_key()
    }

    /// Sign an already computed message digest.
    pub fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>> {
        check_digest_length(self.algorithm, digest)?;

        let info = encode_digest_info(self.algorithm.digest_algorithm(), digest)?;
        self.key.encrypt(&info)
    }
}

impl Signer<Signature> for RsaSigner {
    fn try_sign(&self, msg: &[u8]) -> std::result::Result<Signature, signature::Error> {
        let digest = self.algorithm.digest_algorithm().digest_data(msg);

        self.sign_digest(&digest)
            .map(Signature::from)
            .map_err(|e| {
                debug!("{} signing failed: {}", self.algorithm, e);
                signature::Error::new()
            })
    }
}

/// Verifies PKCS#1 v1.5 signatures against an RSA public key.
#[derive(Clone, Debug)]
pub struct RsaVerifier {
    key: RsaPublicKey,
    algorithm: SignatureAlgorithm,
}

impl RsaVerifier {
    pub fn new(key: RsaPublicKey, algorithm: SignatureAlgorithm) -> Self {
        Self { key, algorithm }
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Verify `signature` over an already computed message digest.
    ///
    /// The signature must be exactly as long as the modulus.
    pub fn verify_digest(&self, digest: &[u8], signature: &[u8]) -> Result<()> {
        check_digest_length(self.algorithm, digest)?;

        if signature.len() != self.key.modulus_len() {
            return Err(CardCryptoError::RsaInputLength {
                actual: signature.len(),
                modulus: self.key.modulus_len(),
            });
        }

        let recovered = self.key.decrypt(signature).map_err(|e| match e {
            CardCryptoError::RsaDataOutOfRange
            | CardCryptoError::RsaBlockType { .. }
            | CardCryptoError::RsaMissingSeparator
            | CardCryptoError::RsaPaddingTooShort => {
                debug!("{} signature does not unwrap: {}", self.algorithm, e);
                CardCryptoError::SignatureVerificationFailed
            }
            e => e,
        })?;
        let expected = encode_digest_info(self.algorithm.digest_algorithm(), digest)?;

        ring::constant_time::verify_slices_are_equal(&recovered, &expected)
            .map_err(|_| CardCryptoError::SignatureVerificationFailed)
    }

    /// Verify `signature` over `message`.
    pub fn verify_message(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let digest = self.algorithm.digest_algorithm().digest_data(message);

        self.verify_digest(&digest, signature)
    }
}

impl Verifier<Signature> for RsaVerifier {
    fn verify(&self, msg: &[u8], signature: &Signature) -> std::result::Result<(), signature::Error> {
        self.verify_message(msg, signature.as_ref()).map_err(|e| {
            debug!("{} verification failed: {}", self.algorithm, e);
            signature::Error::new()
        })
    }
}
