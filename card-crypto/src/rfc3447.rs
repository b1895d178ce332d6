// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined in RFC 3447, plus the PKCS#8 wrapper around them.

use {
    crate::{
        algorithm::{DigestAlgorithm, KeyAlgorithm},
        ber::{tag, BerOctet},
        error::{CardCryptoError, Result},
        rsa::{RsaPrivateKey, RsaPublicKey},
    },
    bytes::Bytes,
    log::debug,
    std::convert::TryFrom,
    zeroize::Zeroizing,
};

/// PEM tag of a PKCS#1 private key.
pub const PEM_RSA_PRIVATE_KEY: &str = "RSA PRIVATE KEY";

/// PEM tag of a PKCS#8 private key.
pub const PEM_PRIVATE_KEY: &str = "PRIVATE KEY";

/// Unsigned big-endian value of an INTEGER element.
///
/// A leading sign byte is removed. Negative values are rejected.
fn unsigned_integer<'a>(octet: &'a BerOctet, name: &'static str) -> Result<&'a [u8]> {
    if !octet.is_universal(tag::INTEGER) {
        return Err(CardCryptoError::RsaKeyComponent(name));
    }

    match octet.data()? {
        [] => Err(CardCryptoError::RsaKeyComponent(name)),
        [first, ..] if first & 0x80 != 0 => Err(CardCryptoError::RsaKeyComponent(name)),
        [0, rest @ ..] => Ok(rest),
        data => Ok(data),
    }
}

/// Decode private key material.
///
/// The tree shares one copy of `data`, which is wiped when the last element
/// referencing it is dropped.
fn decode_secret(data: &[u8]) -> Result<BerOctet> {
    decode_owned(Zeroizing::new(data.to_vec()))
}

fn decode_owned<T>(owner: T) -> Result<BerOctet>
where
    T: AsRef<[u8]> + Send + 'static,
{
    BerOctet::decode(Bytes::from_owner(owner))
}

fn expect_sequence<'a>(octet: &'a BerOctet, expected: &'static str) -> Result<&'a [BerOctet]> {
    if !octet.is_universal(tag::SEQUENCE) {
        return Err(CardCryptoError::BerUnexpectedTag {
            expected,
            actual: octet.describe(),
        });
    }

    octet.children()
}

/// RSA private key.
///
/// ```asn.1
/// RSAPrivateKey ::= SEQUENCE {
///   version           Version,
///   modulus           INTEGER,  -- n
///   publicExponent    INTEGER,  -- e
///   privateExponent   INTEGER,  -- d
///   prime1            INTEGER,  -- p
///   prime2            INTEGER,  -- q
///   exponent1         INTEGER,  -- d mod (p-1)
///   exponent2         INTEGER,  -- d mod (q-1)
///   coefficient       INTEGER,  -- (inverse of q) mod p
///   otherPrimeInfos   OtherPrimeInfos OPTIONAL
/// }
/// ```
///
/// Only two-prime keys (version 0) are supported.
pub fn parse_rsa_private_key(data: &[u8]) -> Result<RsaPrivateKey> {
    let root = decode_secret(data)?;
    let fields = expect_sequence(&root, "RSAPrivateKey SEQUENCE")?;

    if fields.len() < 9 {
        return Err(CardCryptoError::RsaKeyComponent("RSAPrivateKey"));
    }

    if !unsigned_integer(&fields[0], "version")?.is_empty() {
        return Err(CardCryptoError::RsaKeyComponent("version"));
    }

    RsaPrivateKey::new(
        unsigned_integer(&fields[1], "modulus")?,
        unsigned_integer(&fields[2], "publicExponent")?,
        unsigned_integer(&fields[3], "privateExponent")?,
        (
            unsigned_integer(&fields[4], "prime1")?,
            unsigned_integer(&fields[5], "prime2")?,
        ),
        (
            unsigned_integer(&fields[6], "exponent1")?,
            unsigned_integer(&fields[7], "exponent2")?,
        ),
        unsigned_integer(&fields[8], "coefficient")?,
    )
}

/// Encode a private key as a PKCS#1 `RSAPrivateKey`.
pub fn encode_rsa_private_key(key: &RsaPrivateKey) -> Vec<u8> {
    let (p, q) = key.primes();
    let (dp, dq) = key.prime_exponents();

    BerOctet::sequence(vec![
        BerOctet::integer(&[]),
        BerOctet::integer(key.modulus()),
        BerOctet::integer(key.public_exponent()),
        BerOctet::integer(key.private_exponent()),
        BerOctet::integer(p),
        BerOctet::integer(q),
        BerOctet::integer(dp),
        BerOctet::integer(dq),
        BerOctet::integer(key.coefficient()),
    ])
    .octet()
    .to_vec()
}

/// RSA public key.
///
/// ```asn.1
/// RSAPublicKey ::= SEQUENCE {
///     modulus           INTEGER,  -- n
///     publicExponent    INTEGER   -- e
/// }
/// ```
pub fn parse_rsa_public_key(data: &[u8]) -> Result<RsaPublicKey> {
    let root = BerOctet::decode(data.to_vec())?;

    match expect_sequence(&root, "RSAPublicKey SEQUENCE")? {
        [modulus, exponent] => RsaPublicKey::new(
            unsigned_integer(modulus, "modulus")?,
            unsigned_integer(exponent, "publicExponent")?,
        ),
        _ => Err(CardCryptoError::RsaKeyComponent("RSAPublicKey")),
    }
}

/// Encode a public key as a PKCS#1 `RSAPublicKey`.
pub fn encode_rsa_public_key(key: &RsaPublicKey) -> Vec<u8> {
    BerOctet::sequence(vec![
        BerOctet::integer(key.modulus()),
        BerOctet::integer(key.exponent()),
    ])
    .octet()
    .to_vec()
}

/// Parse a PKCS#8 private key holding an RSA key.
///
/// ```asn.1
/// PrivateKeyInfo ::= SEQUENCE {
///   version                   Version,
///   privateKeyAlgorithm       AlgorithmIdentifier,
///   privateKey                OCTET STRING,
///   attributes           [0]  IMPLICIT Attributes OPTIONAL }
/// ```
pub fn parse_private_key_info(data: &[u8]) -> Result<RsaPrivateKey> {
    let root = decode_secret(data)?;
    let fields = expect_sequence(&root, "PrivateKeyInfo SEQUENCE")?;

    let (algorithm, private_key) = match fields {
        [_, algorithm, private_key, ..] => (algorithm, private_key),
        _ => return Err(CardCryptoError::RsaKeyComponent("PrivateKeyInfo")),
    };

    let oid = expect_sequence(algorithm, "AlgorithmIdentifier SEQUENCE")?
        .first()
        .ok_or(CardCryptoError::RsaKeyComponent("privateKeyAlgorithm"))?
        .object_id()?;

    let algorithm = KeyAlgorithm::try_from(oid.as_str())?;
    if !matches!(algorithm, KeyAlgorithm::Rsa) {
        return Err(CardCryptoError::UnsupportedKeyAlgorithm(algorithm.oid().to_string()));
    }

    if !private_key.is_universal(tag::OCTET_STRING) {
        return Err(CardCryptoError::BerUnexpectedTag {
            expected: "privateKey OCTET STRING",
            actual: private_key.describe(),
        });
    }

    parse_rsa_private_key(private_key.data()?)
}

/// Parse a PEM encoded private key in either PKCS#1 or PKCS#8 form.
pub fn parse_private_key_pem(data: &[u8]) -> Result<RsaPrivateKey> {
    let pem::Pem { tag, contents, .. } = pem::parse(data)?;
    let contents = Zeroizing::new(contents);

    match tag.as_str() {
        PEM_RSA_PRIVATE_KEY => parse_rsa_private_key(&contents),
        PEM_PRIVATE_KEY => parse_private_key_info(&contents),
        other => {
            debug!("refusing PEM document tagged {:?} as a private key", other);
            Err(CardCryptoError::PemUnexpectedTag(other.to_string()))
        }
    }
}

/// Digest information.
///
/// ```asn.1
/// DigestInfo ::= SEQUENCE {
///     digestAlgorithm DigestAlgorithm,
///     digest OCTET STRING
/// }
/// ```
///
/// This is the payload of a PKCS#1 v1.5 signature block.
pub fn encode_digest_info(algorithm: DigestAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
    Ok(BerOctet::sequence(vec![
        BerOctet::sequence(vec![
            BerOctet::object_identifier(algorithm.oid())?,
            BerOctet::null(),
        ]),
        BerOctet::octet_string(digest.to_vec()),
    ])
    .octet()
    .to_vec())
}

/// Decode a `DigestInfo` into its algorithm and digest.
pub fn parse_digest_info(data: &[u8]) -> Result<(DigestAlgorithm, Vec<u8>)> {
    let root = BerOctet::decode(data.to_vec())?;

    let (algorithm, digest) = match expect_sequence(&root, "DigestInfo SEQUENCE")? {
        [algorithm, digest] => (algorithm, digest),
        _ => return Err(CardCryptoError::CertificateFormat("DigestInfo")),
    };

    let oid = expect_sequence(algorithm, "AlgorithmIdentifier SEQUENCE")?
        .first()
        .ok_or(CardCryptoError::CertificateFormat("digestAlgorithm"))?
        .object_id()?;

    if !digest.is_universal(tag::OCTET_STRING) {
        return Err(CardCryptoError::BerUnexpectedTag {
            expected: "digest OCTET STRING",
            actual: digest.describe(),
        });
    }

    Ok((
        DigestAlgorithm::try_from(oid.as_str())?,
        digest.data()?.to_vec(),
    ))
}
