// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Certificate extensions defined in RFC 5280.
//!
//! ```ASN.1
//! Extensions  ::=  SEQUENCE SIZE (1..MAX) OF Extension
//!
//! Extension  ::=  SEQUENCE  {
//!      extnID      OBJECT IDENTIFIER,
//!      critical    BOOLEAN DEFAULT FALSE,
//!      extnValue   OCTET STRING
//!                  -- contains the DER encoding of an ASN.1 value
//!                  -- corresponding to the extension type identified
//!                  -- by extnID
//!      }
//! ```

use {
    crate::{
        ber::{tag, BerOctet},
        error::{CardCryptoError, Result},
    },
    bitflags::bitflags,
};

/// Subject Key Identifier
///
/// 2.5.29.14
pub const OID_SUBJECT_KEY_IDENTIFIER: &str = "2.5.29.14";

/// Key Usage
///
/// 2.5.29.15
pub const OID_KEY_USAGE: &str = "2.5.29.15";

/// Subject Alternative Name
///
/// 2.5.29.17
pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";

/// Basic Constraints
///
/// 2.5.29.19
pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";

/// Authority Key Identifier
///
/// 2.5.29.35
pub const OID_AUTHORITY_KEY_IDENTIFIER: &str = "2.5.29.35";

/// Extended Key Usage
///
/// 2.5.29.37
pub const OID_EXTENDED_KEY_USAGE: &str = "2.5.29.37";

/// TLS WWW server authentication
///
/// 1.3.6.1.5.5.7.3.1
pub const OID_EKU_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";

/// TLS WWW client authentication
///
/// 1.3.6.1.5.5.7.3.2
pub const OID_EKU_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";

/// Signing of downloadable executable code
///
/// 1.3.6.1.5.5.7.3.3
pub const OID_EKU_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";

/// Email protection
///
/// 1.3.6.1.5.5.7.3.4
pub const OID_EKU_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";

/// Binding the hash of an object to a time
///
/// 1.3.6.1.5.5.7.3.8
pub const OID_EKU_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";

/// Signing OCSP responses
///
/// 1.3.6.1.5.5.7.3.9
pub const OID_EKU_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";

/// Microsoft smart card logon
///
/// 1.3.6.1.4.1.311.20.2.2
pub const OID_EKU_SMARTCARD_LOGON: &str = "1.3.6.1.4.1.311.20.2.2";

/// Name of a well-known extended key usage purpose.
pub fn extended_key_usage_name(oid: &str) -> Option<&'static str> {
    Some(match oid {
        OID_EKU_SERVER_AUTH => "serverAuth",
        OID_EKU_CLIENT_AUTH => "clientAuth",
        OID_EKU_CODE_SIGNING => "codeSigning",
        OID_EKU_EMAIL_PROTECTION => "emailProtection",
        OID_EKU_TIME_STAMPING => "timeStamping",
        OID_EKU_OCSP_SIGNING => "OCSPSigning",
        OID_EKU_SMARTCARD_LOGON => "smartcardLogon",
        _ => return None,
    })
}

bitflags! {
    /// Key usage flags, left-justified in a 32-bit word.
    ///
    /// Bit 0 of the ASN.1 BIT STRING (digitalSignature) is the most
    /// significant bit of the word.
    ///
    /// ```ASN.1
    /// KeyUsage ::= BIT STRING {
    ///      digitalSignature        (0),
    ///      nonRepudiation          (1),
    ///      keyEncipherment         (2),
    ///      dataEncipherment        (3),
    ///      keyAgreement            (4),
    ///      keyCertSign             (5),
    ///      cRLSign                 (6),
    ///      encipherOnly            (7),
    ///      decipherOnly            (8) }
    /// ```
    pub struct KeyUsage: u32 {
        const DIGITAL_SIGNATURE = 0x8000_0000;
        const NON_REPUDIATION = 0x4000_0000;
        const KEY_ENCIPHERMENT = 0x2000_0000;
        const DATA_ENCIPHERMENT = 0x1000_0000;
        const KEY_AGREEMENT = 0x0800_0000;
        const KEY_CERT_SIGN = 0x0400_0000;
        const CRL_SIGN = 0x0200_0000;
        const ENCIPHER_ONLY = 0x0100_0000;
        const DECIPHER_ONLY = 0x0080_0000;
    }
}

/// Pack BIT STRING content into a left-justified word.
///
/// The first content byte is the count of unused trailing bits, which are
/// cleared. At most 4 bytes of bits are packed; later ones are ignored.
pub fn bit_string_word(content: &[u8]) -> Result<u32> {
    let (unused, bits) = content
        .split_first()
        .ok_or(CardCryptoError::CertificateFormat("BIT STRING"))?;

    if *unused > 7 || (bits.is_empty() && *unused != 0) {
        return Err(CardCryptoError::CertificateFormat("BIT STRING"));
    }

    let mut word = 0u32;
    for (i, b) in bits.iter().take(4).enumerate() {
        let b = if i == bits.len() - 1 {
            b & (0xffu8 << unused)
        } else {
            *b
        };

        word |= (b as u32) << (24 - 8 * i);
    }

    Ok(word)
}

/// Find every Extension with the given extnID below `extensions`.
pub fn find_extensions<'a>(extensions: &'a BerOctet, oid: &str) -> Result<Vec<&'a BerOctet>> {
    Ok(extensions
        .search_oid(oid)?
        .into_iter()
        .filter(|ext| ext.is_universal(tag::SEQUENCE))
        .collect())
}

/// Find the single Extension with the given extnID.
///
/// Returns None when it is absent and an error when it repeats.
pub fn find_unique_extension<'a>(
    extensions: &'a BerOctet,
    oid: &str,
) -> Result<Option<&'a BerOctet>> {
    let mut found = find_extensions(extensions, oid)?;

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(CardCryptoError::ExtensionCardinality {
            oid: oid.to_string(),
            count,
        }),
    }
}

/// Whether an Extension is marked critical.
pub fn extension_is_critical(extension: &BerOctet) -> Result<bool> {
    let children = extension.children()?;

    Ok(match children {
        [_, critical, _] if critical.is_universal(tag::BOOLEAN) => {
            critical.data()?.first().map_or(false, |b| *b != 0)
        }
        _ => false,
    })
}

/// Decode the value carried in an Extension's extnValue OCTET STRING.
pub fn extension_value(extension: &BerOctet) -> Result<BerOctet> {
    let value = extension
        .children()?
        .last()
        .filter(|v| v.is_universal(tag::OCTET_STRING) && !v.is_constructed())
        .ok_or(CardCryptoError::CertificateFormat("extnValue"))?;

    BerOctet::decode(value.data_bytes()?)
}

/// The cA flag of a BasicConstraints value.
///
/// ```ASN.1
/// BasicConstraints ::= SEQUENCE {
///      cA                      BOOLEAN DEFAULT FALSE,
///      pathLenConstraint       INTEGER (0..MAX) OPTIONAL }
/// ```
pub fn basic_constraints_ca(value: &BerOctet) -> Result<bool> {
    Ok(match value.children()?.first() {
        Some(ca) if ca.is_universal(tag::BOOLEAN) => ca.data()?.first().map_or(false, |b| *b != 0),
        _ => false,
    })
}

/// The purposes listed in an ExtKeyUsageSyntax value, dotted.
pub fn extended_key_usage_oids(value: &BerOctet) -> Result<Vec<String>> {
    value.children()?.iter().map(|oid| oid.object_id()).collect()
}
