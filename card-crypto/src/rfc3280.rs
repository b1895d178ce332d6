// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Names and directory strings defined in RFC 3280.
//!
//! ```ASN.1
//! Name ::= CHOICE { RDNSequence }
//!
//! RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
//!
//! RelativeDistinguishedName ::= SET OF AttributeTypeAndValue
//!
//! AttributeTypeAndValue ::= SEQUENCE {
//!   type     AttributeType,
//!   value    AttributeValue }
//! ```

use crate::{
    ber::{tag, BerOctet, TagClass},
    error::{CardCryptoError, Result},
    rfc4519::attribute_short_name,
};

/// Transcode big-endian UCS code units of `width` bytes (2 or 4) to UTF-8.
///
/// Two byte units are read as UTF-16, so surrogate pairs are combined.
pub fn ucs_to_utf8(data: &[u8], width: usize) -> Result<String> {
    match width {
        2 => {
            if data.len() % 2 != 0 {
                return Err(CardCryptoError::StringDecode("BMPString"));
            }

            let units = data
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]));

            char::decode_utf16(units)
                .collect::<std::result::Result<String, _>>()
                .map_err(|_| CardCryptoError::StringDecode("BMPString"))
        }
        4 => {
            if data.len() % 4 != 0 {
                return Err(CardCryptoError::StringDecode("UniversalString"));
            }

            data.chunks_exact(4)
                .map(|c| {
                    char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                        .ok_or(CardCryptoError::StringDecode("UniversalString"))
                })
                .collect()
        }
        _ => Err(CardCryptoError::StringDecode("UCS code unit width")),
    }
}

/// Decode a directory string element into UTF-8.
///
/// BMPString, UniversalString and CHARACTER STRING content is transcoded.
/// T61String is read as Latin-1. The ASCII based types and UTF8String are
/// validated as UTF-8.
pub fn directory_string_to_utf8(value: &BerOctet) -> Result<String> {
    let data = value.data()?;

    if value.class() != TagClass::Universal {
        return Err(CardCryptoError::BerUnexpectedTag {
            expected: "directory string",
            actual: value.describe(),
        });
    }

    match value.tag() {
        tag::BMP_STRING => ucs_to_utf8(data, 2),
        tag::UNIVERSAL_STRING | tag::CHARACTER_STRING => ucs_to_utf8(data, 4),
        tag::T61_STRING => Ok(data.iter().map(|b| *b as char).collect()),
        tag::UTF8_STRING
        | tag::PRINTABLE_STRING
        | tag::IA5_STRING
        | tag::NUMERIC_STRING
        | tag::VISIBLE_STRING => String::from_utf8(data.to_vec())
            .map_err(|_| CardCryptoError::StringDecode("UTF-8")),
        _ => Err(CardCryptoError::BerUnexpectedTag {
            expected: "directory string",
            actual: value.describe(),
        }),
    }
}

/// Values of every attribute of type `oid` within a Name, in encoded order.
pub fn name_attribute_values<'a>(name: &'a BerOctet, oid: &str) -> Result<Vec<&'a BerOctet>> {
    name.search_oid_next(oid)
}

/// Render a Name in a one line `CN=Test, O=Example` form.
///
/// Attribute types without a short name are shown dotted. Values that are
/// not directory strings are shown as hex.
pub fn name_to_string(name: &BerOctet) -> Result<String> {
    let mut parts = vec![];

    for rdn in name.children()? {
        for atv in rdn.children()? {
            let (attribute, value) = match atv.children()? {
                [attribute, value, ..] => (attribute, value),
                _ => {
                    return Err(CardCryptoError::CertificateFormat(
                        "AttributeTypeAndValue",
                    ))
                }
            };

            let oid = attribute.object_id()?;
            let key = attribute_short_name(&oid)
                .map(|s| s.to_string())
                .unwrap_or(oid);

            let rendered = match directory_string_to_utf8(value) {
                Ok(s) => s,
                Err(_) => format!("#{}", hex::encode(value.octet())),
            };

            parts.push(format!("{}={}", key, rendered));
        }
    }

    Ok(parts.join(", "))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bmp_string() -> Result<()> {
        assert_eq!(
            ucs_to_utf8(&hex::decode("03a9006d006500670061").unwrap(), 2)?,
            "Ωmega"
        );
        assert_eq!(
            ucs_to_utf8(&hex::decode("d83dde00").unwrap(), 2)?,
            "\u{1f600}"
        );
        assert!(ucs_to_utf8(&[0x00], 2).is_err());
        assert!(ucs_to_utf8(&hex::decode("d83d").unwrap(), 2).is_err());

        Ok(())
    }

    #[test]
    fn universal_string() -> Result<()> {
        assert_eq!(
            ucs_to_utf8(&hex::decode("000000410001f600000000e9").unwrap(), 4)?,
            "A\u{1f600}é"
        );
        // Surrogate code points are not characters.
        assert!(ucs_to_utf8(&hex::decode("0000d800").unwrap(), 4).is_err());
        assert!(ucs_to_utf8(&hex::decode("00110000").unwrap(), 4).is_err());
        assert!(ucs_to_utf8(&[0; 3], 4).is_err());
        assert!(ucs_to_utf8(&[0; 3], 3).is_err());

        Ok(())
    }

    #[test]
    fn directory_strings() -> Result<()> {
        let bmp = BerOctet::new_primitive(
            TagClass::Universal,
            tag::BMP_STRING,
            hex::decode("03a9006d006500670061").unwrap(),
        );
        assert_eq!(directory_string_to_utf8(&bmp)?, "Ωmega");

        let t61 =
            BerOctet::new_primitive(TagClass::Universal, tag::T61_STRING, vec![0x4du8, 0xfc]);
        assert_eq!(directory_string_to_utf8(&t61)?, "Mü");

        let utf8 = BerOctet::new_primitive(
            TagClass::Universal,
            tag::UTF8_STRING,
            "Ωmega".as_bytes().to_vec(),
        );
        assert_eq!(directory_string_to_utf8(&utf8)?, "Ωmega");

        let bad = BerOctet::new_primitive(TagClass::Universal, tag::UTF8_STRING, vec![0xffu8]);
        assert!(matches!(
            directory_string_to_utf8(&bad),
            Err(CardCryptoError::StringDecode(_))
        ));

        assert!(matches!(
            directory_string_to_utf8(&BerOctet::null()),
            Err(CardCryptoError::BerUnexpectedTag { .. })
        ));

        Ok(())
    }

    fn rdn(oid: &str, number: u32, value: &[u8]) -> Result<BerOctet> {
        let mut set = BerOctet::new_constructed(TagClass::Universal, tag::SET);
        set.push(BerOctet::sequence(vec![
            BerOctet::object_identifier(oid)?,
            BerOctet::new_primitive(TagClass::Universal, number, value.to_vec()),
        ]))?;

        Ok(set)
    }

    #[test]
    fn render_name() -> Result<()> {
        let name = BerOctet::sequence(vec![
            rdn("2.5.4.6", tag::PRINTABLE_STRING, b"US")?,
            rdn("2.5.4.3", tag::UTF8_STRING, b"Test")?,
            rdn("1.2.3.4", tag::OCTET_STRING, &[0xab])?,
        ]);

        assert_eq!(name_to_string(&name)?, "C=US, CN=Test, 1.2.3.4=#0401ab");
        assert_eq!(
            name_attribute_values(&name, "2.5.4.3")?[0].data()?,
            b"Test"
        );

        Ok(())
    }
}
