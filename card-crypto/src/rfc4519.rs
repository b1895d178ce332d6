// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute types defined in RFC 4519.

/// Common Name (CN)
///
/// 2.5.4.3
pub const OID_COMMON_NAME: &str = "2.5.4.3";

/// Surname (SN)
///
/// 2.5.4.4
pub const OID_SURNAME: &str = "2.5.4.4";

/// Serial Number
///
/// 2.5.4.5
pub const OID_SERIAL_NUMBER: &str = "2.5.4.5";

/// Country Name (C)
///
/// 2.5.4.6
pub const OID_COUNTRY_NAME: &str = "2.5.4.6";

/// Locality Name (L)
///
/// 2.5.4.7
pub const OID_LOCALITY_NAME: &str = "2.5.4.7";

/// State or Province Name
///
/// 2.5.4.8
pub const OID_STATE_PROVINCE_NAME: &str = "2.5.4.8";

/// Organization Name (O)
///
/// 2.5.4.10
pub const OID_ORGANIZATION_NAME: &str = "2.5.4.10";

/// Organizational Unit Name (OU)
///
/// 2.5.4.11
pub const OID_ORGANIZATIONAL_UNIT_NAME: &str = "2.5.4.11";

/// Title
///
/// 2.5.4.12
pub const OID_TITLE: &str = "2.5.4.12";

/// Short name of a well-known attribute type.
pub fn attribute_short_name(oid: &str) -> Option<&'static str> {
    Some(match oid {
        OID_COMMON_NAME => "CN",
        OID_SURNAME => "SN",
        OID_SERIAL_NUMBER => "serialNumber",
        OID_COUNTRY_NAME => "C",
        OID_LOCALITY_NAME => "L",
        OID_STATE_PROVINCE_NAME => "ST",
        OID_ORGANIZATION_NAME => "O",
        OID_ORGANIZATIONAL_UNIT_NAME => "OU",
        OID_TITLE => "title",
        _ => return None,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(attribute_short_name(OID_COMMON_NAME), Some("CN"));
        assert_eq!(attribute_short_name("2.5.4.10"), Some("O"));
        assert_eq!(attribute_short_name("2.5.4.99"), None);
    }
}
