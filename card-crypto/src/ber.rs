// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! BER/DER tag-length-value trees.

A [BerOctet] is one TLV element: either a primitive holding content bytes
or a constructed element owning an ordered list of children. Trees come
from decoding bytes ([BerOctet::decode]) or are assembled with the
builder functions.

Decoded elements keep a zero-copy [Bytes] view of the encoding they came
from. [BerOctet::octet] hands that view back unchanged unless the element or
one of its descendants has been mutated since, in which case the element is
re-encoded.

Decoding only accepts definite lengths. Encoding can emit the indefinite
form for constructed elements (see [BerOctet::set_definite]).
*/

use {
    crate::{
        asn1time::{self, TimeKind},
        error::{CardCryptoError, Result},
        oid,
    },
    bytes::Bytes,
    log::debug,
    std::fmt::{Display, Formatter},
};

/// Largest accepted tag number in the high-tag-number form.
pub const MAX_TAG_NUMBER: u32 = (1 << 28) - 1;

/// Largest accepted count of long form length octets.
pub const MAX_LENGTH_OCTETS: usize = 4;

/// Deepest accepted nesting of elements during decoding.
pub const MAX_DEPTH: usize = 64;

/// Universal tag numbers.
pub mod tag {
    pub const END_OF_CONTENTS: u32 = 0;
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const OBJECT_DESCRIPTOR: u32 = 7;
    pub const EXTERNAL: u32 = 8;
    pub const REAL: u32 = 9;
    pub const ENUMERATED: u32 = 10;
    pub const EMBEDDED_PDV: u32 = 11;
    pub const UTF8_STRING: u32 = 12;
    pub const RELATIVE_OID: u32 = 13;
    pub const SEQUENCE: u32 = 16;
    pub const SET: u32 = 17;
    pub const NUMERIC_STRING: u32 = 18;
    pub const PRINTABLE_STRING: u32 = 19;
    pub const T61_STRING: u32 = 20;
    pub const VIDEOTEX_STRING: u32 = 21;
    pub const IA5_STRING: u32 = 22;
    pub const UTC_TIME: u32 = 23;
    pub const GENERALIZED_TIME: u32 = 24;
    pub const GRAPHIC_STRING: u32 = 25;
    pub const VISIBLE_STRING: u32 = 26;
    pub const GENERAL_STRING: u32 = 27;
    pub const UNIVERSAL_STRING: u32 = 28;
    pub const CHARACTER_STRING: u32 = 29;
    pub const BMP_STRING: u32 = 30;
}

/// Name of a universal tag number, if it has one.
pub fn universal_tag_name(number: u32) -> Option<&'static str> {
    Some(match number {
        tag::END_OF_CONTENTS => "END OF CONTENTS",
        tag::BOOLEAN => "BOOLEAN",
        tag::INTEGER => "INTEGER",
        tag::BIT_STRING => "BIT STRING",
        tag::OCTET_STRING => "OCTET STRING",
        tag::NULL => "NULL",
        tag::OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
        tag::OBJECT_DESCRIPTOR => "ObjectDescriptor",
        tag::EXTERNAL => "EXTERNAL",
        tag::REAL => "REAL",
        tag::ENUMERATED => "ENUMERATED",
        tag::EMBEDDED_PDV => "EMBEDDED PDV",
        tag::UTF8_STRING => "UTF8String",
        tag::RELATIVE_OID => "RELATIVE-OID",
        tag::SEQUENCE => "SEQUENCE",
        tag::SET => "SET",
        tag::NUMERIC_STRING => "NumericString",
        tag::PRINTABLE_STRING => "PrintableString",
        tag::T61_STRING => "T61String",
        tag::VIDEOTEX_STRING => "VideotexString",
        tag::IA5_STRING => "IA5String",
        tag::UTC_TIME => "UTCTime",
        tag::GENERALIZED_TIME => "GeneralizedTime",
        tag::GRAPHIC_STRING => "GraphicString",
        tag::VISIBLE_STRING => "VisibleString",
        tag::GENERAL_STRING => "GeneralString",
        tag::UNIVERSAL_STRING => "UniversalString",
        tag::CHARACTER_STRING => "CHARACTER STRING",
        tag::BMP_STRING => "BMPString",
        _ => return None,
    })
}

/// The class bits of an identifier octet.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TagClass {
    Universal,
    Application,
    Context,
    Private,
}

impl TagClass {
    fn from_identifier(b: u8) -> Self {
        match b >> 6 {
            0 => Self::Universal,
            1 => Self::Application,
            2 => Self::Context,
            _ => Self::Private,
        }
    }

    fn identifier_bits(&self) -> u8 {
        match self {
            Self::Universal => 0x00,
            Self::Application => 0x40,
            Self::Context => 0x80,
            Self::Private => 0xc0,
        }
    }
}

impl Display for TagClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Universal => "universal",
            Self::Application => "application",
            Self::Context => "context",
            Self::Private => "private",
        })
    }
}

const CONSTRUCTED_BIT: u8 = 0x20;
const HIGH_TAG_ESCAPE: u8 = 0x1f;

struct Header {
    class: TagClass,
    constructed: bool,
    tag: u32,
    header_len: usize,
    content_len: usize,
}

fn parse_header(data: &[u8]) -> Result<Header> {
    let first = *data
        .first()
        .ok_or(CardCryptoError::BerTruncated("identifier"))?;

    let class = TagClass::from_identifier(first);
    let constructed = first & CONSTRUCTED_BIT != 0;
    let mut tag = (first & HIGH_TAG_ESCAPE) as u32;
    let mut pos = 1;

    if tag == HIGH_TAG_ESCAPE as u32 {
        tag = 0;

        loop {
            let b = *data.get(pos).ok_or(CardCryptoError::BerUnterminatedTag)?;
            pos += 1;

            if tag > MAX_TAG_NUMBER >> 7 {
                return Err(CardCryptoError::BerTagOverflow(MAX_TAG_NUMBER));
            }
            tag = (tag << 7) | (b & 0x7f) as u32;

            if b & 0x80 == 0 {
                break;
            }
        }
    }

    let b = *data.get(pos).ok_or(CardCryptoError::BerTruncated("length"))?;
    pos += 1;

    let content_len = if b & 0x80 == 0 {
        b as usize
    } else {
        let count = (b & 0x7f) as usize;

        if count == 0 {
            return Err(CardCryptoError::BerUnexpectedIndefiniteLength);
        }
        if count > MAX_LENGTH_OCTETS {
            return Err(CardCryptoError::BerLengthOverflow(count));
        }

        let octets = data
            .get(pos..pos + count)
            .ok_or(CardCryptoError::BerTruncated("length"))?;
        pos += count;

        octets.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize)
    };

    let available = data.len() - pos;
    if content_len > available {
        return Err(CardCryptoError::BerLengthExceedsBuffer {
            declared: content_len,
            available,
        });
    }

    Ok(Header {
        class,
        constructed,
        tag,
        header_len: pos,
        content_len,
    })
}

fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

fn push_identifier(out: &mut Vec<u8>, class: TagClass, constructed: bool, number: u32) {
    let mut first = class.identifier_bits();
    if constructed {
        first |= CONSTRUCTED_BIT;
    }

    if number < HIGH_TAG_ESCAPE as u32 {
        out.push(first | number as u8);
        return;
    }

    out.push(first | HIGH_TAG_ESCAPE);

    let mut groups = [0u8; 5];
    let mut count = 0;
    let mut v = number;
    loop {
        groups[count] = (v & 0x7f) as u8;
        count += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        out.push(groups[i] | if i > 0 { 0x80 } else { 0 });
    }
}

/// A BER/DER encoded element.
#[derive(Clone, Debug)]
pub struct BerOctet {
    class: TagClass,
    constructed: bool,
    tag: u32,
    definite: bool,
    modified: bool,
    /// Encoding this element was decoded from. Stale when modified.
    encoded: Bytes,
    data: Bytes,
    children: Vec<BerOctet>,
}

impl PartialEq for BerOctet {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && self.constructed == other.constructed
            && self.tag == other.tag
            && self.definite == other.definite
            && if self.constructed {
                self.children == other.children
            } else {
                self.data == other.data
            }
    }
}

impl Eq for BerOctet {}

fn decode_element(data: Bytes, offset: usize, depth: usize) -> Result<BerOctet> {
    let header = parse_header(&data).map_err(|e| {
        debug!("invalid BER element at offset {}: {}", offset, e);
        e
    })?;

    let total = header.header_len + header.content_len;
    let encoded = data.slice(0..total);
    let content = data.slice(header.header_len..total);

    let mut octet = BerOctet {
        class: header.class,
        constructed: header.constructed,
        tag: header.tag,
        definite: true,
        modified: false,
        encoded,
        data: Bytes::new(),
        children: vec![],
    };

    if header.constructed {
        if depth >= MAX_DEPTH {
            debug!("BER nesting too deep at offset {}", offset);
            return Err(CardCryptoError::BerNestingTooDeep(MAX_DEPTH));
        }

        let mut pos = 0;
        while pos < content.len() {
            let child = decode_element(
                content.slice(pos..),
                offset + header.header_len + pos,
                depth + 1,
            )?;
            pos += child.encoded.len();
            octet.children.push(child);
        }
    } else {
        octet.data = content;
    }

    Ok(octet)
}

impl BerOctet {
    /// Decode exactly one element spanning all of `data`.
    pub fn decode(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let (octet, consumed) = Self::decode_prefix(data.clone())?;

        if consumed != data.len() {
            debug!(
                "BER element of {} bytes followed by {} trailing bytes",
                consumed,
                data.len() - consumed
            );
            return Err(CardCryptoError::BerTrailingData(data.len() - consumed));
        }

        Ok(octet)
    }

    /// Decode the element at the start of `data`.
    ///
    /// Returns the element and the number of bytes it spans.
    pub fn decode_prefix(data: impl Into<Bytes>) -> Result<(Self, usize)> {
        let octet = decode_element(data.into(), 0, 0)?;
        let consumed = octet.encoded.len();

        Ok((octet, consumed))
    }

    /// Construct a primitive element.
    pub fn new_primitive(class: TagClass, number: u32, data: impl Into<Bytes>) -> Self {
        Self {
            class,
            constructed: false,
            tag: number,
            definite: true,
            modified: true,
            encoded: Bytes::new(),
            data: data.into(),
            children: vec![],
        }
    }

    /// Construct an empty constructed element.
    pub fn new_constructed(class: TagClass, number: u32) -> Self {
        Self {
            class,
            constructed: true,
            tag: number,
            definite: true,
            modified: true,
            encoded: Bytes::new(),
            data: Bytes::new(),
            children: vec![],
        }
    }

    /// A universal SEQUENCE holding `children`.
    pub fn sequence(children: Vec<BerOctet>) -> Self {
        let mut octet = Self::new_constructed(TagClass::Universal, tag::SEQUENCE);
        octet.children = children;
        octet
    }

    pub fn null() -> Self {
        Self::new_primitive(TagClass::Universal, tag::NULL, Bytes::new())
    }

    pub fn boolean(value: bool) -> Self {
        Self::new_primitive(
            TagClass::Universal,
            tag::BOOLEAN,
            vec![if value { 0xff } else { 0x00 }],
        )
    }

    pub fn octet_string(data: impl Into<Bytes>) -> Self {
        Self::new_primitive(TagClass::Universal, tag::OCTET_STRING, data)
    }

    /// A universal INTEGER from unsigned big-endian bytes.
    ///
    /// Redundant leading zeros are dropped and a zero is prepended when the
    /// high bit is set, so the encoding is minimal and non-negative.
    pub fn integer(value: &[u8]) -> Self {
        let start = value
            .iter()
            .position(|b| *b != 0)
            .unwrap_or(value.len());
        let value = &value[start..];

        let mut content = Vec::with_capacity(value.len() + 1);
        if value.first().map_or(true, |b| b & 0x80 != 0) {
            content.push(0);
        }
        content.extend_from_slice(value);

        Self::new_primitive(TagClass::Universal, tag::INTEGER, content)
    }

    /// A universal OBJECT IDENTIFIER from dotted decimal form.
    pub fn object_identifier(dotted: &str) -> Result<Self> {
        Ok(Self::new_primitive(
            TagClass::Universal,
            tag::OBJECT_IDENTIFIER,
            oid::encode_oid(dotted)?,
        ))
    }

    /// A UTCTime or GeneralizedTime from a `YYYYMMDDHHMMSS` time.
    pub fn time(time: &str) -> Result<Self> {
        let (kind, content) = asn1time::encode_time(time)?;

        Ok(Self::new_primitive(TagClass::Universal, kind.tag(), content))
    }

    pub fn class(&self) -> TagClass {
        self.class
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// The tag number.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    pub fn is_definite(&self) -> bool {
        self.definite
    }

    /// Whether this is a universal element with the given tag number.
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.tag == number
    }

    /// Whether this is a context specific element with the given tag number.
    pub fn is_context(&self, number: u32) -> bool {
        self.class == TagClass::Context && self.tag == number
    }

    /// Whether this element or any descendant changed since decoding.
    pub fn is_modified(&self) -> bool {
        self.modified || self.children.iter().any(|c| c.is_modified())
    }

    /// Content bytes of a primitive element.
    pub fn data(&self) -> Result<&[u8]> {
        if self.constructed {
            Err(CardCryptoError::BerNotPrimitive)
        } else {
            Ok(&self.data)
        }
    }

    /// Content bytes of a primitive element as a shared buffer.
    pub fn data_bytes(&self) -> Result<Bytes> {
        self.data()?;
        Ok(self.data.clone())
    }

    /// Children of a constructed element.
    pub fn children(&self) -> Result<&[BerOctet]> {
        if self.constructed {
            Ok(&self.children)
        } else {
            Err(CardCryptoError::BerNotConstructed)
        }
    }

    /// A child by position. None for primitives and out of range indices.
    pub fn child(&self, index: usize) -> Option<&BerOctet> {
        self.children.get(index)
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut BerOctet> {
        self.children.get_mut(index)
    }

    /// Human readable description of the identifier, for diagnostics.
    pub fn describe(&self) -> String {
        let form = if self.constructed {
            "constructed"
        } else {
            "primitive"
        };

        match (self.class, universal_tag_name(self.tag)) {
            (TagClass::Universal, Some(name)) => format!("{} ({})", name, form),
            (class, _) => format!("{} {} ({})", class, self.tag, form),
        }
    }

    fn expect_universal(&self, number: u32, expected: &'static str) -> Result<()> {
        if self.constructed || !self.is_universal(number) {
            Err(CardCryptoError::BerUnexpectedTag {
                expected,
                actual: self.describe(),
            })
        } else {
            Ok(())
        }
    }

    /// Decode this OBJECT IDENTIFIER to dotted decimal form.
    pub fn object_id(&self) -> Result<String> {
        self.expect_universal(tag::OBJECT_IDENTIFIER, "OBJECT IDENTIFIER")?;
        oid::decode_oid(&self.data)
    }

    /// Decode this UTCTime or GeneralizedTime to `YYYYMMDDHHMMSS`.
    pub fn decoded_time(&self) -> Result<String> {
        let kind = match (self.class, self.constructed) {
            (TagClass::Universal, false) => TimeKind::from_tag(self.tag),
            _ => None,
        }
        .ok_or_else(|| CardCryptoError::BerUnexpectedTag {
            expected: "UTCTime or GeneralizedTime",
            actual: self.describe(),
        })?;

        asn1time::decode_time(kind, &self.data)
    }

    /// Replace the content of a primitive element.
    pub fn set_data(&mut self, data: impl Into<Bytes>) -> Result<()> {
        if self.constructed {
            return Err(CardCryptoError::BerNotPrimitive);
        }

        self.data = data.into();
        self.modified = true;

        Ok(())
    }

    /// Append a child to a constructed element.
    pub fn push(&mut self, child: BerOctet) -> Result<()> {
        if !self.constructed {
            return Err(CardCryptoError::BerNotConstructed);
        }

        self.children.push(child);
        self.modified = true;

        Ok(())
    }

    /// Insert a child at `index`, shifting later children.
    ///
    /// An index past the end appends.
    pub fn insert(&mut self, index: usize, child: BerOctet) -> Result<()> {
        if !self.constructed {
            return Err(CardCryptoError::BerNotConstructed);
        }

        let index = index.min(self.children.len());
        self.children.insert(index, child);
        self.modified = true;

        Ok(())
    }

    /// Remove and return a child. None for primitives and out of range indices.
    pub fn remove(&mut self, index: usize) -> Option<BerOctet> {
        if index >= self.children.len() {
            return None;
        }

        self.modified = true;
        Some(self.children.remove(index))
    }

    /// Select the definite or indefinite length form for encoding.
    ///
    /// Only constructed elements can use the indefinite form.
    pub fn set_definite(&mut self, definite: bool) -> Result<()> {
        if !definite && !self.constructed {
            return Err(CardCryptoError::BerNotConstructed);
        }

        if self.definite != definite {
            self.definite = definite;
            self.modified = true;
        }

        Ok(())
    }

    /// Replace the content with an encoded OBJECT IDENTIFIER.
    pub fn set_object_id(&mut self, dotted: &str) -> Result<()> {
        let content = oid::encode_oid(dotted)?;
        self.set_data(content)
    }

    /// Replace the content with an encoded time, switching the tag to the
    /// time type selected for the year.
    pub fn set_time(&mut self, time: &str) -> Result<()> {
        if self.constructed {
            return Err(CardCryptoError::BerNotPrimitive);
        }

        let (kind, content) = asn1time::encode_time(time)?;
        self.class = TagClass::Universal;
        self.tag = kind.tag();
        self.set_data(content)
    }

    /// The encoding of this element.
    ///
    /// This is the decoded input, shared without copying, unless something
    /// in the tree was modified.
    pub fn octet(&self) -> Bytes {
        if !self.is_modified() {
            return self.encoded.clone();
        }

        let mut out = Vec::new();
        self.encode_into(&mut out);

        Bytes::from(out)
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        if !self.is_modified() {
            out.extend_from_slice(&self.encoded);
            return;
        }

        push_identifier(out, self.class, self.constructed, self.tag);

        let content = if self.constructed {
            let mut content = Vec::new();
            for child in &self.children {
                child.encode_into(&mut content);
            }
            content
        } else {
            self.data.to_vec()
        };

        if self.definite {
            push_length(out, content.len());
            out.extend_from_slice(&content);
        } else {
            out.push(0x80);
            out.extend_from_slice(&content);
            out.extend_from_slice(&[0x00, 0x00]);
        }
    }

    fn search_oid_into<'a>(&'a self, content: &[u8], next: bool, out: &mut Vec<&'a BerOctet>) {
        for (i, child) in self.children.iter().enumerate() {
            if !child.constructed
                && child.is_universal(tag::OBJECT_IDENTIFIER)
                && child.data.as_ref() == content
            {
                if next {
                    if let Some(sibling) = self.children.get(i + 1) {
                        out.push(sibling);
                    }
                } else {
                    out.push(self);
                }
            } else if child.constructed {
                child.search_oid_into(content, next, out);
            }
        }
    }

    /// Find every constructed descendant (or self) that directly contains
    /// the OBJECT IDENTIFIER `dotted`.
    pub fn search_oid(&self, dotted: &str) -> Result<Vec<&BerOctet>> {
        let content = oid::encode_oid(dotted)?;
        let mut out = vec![];
        self.search_oid_into(&content, false, &mut out);

        Ok(out)
    }

    /// Find the element following each occurrence of the OBJECT IDENTIFIER
    /// `dotted` among its siblings.
    ///
    /// In `SEQUENCE { type OBJECT IDENTIFIER, value ANY }` shapes this is the
    /// value associated with the identifier.
    pub fn search_oid_next(&self, dotted: &str) -> Result<Vec<&BerOctet>> {
        let content = oid::encode_oid(dotted)?;
        let mut out = vec![];
        self.search_oid_into(&content, true, &mut out);

        Ok(out)
    }

    fn fmt_tree(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        let indent = "  ".repeat(depth);

        let label = match (self.class, universal_tag_name(self.tag)) {
            (TagClass::Universal, Some(name)) => name.to_string(),
            (TagClass::Universal, None) => format!("[UNIVERSAL {}]", self.tag),
            (TagClass::Application, _) => format!("[APPLICATION {}]", self.tag),
            (TagClass::Context, _) => format!("[{}]", self.tag),
            (TagClass::Private, _) => format!("[PRIVATE {}]", self.tag),
        };

        if self.constructed {
            writeln!(f, "{}{}", indent, label)?;
            for child in &self.children {
                child.fmt_tree(f, depth + 1)?;
            }
            return Ok(());
        }

        let value = if self.is_universal(tag::OBJECT_IDENTIFIER) {
            self.object_id().ok()
        } else if self.class == TagClass::Universal && TimeKind::from_tag(self.tag).is_some() {
            self.decoded_time().ok()
        } else if self.class == TagClass::Universal
            && matches!(
                self.tag,
                tag::UTF8_STRING
                    | tag::PRINTABLE_STRING
                    | tag::IA5_STRING
                    | tag::NUMERIC_STRING
                    | tag::VISIBLE_STRING
            )
        {
            std::str::from_utf8(&self.data)
                .ok()
                .map(|s| format!("{:?}", s))
        } else {
            None
        };

        let value = value.unwrap_or_else(|| {
            if self.data.len() > 16 {
                format!("{}...", hex::encode(&self.data[..16]))
            } else {
                hex::encode(&self.data)
            }
        });

        writeln!(f, "{}{} ({} bytes) {}", indent, label, self.data.len(), value)
    }
}

impl Display for BerOctet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_tree(f, 0)
    }
}

#[cfg(test)]
mod test {
    use {super::*, crate::testutil};

    fn decode_hex(s: &str) -> Result<BerOctet> {
        BerOctet::decode(hex::decode(s).unwrap())
    }

    #[test]
    fn decode_simple_sequence() -> Result<()> {
        // SEQUENCE { INTEGER 0x1234, NULL, OID 2.5.4.3 }
        let octet = decode_hex("300b0202123405000603550403")?;
        assert!(octet.is_constructed());
        assert!(octet.is_universal(tag::SEQUENCE));
        assert!(!octet.is_modified());

        let children = octet.children()?;
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].data()?, &[0x12, 0x34]);
        assert!(children[1].is_universal(tag::NULL));
        assert_eq!(children[2].object_id()?, "2.5.4.3");

        assert!(matches!(
            octet.data(),
            Err(CardCryptoError::BerNotPrimitive)
        ));
        assert!(matches!(
            children[0].children(),
            Err(CardCryptoError::BerNotConstructed)
        ));

        Ok(())
    }

    #[test]
    fn certificates_round_trip_unmodified() -> Result<()> {
        for pem_data in [testutil::CA_CERTIFICATE, testutil::LEAF_CERTIFICATE] {
            let der = pem::parse(pem_data).unwrap().contents;
            let octet = BerOctet::decode(der.clone())?;

            assert!(!octet.is_modified());
            assert_eq!(octet.octet().as_ref(), der.as_slice());

            // A deep copy re-encodes identically too.
            let copy = octet.clone();
            assert_eq!(copy, octet);
            assert_eq!(copy.octet().as_ref(), der.as_slice());
        }

        Ok(())
    }

    #[test]
    fn forced_re_encoding_matches_der() -> Result<()> {
        let der = pem::parse(testutil::LEAF_CERTIFICATE).unwrap().contents;
        let mut octet = BerOctet::decode(der.clone())?;

        // Setting the same definite form is not a modification.
        octet.set_definite(true)?;
        assert!(!octet.is_modified());

        // Touching a deep primitive forces re-encoding of every ancestor.
        let serial = octet
            .child_mut(0)
            .and_then(|tbs| tbs.child_mut(1))
            .expect("serial number");
        let value = serial.data()?.to_vec();
        serial.set_data(value)?;

        assert!(octet.is_modified());
        assert_eq!(octet.octet().as_ref(), der.as_slice());

        Ok(())
    }

    #[test]
    fn mutation_re_encodes_lengths() -> Result<()> {
        let mut octet = decode_hex("30070402abcd0101ff")?;

        octet
            .child_mut(0)
            .expect("octet string")
            .set_data(vec![0x5a; 200])?;
        assert!(octet.is_modified());

        let encoded = octet.octet();
        assert_eq!(&encoded[..7], &[0x30, 0x81, 0xce, 0x04, 0x81, 0xc8, 0x5a]);
        assert_eq!(&encoded[encoded.len() - 3..], &[0x01, 0x01, 0xff]);

        let again = BerOctet::decode(encoded.clone())?;
        assert_eq!(again.child(0).unwrap().data()?, &[0x5a; 200][..]);
        assert_eq!(again.octet(), encoded);

        // Two length octets.
        let big = BerOctet::octet_string(vec![0u8; 300]).octet();
        assert_eq!(&big[..4], &[0x04, 0x82, 0x01, 0x2c]);

        Ok(())
    }

    #[test]
    fn rejects_truncation() {
        for (input, expected) in [
            ("", "identifier"),
            ("04", "length"),
            ("048201", "length"),
        ] {
            match decode_hex(input) {
                Err(CardCryptoError::BerTruncated(stage)) => assert_eq!(stage, expected),
                other => panic!("{}: unexpected {:?}", input, other),
            }
        }

        assert!(matches!(
            decode_hex("04050102"),
            Err(CardCryptoError::BerLengthExceedsBuffer {
                declared: 5,
                available: 2
            })
        ));

        // The child claims more than its parent holds.
        assert!(matches!(
            decode_hex("3003040501020304"),
            Err(CardCryptoError::BerLengthExceedsBuffer {
                declared: 5,
                available: 1
            })
        ));

        let err = decode_hex("0405").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Format);
    }

    #[test]
    fn rejects_unsupported_lengths() {
        assert!(matches!(
            decode_hex("308005000000"),
            Err(CardCryptoError::BerUnexpectedIndefiniteLength)
        ));
        assert!(matches!(
            decode_hex("04850000000001ff"),
            Err(CardCryptoError::BerLengthOverflow(5))
        ));
    }

    #[test]
    fn trailing_data() -> Result<()> {
        assert!(matches!(
            decode_hex("050000"),
            Err(CardCryptoError::BerTrailingData(1))
        ));

        let (octet, consumed) = BerOctet::decode_prefix(hex::decode("050000").unwrap())?;
        assert!(octet.is_universal(tag::NULL));
        assert_eq!(consumed, 2);

        Ok(())
    }

    #[test]
    fn high_tag_numbers() -> Result<()> {
        let octet = decode_hex("9f810000")?;
        assert_eq!(octet.class(), TagClass::Context);
        assert_eq!(octet.tag(), 128);
        assert!(!octet.is_constructed());

        let built = BerOctet::new_primitive(TagClass::Context, 128, Bytes::new());
        assert_eq!(built.octet().as_ref(), &[0x9f, 0x81, 0x00, 0x00]);

        let built = BerOctet::new_primitive(TagClass::Private, 30, vec![1u8]);
        assert_eq!(built.octet().as_ref(), &[0xde, 0x01, 0x01]);

        let built = BerOctet::new_primitive(TagClass::Application, MAX_TAG_NUMBER, Bytes::new());
        let decoded = BerOctet::decode(built.octet())?;
        assert_eq!(decoded.tag(), MAX_TAG_NUMBER);
        assert_eq!(decoded.class(), TagClass::Application);

        assert!(matches!(
            decode_hex("1f81"),
            Err(CardCryptoError::BerUnterminatedTag)
        ));
        assert!(matches!(
            decode_hex("1f818080800000"),
            Err(CardCryptoError::BerTagOverflow(_))
        ));

        Ok(())
    }

    fn nested(levels: usize) -> BerOctet {
        let mut octet = BerOctet::sequence(vec![]);
        for _ in 1..levels {
            octet = BerOctet::sequence(vec![octet]);
        }
        octet
    }

    #[test]
    fn nesting_depth_bound() -> Result<()> {
        let allowed = nested(MAX_DEPTH).octet();
        BerOctet::decode(allowed)?;

        let hostile = nested(MAX_DEPTH + 1).octet();
        assert!(matches!(
            BerOctet::decode(hostile),
            Err(CardCryptoError::BerNestingTooDeep(MAX_DEPTH))
        ));

        Ok(())
    }

    #[test]
    fn builders() -> Result<()> {
        let octet = BerOctet::sequence(vec![
            BerOctet::integer(&[0x00, 0x00, 0x80]),
            BerOctet::integer(&[]),
            BerOctet::boolean(true),
            BerOctet::null(),
            BerOctet::object_identifier("1.2.840.113549.1.1.1")?,
            BerOctet::time("20261014192243")?,
            BerOctet::time("20510605192244")?,
        ]);

        assert_eq!(
            hex::encode(octet.octet()),
            concat!(
                "3037",
                "02020080",
                "020100",
                "0101ff",
                "0500",
                "06092a864886f70d010101",
                "170d3236313031343139323234335a",
                "180f32303531303630353139323234345a",
            )
        );

        let decoded = BerOctet::decode(octet.octet())?;
        assert_eq!(decoded, octet);
        assert_eq!(decoded.child(5).unwrap().decoded_time()?, "20261014192243");
        assert_eq!(decoded.child(6).unwrap().decoded_time()?, "20510605192244");

        Ok(())
    }

    #[test]
    fn structural_edits() -> Result<()> {
        let mut octet = decode_hex("3006020101020102")?;

        octet.insert(1, BerOctet::null())?;
        octet.push(BerOctet::octet_string(vec![9u8]))?;
        assert_eq!(hex::encode(octet.octet()), "300b0201010500020102040109");

        let removed = octet.remove(0).expect("first child");
        assert_eq!(removed.data()?, &[1]);
        assert!(octet.remove(10).is_none());
        assert_eq!(hex::encode(octet.octet()), "30080500020102040109");

        let mut primitive = BerOctet::null();
        assert!(matches!(
            primitive.push(BerOctet::null()),
            Err(CardCryptoError::BerNotConstructed)
        ));
        assert!(matches!(
            primitive.set_definite(false),
            Err(CardCryptoError::BerNotConstructed)
        ));

        Ok(())
    }

    #[test]
    fn indefinite_length_encoding() -> Result<()> {
        let mut octet = BerOctet::sequence(vec![BerOctet::null()]);
        octet.set_definite(false)?;

        let encoded = octet.octet();
        assert_eq!(encoded.as_ref(), &[0x30, 0x80, 0x05, 0x00, 0x00, 0x00]);

        // The decoder only accepts definite lengths.
        assert!(matches!(
            BerOctet::decode(encoded),
            Err(CardCryptoError::BerUnexpectedIndefiniteLength)
        ));

        Ok(())
    }

    #[test]
    fn set_object_id_and_time() -> Result<()> {
        // SEQUENCE { OID 2.5.4.3, OID 2.5.4.10, UTCTime }
        let mut octet =
            decode_hex("30190603550403060355040a170d3236313031343139323234335a")?;

        octet.child_mut(0).unwrap().set_object_id("2.5.4.6")?;
        assert_eq!(octet.child(0).unwrap().object_id()?, "2.5.4.6");
        assert!(matches!(
            octet.child_mut(0).unwrap().set_object_id("4.1"),
            Err(CardCryptoError::OidMalformed(_))
        ));

        let time = octet.child_mut(2).unwrap();
        time.set_time("20700101000000")?;
        assert!(time.is_universal(tag::GENERALIZED_TIME));
        assert_eq!(time.decoded_time()?, "20700101000000");

        assert!(matches!(
            octet.child(1).unwrap().decoded_time(),
            Err(CardCryptoError::BerUnexpectedTag { .. })
        ));

        let decoded = BerOctet::decode(octet.octet())?;
        assert_eq!(decoded.child(2).unwrap().decoded_time()?, "20700101000000");

        Ok(())
    }

    #[test]
    fn search_by_oid() -> Result<()> {
        let der = pem::parse(testutil::LEAF_CERTIFICATE).unwrap().contents;
        let octet = BerOctet::decode(der)?;

        let cn = octet.search_oid_next(crate::rfc4519::OID_COMMON_NAME)?;
        // Issuer and subject both carry a common name.
        assert_eq!(cn.len(), 2);
        assert_eq!(cn[0].data()?, b"Test");
        assert_eq!(cn[1].data()?, b"Leaf");
        assert!(cn[1].is_universal(tag::PRINTABLE_STRING));

        let containers = octet.search_oid(crate::rfc5280::OID_KEY_USAGE)?;
        assert_eq!(containers.len(), 1);
        assert!(containers[0].is_universal(tag::SEQUENCE));
        // extnID, critical, extnValue.
        assert_eq!(containers[0].children()?.len(), 3);

        assert!(octet.search_oid("1.2.3.4.5")?.is_empty());
        assert!(octet.search_oid("9").is_err());

        Ok(())
    }

    #[test]
    fn tree_dump() -> Result<()> {
        let octet = BerOctet::sequence(vec![
            BerOctet::object_identifier("2.5.4.3")?,
            BerOctet::new_primitive(TagClass::Universal, tag::PRINTABLE_STRING, &b"Leaf"[..]),
            BerOctet::new_primitive(TagClass::Context, 3, vec![0xab; 20]),
        ]);

        let dump = octet.to_string();
        assert_eq!(
            dump,
            concat!(
                "SEQUENCE\n",
                "  OBJECT IDENTIFIER (3 bytes) 2.5.4.3\n",
                "  PrintableString (4 bytes) \"Leaf\"\n",
                "  [3] (20 bytes) abababababababababababababababab...\n",
            )
        );

        assert_eq!(octet.describe(), "SEQUENCE (constructed)");
        assert_eq!(
            octet.child(2).unwrap().describe(),
            "context 3 (primitive)"
        );

        Ok(())
    }
}
