// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OBJECT IDENTIFIER content encoding (X.690 section 8.19).

use crate::error::{CardCryptoError, Result};

/// Decode OBJECT IDENTIFIER content octets into dotted decimal form.
pub fn decode_oid(content: &[u8]) -> Result<String> {
    if content.is_empty() {
        return Err(CardCryptoError::OidMalformed("empty content".into()));
    }

    let mut components = Vec::new();
    let mut value: u64 = 0;
    let mut in_progress = false;

    for &b in content {
        if !in_progress && b == 0x80 {
            return Err(CardCryptoError::OidMalformed(
                "sub-identifier has a leading 0x80 octet".into(),
            ));
        }

        if value > u64::MAX >> 7 {
            return Err(CardCryptoError::OidOverflow);
        }
        value = (value << 7) | (b & 0x7f) as u64;

        if b & 0x80 != 0 {
            in_progress = true;
        } else {
            if components.is_empty() {
                // The first sub-identifier packs the first two arcs.
                let (x, y) = match value {
                    v if v < 40 => (0, v),
                    v if v < 80 => (1, v - 40),
                    v => (2, v - 80),
                };
                components.push(x);
                components.push(y);
            } else {
                components.push(value);
            }

            value = 0;
            in_progress = false;
        }
    }

    if in_progress {
        return Err(CardCryptoError::OidMalformed(
            "final sub-identifier is unterminated".into(),
        ));
    }

    Ok(components
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("."))
}

fn parse_arc(oid: &str, arc: &str) -> Result<u64> {
    if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardCryptoError::OidMalformed(format!(
            "{:?} is not dotted decimal",
            oid
        )));
    }

    arc.parse::<u64>().map_err(|_| CardCryptoError::OidOverflow)
}

fn push_base128(out: &mut Vec<u8>, value: u64) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    let mut v = value;

    loop {
        groups[count] = (v & 0x7f) as u8;
        count += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }

    for i in (0..count).rev() {
        let more = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | more);
    }
}

/// Encode a dotted decimal OBJECT IDENTIFIER into content octets.
///
/// The first arc must be 0, 1 or 2 and, when it is 0 or 1, the second must
/// not exceed 39.
pub fn encode_oid(oid: &str) -> Result<Vec<u8>> {
    let arcs = oid
        .split('.')
        .map(|arc| parse_arc(oid, arc))
        .collect::<Result<Vec<_>>>()?;

    if arcs.len() < 2 {
        return Err(CardCryptoError::OidMalformed(format!(
            "{:?} needs at least two arcs",
            oid
        )));
    }

    let (x, y) = (arcs[0], arcs[1]);
    if x > 2 {
        return Err(CardCryptoError::OidMalformed(format!(
            "first arc of {:?} exceeds 2",
            oid
        )));
    }
    if x < 2 && y > 39 {
        return Err(CardCryptoError::OidMalformed(format!(
            "second arc of {:?} exceeds 39",
            oid
        )));
    }

    let first = (x * 40)
        .checked_add(y)
        .ok_or(CardCryptoError::OidOverflow)?;

    let mut out = Vec::with_capacity(arcs.len() + 4);
    push_base128(&mut out, first);
    for arc in &arcs[2..] {
        push_base128(&mut out, *arc);
    }

    Ok(out)
}
