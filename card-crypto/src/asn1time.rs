// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 primitives related to time types.
//!
//! Times are exchanged as 14 digit `YYYYMMDDHHMMSS` strings in UTC. UTCTime
//! carries a two digit year, interpreted as 19YY from 50 onward and as 20YY
//! below it.

use {
    crate::error::{CardCryptoError, Result},
    chrono::{DateTime, NaiveDate, TimeZone, Utc},
    std::fmt::{Display, Formatter},
};

/// Length of the canonical `YYYYMMDDHHMMSS` form.
pub const TIME_STRING_LEN: usize = 14;

const UTC_TIME_LEN: usize = 13;
const GENERALIZED_TIME_LEN: usize = 15;

/// The two universal time types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeKind {
    UtcTime,
    GeneralizedTime,
}

impl TimeKind {
    /// Universal tag number of this type.
    pub fn tag(&self) -> u32 {
        match self {
            Self::UtcTime => crate::ber::tag::UTC_TIME,
            Self::GeneralizedTime => crate::ber::tag::GENERALIZED_TIME,
        }
    }

    /// Resolve a universal tag number.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            crate::ber::tag::UTC_TIME => Some(Self::UtcTime),
            crate::ber::tag::GENERALIZED_TIME => Some(Self::GeneralizedTime),
            _ => None,
        }
    }
}

impl Display for TimeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UtcTime => "UTCTime",
            Self::GeneralizedTime => "GeneralizedTime",
        })
    }
}

fn all_digits(data: &[u8]) -> bool {
    data.iter().all(|b| b.is_ascii_digit())
}

fn malformed(kind: TimeKind, content: &[u8]) -> CardCryptoError {
    CardCryptoError::TimeMalformed(format!(
        "{} content {:?}",
        kind,
        String::from_utf8_lossy(content)
    ))
}

/// Decode UTCTime or GeneralizedTime content into `YYYYMMDDHHMMSS`.
///
/// Only the UTC (`Z` suffixed) forms with seconds are accepted.
pub fn decode_time(kind: TimeKind, content: &[u8]) -> Result<String> {
    let (expected, year_digits) = match kind {
        TimeKind::UtcTime => (UTC_TIME_LEN, 2),
        TimeKind::GeneralizedTime => (GENERALIZED_TIME_LEN, 4),
    };

    if content.len() != expected {
        return Err(malformed(kind, content));
    }

    let (digits, zone) = content.split_at(expected - 1);
    if !all_digits(digits) || zone != b"Z" {
        return Err(malformed(kind, content));
    }

    let mut out = String::with_capacity(TIME_STRING_LEN);
    if year_digits == 2 {
        out.push_str(if digits[0] >= b'5' { "19" } else { "20" });
    }
    // Validated as ASCII digits above.
    out.extend(digits.iter().map(|b| *b as char));

    Ok(out)
}

fn validate_time_string(time: &str) -> Result<u32> {
    if time.len() != TIME_STRING_LEN || !all_digits(time.as_bytes()) {
        return Err(CardCryptoError::TimeMalformed(format!(
            "{:?} is not YYYYMMDDHHMMSS",
            time
        )));
    }

    time[..4]
        .parse::<u32>()
        .map_err(|_| CardCryptoError::TimeMalformed(time.to_string()))
}

/// Encode a `YYYYMMDDHHMMSS` time into content octets.
///
/// Years before 2050 are encoded as UTCTime, later ones as GeneralizedTime.
/// Years before 1950 cannot be represented and are rejected.
pub fn encode_time(time: &str) -> Result<(TimeKind, Vec<u8>)> {
    let year = validate_time_string(time)?;

    if year < 1950 {
        return Err(CardCryptoError::TimeYearOutOfRange(year));
    }

    let (kind, digits) = if year < 2050 {
        (TimeKind::UtcTime, &time[2..])
    } else {
        (TimeKind::GeneralizedTime, time)
    };

    let mut out = Vec::with_capacity(digits.len() + 1);
    out.extend_from_slice(digits.as_bytes());
    out.push(b'Z');

    Ok((kind, out))
}

/// Interpret a `YYYYMMDDHHMMSS` time as a calendar time.
pub fn time_to_datetime(time: &str) -> Result<DateTime<Utc>> {
    validate_time_string(time)?;

    let field = |range: std::ops::Range<usize>| -> Result<u32> {
        time[range]
            .parse::<u32>()
            .map_err(|_| CardCryptoError::TimeMalformed(time.to_string()))
    };

    let naive = NaiveDate::from_ymd_opt(field(0..4)? as i32, field(4..6)?, field(6..8)?)
        .and_then(|date| {
            date.and_hms_opt(
                field(8..10).ok()?,
                field(10..12).ok()?,
                field(12..14).ok()?,
            )
        })
        .ok_or_else(|| {
            CardCryptoError::TimeMalformed(format!("{:?} is not a calendar time", time))
        })?;

    Ok(Utc.from_utc_datetime(&naive))
}

/// Format a calendar time as `YYYYMMDDHHMMSS`.
pub fn datetime_to_time(time: &DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod test {
    use {super::*, chrono::Datelike};

    #[test]
    fn utc_time_century_pivot() -> Result<()> {
        assert_eq!(
            decode_time(TimeKind::UtcTime, b"491231235959Z")?,
            "20491231235959"
        );
        assert_eq!(
            decode_time(TimeKind::UtcTime, b"500101000000Z")?,
            "19500101000000"
        );
        // Only an upper case zone designator is accepted.
        assert!(matches!(
            decode_time(TimeKind::UtcTime, b"261014192243z"),
            Err(CardCryptoError::TimeMalformed(_))
        ));

        Ok(())
    }

    #[test]
    fn generalized_time() -> Result<()> {
        assert_eq!(
            decode_time(TimeKind::GeneralizedTime, b"20510605192244Z")?,
            "20510605192244"
        );

        Ok(())
    }

    #[test]
    fn rejects_malformed_content() {
        for (kind, content) in [
            (TimeKind::UtcTime, &b"2610141922Z"[..]),
            (TimeKind::UtcTime, &b"261014192243+0100"[..]),
            (TimeKind::UtcTime, &b"2610141922430"[..]),
            (TimeKind::UtcTime, &b"26101419224aZ"[..]),
            (TimeKind::GeneralizedTime, &b"261014192243Z"[..]),
            (TimeKind::GeneralizedTime, &b"20261014192243.5Z"[..]),
        ] {
            assert!(matches!(
                decode_time(kind, content),
                Err(CardCryptoError::TimeMalformed(_))
            ));
        }
    }

    #[test]
    fn encoding_selects_type_by_year() -> Result<()> {
        let (kind, content) = encode_time("20491231235959")?;
        assert_eq!(kind, TimeKind::UtcTime);
        assert_eq!(content, b"491231235959Z");

        let (kind, content) = encode_time("20500101000000")?;
        assert_eq!(kind, TimeKind::GeneralizedTime);
        assert_eq!(content, b"20500101000000Z");

        let (kind, _) = encode_time("19500101000000")?;
        assert_eq!(kind, TimeKind::UtcTime);

        assert!(matches!(
            encode_time("19491231235959"),
            Err(CardCryptoError::TimeYearOutOfRange(1949))
        ));
        assert!(matches!(
            encode_time("2026101419224"),
            Err(CardCryptoError::TimeMalformed(_))
        ));

        Ok(())
    }

    #[test]
    fn encode_decode_idempotent() -> Result<()> {
        for time in [
            "19500101000000",
            "19991231235959",
            "20000229120000",
            "20491231235959",
            "20500101000000",
            "99991231235959",
        ] {
            let (kind, content) = encode_time(time)?;
            assert_eq!(decode_time(kind, &content)?, time);
        }

        Ok(())
    }

    #[test]
    fn calendar_conversion() -> Result<()> {
        let t = time_to_datetime("20261014192243")?;
        assert_eq!(t.year(), 2026);
        assert_eq!(t.month(), 10);
        assert_eq!(t.day(), 14);
        assert_eq!(datetime_to_time(&t), "20261014192243");

        assert!(time_to_datetime("20260230000000").is_err());
        assert!(time_to_datetime("20261014246000").is_err());

        Ok(())
    }
}
