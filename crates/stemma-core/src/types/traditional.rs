//! # Traditional Calendar
//!
//! Tamil calendar markers recorded next to the Gregorian dates of a member.
//!
//! A birth is remembered by month and star (nakshatra), a death by month,
//! lunar fortnight (paksham) and lunar day (thithi). Every part is optional
//! and none of them is converted to or checked against a Gregorian date.
//!
//! Tokens are the upper-case names, e.g. `CHITHIRAI` or `POURNAMI`. Each
//! enum also recognizes its "unknown" token (`TAMIL_MONTH_UNKNOWN`, ...),
//! which reads as "not recorded".

use super::StemmaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! calendar_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, unknown = $unknown:literal,
        { $($variant:ident => $token:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            /// Every value in calendar order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Token meaning "not recorded".
            pub const UNKNOWN_TOKEN: &'static str = $unknown;

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }

            /// Parse a token, mapping blanks and the unknown token to `None`.
            pub fn parse_recorded(s: &str) -> Result<Option<Self>, StemmaError> {
                let token = s.trim();
                if token.is_empty() || token.eq_ignore_ascii_case(Self::UNKNOWN_TOKEN) {
                    return Ok(None);
                }
                token.parse().map(Some)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StemmaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let token = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(token))
                    .ok_or_else(|| {
                        StemmaError::invalid_input(
                            concat!("parse_", $field),
                            Some($field),
                            format!("Unknown {} token '{}'.", $field, token),
                        )
                    })
            }
        }
    };
}

calendar_enum! {
    /// Month of the Tamil solar calendar.
    TamilMonth, "month", unknown = "TAMIL_MONTH_UNKNOWN",
    {
        Chithirai => "CHITHIRAI",
        Vaikasi => "VAIKASI",
        Aani => "AANI",
        Aadi => "AADI",
        Aavani => "AAVANI",
        Purattasi => "PURATTASI",
        Iypasi => "IYPASI",
        Karthigai => "KARTHIGAI",
        Margazhi => "MARGAZHI",
        Thai => "THAI",
        Maasi => "MAASI",
        Panguni => "PANGUNI",
    }
}

calendar_enum! {
    /// Birth star (nakshatra).
    TamilStar, "star", unknown = "TAMIL_STAR_UNKNOWN",
    {
        Ashwini => "ASHWINI",
        Barani => "BARANI",
        Krithigai => "KRITHIGAI",
        Rohini => "ROHINI",
        Mirugaseerisham => "MIRUGASEERISHAM",
        Thiruvathirai => "THIRUVATHIRAI",
        Punarpoosam => "PUNARPOOSAM",
        Poosam => "POOSAM",
        Aayilyam => "AAYILYAM",
        Magam => "MAGAM",
        Pooram => "POORAM",
        Uthiram => "UTHIRAM",
        Hastham => "HASTHAM",
        Chitthirai => "CHITTHIRAI",
        Swathi => "SWATHI",
        Visagam => "VISAGAM",
        Anusham => "ANUSHAM",
        Kettai => "KETTAI",
        Moolam => "MOOLAM",
        Pooradam => "POORADAM",
        Uthiradam => "UTHIRADAM",
        Thiruvonam => "THIRUVONAM",
        Avittam => "AVITTAM",
        Sathayam => "SATHAYAM",
        Poorattadhi => "POORATTADHI",
        Uthirattadhi => "UTHIRATTADHI",
        Revathi => "REVATHI",
    }
}

calendar_enum! {
    /// Lunar fortnight: waning (`KRISHNA`) or waxing (`SHUKLA`).
    Paksham, "paksham", unknown = "PAKSHAM_UNKNOWN",
    {
        Krishna => "KRISHNA",
        Shukla => "SHUKLA",
    }
}

calendar_enum! {
    /// Lunar day within a fortnight.
    Thithi, "thithi", unknown = "THITHI_UNKNOWN",
    {
        Prathamai => "PRATHAMAI",
        Dwithiyai => "DWITHIYAI",
        Thrithiyai => "THRITHIYAI",
        Chathurthi => "CHATHURTHI",
        Panchami => "PANCHAMI",
        Sashti => "SASHTI",
        Saptami => "SAPTAMI",
        Ashtami => "ASHTAMI",
        Navami => "NAVAMI",
        Dasami => "DASAMI",
        Ekadasi => "EKADASI",
        Dwadasi => "DWADASI",
        Thrayodasi => "THRAYODASI",
        Chathurdasi => "CHATHURDASI",
        Amavasya => "AMAVASYA",
        Pournami => "POURNAMI",
    }
}

/// A date remembered by the traditional calendar.
///
/// Births use `month` and `star`; deaths use `month`, `paksham` and
/// `thithi`. [`crate::ingestor::Ingestor`] enforces that split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraditionalDate {
    #[serde(default)]
    pub month: Option<TamilMonth>,
    #[serde(default)]
    pub star: Option<TamilStar>,
    #[serde(default)]
    pub paksham: Option<Paksham>,
    #[serde(default)]
    pub thithi: Option<Thithi>,
}

impl TraditionalDate {
    /// Returns `true` when no part is recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.month.is_none()
            && self.star.is_none()
            && self.paksham.is_none()
            && self.thithi.is_none()
    }
}

impl fmt::Display for TraditionalDate {
    /// Recorded parts separated by spaces, e.g. `THAI ROHINI`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            self.month.map(TamilMonth::as_str),
            self.star.map(TamilStar::as_str),
            self.paksham.map(Paksham::as_str),
            self.thithi.map(Thithi::as_str),
        ]
        .into_iter()
        .flatten()
        .collect();
        f.write_str(&parts.join(" "))
    }
}
