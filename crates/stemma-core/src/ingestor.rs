//! # Ingestor Module
//!
//! Validation of user-supplied member data before it reaches the graph.
//!
//! - Validate drafts before graph mutation
//! - Reject malformed names and illogical dates
//! - Normalize nicknames (trim, drop blanks, deduplicate)
//! - Never touches the graph itself

use crate::primitives::{MAX_NAME_LENGTH, MAX_NICKNAMES, MIN_RECORDED_YEAR};
use crate::types::{
    Gender, GregorianDate, Member, MemberId, Paksham, StemmaError, TamilMonth, TamilStar, Thithi,
    TraditionalDate,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const OPERATION: &str = "validate_member";

/// Possibly incomplete date parts as entered by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    #[serde(default)]
    pub day: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl DateParts {
    #[must_use]
    pub const fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            day: Some(day),
            month: Some(month),
            year: Some(year),
        }
    }

    /// Parse `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
    ///
    /// Missing trailing parts stay `None` so that validation can report an
    /// incomplete date instead of guessing.
    pub fn parse(s: &str) -> Result<Self, StemmaError> {
        let mut parts = s.trim().splitn(3, '-');
        let bad = |what: &str| {
            StemmaError::invalid_input(
                "parse_date",
                Some("date"),
                format!("Cannot read {} in date '{}'. Use YYYY-MM-DD.", what, s),
            )
        };
        let year = parts
            .next()
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<i32>().map_err(|_| bad("year")))
            .transpose()?;
        let month = parts
            .next()
            .map(|p| p.parse::<u32>().map_err(|_| bad("month")))
            .transpose()?;
        let day = parts
            .next()
            .map(|p| p.parse::<u32>().map_err(|_| bad("day")))
            .transpose()?;
        Ok(Self { day, month, year })
    }

    fn is_blank(&self) -> bool {
        self.day.is_none() && self.month.is_none() && self.year.is_none()
    }
}

impl From<GregorianDate> for DateParts {
    fn from(d: GregorianDate) -> Self {
        Self::new(d.year, d.month, d.day)
    }
}

/// Traditional calendar parts as entered by a user, one token per part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraditionalDraft {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub star: Option<String>,
    #[serde(default)]
    pub paksham: Option<String>,
    #[serde(default)]
    pub thithi: Option<String>,
}

impl TraditionalDraft {
    fn is_blank(&self) -> bool {
        [&self.month, &self.star, &self.paksham, &self.thithi]
            .iter()
            .all(|part| part.as_deref().is_none_or(|t| t.trim().is_empty()))
    }
}

impl From<TraditionalDate> for TraditionalDraft {
    fn from(d: TraditionalDate) -> Self {
        Self {
            month: d.month.map(|v| v.as_str().to_string()),
            star: d.star.map(|v| v.as_str().to_string()),
            paksham: d.paksham.map(|v| v.as_str().to_string()),
            thithi: d.thithi.map(|v| v.as_str().to_string()),
        }
    }
}

/// Which traditional parts a date may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TraditionalKind {
    /// Month and star.
    Birth,
    /// Month, paksham and thithi.
    Death,
}

/// Member data as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDraft {
    /// Requested id; a fresh one is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default)]
    pub date_of_birth: Option<DateParts>,
    #[serde(default)]
    pub date_of_death: Option<DateParts>,
    #[serde(default)]
    pub wedding_date: Option<DateParts>,
    #[serde(default)]
    pub traditional_date_of_birth: Option<TraditionalDraft>,
    #[serde(default)]
    pub traditional_date_of_death: Option<TraditionalDraft>,
    #[serde(default)]
    pub additional_info: BTreeMap<String, String>,
}

impl MemberDraft {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Draft that reproduces an existing record.
    #[must_use]
    pub fn from_member(member: &Member) -> Self {
        Self {
            id: Some(member.id.to_string()),
            name: member.name.clone(),
            nicknames: member.nicknames.clone(),
            gender: Some(member.gender.to_string()),
            alive: member.alive,
            date_of_birth: member.date_of_birth.map(DateParts::from),
            date_of_death: member.date_of_death.map(DateParts::from),
            wedding_date: member.wedding_date.map(DateParts::from),
            traditional_date_of_birth: member.traditional_date_of_birth.map(TraditionalDraft::from),
            traditional_date_of_death: member.traditional_date_of_death.map(TraditionalDraft::from),
            additional_info: member.additional_info.clone(),
        }
    }
}

/// The Ingestor turns drafts into validated member records.
pub struct Ingestor;

impl Ingestor {
    /// Validate `draft` against today's local date and build a member.
    pub fn build_member(id: MemberId, draft: &MemberDraft) -> Result<Member, StemmaError> {
        Self::build_member_on(id, draft, chrono::Local::now().date_naive())
    }

    /// Validate `draft` as of `today` and build a member.
    ///
    /// Rules:
    /// - name is required after trimming
    /// - nicknames are trimmed, blanks dropped, duplicates removed
    /// - an unrecognized gender token is recorded as `UNKNOWN`
    /// - each date is complete, calendar-valid, not in the future and not
    ///   before year 1000
    /// - traditional parts are known calendar tokens; a birth records month
    ///   and star, a death month, paksham and thithi
    /// - a death date may not precede the birth date, nor accompany
    ///   `alive = true`; it implies `alive = false` otherwise. A traditional
    ///   death date counts as a death date here
    pub fn build_member_on(
        id: MemberId,
        draft: &MemberDraft,
        today: NaiveDate,
    ) -> Result<Member, StemmaError> {
        let name = Self::validate_name(&draft.name)?;
        let nicknames = Self::normalize_nicknames(&draft.nicknames)?;
        let gender = Self::parse_gender(draft.gender.as_deref());

        let date_of_birth = Self::validate_date(draft.date_of_birth.as_ref(), "dob", today)?;
        let date_of_death = Self::validate_date(draft.date_of_death.as_ref(), "dod", today)?;
        let wedding_date = Self::validate_date(draft.wedding_date.as_ref(), "wedding", today)?;

        let traditional_date_of_birth = Self::validate_traditional(
            draft.traditional_date_of_birth.as_ref(),
            TraditionalKind::Birth,
        )?;
        let traditional_date_of_death = Self::validate_traditional(
            draft.traditional_date_of_death.as_ref(),
            TraditionalKind::Death,
        )?;

        let recorded_death = date_of_death.is_some() || traditional_date_of_death.is_some();
        let alive = match (recorded_death, draft.alive) {
            (true, Some(true)) => {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("alive"),
                    "Date of Death provided for a member marked alive.",
                ));
            }
            (true, _) => Some(false),
            (false, alive) => alive,
        };

        if let (Some(dob), Some(dod)) = (date_of_birth, date_of_death) {
            if dod < dob {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("date_of_death"),
                    "Validation Error: Date of Death cannot be before Date of Birth.",
                ));
            }
        }

        if draft.additional_info.keys().any(|k| k.trim().is_empty()) {
            return Err(StemmaError::invalid_input(
                OPERATION,
                Some("additional_info"),
                "Attribute keys cannot be empty.",
            ));
        }

        Ok(Member {
            id,
            name,
            nicknames,
            gender,
            alive,
            date_of_birth,
            date_of_death,
            wedding_date,
            traditional_date_of_birth,
            traditional_date_of_death,
            additional_info: draft.additional_info.clone(),
        })
    }

    fn validate_name(raw: &str) -> Result<String, StemmaError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(StemmaError::invalid_input(
                OPERATION,
                Some("name"),
                "Validation Error: Name cannot be empty.",
            ));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(StemmaError::invalid_input(
                OPERATION,
                Some("name"),
                format!("Name exceeds {} characters.", MAX_NAME_LENGTH),
            ));
        }
        Ok(name.to_string())
    }

    fn normalize_nicknames(raw: &[String]) -> Result<Vec<String>, StemmaError> {
        let mut out: Vec<String> = Vec::new();
        for nickname in raw.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if nickname.chars().count() > MAX_NAME_LENGTH {
                return Err(StemmaError::invalid_input(
                    OPERATION,
                    Some("nicknames"),
                    format!("Nickname exceeds {} characters.", MAX_NAME_LENGTH),
                ));
            }
            if !out.iter().any(|n| n == nickname) {
                out.push(nickname.to_string());
            }
        }
        if out.len() > MAX_NICKNAMES {
            return Err(StemmaError::invalid_input(
                OPERATION,
                Some("nicknames"),
                format!("At most {} nicknames are allowed.", MAX_NICKNAMES),
            ));
        }
        Ok(out)
    }

    fn parse_gender(token: Option<&str>) -> Gender {
        match token {
            None => Gender::Unknown,
            Some(t) if t.trim().is_empty() => Gender::Unknown,
            Some(t) => t.parse().unwrap_or_else(|_| {
                warn!(token = t, "unrecognized gender token, recording UNKNOWN");
                Gender::Unknown
            }),
        }
    }

    /// Validate traditional calendar tokens.
    ///
    /// Blank parts and the calendars' unknown tokens read as unrecorded; a
    /// draft with nothing recorded yields `None`.
    fn validate_traditional(
        draft: Option<&TraditionalDraft>,
        kind: TraditionalKind,
    ) -> Result<Option<TraditionalDate>, StemmaError> {
        let Some(draft) = draft.filter(|d| !d.is_blank()) else {
            return Ok(None);
        };
        let (prefix, field, label) = match kind {
            TraditionalKind::Birth => {
                ("dob", "traditional_date_of_birth", "Traditional Date of Birth Error")
            }
            TraditionalKind::Death => {
                ("dod", "traditional_date_of_death", "Traditional Date of Death Error")
            }
        };
        let reject = |part: &str, token: &str| {
            StemmaError::invalid_input(
                OPERATION,
                Some(field),
                format!(
                    "{}: Invalid traditional {} value '{}' for prefix '{}'.",
                    label, part, token, prefix
                ),
            )
        };
        let not_recorded = |part: &str, token: &Option<String>| match token {
            Some(t) if !t.trim().is_empty() => Err(StemmaError::invalid_input(
                OPERATION,
                Some(field),
                format!(
                    "{}: Traditional {} does not apply to prefix '{}'.",
                    label, part, prefix
                ),
            )),
            _ => Ok(()),
        };

        let mut date = TraditionalDate::default();
        if let Some(token) = &draft.month {
            date.month = TamilMonth::parse_recorded(token).map_err(|_| reject("month", token))?;
        }
        match kind {
            TraditionalKind::Birth => {
                not_recorded("paksham", &draft.paksham)?;
                not_recorded("thithi", &draft.thithi)?;
                if let Some(token) = &draft.star {
                    date.star =
                        TamilStar::parse_recorded(token).map_err(|_| reject("star", token))?;
                }
            }
            TraditionalKind::Death => {
                not_recorded("star", &draft.star)?;
                if let Some(token) = &draft.paksham {
                    date.paksham =
                        Paksham::parse_recorded(token).map_err(|_| reject("paksham", token))?;
                }
                if let Some(token) = &draft.thithi {
                    date.thithi =
                        Thithi::parse_recorded(token).map_err(|_| reject("thithi", token))?;
                }
            }
        }
        Ok((!date.is_empty()).then_some(date))
    }

    /// Validate optional date parts labelled `prefix` in messages.
    pub fn validate_date(
        parts: Option<&DateParts>,
        prefix: &str,
        today: NaiveDate,
    ) -> Result<Option<GregorianDate>, StemmaError> {
        let Some(parts) = parts.filter(|p| !p.is_blank()) else {
            return Ok(None);
        };
        let field = Some(prefix);
        let (Some(day), Some(month), Some(year)) = (parts.day, parts.month, parts.year) else {
            return Err(StemmaError::invalid_input(
                OPERATION,
                field,
                format!(
                    "Incomplete Gregorian date provided for '{prefix}'. \
                     Please provide day, month, and year."
                ),
            ));
        };
        if !(1..=12).contains(&month) {
            return Err(StemmaError::invalid_input(
                OPERATION,
                field,
                format!(
                    "Invalid month ({}) for '{}'. Month must be between 1 and 12.",
                    month, prefix
                ),
            ));
        }
        let date = GregorianDate::new(year, month, day);
        let Some(naive) = date.to_naive() else {
            return Err(StemmaError::invalid_input(
                OPERATION,
                field,
                format!(
                    "Invalid day ({}) for '{}' month {} and year {}.",
                    day, prefix, month, year
                ),
            ));
        };
        if naive > today {
            return Err(StemmaError::invalid_input(
                OPERATION,
                field,
                format!(
                    "Gregorian date for '{}' ({}) cannot be in the future.",
                    prefix, date
                ),
            ));
        }
        if year < MIN_RECORDED_YEAR {
            return Err(StemmaError::invalid_input(
                OPERATION,
                field,
                format!(
                    "Year ({}) for '{}' seems too far in the past. Please check.",
                    year, prefix
                ),
            ));
        }
        Ok(Some(date))
    }
}

// =============================================================================
// TESTS
// =============================================================================
