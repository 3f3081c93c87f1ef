//! Due-date and timezone normalization
//!
//! User input is a wall-clock reading plus an IANA zone. Zoned reminders are
//! stored as the absolute instant; floating and date-only reminders keep the
//! literal clock reading, stored as a UTC instant with the same digits so the
//! nominal time survives viewers in other zones.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Zone assumed when neither the input nor the stored reminder names one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

/// Interpretation flags stored alongside a due date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueDateFields {
    /// IANA zone the reminder was created in
    pub timezone: String,
    /// Wall-clock time is authoritative, never reinterpreted per zone
    pub is_floating: bool,
    /// Only the calendar date matters
    pub is_date_only: bool,
}

impl Default for DueDateFields {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            is_floating: false,
            is_date_only: false,
        }
    }
}

impl DueDateFields {
    /// Merge caller-supplied flags over the reminder's stored ones.
    ///
    /// A partial update that omits a flag keeps the stored value instead of
    /// falling back to the global default.
    pub fn resolve(
        timezone: Option<&str>,
        is_floating: Option<bool>,
        is_date_only: Option<bool>,
        stored: Option<&Self>,
    ) -> Self {
        let timezone = timezone
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
            .map(ToString::to_string)
            .or_else(|| stored.map(|fields| fields.timezone.clone()))
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        Self {
            timezone,
            is_floating: is_floating
                .or_else(|| stored.map(|fields| fields.is_floating))
                .unwrap_or(false),
            is_date_only: is_date_only
                .or_else(|| stored.map(|fields| fields.is_date_only))
                .unwrap_or(false),
        }
    }

    /// Whether timezone conversion is suppressed.
    pub const fn keeps_clock_reading(&self) -> bool {
        self.is_floating || self.is_date_only
    }

    /// Normalize `input` under these flags.
    pub fn normalize(&self, input: &str) -> Result<DateTime<Utc>> {
        normalize_due_date(input, &self.timezone, self.is_floating, self.is_date_only)
    }
}

/// Convert a user-entered due date into the instant stored on the reminder.
pub fn normalize_due_date(
    input: &str,
    timezone: &str,
    is_floating: bool,
    is_date_only: bool,
) -> Result<DateTime<Utc>> {
    let parsed = parse_due_input(input)?;

    if is_floating || is_date_only {
        let clock = match parsed {
            DueInput::Instant(instant) => instant.naive_local(),
            DueInput::WallClock(clock) => clock,
        };
        return Ok(Utc.from_utc_datetime(&clock));
    }

    match parsed {
        DueInput::Instant(instant) => Ok(instant.with_timezone(&Utc)),
        DueInput::WallClock(clock) => wall_clock_to_utc(clock, parse_zone(timezone)?),
    }
}

/// Parse an IANA zone name; blank input means UTC.
pub fn parse_zone(timezone: &str) -> Result<Tz> {
    let name = timezone.trim();
    if name.is_empty() {
        return Ok(Tz::UTC);
    }
    name.parse::<Tz>()
        .map_err(|_| Error::InvalidInput(format!("unknown timezone '{name}'")))
}

/// Wall-clock reading of a stored due date as a viewer in `viewer` sees it.
pub fn display_clock(stored: DateTime<Utc>, fields: &DueDateFields, viewer: Tz) -> NaiveDateTime {
    if fields.keeps_clock_reading() {
        stored.naive_utc()
    } else {
        stored.with_timezone(&viewer).naive_local()
    }
}

/// Whether a due date falls on the viewer's current calendar day.
pub fn is_due_on_day(
    stored: DateTime<Utc>,
    fields: &DueDateFields,
    viewer: Tz,
    now: DateTime<Utc>,
) -> bool {
    let today = now.with_timezone(&viewer).date_naive();
    display_clock(stored, fields, viewer).date() == today
}

enum DueInput {
    Instant(DateTime<FixedOffset>),
    WallClock(NaiveDateTime),
}

fn parse_due_input(input: &str) -> Result<DueInput> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(Error::InvalidInput("due date must not be empty".to_string()));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(DueInput::Instant(instant));
    }

    let with_offset = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .map_or_else(|| raw.to_string(), |head| format!("{head}+00:00"));
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(instant) = DateTime::parse_from_str(&with_offset, format) {
            return Ok(DueInput::Instant(instant));
        }
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(clock) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(DueInput::WallClock(clock));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(DueInput::WallClock(date.and_time(chrono::NaiveTime::MIN)));
    }

    Err(Error::InvalidInput(format!("unrecognized due date '{raw}'")))
}

fn wall_clock_to_utc(clock: NaiveDateTime, zone: Tz) -> Result<DateTime<Utc>> {
    match zone.from_local_datetime(&clock) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        // DST fold: the earlier of the two instants
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        // DST gap: keep the offset in force before the transition, which
        // moves the reading forward by the gap length
        LocalResult::None => {
            let before = (1..=16)
                .find_map(|step| {
                    zone.offset_from_local_datetime(&(clock - Duration::minutes(15 * step)))
                        .earliest()
                })
                .ok_or_else(|| {
                    Error::InvalidInput(format!("{clock} does not exist in {}", zone.name()))
                })?;
            let offset_seconds = i64::from(before.fix().local_minus_utc());
            Ok(Utc.from_utc_datetime(&(clock - Duration::seconds(offset_seconds))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn floating_keeps_clock_reading_regardless_of_zone() {
        for zone in ["America/Sao_Paulo", "Asia/Tokyo", "UTC", "Pacific/Kiritimati"] {
            let stored = normalize_due_date("2024-06-01T09:00:00", zone, true, false).unwrap();
            assert_eq!(stored, utc("2024-06-01T09:00:00Z"), "zone {zone}");
        }
    }

    #[test]
    fn date_only_keeps_clock_reading() {
        let stored = normalize_due_date("2024-06-01", "Asia/Tokyo", false, true).unwrap();
        assert_eq!(stored, utc("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn floating_ignores_explicit_offset() {
        let stored =
            normalize_due_date("2024-06-01T09:00:00+05:00", "UTC", true, false).unwrap();
        assert_eq!(stored, utc("2024-06-01T09:00:00Z"));
    }

    #[test]
    fn zoned_input_converts_to_instant() {
        let stored =
            normalize_due_date("2024-06-01T09:00:00", "America/Sao_Paulo", false, false).unwrap();
        assert_eq!(stored, utc("2024-06-01T12:00:00Z"));

        let short = normalize_due_date("2024-06-01T09:00", "Asia/Tokyo", false, false).unwrap();
        assert_eq!(short, utc("2024-06-01T00:00:00Z"));
    }

    #[test]
    fn explicit_offset_is_an_instant() {
        let stored = normalize_due_date("2024-06-01T09:00:00Z", "Asia/Tokyo", false, false).unwrap();
        assert_eq!(stored, utc("2024-06-01T09:00:00Z"));

        let minutes = normalize_due_date("2024-06-01T09:00Z", "Asia/Tokyo", false, false).unwrap();
        assert_eq!(minutes, utc("2024-06-01T09:00:00Z"));
    }

    #[test]
    fn dst_gap_moves_forward() {
        // 02:30 does not exist in New York on 2024-03-10
        let stored =
            normalize_due_date("2024-03-10T02:30:00", "America/New_York", false, false).unwrap();
        assert_eq!(stored, utc("2024-03-10T07:30:00Z"));
    }

    #[test]
    fn dst_fold_picks_earlier_instant() {
        // 01:30 happens twice in New York on 2024-11-03
        let stored =
            normalize_due_date("2024-11-03T01:30:00", "America/New_York", false, false).unwrap();
        assert_eq!(stored, utc("2024-11-03T05:30:00Z"));
    }

    #[test]
    fn rejects_unknown_zone_and_garbage() {
        assert!(normalize_due_date("2024-06-01T09:00:00", "Mars/Olympus", false, false).is_err());
        assert!(normalize_due_date("next tuesday", "UTC", false, false).is_err());
        assert!(normalize_due_date("  ", "UTC", false, false).is_err());
    }

    #[test]
    fn resolve_reuses_stored_flags() {
        let stored = DueDateFields {
            timezone: "Europe/Lisbon".to_string(),
            is_floating: true,
            is_date_only: false,
        };
        let resolved = DueDateFields::resolve(None, None, Some(true), Some(&stored));
        assert_eq!(
            resolved,
            DueDateFields {
                timezone: "Europe/Lisbon".to_string(),
                is_floating: true,
                is_date_only: true,
            }
        );
    }

    #[test]
    fn resolve_defaults_without_stored_flags() {
        let resolved = DueDateFields::resolve(Some("  "), None, None, None);
        assert_eq!(resolved, DueDateFields::default());
    }

    #[test]
    fn due_today_respects_floating_reading() {
        let tokyo = parse_zone("Asia/Tokyo").unwrap();
        let now = utc("2024-06-01T20:00:00Z"); // already June 2nd in Tokyo

        let floating = DueDateFields {
            is_floating: true,
            ..DueDateFields::default()
        };
        assert!(is_due_on_day(utc("2024-06-02T08:00:00Z"), &floating, tokyo, now));
        assert!(!is_due_on_day(utc("2024-06-01T08:00:00Z"), &floating, tokyo, now));

        let zoned = DueDateFields::default();
        assert!(is_due_on_day(utc("2024-06-01T23:00:00Z"), &zoned, tokyo, now));
    }
}
