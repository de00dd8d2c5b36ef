//! Resolving "today" in the app's reference timezone.
//!
//! Recurring-bill buckets and budget rollups compare transaction dates against
//! the current date. To keep those comparisons deterministic the date is
//! always evaluated in a single configured timezone rather than whatever the
//! server host happens to use.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the current UTC offset for a canonical timezone name, e.g. "Europe/London".
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Get today's date in the given canonical timezone.
///
/// # Errors
/// Returns [Error::InvalidTimezone] if the timezone name is not a valid
/// canonical timezone string.
pub fn today_in(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}
