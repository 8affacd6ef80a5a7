use chrono::{DateTime, FixedOffset, Local, Utc};

/// Timezone for same-day identity and the sweep cutoff.
///
/// `HostLocal` is resolved against the host zone at each use, so a
/// long-running scheduler follows DST changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTimezone {
    HostLocal,
    Fixed(FixedOffset),
}

impl RunTimezone {
    /// UTC offset in effect at `now`.
    #[must_use]
    pub fn offset_at(self, now: DateTime<Utc>) -> FixedOffset {
        match self {
            RunTimezone::HostLocal => *now.with_timezone(&Local).offset(),
            RunTimezone::Fixed(offset) => offset,
        }
    }
}

impl From<FixedOffset> for RunTimezone {
    fn from(offset: FixedOffset) -> Self {
        RunTimezone::Fixed(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_offset_ignores_the_instant() {
        let tz = RunTimezone::from(FixedOffset::west_opt(5 * 3600).unwrap());
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap();
        assert_eq!(tz.offset_at(winter), tz.offset_at(summer));
        assert_eq!(tz.offset_at(winter).local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn host_local_is_resolved_per_instant() {
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap();
        for at in [winter, summer] {
            assert_eq!(
                RunTimezone::HostLocal.offset_at(at),
                *Local.from_utc_datetime(&at.naive_utc()).offset()
            );
        }
    }
}
