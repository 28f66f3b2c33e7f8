//! Weekly wall-clock schedule in a fixed UTC offset.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Weekday};

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySchedule {
    times: Vec<NaiveTime>,
    weekdays: Vec<Weekday>,
    offset: FixedOffset,
}

impl WeeklySchedule {
    pub fn new(
        times: impl IntoIterator<Item = NaiveTime>,
        weekdays: impl IntoIterator<Item = Weekday>,
        offset: FixedOffset,
    ) -> Result<Self> {
        let times: Vec<NaiveTime> = times
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        weekdays.sort_by_key(|d| d.num_days_from_monday());
        weekdays.dedup();

        if times.is_empty() {
            anyhow::bail!("Schedule has no times");
        }
        if weekdays.is_empty() {
            anyhow::bail!("Schedule has no weekdays");
        }
        Ok(Self {
            times,
            weekdays,
            offset,
        })
    }

    /// Parse `["HH:MM", ...]`, a weekday spec (`Mon-Fri`, `Mon,Wed,Fri`,
    /// `Sat-Sun`) and a whole-hour UTC offset.
    pub fn parse(times: &[String], weekdays: &str, utc_offset_hours: i32) -> Result<Self> {
        let times = times
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(t.trim(), "%H:%M")
                    .with_context(|| format!("Invalid schedule time '{t}', expected HH:MM"))
            })
            .collect::<Result<Vec<_>>>()?;
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("Invalid UTC offset: {utc_offset_hours}h"))?;
        Self::new(times, parse_weekdays(weekdays)?, offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn times(&self) -> &[NaiveTime] {
        &self.times
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    /// First slot strictly after `after`, in the schedule's offset.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<FixedOffset>> {
        let local = after.with_timezone(&self.offset);
        // Covers a full week plus today's remaining slots
        for day in 0..=7 {
            let date = local.date_naive() + Duration::days(day);
            if !self.weekdays.contains(&date.weekday()) {
                continue;
            }
            for time in &self.times {
                let Some(slot) = self.offset.from_local_datetime(&date.and_time(*time)).single()
                else {
                    continue;
                };
                if slot > local {
                    return Some(slot);
                }
            }
        }
        None
    }

    /// The next `n` slots after `after`.
    pub fn upcoming<Tz: TimeZone>(
        &self,
        after: &DateTime<Tz>,
        n: usize,
    ) -> Vec<DateTime<FixedOffset>> {
        let mut slots = Vec::with_capacity(n);
        let mut cursor = after.with_timezone(&self.offset);
        while slots.len() < n {
            match self.next_after(&cursor) {
                Some(slot) => {
                    slots.push(slot);
                    cursor = slot;
                }
                None => break,
            }
        }
        slots
    }
}

fn parse_weekday(s: &str) -> Result<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow::anyhow!("Invalid weekday '{}'", s.trim()))
}

/// `Mon-Fri` style ranges (wrapping allowed, e.g. `Fri-Mon`) and comma lists.
pub fn parse_weekdays(spec: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (parse_weekday(from)?, parse_weekday(to)?);
                let mut day = from;
                loop {
                    days.push(day);
                    if day == to {
                        break;
                    }
                    day = day.succ();
                }
            }
            None => days.push(parse_weekday(part)?),
        }
    }
    if days.is_empty() {
        anyhow::bail!("Empty weekday spec '{spec}'");
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn moscow() -> WeeklySchedule {
        WeeklySchedule::parse(
            &["23:34".to_string(), "11:34".to_string(), "16:34".to_string()],
            "Mon-Fri",
            3,
        )
        .unwrap()
    }

    fn msk(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(h, min, 0)
                    .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(parse_weekdays("Mon-Fri").unwrap().len(), 5);
        assert_eq!(
            parse_weekdays("Fri-Mon").unwrap(),
            vec![Weekday::Fri, Weekday::Sat, Weekday::Sun, Weekday::Mon]
        );
        assert_eq!(
            parse_weekdays("mon, wed,Fri").unwrap(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert!(parse_weekdays("Funday").is_err());
        assert!(parse_weekdays("").is_err());
    }

    #[test]
    fn test_times_sorted_and_validated() {
        let schedule = moscow();
        assert_eq!(schedule.times()[0], NaiveTime::from_hms_opt(11, 34, 0).unwrap());
        assert!(WeeklySchedule::parse(&["25:00".to_string()], "Mon", 3).is_err());
        assert!(WeeklySchedule::parse(&[], "Mon", 3).is_err());
    }

    #[test]
    fn test_next_same_day() {
        // Monday 2025-03-03 10:00 MSK
        let next = moscow().next_after(&msk(2025, 3, 3, 10, 0)).unwrap();
        assert_eq!(next, msk(2025, 3, 3, 11, 34));
    }

    #[test]
    fn test_next_is_strictly_after() {
        let next = moscow().next_after(&msk(2025, 3, 3, 11, 34)).unwrap();
        assert_eq!(next, msk(2025, 3, 3, 16, 34));
    }

    #[test]
    fn test_friday_night_rolls_to_monday() {
        // Friday 2025-03-07 23:40 MSK
        let next = moscow().next_after(&msk(2025, 3, 7, 23, 40)).unwrap();
        assert_eq!(next, msk(2025, 3, 10, 11, 34));
    }

    #[test]
    fn test_utc_input_converted() {
        // 08:00 UTC == 11:00 MSK
        let utc = chrono::Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap();
        let next = moscow().next_after(&utc).unwrap();
        assert_eq!(next, msk(2025, 3, 3, 11, 34));
    }

    #[test]
    fn test_upcoming() {
        let slots = moscow().upcoming(&msk(2025, 3, 7, 12, 0), 3);
        assert_eq!(
            slots,
            vec![
                msk(2025, 3, 7, 16, 34),
                msk(2025, 3, 7, 23, 34),
                msk(2025, 3, 10, 11, 34)
            ]
        );
    }
}
