use chrono::{Days, NaiveDate};

/// Number of activity days the reader fetches to compute a streak.
pub const RECENT_ACTIVITY_LIMIT: usize = 30;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}

/// Consecutive reading days ending today or yesterday.
///
/// `days` are calendar-day strings, most recent first. A streak survives a
/// day without reading until a whole calendar day is missed.
pub fn compute_streak<S: AsRef<str>>(days: &[S], today: NaiveDate) -> u32 {
    let mut parsed: Vec<NaiveDate> = days
        .iter()
        .filter_map(|day| {
            let parsed = parse_day(day.as_ref());
            if parsed.is_none() {
                log::warn!("ignoring malformed activity day {:?}", day.as_ref());
            }
            parsed
        })
        .collect();
    parsed.sort_unstable_by(|a, b| b.cmp(a));
    parsed.dedup();

    let Some(&latest) = parsed.first() else {
        return 0;
    };
    let yesterday = today.checked_sub_days(Days::new(1));
    if latest != today && Some(latest) != yesterday {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest;
    for day in parsed.iter().skip(1) {
        let Some(previous) = expected.checked_sub_days(Days::new(1)) else {
            break;
        };
        if *day != previous {
            break;
        }
        streak += 1;
        expected = previous;
    }
    streak
}
