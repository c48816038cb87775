use time::{macros::format_description, Date, Duration};

pub fn parse_day(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_day(day: Date) -> String {
    day.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| day.to_string())
}

pub fn format_clock(t: time::Time) -> String {
    t.format(format_description!("[hour]:[minute]"))
        .unwrap_or_else(|_| format!("{:02}:{:02}", t.hour(), t.minute()))
}

/// The seven days of the Sunday-start week containing `today`,
/// index 0 = Sunday .. index 6 = Saturday.
///
/// `None` when part of that week falls outside the representable date range.
pub fn week_of(today: Date) -> Option<[Date; 7]> {
    let sunday =
        today.checked_sub(Duration::days(today.weekday().number_days_from_sunday() as i64))?;
    sunday.checked_add(Duration::days(6))?;
    Some(std::array::from_fn(|i| sunday + Duration::days(i as i64)))
}
