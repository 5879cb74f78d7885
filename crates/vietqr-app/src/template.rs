// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

pub const DATE_PLACEHOLDER: &str = "{date}";
pub const TIME_PLACEHOLDER: &str = "{time}";
pub const LOCATION_PLACEHOLDER: &str = "{location}";

// Substitutes `{date}`, `{time}` and `{location}` into `template`, then collapses whitespace
// runs and trims. A missing or empty location substitutes as the empty string.
pub fn process_template(template: &str, location: Option<&str>, now: OffsetDateTime) -> String {
    let mut text = template.to_owned();
    if text.contains(DATE_PLACEHOLDER) {
        text = text.replace(DATE_PLACEHOLDER, &format_date(now));
    }
    if text.contains(TIME_PLACEHOLDER) {
        text = text.replace(TIME_PLACEHOLDER, &format_time(now));
    }
    if text.contains(LOCATION_PLACEHOLDER) {
        text = text.replace(LOCATION_PLACEHOLDER, location.unwrap_or(""));
    }
    collapse_whitespace(&text)
}

pub fn format_date(now: OffsetDateTime) -> String {
    format!(
        "{:02}{:02}{:02}",
        now.day(),
        u8::from(now.month()),
        now.year().rem_euclid(100)
    )
}

pub fn format_time(now: OffsetDateTime) -> String {
    format!("{}h{:02}", now.hour(), now.minute())
}

pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_whitespace() && chars.peek().is_some_and(|next| next.is_whitespace()) {
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl DayPeriod {
    pub const fn from_hour(hour: u8) -> Self {
        match hour {
            0..=8 => Self::Morning,
            9..=11 => Self::Midday,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }

    pub const fn greeting(self) -> &'static str {
        match self {
            Self::Morning => "Chuc quy khach buoi sang tot lanh",
            Self::Midday => "Chuc quy khach buoi trua tot lanh",
            Self::Afternoon => "Chuc quy khach buoi chieu tot lanh",
            Self::Evening => "Chuc quy khach buoi toi tot lanh",
        }
    }
}

pub const fn default_message(hour: u8) -> &'static str {
    DayPeriod::from_hour(hour).greeting()
}

#[cfg(test)]
mod tests {
    use super::{DayPeriod, collapse_whitespace, default_message, process_template};
    use time::macros::datetime;

    #[test]
    fn date_is_ddmmyy() {
        let now = datetime!(2026-03-07 14:30 +07:00);
        assert_eq!(process_template("{date}", None, now), "070326");
    }

    #[test]
    fn time_hour_is_unpadded_minutes_padded() {
        let now = datetime!(2026-03-07 09:05 +07:00);
        assert_eq!(process_template("{time}", None, now), "9h05");

        let late = datetime!(2026-03-07 21:30 +07:00);
        assert_eq!(process_template("{time}", None, late), "21h30");

        let midnight = datetime!(2026-03-07 00:00 UTC);
        assert_eq!(process_template("{time}", None, midnight), "0h00");
    }

    #[test]
    fn missing_location_substitutes_empty_and_trims() {
        let now = datetime!(2026-03-07 09:05 UTC);
        assert_eq!(process_template("Hi {location}", None, now), "Hi");
        assert_eq!(process_template("Hi {location}", Some(""), now), "Hi");
    }

    #[test]
    fn location_substitution_collapses_spaces() {
        let now = datetime!(2026-03-07 09:05 UTC);
        assert_eq!(
            process_template("A  {location}  B", Some("Hanoi"), now),
            "A Hanoi B"
        );
    }

    #[test]
    fn placeholders_repeat_and_mix_in_any_order() {
        let now = datetime!(2025-12-31 23:59 UTC);
        assert_eq!(
            process_template("{time} {location} {date} {time}", Some("Hue"), now),
            "23h59 Hue 311225 23h59"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let now = datetime!(2025-12-31 23:59 UTC);
        assert_eq!(process_template("{name} paid", None, now), "{name} paid");
    }

    #[test]
    fn collapse_keeps_single_whitespace_characters() {
        assert_eq!(collapse_whitespace("  a\tb \n c  "), "a\tb c");
    }

    #[test]
    fn greeting_branches_follow_hour_boundaries() {
        assert_eq!(DayPeriod::from_hour(0), DayPeriod::Morning);
        assert_eq!(DayPeriod::from_hour(8), DayPeriod::Morning);
        assert_eq!(DayPeriod::from_hour(9), DayPeriod::Midday);
        assert_eq!(DayPeriod::from_hour(11), DayPeriod::Midday);
        assert_eq!(DayPeriod::from_hour(12), DayPeriod::Afternoon);
        assert_eq!(DayPeriod::from_hour(17), DayPeriod::Afternoon);
        assert_eq!(DayPeriod::from_hour(18), DayPeriod::Evening);
        assert_eq!(DayPeriod::from_hour(23), DayPeriod::Evening);
        assert_eq!(default_message(10), "Chuc quy khach buoi trua tot lanh");
    }
}
