use chrono::{Datelike, Local, NaiveDate};

/// Opening line for every prompt so models anchor on the real current year.
pub fn date_context() -> String {
    date_context_for(Local::now().date_naive())
}

pub fn date_context_for(today: NaiveDate) -> String {
    format!(
        "CURRENT DATE: {} (Year: {}). All content should be relevant to {}, not past years.",
        today.format("%B %d, %Y"),
        today.year(),
        today.year()
    )
}

pub fn current_year() -> i32 {
    Local::now().year()
}

/// "January 2026" style label used by the generation prompts
pub fn current_month_label() -> String {
    Local::now().format("%B %Y").to_string()
}

/// Today's date as YYYY-MM-DD, the default for items missing a publication date
pub fn today_iso() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_date_context() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        let ctx = date_context_for(day);
        assert!(ctx.starts_with("CURRENT DATE: January 12, 2026 (Year: 2026)"));
    }

    #[test]
    fn today_is_iso_formatted() {
        let today = today_iso();
        assert!(NaiveDate::parse_from_str(&today, "%Y-%m-%d").is_ok());
    }
}
