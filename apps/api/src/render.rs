//! Turns a review list into testimonial-card HTML.

use std::fmt::Write;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use html_escape::encode_text;

use crate::models::Review;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Label used when a review has no usable date.
pub const DATE_PLACEHOLDER: &str = "Recently";

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Relative label for a review date: "Today", "Yesterday", "3 days ago",
/// "2 weeks ago", then "3 Oct" (year added when it differs from now).
pub fn format_date(raw: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(date) = raw.and_then(parse_date) else {
        return DATE_PLACEHOLDER.to_string();
    };

    let diff_ms = (now - date).num_milliseconds().abs();
    let days = (diff_ms + MS_PER_DAY - 1) / MS_PER_DAY;

    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        d if d < 7 => format!("{d} days ago"),
        d if d < 30 => {
            let weeks = d / 7;
            format!("{weeks} week{} ago", if weeks > 1 { "s" } else { "" })
        }
        _ if date.year() != now.year() => date.format("%-d %b %Y").to_string(),
        _ => date.format("%-d %b").to_string(),
    }
}

/// One card per review, in order. Content, author and avatar are escaped.
pub fn render_reviews(reviews: &[Review], now: DateTime<Utc>) -> String {
    let mut html = String::new();
    for (index, review) in reviews.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = write!(
            html,
            r#"<div class="testimonial-card" style="animation-delay: {delay:.2}s">
    <p class="testimonial-text">"{content}"</p>
    <div class="testimonial-author">
        <div class="author-avatar">{avatar}</div>
        <div class="author-info">
            <h4>{author}</h4>
            <p>{rating} Stars - {date}</p>
        </div>
    </div>
</div>
"#,
            delay = index as f64 * 0.15,
            content = encode_text(&review.content),
            avatar = encode_text(review.display_avatar()),
            author = encode_text(&review.author),
            rating = review.rating,
            date = format_date(review.date.as_deref(), now),
        );
    }
    html
}
