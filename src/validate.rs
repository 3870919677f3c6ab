use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // HH:mm, 24h clock
    static ref TIME_RE: Regex = Regex::new(r"^([01]?\d|2[0-3]):[0-5]\d$").unwrap();
    // Italian mobile numbers, optional +39 prefix
    static ref PHONE_RE: Regex = Regex::new(r"^(\+39\s?)?\d{3}\s?\d{3}\s?\d{4}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Minimum 8 characters with at least one lowercase letter, one uppercase
/// letter and one digit.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn is_valid_time(time: &str) -> bool {
    TIME_RE.is_match(time)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_website(website: &str) -> bool {
    reqwest::Url::parse(website)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn parse_time(time: &str) -> Option<(u32, u32)> {
    let (h, m) = time.split_once(':')?;
    Some((h.parse().ok()?, m.parse().ok()?))
}

/// True when `later` is strictly after `earlier`. Both must already be
/// valid HH:mm strings.
pub fn is_time_after(later: &str, earlier: &str) -> bool {
    match (parse_time(later), parse_time(earlier)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("name.surname@mail.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn password_requires_mixed_case_and_digit() {
        assert!(is_valid_password("Pw123456"));
        assert!(!is_valid_password("short1A"));
        assert!(!is_valid_password("alllowercase1"));
        assert!(!is_valid_password("ALLUPPERCASE1"));
        assert!(!is_valid_password("NoDigitsHere"));
    }

    #[test]
    fn time_format_is_24h() {
        assert!(is_valid_time("09:30"));
        assert!(is_valid_time("9:30"));
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("12:60"));
        assert!(!is_valid_time("noon"));
    }

    #[test]
    fn time_ordering() {
        assert!(is_time_after("18:00", "17:59"));
        assert!(is_time_after("18:01", "18:00"));
        assert!(!is_time_after("18:00", "18:00"));
        assert!(!is_time_after("09:00", "18:00"));
    }

    #[test]
    fn phone_accepts_italian_numbers() {
        assert!(is_valid_phone("333 123 4567"));
        assert!(is_valid_phone("+39 333 123 4567"));
        assert!(is_valid_phone("3331234567"));
        assert!(!is_valid_phone("12345"));
    }

    #[test]
    fn website_requires_http_scheme() {
        assert!(is_valid_website("https://example.com"));
        assert!(is_valid_website("http://example.com/path"));
        assert!(!is_valid_website("example.com"));
        assert!(!is_valid_website("ftp://example.com"));
    }
}
