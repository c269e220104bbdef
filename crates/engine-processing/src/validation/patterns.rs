use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").unwrap();
    static ref PHONE: Regex = Regex::new(r"^[\d\s+\-()]+$").unwrap();
    static ref DATES: Vec<Regex> = [
        r"^\d{4}-\d{2}-\d{2}$",
        r"^\d{2}/\d{2}/\d{4}$",
        r"^\d{2}-\d{2}-\d{4}$",
        r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

pub fn is_email(text: &str) -> bool {
    EMAIL.is_match(text)
}

pub fn is_phone(text: &str) -> bool {
    PHONE.is_match(text)
}

/// YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, or an ISO date-time.
pub fn is_plausible_date(text: &str) -> bool {
    DATES.iter().any(|re| re.is_match(text))
}

/// Parses an amount written with either decimal separator.
pub fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_email("jean.dupont@exemple.fr"));
        assert!(is_email("a-b_c@mail.co.uk"));
        assert!(!is_email("jean.dupont@exemple"));
        assert!(!is_email("jean dupont@exemple.fr"));
    }

    #[test]
    fn test_phone() {
        assert!(is_phone("+33 (0)1 23-45-67-89"));
        assert!(!is_phone("01 23 45 ext. 6"));
    }

    #[test]
    fn test_dates() {
        assert!(is_plausible_date("2021-03-04"));
        assert!(is_plausible_date("04/03/2021"));
        assert!(is_plausible_date("04-03-2021"));
        assert!(is_plausible_date("2021-03-04 10:15:00"));
        assert!(!is_plausible_date("4 mars 2021"));
        assert!(!is_plausible_date("2021/03/04"));
    }

    #[test]
    fn test_amounts() {
        assert_eq!(parse_amount("1200,50"), Some(1200.5));
        assert_eq!(parse_amount(" 15 "), Some(15.0));
        assert_eq!(parse_amount("-3"), Some(-3.0));
        assert_eq!(parse_amount("douze"), None);
        assert_eq!(parse_amount("inf"), None);
    }
}
