//! # Form Validators
//!
//! Field-level checks run before a create/update is sent. Each returns
//! `None` when the value is acceptable, or the message to show.

use regex::Regex;
use std::fmt::Display;
use std::sync::OnceLock;

fn service_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[a-z0-9]+$").expect("static pattern"))
}

pub fn required(value: &str) -> Option<String> {
    value
        .is_empty()
        .then(|| "This is a required field".to_string())
}

/// Service names are limited to lower case letters and digits.
pub fn valid_service_name(value: &str) -> Option<String> {
    (!service_name_pattern().is_match(value))
        .then(|| "You only can use lower case letters and numbers".to_string())
}

pub fn min_length(min: usize) -> impl Fn(&str) -> Option<String> {
    move |value| {
        (value.chars().count() < min)
            .then(|| format!("The value must be greater than {} characters long", min))
    }
}

pub fn max_length(max: usize) -> impl Fn(&str) -> Option<String> {
    move |value| {
        (value.chars().count() > max)
            .then(|| format!("The value must be less than {} characters long", max))
    }
}

pub fn min_number(min: i64) -> impl Fn(i64) -> Option<String> {
    move |value| (value < min).then(|| format!("The value must be greater than {}", min))
}

pub fn max_number(max: i64) -> impl Fn(i64) -> Option<String> {
    move |value| (value > max).then(|| format!("The value must be less than {}", max))
}

pub fn check_duplicate<T: PartialEq + Display>(existing: &[T]) -> impl Fn(&T) -> Option<String> + '_ {
    move |value| {
        existing
            .contains(value)
            .then(|| format!("The value {} is in used", value))
    }
}

/// Runs `checks` in order and returns the first failure.
pub fn first_error<'a>(
    value: &str,
    checks: &[&'a dyn Fn(&str) -> Option<String>],
) -> Option<String> {
    checks.iter().find_map(|check| check(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("ohara").is_none());
        assert_eq!(required("").as_deref(), Some("This is a required field"));
    }

    #[test]
    fn test_valid_service_name() {
        assert!(valid_service_name("abc123").is_none());
        let error = Some("You only can use lower case letters and numbers".to_string());
        assert_eq!(valid_service_name("ABC"), error);
        assert_eq!(valid_service_name("!#@$%^&"), error);
        assert_eq!(valid_service_name(" "), error);
    }

    #[test]
    fn test_lengths() {
        let min = min_length(50);
        assert!(min(&"a".repeat(100)).is_none());
        assert_eq!(
            min(&"a".repeat(49)).as_deref(),
            Some("The value must be greater than 50 characters long")
        );

        let max = max_length(50);
        assert!(max(&"a".repeat(35)).is_none());
        assert_eq!(
            max(&"a".repeat(51)).as_deref(),
            Some("The value must be less than 50 characters long")
        );
    }

    #[test]
    fn test_numbers() {
        let min = min_number(50);
        assert!(min(100).is_none());
        assert_eq!(min(-1).as_deref(), Some("The value must be greater than 50"));

        let max = max_number(50);
        assert!(max(35).is_none());
        assert_eq!(max(51).as_deref(), Some("The value must be less than 50"));
    }

    #[test]
    fn test_check_duplicate() {
        let empty: Vec<String> = Vec::new();
        assert!(check_duplicate(&empty)(&"abc".to_string()).is_none());

        let names = vec!["foo".to_string(), "bar".to_string()];
        let check = check_duplicate(&names);
        assert_eq!(
            check(&"foo".to_string()).as_deref(),
            Some("The value foo is in used")
        );
        assert!(check(&"baz".to_string()).is_none());
    }

    #[test]
    fn test_first_error() {
        let max = max_length(4);
        let checks: [&dyn Fn(&str) -> Option<String>; 3] = [&required, &valid_service_name, &max];
        assert!(first_error("abc", &checks).is_none());
        assert_eq!(
            first_error("", &checks).as_deref(),
            Some("This is a required field")
        );
        assert_eq!(
            first_error("abcdef", &checks).as_deref(),
            Some("The value must be less than 4 characters long")
        );
    }
}
