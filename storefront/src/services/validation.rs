//! Input checks shared by the checkout, consultation and account endpoints.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email pattern"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10,11}$").expect("phone pattern"));

pub fn is_valid_email(email: &str) -> bool {
  EMAIL_RE.is_match(email.trim())
}

/// Vietnamese phone numbers: 10 or 11 digits.
pub fn is_valid_phone(phone: &str) -> bool {
  PHONE_RE.is_match(phone.trim())
}

pub fn is_blank(value: Option<&str>) -> bool {
  value.map_or(true, |v| v.trim().is_empty())
}

/// Trims and drops empty optional text.
pub fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emails() {
    assert!(is_valid_email("an.nguyen@example.com"));
    assert!(is_valid_email("  lan+shop@mail.vn "));
    assert!(!is_valid_email("an@"));
    assert!(!is_valid_email("not an email"));
  }

  #[test]
  fn phones() {
    assert!(is_valid_phone("0912345678"));
    assert!(is_valid_phone("09123456789"));
    assert!(!is_valid_phone("091234567"));
    assert!(!is_valid_phone("0912-345-678"));
  }

  #[test]
  fn blanks() {
    assert!(is_blank(None));
    assert!(is_blank(Some("   ")));
    assert_eq!(non_blank(Some("  Hà Nội ")), Some("Hà Nội".to_string()));
    assert_eq!(non_blank(Some("")), None);
  }
}
