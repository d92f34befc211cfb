//! Shared input rules

use once_cell::sync::Lazy;
use regex::Regex;

/// Kenyan mobile number in E.164 form, Safaricom/Airtel prefixes
pub static KENYAN_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+254[17]\d{8}$").unwrap());

/// National ID: 7 to 9 digits
pub static NATIONAL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{7,9}$").unwrap());
