//! Common regex patterns for applicant document extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Credit points: "6 CP", "7,5 CP", "5.0cp"
    pub static ref CREDIT_POINTS: Regex = Regex::new(
        r"(?i)(\d+(?:[.,]\d+)?)\s*CP"
    ).unwrap();

    // Any single digit grade, optionally with one decimal
    pub static ref GRADE_LOOSE: Regex = Regex::new(
        r"(\d(?:[.,]\d)?)"
    ).unwrap();

    // German grade scale 1,0 - 4,9
    pub static ref GRADE_STRICT: Regex = Regex::new(
        r"\b([1-4][.,]\d)\b"
    ).unwrap();

    // Plain decimal value in a form field
    pub static ref DECIMAL_VALUE: Regex = Regex::new(
        r"(\d+(?:[.,]\d+)?)"
    ).unwrap();

    // Applicant numbers have at least five digits
    pub static ref APPLICANT_NUMBER: Regex = Regex::new(
        r"\b(\d{5,})\b"
    ).unwrap();

    // Line noise removed by the normalizer, applied in this order
    pub static ref LINK_FRAGMENT: Regex = Regex::new(
        r"(?i)\S*(?:https?://|www\.)\S*|\S+\.(?:png|jpe?g|gif|svg)\b"
    ).unwrap();

    pub static ref PAGE_FOOTER: Regex = Regex::new(
        r"(?i)\b(?:Seite\s*\d+\s*von\s*\d+|Page\s*\d+\s*of\s*\d+)\b"
    ).unwrap();

    pub static ref MODULE_CODE: Regex = Regex::new(
        r"(?i)\b[A-Z]{2,5}[ -]?\d{2,5}\b"
    ).unwrap();

    pub static ref UPPERCASE_CODE: Regex = Regex::new(
        r"\b[A-Z-]+\s*\d+\b"
    ).unwrap();

    pub static ref DECIMAL_NOISE: Regex = Regex::new(
        r"\d+[.,]\d+"
    ).unwrap();

    pub static ref INTEGER_NOISE: Regex = Regex::new(
        r"\b\d+\b"
    ).unwrap();

    pub static ref SEPARATORS: Regex = Regex::new(
        r"[|/\\*_,;:]"
    ).unwrap();

    pub static ref STRUCTURAL_TOKENS: Regex = Regex::new(
        r"(?i)\b(?:CP|Pass|Fail|Note|Grade)\b"
    ).unwrap();
}
