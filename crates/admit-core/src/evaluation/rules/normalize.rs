//! Cleanup of raw OCR lines before they are reported as unrecognized.

use super::patterns::{
    CREDIT_POINTS, DECIMAL_NOISE, INTEGER_NOISE, LINK_FRAGMENT, MODULE_CODE, PAGE_FOOTER, SEPARATORS,
    STRUCTURAL_TOKENS, UPPERCASE_CODE,
};

/// Lines shorter than this after cleanup carry no information.
const MIN_INFORMATIVE_CHARS: usize = 4;

/// Strip codes, numbers, footers and structural tokens from an OCR line.
///
/// Returns an empty string when nothing informative remains.
pub fn normalize_line(raw: &str) -> String {
    // Footers go before digit removal, which would otherwise break them up.
    let line = LINK_FRAGMENT.replace_all(raw, " ");
    let line = PAGE_FOOTER.replace_all(&line, " ");
    let line = CREDIT_POINTS.replace_all(&line, " ");
    let line = MODULE_CODE.replace_all(&line, " ");
    let line = UPPERCASE_CODE.replace_all(&line, " ");
    let line = DECIMAL_NOISE.replace_all(&line, " ");
    let line = INTEGER_NOISE.replace_all(&line, " ");
    let line = SEPARATORS.replace_all(&line, " ");
    let line = STRUCTURAL_TOKENS.replace_all(&line, " ");

    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    let collapsed = collapsed.trim_matches(|c: char| c == '-' || c.is_whitespace());

    if collapsed.chars().count() < MIN_INFORMATIVE_CHARS {
        return String::new();
    }

    collapsed.to_string()
}
