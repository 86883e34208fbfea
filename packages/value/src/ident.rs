//! Engine identifier rules.

/// Longest variable or field name the engine accepts.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Check whether `name` is a valid engine variable or struct field name.
///
/// Names start with an ASCII letter and continue with ASCII letters, digits
/// or underscores. A leading underscore is rejected.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    name.len() <= MAX_IDENTIFIER_LEN
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
