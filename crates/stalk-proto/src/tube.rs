/// Longest tube name a server accepts, in bytes.
pub const MAX_TUBE_NAME_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTubeName {
    #[error("tube name is empty")]
    Empty,

    #[error("tube name exceeds {} bytes", MAX_TUBE_NAME_LEN)]
    TooLong,

    #[error("tube name must not start with '-'")]
    LeadingHyphen,

    #[error("tube name contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Check a tube name against the server's naming rules: 1 to 200 bytes of
/// ASCII letters, digits and `-+/;.$_()`, not starting with a hyphen.
pub fn validate_tube_name(name: &str) -> Result<(), InvalidTubeName> {
    if name.is_empty() {
        return Err(InvalidTubeName::Empty);
    }
    if name.len() > MAX_TUBE_NAME_LEN {
        return Err(InvalidTubeName::TooLong);
    }
    if name.starts_with('-') {
        return Err(InvalidTubeName::LeadingHyphen);
    }
    if let Some(c) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(InvalidTubeName::InvalidChar(c));
    }
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-+/;.$_()".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_protocol_charset() {
        let longest = "x".repeat(MAX_TUBE_NAME_LEN);
        for name in ["default", "emails", "a-b+c/d;e.f$g_h(i)", "0", longest.as_str()] {
            assert_eq!(validate_tube_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn rejects_invalid_names() {
        assert_eq!(validate_tube_name(""), Err(InvalidTubeName::Empty));
        assert_eq!(validate_tube_name(&"x".repeat(201)), Err(InvalidTubeName::TooLong));
        assert_eq!(validate_tube_name("-jobs"), Err(InvalidTubeName::LeadingHyphen));
        assert_eq!(validate_tube_name("my tube"), Err(InvalidTubeName::InvalidChar(' ')));
        assert_eq!(validate_tube_name("tübe"), Err(InvalidTubeName::InvalidChar('ü')));
    }
}
