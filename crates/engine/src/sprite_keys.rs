use thiserror::Error;

/// Sprite keys name sprite sheets the renderer resolves by id, so they are flat
/// identifiers rather than paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must start with an ASCII letter")]
    LeadingNonLetter,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

pub(crate) fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    let Some(first) = key.chars().next() else {
        return Err(SpriteKeyError::Empty);
    };
    if !first.is_ascii_alphabetic() {
        return Err(SpriteKeyError::LeadingNonLetter);
    }
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-') {
            continue;
        }
        return Err(SpriteKeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_element_style_ids() {
        for key in [
            "blue-slime-idle-sprite",
            "playerAttackSprite",
            "red_demon_walk2",
        ] {
            assert!(validate_sprite_key(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_paths_and_punctuation() {
        assert_eq!(validate_sprite_key(""), Err(SpriteKeyError::Empty));
        assert_eq!(
            validate_sprite_key("-slime"),
            Err(SpriteKeyError::LeadingNonLetter)
        );
        for key in ["ui/icon", "a.b", "a b", r"a\b"] {
            assert!(validate_sprite_key(key).is_err(), "key={key}");
        }
    }
}
