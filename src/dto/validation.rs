//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::ids::PLAYER_ID_LEN;

/// Validates that a returning player ID looks like one we handed out:
/// exactly 16 ASCII alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_player_id("a1B2c3D4e5F6g7H8") // Ok
/// validate_player_id("a1B2c3D4e5F6g7H")  // Err - too short
/// validate_player_id("a1B2c3D4e5F6g7H!") // Err - not alphanumeric
/// ```
pub fn validate_player_id(id: &str) -> Result<(), ValidationError> {
    if id.len() != PLAYER_ID_LEN {
        let mut err = ValidationError::new("player_id_length");
        err.message = Some(
            format!(
                "Player ID must be exactly {PLAYER_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("player_id_format");
        err.message = Some("Player ID must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_id_valid() {
        assert!(validate_player_id("a1B2c3D4e5F6g7H8").is_ok());
        assert!(validate_player_id("0000000000000000").is_ok());
    }

    #[test]
    fn test_validate_player_id_invalid_length() {
        assert!(validate_player_id("a1B2c3D4e5F6g7H").is_err()); // too short
        assert!(validate_player_id("a1B2c3D4e5F6g7H8x").is_err()); // too long
        assert!(validate_player_id("").is_err());
    }

    #[test]
    fn test_validate_player_id_invalid_format() {
        assert!(validate_player_id("a1B2c3D4e5F6g7H!").is_err());
        assert!(validate_player_id("a1B2c3D4 5F6g7H8").is_err()); // space
        assert!(validate_player_id("a1B2c3D4é5F6g7H").is_err()); // non-ascii
    }
}
