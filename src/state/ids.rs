use rand::{Rng, distr::Alphanumeric};

/// Length of generated game identifiers.
pub const GAME_ID_LEN: usize = 12;
/// Length of generated player identifiers.
pub const PLAYER_ID_LEN: usize = 16;

/// Source of fresh identifiers for games and players.
pub trait IdGenerator: Send + Sync {
    /// New game identifier.
    fn game_id(&self) -> String;
    /// New player identifier.
    fn player_id(&self) -> String;
}

/// Random alphanumeric identifiers drawn from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

impl IdGenerator for RandomIds {
    fn game_id(&self) -> String {
        random_alphanumeric(GAME_ID_LEN)
    }

    fn player_id(&self) -> String {
        random_alphanumeric(PLAYER_ID_LEN)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_have_expected_shape() {
        let ids = RandomIds;
        let game = ids.game_id();
        let player = ids.player_id();

        assert_eq!(game.len(), GAME_ID_LEN);
        assert_eq!(player.len(), PLAYER_ID_LEN);
        assert!(game.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(player.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ids_do_not_repeat() {
        let ids = RandomIds;
        let generated: HashSet<_> = (0..500).map(|_| ids.game_id()).collect();
        assert_eq!(generated.len(), 500);
    }
}
