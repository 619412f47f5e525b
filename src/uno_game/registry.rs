use super::game::{Game, GameError, RemoveOutcome};
use chrono::{DateTime, Utc};
use log::info;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    AlreadyInGame(String),
    NotInGame,
    GameNotFound,
    Game(GameError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyInGame(user) => {
                write!(f, "{} is already in a game.", user)
            }
            RegistryError::NotInGame => write!(
                f,
                "You have to be in a game to play. Create a game with your friends first."
            ),
            RegistryError::GameNotFound => write!(f, "No such game."),
            RegistryError::Game(e) => write!(f, "{}", e),
        }
    }
}

impl From<GameError> for RegistryError {
    fn from(e: GameError) -> Self {
        RegistryError::Game(e)
    }
}

/// A registered game and when it was started.
#[derive(Debug, Clone)]
pub struct GameHandle {
    pub game: Arc<Mutex<Game>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    games: HashMap<Uuid, GameHandle>,
    users: HashMap<String, Uuid>,
}

/// Process-wide map of active games and of which game each user is in.
/// The registry lock guards the maps; each game sits behind its own lock
/// so moves in different games do not serialize against each other. The
/// registry lock is never taken while a game lock is held.
pub struct GameRegistry {
    inner: Mutex<Inner>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Starts a game for the given users. Rejects users already playing.
    pub fn create_game(&self, identities: Vec<String>) -> Result<(Uuid, GameHandle), RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        let mut seen = HashSet::new();
        for identity in &identities {
            if !seen.insert(identity.clone()) || inner.users.contains_key(identity) {
                return Err(RegistryError::AlreadyInGame(identity.clone()));
            }
        }

        let id = Uuid::new_v4();
        let game = Game::new(id, identities.clone())?;
        let handle = GameHandle {
            game: Arc::new(Mutex::new(game)),
            created_at: Utc::now(),
        };
        inner.games.insert(id, handle.clone());
        for identity in &identities {
            inner.users.insert(identity.clone(), id);
        }

        info!("started game {} with users {:?}", id, identities);
        Ok((id, handle))
    }

    pub fn get(&self, id: &Uuid) -> Result<GameHandle, RegistryError> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.games.get(id).cloned().ok_or(RegistryError::GameNotFound)
    }

    /// The game a user currently plays in.
    pub fn game_for_user(&self, user: &str) -> Result<(Uuid, Arc<Mutex<Game>>), RegistryError> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        let id = *inner.users.get(user).ok_or(RegistryError::NotInGame)?;
        let handle = inner.games.get(&id).ok_or(RegistryError::NotInGame)?;
        Ok((id, Arc::clone(&handle.game)))
    }

    pub fn list(&self) -> Vec<(Uuid, DateTime<Utc>)> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner
            .games
            .iter()
            .map(|(id, handle)| (*id, handle.created_at))
            .collect()
    }

    /// Removes a user from their game. Cleans the whole game up when the
    /// departure ends it.
    pub fn leave(&self, user: &str) -> Result<(RemoveOutcome, Arc<Mutex<Game>>), RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let game_id = inner.users.remove(user).ok_or(RegistryError::NotInGame)?;
        let game_arc = inner
            .games
            .get(&game_id)
            .map(|handle| Arc::clone(&handle.game))
            .ok_or(RegistryError::GameNotFound)?;

        let outcome = {
            let mut game = game_arc.lock().expect("game lock poisoned");
            game.remove_player(user).unwrap_or(RemoveOutcome::Continues)
        };

        match outcome {
            RemoveOutcome::Abandoned | RemoveOutcome::ForfeitWin { .. } => {
                inner.games.remove(&game_id);
                inner.users.retain(|_, id| id != &game_id);
                info!("ended game {} after {} left", game_id, user);
            }
            RemoveOutcome::Continues => {}
        }
        Ok((outcome, game_arc))
    }

    /// Drops a game and releases all of its users.
    pub fn end_game(&self, id: &Uuid) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if inner.games.remove(id).is_none() {
            return Err(RegistryError::GameNotFound);
        }
        inner.users.retain(|_, game_id| game_id != id);
        info!("ended game {}", id);
        Ok(())
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uno_game::game::GameStatus;

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = GameRegistry::new();
        let (id, handle) = registry.create_game(users(&["alice", "bob"])).unwrap();

        assert_eq!(registry.list().len(), 1);
        assert!(registry.get(&id).is_ok());

        let (found_id, _) = registry.game_for_user("alice").unwrap();
        assert_eq!(found_id, id);
        assert_eq!(
            handle.game.lock().unwrap().players[0].identity,
            "alice".to_string()
        );
    }

    #[test]
    fn test_busy_users_cannot_join_a_second_game() {
        let registry = GameRegistry::new();
        registry.create_game(users(&["alice", "bob"])).unwrap();

        let result = registry.create_game(users(&["alice", "carol"]));
        assert_eq!(
            result.err(),
            Some(RegistryError::AlreadyInGame("alice".to_string()))
        );
        // carol must not have been claimed by the failed attempt.
        assert!(matches!(
            registry.game_for_user("carol"),
            Err(RegistryError::NotInGame)
        ));
    }

    #[test]
    fn test_duplicate_users_in_one_request() {
        let registry = GameRegistry::new();
        let result = registry.create_game(users(&["alice", "alice"]));
        assert_eq!(
            result.err(),
            Some(RegistryError::AlreadyInGame("alice".to_string()))
        );
    }

    #[test]
    fn test_too_few_players() {
        let registry = GameRegistry::new();
        let result = registry.create_game(users(&["alice"]));
        assert_eq!(
            result.err(),
            Some(RegistryError::Game(GameError::InsufficientPlayers))
        );
    }

    #[test]
    fn test_leave_until_the_game_ends() {
        let registry = GameRegistry::new();
        let (id, _) = registry
            .create_game(users(&["alice", "bob", "carol"]))
            .unwrap();

        let (outcome, _) = registry.leave("alice").unwrap();
        assert_eq!(outcome, RemoveOutcome::Continues);
        assert!(registry.get(&id).is_ok());

        let (outcome, game) = registry.leave("bob").unwrap();
        assert_eq!(outcome, RemoveOutcome::ForfeitWin { winner: 0 });
        assert_eq!(
            game.lock().unwrap().status,
            GameStatus::Finished { winner: Some(0) }
        );

        // The game is gone and everyone is free again.
        assert!(matches!(registry.get(&id), Err(RegistryError::GameNotFound)));
        assert!(matches!(
            registry.game_for_user("carol"),
            Err(RegistryError::NotInGame)
        ));
    }

    #[test]
    fn test_end_game_releases_users() {
        let registry = GameRegistry::new();
        let (id, _) = registry.create_game(users(&["alice", "bob"])).unwrap();

        registry.end_game(&id).unwrap();
        assert!(matches!(registry.end_game(&id), Err(RegistryError::GameNotFound)));
        assert!(registry.create_game(users(&["alice", "bob"])).is_ok());
    }
}
