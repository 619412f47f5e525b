use super::card::{Card, Colour, Rank};
use super::deck::Deck;
use super::player::Player;
use std::fmt;
use uuid::Uuid;

pub const STARTING_HAND_SIZE: usize = 7;
pub const MIN_PLAYERS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum GameStatus {
    AwaitingMove,
    Finished { winner: Option<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameError {
    NotYourTurn,
    InvalidCardIndex,
    WrongCard(String),
    MissingColour,
    InsufficientPlayers,
    DeckExhausted,
    GameFinished,
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::NotYourTurn => write!(f, "It's not your turn!"),
            GameError::InvalidCardIndex => write!(f, "You don't have a card with that number!"),
            GameError::WrongCard(reason) => write!(f, "{}", reason),
            GameError::MissingColour => {
                write!(f, "You have to pick a colour for that card: use r, g, b or y!")
            }
            GameError::InsufficientPlayers => {
                write!(f, "You need at least 2 players to start a game.")
            }
            GameError::DeckExhausted => write!(f, "There are no cards left to draw."),
            GameError::GameFinished => write!(f, "The game is already over."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    CardPlayed {
        player: usize,
        card: Card,
        colour: Colour,
    },
    CardDrawn {
        player: usize,
        count: usize,
    },
    ForcedDraw {
        player: usize,
        count: usize,
    },
}

/// Represents the direction of play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// What happened when a player left the game.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoveOutcome {
    Continues,
    Abandoned,
    ForfeitWin { winner: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: Uuid,
    pub players: Vec<Player>,
    pub deck: Deck,
    pub direction: Direction,
    pub turn_index: usize,
    pub pending_draws: usize,
    pub pending_skips: usize,
    pub status: GameStatus,
}

impl Game {
    pub fn new(id: Uuid, identities: Vec<String>) -> Result<Self, GameError> {
        if identities.len() < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers);
        }

        let mut deck = Deck::new();
        let hands = deck.deal_initial_hands(identities.len(), STARTING_HAND_SIZE)?;
        deck.flip_initial_card()?;

        let mut players: Vec<Player> = identities
            .into_iter()
            .zip(hands)
            .map(|(identity, hand)| Player::new(identity, hand))
            .collect();
        players[0].is_current_turn = true;

        Ok(Self {
            id,
            players,
            deck,
            direction: Direction::Clockwise,
            turn_index: 0,
            pending_draws: 0,
            pending_skips: 0,
            status: GameStatus::AwaitingMove,
        })
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn_index)
    }

    /// Checks whether a card may go on the discard pile right now.
    fn validate_play(&self, card: &Card) -> Result<(), GameError> {
        let Some(top) = self.deck.top() else {
            // Nothing flipped yet, anything goes.
            return Ok(());
        };

        if self.pending_draws > 0 {
            let stacks = matches!(
                (card.rank, top.card.rank),
                (Rank::DrawTwo, Rank::DrawTwo) | (Rank::WildDrawFour, Rank::WildDrawFour)
            );
            if stacks {
                return Ok(());
            }
            return Err(GameError::WrongCard(format!(
                "You have to draw {} cards first, or play another {} to pass them on.",
                self.pending_draws, top.card
            )));
        }

        if card.colour == Colour::Wild || top.colour == Colour::Wild {
            return Ok(());
        }
        if card.colour == top.colour || card.rank == top.card.rank {
            return Ok(());
        }
        Err(GameError::WrongCard(format!(
            "You can't play {} on {}.",
            card, top
        )))
    }

    /// Handles playing a card. Validation happens before any state changes;
    /// the caller checks for a win and advances the turn afterwards.
    pub fn play_card(
        &mut self,
        player_index: usize,
        card_index: usize,
        chosen_colour: Option<Colour>,
    ) -> Result<GameEvent, GameError> {
        if matches!(self.status, GameStatus::Finished { .. }) {
            return Err(GameError::GameFinished);
        }
        if player_index != self.turn_index {
            return Err(GameError::NotYourTurn);
        }
        let card = *self
            .players[player_index]
            .hand
            .get(card_index)
            .ok_or(GameError::InvalidCardIndex)?;

        self.validate_play(&card)?;

        // The discard push validates the wild colour, so it goes first; a
        // rejected wild must leave the hand untouched.
        self.deck.play_to_discard(card, chosen_colour)?;
        self.players[player_index].remove_card(card_index)?;

        match card.rank {
            Rank::Skip => self.pending_skips += 1,
            Rank::Reverse => {
                self.direction = self.direction.reverse();
                // With two players a reverse comes straight back around.
                if self.players.len() == 2 {
                    self.pending_skips += 1;
                }
            }
            Rank::DrawTwo => self.pending_draws += 2,
            Rank::WildDrawFour => self.pending_draws += 4,
            Rank::Number(_) | Rank::Wild => {}
        }

        let colour = self.deck.top_colour().unwrap_or(card.colour);
        Ok(GameEvent::CardPlayed {
            player: player_index,
            card,
            colour,
        })
    }

    /// Handles drawing. A pending forced draw is consumed in full and ends
    /// the turn; otherwise one card is drawn and the player may still play
    /// before the caller advances the turn.
    pub fn draw_card(&mut self, player_index: usize) -> Result<GameEvent, GameError> {
        if matches!(self.status, GameStatus::Finished { .. }) {
            return Err(GameError::GameFinished);
        }
        if player_index != self.turn_index {
            return Err(GameError::NotYourTurn);
        }

        if self.pending_draws > 0 {
            let count = self.pending_draws;
            let cards = self.deck.draw(count)?;
            for card in cards {
                self.players[player_index].add_card(card);
            }
            self.pending_draws = 0;
            return Ok(GameEvent::ForcedDraw {
                player: player_index,
                count,
            });
        }

        let cards = self.deck.draw(1)?;
        for card in cards {
            self.players[player_index].add_card(card);
        }
        Ok(GameEvent::CardDrawn {
            player: player_index,
            count: 1,
        })
    }

    /// Updates the current turn based on the direction of play, consuming
    /// any skips left behind by the last played card. Called by the shell
    /// exactly once after each accepted move.
    pub fn next_turn(&mut self) {
        let num_players = self.players.len();
        if num_players == 0 {
            return;
        }
        if let Some(player) = self.players.get_mut(self.turn_index) {
            player.is_current_turn = false;
        }

        let steps = 1 + self.pending_skips;
        self.pending_skips = 0;
        for _ in 0..steps {
            self.turn_index = match self.direction {
                Direction::Clockwise => (self.turn_index + 1) % num_players,
                Direction::CounterClockwise => (self.turn_index + num_players - 1) % num_players,
            };
        }
        self.players[self.turn_index].is_current_turn = true;
    }

    /// The player whose hand is empty, if any. At most one player can reach
    /// an empty hand per move.
    pub fn check_win(&self) -> Option<usize> {
        self.players.iter().position(|p| p.has_won())
    }

    /// Removes a player, returning their hand to the bottom of the draw
    /// pile. Returns `None` if no player has that identity.
    pub fn remove_player(&mut self, identity: &str) -> Option<RemoveOutcome> {
        let index = self.players.iter().position(|p| p.identity == identity)?;
        let removed = self.players.remove(index);
        self.deck.draw_pile.splice(0..0, removed.hand);

        if self.players.is_empty() {
            self.status = GameStatus::Finished { winner: None };
            return Some(RemoveOutcome::Abandoned);
        }
        if self.players.len() == 1 {
            self.turn_index = 0;
            self.players[0].is_current_turn = true;
            self.status = GameStatus::Finished { winner: Some(0) };
            return Some(RemoveOutcome::ForfeitWin { winner: 0 });
        }

        let num_players = self.players.len();
        if index < self.turn_index {
            self.turn_index -= 1;
        } else if index == self.turn_index {
            // The leaver held the turn, pass it on in the current direction.
            self.turn_index = match self.direction {
                Direction::Clockwise => self.turn_index % num_players,
                Direction::CounterClockwise => {
                    (self.turn_index + num_players - 1) % num_players
                }
            };
        }
        for (i, player) in self.players.iter_mut().enumerate() {
            player.is_current_turn = i == self.turn_index;
        }
        Some(RemoveOutcome::Continues)
    }
}
