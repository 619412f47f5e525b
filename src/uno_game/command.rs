use super::card::Colour;
use super::game::{Game, GameError, GameStatus, RemoveOutcome};
use super::player::Player;
use super::registry::{GameRegistry, RegistryError};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed chat command. `0` draws; any other number plays that card
/// (1-based, as shown in the status view), optionally with a colour letter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Draw,
    Play {
        card_index: usize,
        colour: Option<Colour>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    NotACardNumber,
    UnknownColour,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NotACardNumber => write!(f, "Invalid card. Use a number!"),
            ParseError::UnknownColour => write!(f, "Invalid colour: use r, g, b or y!"),
        }
    }
}

impl Command {
    pub fn parse(text: &str) -> Result<Command, ParseError> {
        let mut parts = text.split_whitespace();
        let number = parts.next().unwrap_or("");
        let colour_part = parts.next().unwrap_or("");

        let number: usize = number.parse().map_err(|_| ParseError::NotACardNumber)?;
        if number == 0 {
            return Ok(Command::Draw);
        }

        let colour = match colour_part {
            "" => None,
            s => Some(Colour::from_letter(s).ok_or(ParseError::UnknownColour)?),
        };
        Ok(Command::Play {
            card_index: number - 1,
            colour,
        })
    }
}

/// One message the transport should deliver to one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub to: String,
    pub text: String,
}

impl Reply {
    fn to_user(user: &str, text: impl Into<String>) -> Self {
        Self {
            to: user.to_string(),
            text: text.into(),
        }
    }
}

/// The status view a player sees after every accepted move. Only their own
/// cards are spelled out; everyone else appears as a count.
pub fn status_message(game: &Game, player: &Player) -> String {
    let current = game
        .current_player()
        .map(|p| p.identity.as_str())
        .unwrap_or("nobody");

    let mut text = format!("UNO - it's {}'s turn.\n", current);
    text.push_str("Type 0 to draw a card or the card number to play that card.\n");
    if game.pending_draws > 0 {
        text.push_str(&format!("Draw: {}\n", game.pending_draws));
    }
    if let Some(top) = game.deck.top() {
        text.push_str(&format!("Discard: {}\n", top));
    }

    let counts = game
        .players
        .iter()
        .map(|p| format!("{}: {}", p.identity, p.hand.len()))
        .collect::<Vec<_>>()
        .join(", ");
    text.push_str(&format!("Cards left: {}\n", counts));

    let cards = player
        .hand
        .iter()
        .enumerate()
        .map(|(i, card)| format!("{}.{}", i + 1, card))
        .collect::<Vec<_>>()
        .join(" ");
    text.push_str(&format!("Your cards: {}", cards));
    text
}

pub fn status_replies(game: &Game) -> Vec<Reply> {
    game.players
        .iter()
        .map(|p| Reply::to_user(&p.identity, status_message(game, p)))
        .collect()
}

fn broadcast(game: &Game, text: &str) -> Vec<Reply> {
    game.players
        .iter()
        .map(|p| Reply::to_user(&p.identity, text))
        .collect()
}

fn win_replies(game: &Game, winner: usize) -> Vec<Reply> {
    let name = game
        .players
        .get(winner)
        .map(|p| p.identity.as_str())
        .unwrap_or("somebody");
    broadcast(game, &format!("UNO - {} won the game!", name))
}

/// Handles one chat message from a player: look their game up, parse the
/// command, run it, and render the resulting views. Every error comes back
/// as a reply to the sender; only deck exhaustion ends the game.
pub fn handle_message(registry: &GameRegistry, user: &str, text: &str) -> Vec<Reply> {
    let (game_id, game_arc) = match registry.game_for_user(user) {
        Ok(found) => found,
        Err(e) => return vec![Reply::to_user(user, e.to_string())],
    };
    let command = match Command::parse(text) {
        Ok(command) => command,
        Err(e) => return vec![Reply::to_user(user, e.to_string())],
    };

    let mut end_game = false;
    let replies = {
        let mut game = game_arc.lock().expect("game lock poisoned");
        let player_index = match game.players.iter().position(|p| p.identity == user) {
            Some(index) => index,
            None => return vec![Reply::to_user(user, RegistryError::NotInGame.to_string())],
        };

        let result = match command {
            Command::Draw => game.draw_card(player_index),
            Command::Play { card_index, colour } => game.play_card(player_index, card_index, colour),
        };

        match result {
            Err(GameError::DeckExhausted) => {
                end_game = true;
                broadcast(
                    &game,
                    "The draw pile is exhausted and the game cannot continue. The game has been ended.",
                )
            }
            Err(e) => vec![Reply::to_user(user, e.to_string())],
            Ok(event) => {
                debug!("game {}: {:?}", game_id, event);
                if let Some(winner) = game.check_win() {
                    game.status = GameStatus::Finished {
                        winner: Some(winner),
                    };
                    end_game = true;
                    win_replies(&game, winner)
                } else {
                    game.next_turn();
                    status_replies(&game)
                }
            }
        }
    };

    if end_game {
        if let Err(e) = registry.end_game(&game_id) {
            error!("failed to end game {}: {}", game_id, e);
        }
    }
    replies
}

/// Handles a player leaving their game, from the leave command or a
/// dropped chat session.
pub fn handle_leave(registry: &GameRegistry, user: &str) -> Vec<Reply> {
    match registry.leave(user) {
        Err(e) => vec![Reply::to_user(user, e.to_string())],
        Ok((outcome, game_arc)) => {
            let game = game_arc.lock().expect("game lock poisoned");
            match outcome {
                RemoveOutcome::Continues => status_replies(&game),
                RemoveOutcome::ForfeitWin { winner } => {
                    let name = game
                        .players
                        .get(winner)
                        .map(|p| p.identity.as_str())
                        .unwrap_or("somebody");
                    broadcast(
                        &game,
                        &format!("UNO - everyone else left. {} wins by forfeit!", name),
                    )
                }
                RemoveOutcome::Abandoned => Vec::new(),
            }
        }
    }
}
