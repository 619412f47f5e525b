use super::card::Card;
use super::game::GameError;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Chat identity the transport uses to address this player.
    pub identity: String,
    pub hand: Vec<Card>,
    pub is_current_turn: bool,
}

impl Player {
    pub fn new(identity: String, hand: Vec<Card>) -> Self {
        Self {
            identity,
            hand,
            is_current_turn: false,
        }
    }

    /// Adds a card to the player's hand.
    pub fn add_card(&mut self, card: Card) {
        self.hand.push(card);
    }

    /// Removes a card from the player's hand at the specified index.
    /// Returns `Err(GameError::InvalidCardIndex)` if the index is out of bounds.
    pub fn remove_card(&mut self, card_index: usize) -> Result<Card, GameError> {
        if card_index < self.hand.len() {
            Ok(self.hand.remove(card_index))
        } else {
            Err(GameError::InvalidCardIndex)
        }
    }

    /// Checks if the player has won (i.e., their hand is empty).
    pub fn has_won(&self) -> bool {
        self.hand.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uno_game::card::{Colour, Rank};

    #[test]
    fn test_hand_management() {
        let mut player = Player::new("alice".to_string(), Vec::new());
        assert!(player.has_won());

        player.add_card(Card::new(Colour::Red, Rank::Number(5)));
        assert!(!player.has_won());

        let card = player.remove_card(0).unwrap();
        assert_eq!(card, Card::new(Colour::Red, Rank::Number(5)));
        assert!(player.has_won());

        assert!(matches!(
            player.remove_card(0),
            Err(GameError::InvalidCardIndex)
        ));
    }
}
