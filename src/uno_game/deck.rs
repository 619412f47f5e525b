use super::card::{Card, Colour, Rank};
use super::game::GameError;
use rand::seq::SliceRandom; // Import the shuffle functionality
use std::fmt;

/// A card on the discard pile together with the colour it counts as.
/// For wilds the chosen colour lives here; the card itself stays wild.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayedCard {
    pub card: Card,
    pub colour: Colour,
}

impl fmt::Display for PlayedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.card.is_wild() && self.colour.is_concrete() {
            write!(f, "{} ({})", self.card, self.colour)
        } else {
            write!(f, "{}", self.card)
        }
    }
}

/// The shared draw and discard piles of one game. The top of each pile is
/// the last element of its vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    pub draw_pile: Vec<Card>,
    pub discard_pile: Vec<PlayedCard>,
}

impl Deck {
    /// The standard 108-card set, unshuffled.
    pub fn full_card_set() -> Vec<Card> {
        let mut cards = Vec::with_capacity(108);

        for &colour in &[Colour::Red, Colour::Green, Colour::Blue, Colour::Yellow] {
            // One copy of the 0 card
            cards.push(Card::new(colour, Rank::Number(0)));

            // Two copies of each numbered card (1-9)
            for number in 1..=9u8 {
                cards.push(Card::new(colour, Rank::Number(number)));
                cards.push(Card::new(colour, Rank::Number(number)));
            }

            // Skip, Reverse and Draw Two (two copies each)
            for _ in 0..2 {
                cards.push(Card::new(colour, Rank::Skip));
                cards.push(Card::new(colour, Rank::Reverse));
                cards.push(Card::new(colour, Rank::DrawTwo));
            }
        }

        for _ in 0..4 {
            cards.push(Card::new(Colour::Wild, Rank::Wild));
            cards.push(Card::new(Colour::Wild, Rank::WildDrawFour));
        }

        cards
    }

    pub fn new() -> Self {
        let mut draw_pile = Deck::full_card_set();
        let mut rng = rand::rng();
        draw_pile.shuffle(&mut rng);

        Self {
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// Deals `hand_size` cards to each of `player_count` players from the top
    /// of the draw pile. One card must remain afterwards to start the discard
    /// pile.
    pub fn deal_initial_hands(
        &mut self,
        player_count: usize,
        hand_size: usize,
    ) -> Result<Vec<Vec<Card>>, GameError> {
        if player_count * hand_size + 1 > self.draw_pile.len() {
            return Err(GameError::DeckExhausted);
        }

        let mut hands: Vec<Vec<Card>> = (0..player_count)
            .map(|_| Vec::with_capacity(hand_size))
            .collect();
        for _ in 0..hand_size {
            for hand in hands.iter_mut() {
                match self.draw_pile.pop() {
                    Some(card) => hand.push(card),
                    None => return Err(GameError::DeckExhausted),
                }
            }
        }
        Ok(hands)
    }

    /// Turns the top draw card face up to start the discard pile.
    pub fn flip_initial_card(&mut self) -> Result<(), GameError> {
        let card = self.draw_pile.pop().ok_or(GameError::DeckExhausted)?;
        self.discard_pile.push(PlayedCard {
            card,
            colour: card.colour,
        });
        Ok(())
    }

    /// Removes and returns `n` cards from the top of the draw pile,
    /// reshuffling the discard pile (all but its top card) back in when the
    /// draw pile runs dry.
    pub fn draw(&mut self, n: usize) -> Result<Vec<Card>, GameError> {
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            if self.draw_pile.is_empty() {
                self.reshuffle_discard();
            }
            match self.draw_pile.pop() {
                Some(card) => drawn.push(card),
                None => {
                    // Put the partial draw back so no card is lost.
                    self.draw_pile.extend(drawn);
                    return Err(GameError::DeckExhausted);
                }
            }
        }
        Ok(drawn)
    }

    fn reshuffle_discard(&mut self) {
        if self.discard_pile.len() < 2 {
            return;
        }
        let Some(top) = self.discard_pile.pop() else {
            return;
        };
        let mut reclaimed: Vec<Card> = self.discard_pile.drain(..).map(|p| p.card).collect();
        self.discard_pile.push(top);

        let mut rng = rand::rng();
        reclaimed.shuffle(&mut rng);
        self.draw_pile.append(&mut reclaimed);
    }

    /// Pushes a card onto the discard pile. Wilds must come with the colour
    /// the player declared; for other cards the colour argument is ignored.
    pub fn play_to_discard(
        &mut self,
        card: Card,
        chosen_colour: Option<Colour>,
    ) -> Result<(), GameError> {
        let colour = if card.is_wild() {
            match chosen_colour {
                Some(c) if c.is_concrete() => c,
                _ => return Err(GameError::MissingColour),
            }
        } else {
            card.colour
        };
        self.discard_pile.push(PlayedCard { card, colour });
        Ok(())
    }

    pub fn top(&self) -> Option<&PlayedCard> {
        self.discard_pile.last()
    }

    /// The colour the next play has to match.
    pub fn top_colour(&self) -> Option<Colour> {
        self.top().map(|p| p.colour)
    }

    /// The rank the next play has to match.
    pub fn top_rank(&self) -> Option<Rank> {
        self.top().map(|p| p.card.rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_card_set() {
        let cards = Deck::full_card_set();
        assert_eq!(cards.len(), 108); // Standard Uno deck has 108 cards

        let red = cards.iter().filter(|c| c.colour == Colour::Red).count();
        assert_eq!(red, 25);
        let wilds = cards.iter().filter(|c| c.is_wild()).count();
        assert_eq!(wilds, 8);
    }

    #[test]
    fn test_deal_initial_hands() {
        let mut deck = Deck::new();
        let hands = deck.deal_initial_hands(3, 7).unwrap();
        assert_eq!(hands.len(), 3);
        assert!(hands.iter().all(|h| h.len() == 7));
        assert_eq!(deck.draw_pile.len(), 108 - 21);
    }

    #[test]
    fn test_deal_rejects_oversized_table() {
        // 16 players at 7 cards each would need 112 cards plus the flip.
        let mut deck = Deck::new();
        assert!(matches!(
            deck.deal_initial_hands(16, 7),
            Err(GameError::DeckExhausted)
        ));
    }

    #[test]
    fn test_flip_initial_card() {
        let mut deck = Deck::new();
        deck.flip_initial_card().unwrap();
        assert_eq!(deck.discard_pile.len(), 1);
        assert_eq!(deck.draw_pile.len(), 107);
        let top = deck.top().unwrap();
        assert_eq!(top.colour, top.card.colour);
    }

    #[test]
    fn test_wild_keeps_its_identity_on_the_pile() {
        let mut deck = Deck::new();
        let wild = Card::new(Colour::Wild, Rank::Wild);
        deck.play_to_discard(wild, Some(Colour::Blue)).unwrap();

        let top = deck.top().unwrap();
        assert_eq!(top.card.colour, Colour::Wild);
        assert_eq!(top.colour, Colour::Blue);
        assert_eq!(deck.top_colour(), Some(Colour::Blue));
        assert_eq!(deck.top_rank(), Some(Rank::Wild));
    }

    #[test]
    fn test_wild_without_colour_is_rejected() {
        let mut deck = Deck::new();
        let before = deck.discard_pile.len();
        let wild = Card::new(Colour::Wild, Rank::WildDrawFour);
        assert!(matches!(
            deck.play_to_discard(wild, None),
            Err(GameError::MissingColour)
        ));
        assert!(matches!(
            deck.play_to_discard(wild, Some(Colour::Wild)),
            Err(GameError::MissingColour)
        ));
        assert_eq!(deck.discard_pile.len(), before);
    }

    #[test]
    fn test_draw_reshuffles_and_keeps_the_top_discard() {
        let mut deck = Deck::new();
        deck.flip_initial_card().unwrap();

        // Move the whole draw pile onto the discard pile.
        while let Some(card) = deck.draw_pile.pop() {
            deck.discard_pile.push(PlayedCard {
                card,
                colour: card.colour,
            });
        }
        let top = *deck.top().unwrap();

        let drawn = deck.draw(5).unwrap();
        assert_eq!(drawn.len(), 5);
        assert_eq!(deck.top(), Some(&top));
        assert_eq!(deck.draw_pile.len() + deck.discard_pile.len() + drawn.len(), 108);
    }

    #[test]
    fn test_draw_fails_when_no_cards_are_left() {
        let mut deck = Deck::new();
        deck.flip_initial_card().unwrap();
        deck.draw_pile.clear();

        // Only the top discard remains, which may never be drawn.
        assert!(matches!(deck.draw(1), Err(GameError::DeckExhausted)));
        assert_eq!(deck.discard_pile.len(), 1);
    }
}
