use rand::prelude::*;

use super::Card;

pub const DECK_SIZE: usize = 52;

const RANKS: [Card; 13] = [
    Card::Ace,
    Card::Value(2),
    Card::Value(3),
    Card::Value(4),
    Card::Value(5),
    Card::Value(6),
    Card::Value(7),
    Card::Value(8),
    Card::Value(9),
    Card::Value(10),
    Card::Jack,
    Card::Queen,
    Card::King,
];

// A single 52 card deck that reshuffles itself when it runs out, so drawing never fails.
#[derive(Clone, Debug)]
pub struct Deck {
    // Cards are drawn from the end.
    cards: Vec<Card>,
}

impl Deck {
    pub fn new<R: Rng>(rng: &mut R) -> Deck {
        let mut deck = Deck {
            cards: Vec::with_capacity(DECK_SIZE),
        };
        deck.refill(rng);
        deck
    }

    /// Creates a deck that deals `cards` in the given order before falling back to
    /// a freshly shuffled full deck.
    pub fn stacked(cards: Vec<Card>) -> Deck {
        let mut cards = cards;
        cards.reverse();
        Deck { cards: cards }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            self.refill(rng);
        }
    }

    fn refill<R: Rng>(&mut self, rng: &mut R) {
        self.cards.clear();
        for _ in 0..4 {
            self.cards.extend_from_slice(&RANKS);
        }
        self.cards.shuffle(rng);
    }
}
