use std::mem;

use rand::prelude::*;

use super::{Action, Card, Deck, Hand, State, BLACKJACK};
use crate::error::{Error, Result};
use crate::solver::Environment;

// The dealer keeps drawing while at or below this total, soft or not.
const DEALER_STANDS_ABOVE: u32 = 17;

#[derive(Clone, Debug)]
pub struct Player {
    hand: Hand,
    dealer_card: Card,
    turn_active: bool,
    bust: bool,
}

#[derive(Clone, Debug)]
pub struct Dealer {
    hand: Hand,
    upcard: Card,
}

#[derive(Clone, Debug)]
enum Round {
    NotDealt,
    AwaitingPlayer { player: Player, dealer: Dealer },
    Terminal {
        player: Player,
        dealer: Dealer,
        reward: f64,
    },
}

/// Single player blackjack against a dealer that draws to 18.
#[derive(Clone, Debug)]
pub struct Game {
    deck: Deck,
    round: Round,
}

impl Player {
    fn new<R: Rng>(dealer_card: Card, deck: &mut Deck, rng: &mut R) -> Player {
        let mut hand = Hand::default();
        hand.add_card(deck.draw(rng));
        hand.add_card(deck.draw(rng));
        Player {
            hand: hand,
            dealer_card: dealer_card,
            turn_active: true,
            bust: false,
        }
    }

    pub fn apply<R: Rng>(&mut self, action: Action, deck: &mut Deck, rng: &mut R) {
        match action {
            Action::Hit => {
                self.hand.add_card(deck.draw(rng));
                if self.hand.is_bust() {
                    self.turn_active = false;
                    self.bust = true;
                }
            }
            Action::Stand => self.turn_active = false,
        }
    }

    pub fn observation(&self) -> State {
        State {
            player_total: self.hand.total(),
            dealer_card: self.dealer_card.value(),
            // Any ace in a live hand, whether it is counted high or not.
            usable_ace: self.hand.ace_count() > 0 && !self.hand.is_bust(),
            ace_count: self.hand.ace_count(),
        }
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn is_turn_active(&self) -> bool {
        self.turn_active
    }

    pub fn is_bust(&self) -> bool {
        self.bust
    }
}

impl Dealer {
    fn new<R: Rng>(upcard: Card, deck: &mut Deck, rng: &mut R) -> Dealer {
        let mut hand = Hand::from_cards(&[upcard]);
        hand.add_card(deck.draw(rng));
        Dealer {
            hand: hand,
            upcard: upcard,
        }
    }

    // Draws until the total passes 17 or the hand busts.
    pub fn play_out<R: Rng>(&mut self, deck: &mut Deck, rng: &mut R) {
        while self.hand.total() <= DEALER_STANDS_ABOVE {
            self.hand.add_card(deck.draw(rng));
        }
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn upcard(&self) -> Card {
        self.upcard
    }
}

// Reward for a player who did not bust.
fn settle(player: &Player, dealer: &Dealer) -> f64 {
    let player_sum = player.hand.total();
    let dealer_sum = dealer.hand.total();

    if dealer_sum > BLACKJACK {
        // Dealer has gone bust.
        1.0
    } else if player_sum > dealer_sum {
        1.0
    } else if player_sum < dealer_sum {
        -1.0
    } else {
        0.0
    }
}

impl Game {
    // Starts with an empty deck; reset() shuffles a fresh one for every round.
    pub fn new() -> Game {
        Game::with_deck(Deck::stacked(Vec::new()))
    }

    pub fn with_deck(deck: Deck) -> Game {
        Game {
            deck: deck,
            round: Round::NotDealt,
        }
    }

    pub fn cards_remaining(&self) -> usize {
        self.deck.remaining()
    }

    /// Deals a new round from the current deck without reshuffling it.
    ///
    /// The dealer's upcard comes first, then the player's two cards, then the
    /// dealer's hole card.
    pub fn deal<R: Rng>(&mut self, rng: &mut R) -> State {
        let upcard = self.deck.draw(rng);
        let player = Player::new(upcard, &mut self.deck, rng);
        let dealer = Dealer::new(upcard, &mut self.deck, rng);
        let state = player.observation();
        self.round = Round::AwaitingPlayer {
            player: player,
            dealer: dealer,
        };
        state
    }

    pub fn player(&self) -> Option<&Player> {
        match &self.round {
            Round::NotDealt => None,
            Round::AwaitingPlayer { player, .. } | Round::Terminal { player, .. } => Some(player),
        }
    }

    pub fn dealer(&self) -> Option<&Dealer> {
        match &self.round {
            Round::NotDealt => None,
            Round::AwaitingPlayer { dealer, .. } | Round::Terminal { dealer, .. } => Some(dealer),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self.round {
            Round::Terminal { .. } => true,
            _ => false,
        }
    }

    // Final reward once the round is over.
    pub fn reward(&self) -> Option<f64> {
        match self.round {
            Round::Terminal { reward, .. } => Some(reward),
            _ => None,
        }
    }
}

impl Environment for Game {
    type State = State;
    type Action = Action;

    const ACTIONS: &'static [Action] = &[Action::Hit, Action::Stand];

    fn reset<R: Rng>(&mut self, rng: &mut R) -> State {
        self.deck = Deck::new(rng);
        self.deal(rng)
    }

    fn step<R: Rng>(&mut self, action: Action, rng: &mut R) -> Result<(State, f64, bool)> {
        let (mut player, mut dealer) = match mem::replace(&mut self.round, Round::NotDealt) {
            Round::AwaitingPlayer { player, dealer } => (player, dealer),
            other => {
                self.round = other;
                return Err(Error::EpisodeOver);
            }
        };

        player.apply(action, &mut self.deck, rng);
        let state = player.observation();

        if player.is_bust() {
            // Player has gone bust.
            self.round = Round::Terminal {
                player: player,
                dealer: dealer,
                reward: -1.0,
            };
            return Ok((state, -1.0, true));
        }

        if !player.is_turn_active() {
            dealer.play_out(&mut self.deck, rng);
            let reward = settle(&player, &dealer);
            self.round = Round::Terminal {
                player: player,
                dealer: dealer,
                reward: reward,
            };
            return Ok((state, reward, true));
        }

        self.round = Round::AwaitingPlayer {
            player: player,
            dealer: dealer,
        };
        Ok((state, 0.0, false))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::blackjack::deck::DECK_SIZE;
    use super::*;
    use Card as C;

    fn stacked_game(cards: Vec<Card>) -> Game {
        Game::with_deck(Deck::stacked(cards))
    }

    #[test]
    fn reset_deals_live_hand() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = Game::new();
        for _ in 0..1000 {
            let state = game.reset(&mut rng);
            assert!(state.player_total >= 4 && state.player_total <= 21);
            assert!(state.dealer_card >= 2 && state.dealer_card <= 11);
            assert_eq!(game.player().unwrap().hand().cards().len(), 2);
            assert_eq!(game.dealer().unwrap().hand().cards().len(), 2);
            assert!(!game.is_terminal());
        }
    }

    #[test]
    fn deal_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![C::Ace, C::Value(9), C::Jack, C::Value(4)]);
        let state = game.deal(&mut rng);
        assert_eq!(
            state,
            State {
                player_total: 19,
                dealer_card: 11,
                usable_ace: false,
                ace_count: 0,
            }
        );
        let dealer = game.dealer().unwrap();
        assert_eq!(dealer.upcard(), C::Ace);
        assert_eq!(dealer.hand().cards(), &[C::Ace, C::Value(4)]);
    }

    #[test]
    fn face_upcard_counts_ten() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![C::Queen, C::Ace, C::Value(6), C::Value(2)]);
        let state = game.deal(&mut rng);
        assert_eq!(
            state,
            State {
                player_total: 17,
                dealer_card: 10,
                usable_ace: true,
                ace_count: 1,
            }
        );
    }

    #[test]
    fn hard_hand_with_ace_keeps_usable_ace() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![
            C::Value(9),
            C::Ace,
            C::Value(10),
            C::Value(8),
            C::Value(5),
        ]);
        let state = game.deal(&mut rng);
        assert!(state.usable_ace);
        assert_eq!(state.player_total, 21);

        // A, 10, 5 counts the ace low but still reports it.
        let (state, reward, done) = game.step(Action::Hit, &mut rng).unwrap();
        assert_eq!(
            state,
            State {
                player_total: 16,
                dealer_card: 9,
                usable_ace: true,
                ace_count: 1,
            }
        );
        assert!(!game.player().unwrap().hand().is_soft());
        assert_eq!(reward, 0.0);
        assert!(!done);
    }

    #[test]
    fn busted_hand_reports_no_usable_ace() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![
            C::Value(9),
            C::Ace,
            C::Value(5),
            C::Value(8),
            C::King,
            C::Queen,
        ]);
        game.deal(&mut rng);
        game.step(Action::Hit, &mut rng).unwrap();
        let (state, reward, done) = game.step(Action::Hit, &mut rng).unwrap();
        assert_eq!(state.player_total, 26);
        assert!(!state.usable_ace);
        assert_eq!(state.ace_count, 1);
        assert_eq!(reward, -1.0);
        assert!(done);
    }

    #[test]
    fn reset_shuffles_a_fresh_deck() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![C::Value(2); 10]);
        // Upcard, two player cards and the hole card come from a new deck.
        game.reset(&mut rng);
        assert_eq!(game.cards_remaining(), DECK_SIZE - 4);

        // Partly drained deck is replaced on the next round.
        game.step(Action::Hit, &mut rng).ok();
        game.reset(&mut rng);
        assert_eq!(game.cards_remaining(), DECK_SIZE - 4);
    }

    #[test]
    fn new_game_starts_with_empty_deck() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = Game::new();
        assert_eq!(game.cards_remaining(), 0);
        game.reset(&mut rng);
        assert_eq!(game.cards_remaining(), DECK_SIZE - 4);
    }

    #[test]
    fn hit_without_bust_continues() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![
            C::Value(5),
            C::Value(2),
            C::Value(3),
            C::Value(7),
            C::Value(4),
        ]);
        game.deal(&mut rng);
        let (state, reward, done) = game.step(Action::Hit, &mut rng).unwrap();
        assert_eq!(state.player_total, 9);
        assert_eq!(reward, 0.0);
        assert!(!done);
        assert!(game.player().unwrap().is_turn_active());
    }

    #[test]
    fn hit_to_bust_loses() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![
            C::Value(5),
            C::Value(10),
            C::Value(9),
            C::Value(7),
            C::Value(5),
        ]);
        game.deal(&mut rng);
        let (state, reward, done) = game.step(Action::Hit, &mut rng).unwrap();
        assert_eq!(state.player_total, 24);
        assert_eq!(reward, -1.0);
        assert!(done);
        assert!(game.player().unwrap().is_bust());
        // Dealer never plays against a busted player.
        assert_eq!(game.dealer().unwrap().hand().cards().len(), 2);
        assert_eq!(game.reward(), Some(-1.0));
    }

    #[test]
    fn stand_on_20_dealer_busts() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![
            C::Value(6),
            C::Value(10),
            C::King,
            C::Value(7),
            C::Value(10),
        ]);
        let state = game.deal(&mut rng);
        assert_eq!(state.player_total, 20);
        assert_eq!(state.dealer_card, 6);

        let (state, reward, done) = game.step(Action::Stand, &mut rng).unwrap();
        assert_eq!(state.player_total, 20);
        assert_eq!(game.dealer().unwrap().hand().total(), 23);
        assert_eq!(reward, 1.0);
        assert!(done);
    }

    #[test]
    fn settle_outcomes() {
        let mut rng = StdRng::seed_from_u64(1);

        // Player 20 against dealer 19.
        let mut game = stacked_game(vec![C::Value(10), C::Value(10), C::Jack, C::Value(9)]);
        game.deal(&mut rng);
        assert_eq!(game.step(Action::Stand, &mut rng).unwrap().1, 1.0);

        // Player 19 against dealer 20.
        let mut game = stacked_game(vec![C::Value(10), C::Value(10), C::Value(9), C::Jack]);
        game.deal(&mut rng);
        assert_eq!(game.step(Action::Stand, &mut rng).unwrap().1, -1.0);

        // Push at 20.
        let mut game = stacked_game(vec![C::Value(10), C::Value(10), C::Queen, C::King]);
        game.deal(&mut rng);
        assert_eq!(game.step(Action::Stand, &mut rng).unwrap().1, 0.0);
        assert_eq!(game.reward(), Some(0.0));
    }

    #[test]
    fn dealer_hits_soft_17() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut deck = Deck::stacked(vec![C::Value(6), C::Value(4), C::Value(9)]);
        let mut dealer = Dealer::new(C::Ace, &mut deck, &mut rng);
        assert_eq!(dealer.hand().total(), 17);
        assert!(dealer.hand().is_soft());

        dealer.play_out(&mut deck, &mut rng);
        assert_eq!(dealer.hand().cards(), &[C::Ace, C::Value(6), C::Value(4)]);
        assert_eq!(dealer.hand().total(), 21);
        assert_eq!(deck.remaining(), 1);
    }

    #[test]
    fn dealer_with_two_aces_draws_past_17() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut deck = Deck::stacked(vec![C::Ace, C::Value(5), C::Value(4), C::Value(9)]);
        let mut dealer = Dealer::new(C::Ace, &mut deck, &mut rng);
        assert_eq!(dealer.hand().total(), 12);

        // 12 -> 17 (soft) -> 21.
        dealer.play_out(&mut deck, &mut rng);
        assert_eq!(dealer.hand().total(), 21);
        assert_eq!(dealer.hand().cards().len(), 4);
        assert_eq!(deck.remaining(), 1);
    }

    #[test]
    fn dealer_stands_on_18() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut deck = Deck::stacked(vec![C::Value(8), C::Value(2)]);
        let mut dealer = Dealer::new(C::King, &mut deck, &mut rng);
        dealer.play_out(&mut deck, &mut rng);
        assert_eq!(dealer.hand().total(), 18);
        assert_eq!(deck.remaining(), 1);
    }

    #[test]
    fn step_after_terminal_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = stacked_game(vec![C::Value(10), C::Value(10), C::Jack, C::Value(9)]);
        game.deal(&mut rng);
        game.step(Action::Stand, &mut rng).unwrap();
        assert_eq!(game.step(Action::Hit, &mut rng), Err(Error::EpisodeOver));
        assert!(game.is_terminal());
        assert_eq!(game.reward(), Some(1.0));
    }

    #[test]
    fn step_before_deal_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut game = Game::new();
        assert_eq!(game.step(Action::Stand, &mut rng), Err(Error::EpisodeOver));
        assert!(game.player().is_none());
    }

    #[test]
    fn episodes_always_terminate() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut game = Game::new();
        for _ in 0..1000 {
            game.reset(&mut rng);
            let mut steps = 0;
            loop {
                let action = if rng.gen_bool(0.5) { Action::Hit } else { Action::Stand };
                let (_, reward, done) = game.step(action, &mut rng).unwrap();
                steps += 1;
                if done {
                    assert!(reward == -1.0 || reward == 0.0 || reward == 1.0);
                    break;
                }
                assert_eq!(reward, 0.0);
            }
            // A player cannot take more than 21 hits without busting.
            assert!(steps <= 21);
        }
    }
}
