mod deck;
mod game;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use plotlib::{
    page::Page,
    repr::Plot,
    style::{PointMarker, PointStyle},
    view::ContinuousView,
};
use prettytable::{Cell, Row, Table};
use rand::prelude::*;

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::solver::monte_carlo::{LearningCurve, MonteCarloAgent};

pub use deck::Deck;
pub use game::{Dealer, Game, Player};

pub const BLACKJACK: u32 = 21;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Card {
    Ace,
    Value(u32),
    Jack,
    Queen,
    King,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Action {
    Hit,
    Stand,
}

// Ordered, append-only list of cards. Totals are derived on demand.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Hand {
    cards: Vec<Card>,
}

/// What the player sees before each decision.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct State {
    pub player_total: u32,
    // Ace counts as 11, faces as 10.
    pub dealer_card: u32,
    pub usable_ace: bool,
    pub ace_count: u32,
}

impl Card {
    pub fn is_ace(&self) -> bool {
        match self {
            Card::Ace => true,
            _ => false,
        }
    }

    // Value with an ace counted high.
    pub fn value(&self) -> u32 {
        match self {
            Card::Ace => 11,
            Card::Value(v) => *v,
            Card::Jack | Card::Queen | Card::King => 10,
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Action> {
        match s {
            "hit" => Ok(Action::Hit),
            "stand" | "stick" => Ok(Action::Stand),
            _ => Err(Error::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Hit => write!(f, "hit"),
            Action::Stand => write!(f, "stand"),
        }
    }
}

impl Hand {
    pub fn from_cards(cards: &[Card]) -> Hand {
        Hand {
            cards: cards.to_vec(),
        }
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn total(&self) -> u32 {
        self.evaluate().0
    }

    pub fn is_soft(&self) -> bool {
        let (total, high_aces) = self.evaluate();
        high_aces > 0 && total <= BLACKJACK
    }

    pub fn ace_count(&self) -> u32 {
        self.cards.iter().filter(|c| c.is_ace()).count() as u32
    }

    pub fn is_bust(&self) -> bool {
        self.total() > BLACKJACK
    }

    // Returns the best total and the number of aces still counted as 11.
    fn evaluate(&self) -> (u32, u32) {
        let mut total: u32 = self.cards.iter().map(|c| c.value()).sum();
        let mut high_aces = self.ace_count();
        while total > BLACKJACK && high_aces > 0 {
            total -= 10;
            high_aces -= 1;
        }
        (total, high_aces)
    }
}

// A policy that only sticks on 20 or higher.
pub fn stick_at_20_policy(state: &State) -> Action {
    if state.player_total < 20 {
        Action::Hit
    } else {
        Action::Stand
    }
}

pub fn print_policy<R: Rng>(agent: &MonteCarloAgent<Game, R>) {
    // Several ace counts share a cell; show the most visited one.
    let mut cells: HashMap<(u32, u32, bool), (Action, u32)> = HashMap::new();
    for (state, action) in agent.policy() {
        let visits =
            agent.visit_count(state, Action::Hit) + agent.visit_count(state, Action::Stand);
        let key = (state.player_total, state.dealer_card, state.usable_ace);
        let entry = cells.entry(key).or_insert((*action, visits));
        if visits > entry.1 {
            *entry = (*action, visits);
        }
    }

    let mut table = Table::new();

    // Print header.
    let mut header = Vec::new();
    header.push(Cell::new(""));
    header.push(Cell::new("Ace?"));
    for dealer_card in 2..=11 {
        header.push(match dealer_card {
            11 => Cell::new("A"),
            v => Cell::new(&format!("{}", v)),
        });
    }
    table.add_row(Row::new(header));

    for usable_ace in &[false, true] {
        for player_sum in 12..=BLACKJACK {
            let mut cells_row = Vec::new();
            cells_row.push(Cell::new(&format!("{}", player_sum)));
            cells_row.push(Cell::new(match usable_ace {
                true => "Y",
                false => "N",
            }));
            for dealer_card in 2..=11 {
                match cells.get(&(player_sum, dealer_card, *usable_ace)) {
                    Some((Action::Hit, _)) => cells_row.push(Cell::new("H")),
                    Some((Action::Stand, _)) => cells_row.push(Cell::new("S")),
                    None => cells_row.push(Cell::new("")),
                }
            }
            table.add_row(Row::new(cells_row));
        }
    }
    table.printstd();
}

pub fn print_learning_curve(curve: &LearningCurve) {
    let points = curve.points();
    let last = match points.last() {
        Some((episode, _)) => *episode,
        None => return,
    };
    let s1 = Plot::new(points.to_vec()).point_style(PointStyle::new().marker(PointMarker::Circle));
    let v = ContinuousView::new()
        .add(s1)
        .x_range(0.0, last)
        .y_range(-1.0, 1.0)
        .x_label("Episode")
        .y_label("Average reward");
    match Page::single(&v).dimensions(100, 30).to_text() {
        Ok(text) => println!("{}", text),
        Err(err) => warn!("failed to plot learning curve: {:?}", err),
    }
}

fn log_last_round(game: &Game) {
    if !game.is_terminal() {
        return;
    }
    if let (Some(player), Some(dealer)) = (game.player(), game.dealer()) {
        debug!(
            "last round: player {:?} ({}), dealer {:?} ({}) up {:?}, reward {:?}, {} left",
            player.hand().cards(),
            player.hand().total(),
            dealer.hand().cards(),
            dealer.hand().total(),
            dealer.upcard(),
            game.reward(),
            game.cards_remaining()
        );
    }
}

pub fn run(config: &TrainingConfig, eval_episodes: u64, seed: Option<u64>) -> Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!("training blackjack agent (seed {:?})", seed);
    let game = Game::new();
    let mut agent = MonteCarloAgent::new(game, rng);

    let curve = agent.learn(config)?;
    print_policy(&agent);
    print_learning_curve(&curve);

    let optimal = agent.evaluate(eval_episodes)?;
    log_last_round(agent.env());
    let naive = agent.evaluate_with(eval_episodes, |_, state| stick_at_20_policy(state))?;
    println!("Average naive returns: {:.4}", naive);
    println!("Average optimal returns: {:.4}", optimal);
    Ok(())
}
