use std::fmt::Debug;
use std::hash::Hash;

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;

use crate::error::Result;

pub mod monte_carlo;

/// An episodic environment driven one action at a time.
///
/// Randomness is supplied by the caller so a whole run can be replayed from a
/// single seed.
pub trait Environment {
    type State: Clone + Debug + Eq + Hash;
    type Action: Copy + Debug + Eq + Hash + 'static;

    // All actions, in the order used to break ties between equal values.
    const ACTIONS: &'static [Self::Action];

    // Starts a new episode and returns its initial state.
    fn reset<R: Rng>(&mut self, rng: &mut R) -> Self::State;

    // Returns the next state, the reward and whether the episode is over.
    fn step<R: Rng>(
        &mut self,
        action: Self::Action,
        rng: &mut R,
    ) -> Result<(Self::State, f64, bool)>;
}

pub fn random_action<A: Copy, R: Rng>(actions: &[A], rng: &mut R) -> A {
    actions[rng.gen_range(0..actions.len())]
}

pub fn progress_bar(len: u64, label: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{msg} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})")
    {
        bar.set_style(style);
    }
    bar.set_message(label);
    bar
}
