use std::collections::{HashMap, HashSet};

use log::{debug, info};
use rand::prelude::*;

use crate::config::{decay, TrainingConfig};
use crate::error::Result;
use crate::solver::*;

// Number of points kept on the learning curve.
const CURVE_POINTS: u64 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueEstimate {
    pub avg: f64,
    pub count: u32,
}

impl ValueEstimate {
    // Incremental mean with step size 1/count.
    fn update(&mut self, value: f64) {
        self.count += 1;
        let alpha = 1.0 / self.count as f64;
        self.avg += alpha * (value - self.avg);
    }
}

/// Mean episode reward over consecutive windows of training episodes.
#[derive(Clone, Debug, Default)]
pub struct LearningCurve {
    window: u64,
    episodes: u64,
    sum: f64,
    count: u64,
    points: Vec<(f64, f64)>,
}

impl LearningCurve {
    pub fn new(window: u64) -> LearningCurve {
        LearningCurve {
            window: window.max(1),
            ..LearningCurve::default()
        }
    }

    pub fn record(&mut self, reward: f64) {
        self.episodes += 1;
        self.sum += reward;
        self.count += 1;
        if self.count == self.window {
            self.flush();
        }
    }

    // Closes a partially filled window.
    pub fn finish(&mut self) {
        if self.count > 0 {
            self.flush();
        }
    }

    /// (episode, mean reward) pairs, one per window.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    fn flush(&mut self) {
        let mean = self.sum / self.count as f64;
        debug!("episode {}: mean reward {:.4}", self.episodes, mean);
        self.points.push((self.episodes as f64, mean));
        self.sum = 0.0;
        self.count = 0;
    }
}

/// First-visit Monte Carlo control with epsilon-greedy exploration.
///
/// The agent owns both the environment and the random source; every shuffle
/// and every exploratory choice draws from the same generator.
pub struct MonteCarloAgent<E: Environment, R: Rng> {
    env: E,
    rng: R,
    estimates: HashMap<(E::State, E::Action), ValueEstimate>,
    policy: HashMap<E::State, E::Action>,
    epsilon: f64,
}

impl<E: Environment, R: Rng> MonteCarloAgent<E, R> {
    pub fn new(env: E, rng: R) -> MonteCarloAgent<E, R> {
        MonteCarloAgent {
            env: env,
            rng: rng,
            estimates: HashMap::new(),
            policy: HashMap::new(),
            epsilon: 1.0,
        }
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn policy(&self) -> &HashMap<E::State, E::Action> {
        &self.policy
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn action_value(&self, state: &E::State, action: E::Action) -> Option<f64> {
        self.estimates
            .get(&(state.clone(), action))
            .map(|estimate| estimate.avg)
    }

    pub fn visit_count(&self, state: &E::State, action: E::Action) -> u32 {
        self.estimates
            .get(&(state.clone(), action))
            .map_or(0, |estimate| estimate.count)
    }

    pub fn reset(&mut self) -> E::State {
        self.env.reset(&mut self.rng)
    }

    pub fn step(&mut self, action: E::Action) -> Result<(E::State, f64, bool)> {
        self.env.step(action, &mut self.rng)
    }

    /// Picks a random action with probability `epsilon`, otherwise the policy's
    /// action. States without a policy entry always get a random action.
    pub fn choose_action(&mut self, state: &E::State, epsilon: f64) -> E::Action {
        if self.rng.gen::<f64>() < epsilon {
            return random_action(E::ACTIONS, &mut self.rng);
        }
        match self.policy.get(state) {
            Some(action) => *action,
            None => random_action(E::ACTIONS, &mut self.rng),
        }
    }

    pub fn learn(&mut self, config: &TrainingConfig) -> Result<LearningCurve> {
        config.validate()?;
        info!(
            "learning from {} episodes (gamma {}, epsilon {} -> {})",
            config.num_episodes, config.gamma, config.initial_epsilon, config.min_epsilon
        );

        self.epsilon = config.initial_epsilon;
        let mut curve = LearningCurve::new(config.num_episodes / CURVE_POINTS);
        let progress = progress_bar(config.num_episodes, "learning");
        for _ in 0..config.num_episodes {
            let episode = self.generate_episode(self.epsilon)?;
            curve.record(episode.iter().map(|(_, _, reward)| reward).sum());
            self.update(episode, config.gamma);
            self.epsilon = decay(self.epsilon, config.decay_rate, config.min_epsilon);
            progress.inc(1);
        }
        progress.finish_and_clear();
        curve.finish();

        info!(
            "policy covers {} states, final epsilon {:.5}",
            self.policy.len(),
            self.epsilon
        );
        Ok(curve)
    }

    // Average reward of the greedy policy, falling back to random actions for unseen states.
    pub fn evaluate(&mut self, num_episodes: u64) -> Result<f64> {
        self.evaluate_with(num_episodes, |agent, state| agent.choose_action(state, 0.0))
    }

    pub fn evaluate_with<P>(&mut self, num_episodes: u64, mut policy: P) -> Result<f64>
    where
        P: FnMut(&mut Self, &E::State) -> E::Action,
    {
        if num_episodes == 0 {
            return Ok(0.0);
        }

        let progress = progress_bar(num_episodes, "evaluating");
        let mut total_reward = 0.0;
        for _ in 0..num_episodes {
            let mut state = self.reset();
            loop {
                let action = policy(&mut *self, &state);
                let (new_state, reward, done) = self.step(action)?;
                total_reward += reward;
                if done {
                    break;
                }
                state = new_state;
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let average = total_reward / num_episodes as f64;
        info!(
            "average reward over {} episodes is {:.4}",
            num_episodes, average
        );
        Ok(average)
    }

    // Plays one episode. Only the very first action is forced to be random.
    fn generate_episode(&mut self, epsilon: f64) -> Result<Vec<(E::State, E::Action, f64)>> {
        let mut state = self.reset();
        let mut action = random_action(E::ACTIONS, &mut self.rng);
        let mut episode = Vec::new();
        loop {
            let (new_state, reward, done) = self.step(action)?;
            episode.push((state, action, reward));
            if done {
                break;
            }
            state = new_state;
            action = self.choose_action(&state, epsilon);
        }
        Ok(episode)
    }

    // Backward pass over the episode followed by greedy improvement of the touched states.
    fn update(&mut self, episode: Vec<(E::State, E::Action, f64)>, discount: f64) {
        let mut visited = HashSet::new();
        let mut returns = 0.0;
        for (state, action, reward) in episode.into_iter().rev() {
            returns = returns * discount + reward;
            let key = (state, action);
            if visited.contains(&key) {
                continue;
            }
            self.estimates
                .entry(key.clone())
                .or_insert_with(ValueEstimate::default)
                .update(returns);
            visited.insert(key);
        }

        let states: HashSet<E::State> = visited.into_iter().map(|(state, _)| state).collect();
        for state in states {
            if let Some(action) = self.greedy_action(&state) {
                self.policy.insert(state, action);
            }
        }
    }

    // Only a strictly greater value replaces the best action, so ties go to the
    // action listed first.
    fn greedy_action(&self, state: &E::State) -> Option<E::Action> {
        let mut best_action = None;
        let mut max_value = f64::NEG_INFINITY;
        for action in E::ACTIONS {
            if let Some(value) = self.action_value(state, *action) {
                if value > max_value {
                    best_action = Some(*action);
                    max_value = value;
                }
            }
        }
        best_action
    }
}
