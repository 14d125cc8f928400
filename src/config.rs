use crate::error::{Error, Result};

pub const DEFAULT_EPISODES: u64 = 5_000_000;
pub const DEFAULT_GAMMA: f64 = 0.999;
pub const DEFAULT_INITIAL_EPSILON: f64 = 0.5;
pub const DEFAULT_DECAY_RATE: f64 = 0.99999;
pub const DEFAULT_MIN_EPSILON: f64 = 0.001;
pub const DEFAULT_EVAL_EPISODES: u64 = 10_000;

/// Parameters of a Monte Carlo control run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingConfig {
    pub num_episodes: u64,
    // Discount applied to the running return, in (0, 1].
    pub gamma: f64,
    pub initial_epsilon: f64,
    // Per-episode multiplicative decay of epsilon, in (0, 1].
    pub decay_rate: f64,
    // Floor for the decayed epsilon.
    pub min_epsilon: f64,
}

impl Default for TrainingConfig {
    fn default() -> TrainingConfig {
        TrainingConfig {
            num_episodes: DEFAULT_EPISODES,
            gamma: DEFAULT_GAMMA,
            initial_epsilon: DEFAULT_INITIAL_EPSILON,
            decay_rate: DEFAULT_DECAY_RATE,
            min_epsilon: DEFAULT_MIN_EPSILON,
        }
    }
}

fn check(ok: bool, msg: String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidConfig(msg))
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        check(
            self.gamma > 0.0 && self.gamma <= 1.0,
            format!("gamma must be in (0, 1], got {}", self.gamma),
        )?;
        check(
            (0.0..=1.0).contains(&self.initial_epsilon),
            format!(
                "initial epsilon must be in [0, 1], got {}",
                self.initial_epsilon
            ),
        )?;
        check(
            self.decay_rate > 0.0 && self.decay_rate <= 1.0,
            format!("decay rate must be in (0, 1], got {}", self.decay_rate),
        )?;
        check(
            (0.0..=1.0).contains(&self.min_epsilon),
            format!("min epsilon must be in [0, 1], got {}", self.min_epsilon),
        )
    }

    // Epsilon in effect after `episodes` decay steps.
    pub fn epsilon_after(&self, episodes: u64) -> f64 {
        let mut epsilon = self.initial_epsilon;
        for _ in 0..episodes {
            epsilon = decay(epsilon, self.decay_rate, self.min_epsilon);
        }
        epsilon
    }
}

pub fn decay(epsilon: f64, decay_rate: f64, min_epsilon: f64) -> f64 {
    min_epsilon.max(epsilon * decay_rate)
}
