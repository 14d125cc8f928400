use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid action {0:?}, expected one of: hit, stand, stick")]
    InvalidAction(String),
    // Also returned when stepping a game that was never dealt.
    #[error("episode is over, call reset() before stepping again")]
    EpisodeOver,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
