//! Typed errors at module boundaries. The main loop and CLI glue match on
//! `anyhow::Error::downcast_ref` only where the taxonomy in the error design
//! actually branches on them (see `trading_loop`'s shutdown-state check);
//! everywhere else these just carry a clearer message through `?`.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("circuit breaker is in SHUTDOWN, no further cycles permitted until force_recovery")]
    Shutdown,
    #[error(transparent)]
    Venue(#[from] VenueError),
}

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("no open position for {0}")]
    NoOpenPosition(String),
    #[error("unsupported operation on this venue adapter: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
