// error.rs - CLI errors
//
// One diagnostic on stderr naming the failing stage, then a non-zero exit code.

use ring_life::{ConfigError, LifeError, Stage};
use std::io;
use std::process;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Failed to start the async runtime for the workers
    #[error("Failed to start worker runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Display window could not be created or crashed
    #[error("Display window error: {0}")]
    Window(String),

    #[error(transparent)]
    Simulation(#[from] LifeError),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Simulation(err.into())
    }
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Simulation(LifeError::Config(_)) => {
                eprintln!();
                eprintln!("Run with --list-patterns to see the built-in patterns.");
                process::exit(2)
            }
            CliError::Simulation(err) if err.stage() == Some(Stage::Bridge) => {
                eprintln!();
                eprintln!("The display lost contact with the compute group.");
            }
            _ => {}
        }

        process::exit(1)
    }
}
