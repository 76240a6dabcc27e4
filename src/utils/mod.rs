//! The `utils` module holds the pieces shared across `pushsub`: the crate error
//! type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{PubSubError, Result};
