//! Shared types for MTG Arena tooling
//!
//! Card metadata lookups against Scryfall (by Arena id, one at a time or via the
//! bulk `default_cards` dataset) and the error type they share.

pub mod error;
pub mod scryfall;

pub use error::{MtgError, Result};
pub use scryfall::{CardMeta, ScryfallClient};
