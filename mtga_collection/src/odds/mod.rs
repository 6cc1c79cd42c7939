//! Live draw odds for tracked card groups

pub mod deck;
pub mod engine;
pub mod hypergeometric;

pub use deck::{DeckCard, DeckFile, DeckGroup};
pub use engine::{GroupState, OddsEngine, OddsRow};
pub use hypergeometric::HypergeometricInput;
