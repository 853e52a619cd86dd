//! Schema inference over captured JSON bodies.

pub mod derive;
