//! Status surface: Elm-style model, pure update, plain-text rendering, and
//! (with the `cli` feature) terminal input.

pub mod model;
pub mod render;
pub mod update;

#[cfg(feature = "cli")]
pub mod input;
#[cfg(feature = "cli")]
pub mod screen;
#[cfg(feature = "cli")]
pub mod terminal_guard;

#[cfg(test)]
mod test_properties;
