//! Domain types shared by the monitor, store and notification layers.

mod creator;

pub use creator::TrackedCreator;
