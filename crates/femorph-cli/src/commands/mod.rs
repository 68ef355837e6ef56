pub mod coords;
pub mod setup;
