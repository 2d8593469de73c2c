// Core modules implementing command decoding, placement state, events, and errors.
pub mod command;
pub mod error;
pub mod event;
pub mod state;
pub mod vec3;
