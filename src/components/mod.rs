//! Browser components, compiled for `wasm32` only.

pub mod sociogram;
