//! Interactive map, network and circle-packing explorer.
//!
//! The library holds everything that can run without a window: dataset
//! parsing, layouts and the interaction controllers. `src/app` is the egui
//! front end on top of it.

pub mod config;
pub mod data;
pub mod interaction;
pub mod layout;
pub mod util;
