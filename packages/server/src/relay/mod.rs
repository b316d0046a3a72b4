//! Relay core: single-owner command processing for rooms and cached locations.

mod command;
mod service;

pub use command::{RelayCommand, RoomSnapshot};
pub use service::{RelayHandle, RelayService};
