//! Match engine and room synchronization core for a two-player, nine-cell
//! grid game.
//!
//! Local matches run through [`services::local_service::LocalSession`].
//! Networked matches go through [`services::room_service`], which binds a
//! [`state::remote::RemoteSession`] to a room document shared via a
//! [`dao::room_store::RoomStore`] backend; every client mirrors the room
//! through its subscription and the store stays the single source of truth.

pub mod dao;
pub mod error;
pub mod rules;
pub mod services;
pub mod state;
