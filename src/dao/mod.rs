/// In-process reference store backend.
pub mod memory;
/// Entities shared through the store.
pub mod models;
/// Store trait seam and its error type.
pub mod room_store;
