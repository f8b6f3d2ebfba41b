/// Same-device session wrapper driving the draw auto-restart timer.
pub mod local_service;
/// Room lifecycle: create and join under a normalized key.
pub mod room_service;
