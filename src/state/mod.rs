/// Same-device match state machine.
pub mod local;
/// Networked session controller and room mirror.
pub mod remote;
