pub mod device;
pub mod local;

use thiserror::Error;

use crate::types::ActuationCommand;

/// Wire payload bound for queued moves; larger deltas are clamped.
pub const MOVE_LIMIT: i32 = 127;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel disconnected")]
    Disconnected,
    #[error("send failed: {0}")]
    Send(String),
}

/// A delivery path for actuation commands. Constructed once at startup,
/// shut down once at exit.
pub trait ActuationChannel: Send {
    fn name(&self) -> &'static str;
    fn connected(&self) -> bool;
    fn send(&mut self, cmd: ActuationCommand) -> Result<(), ChannelError>;
    /// Re-establish the underlying connection. No-op for local
    /// injection; never called automatically on the dispatch path.
    fn reconnect(&mut self) -> Result<(), ChannelError>;
    fn shutdown(&mut self);
}

/// Render a command as one protocol line, without the terminator.
pub fn encode(cmd: ActuationCommand) -> String {
    match cmd {
        ActuationCommand::Move(dx, dy) => format!(
            "M,{},{}",
            dx.clamp(-MOVE_LIMIT, MOVE_LIMIT),
            dy.clamp(-MOVE_LIMIT, MOVE_LIMIT)
        ),
        ActuationCommand::Click(ms) => format!("C,{}", ms),
        ActuationCommand::RightClick => "R".to_string(),
        ActuationCommand::Ping => "P".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_encode_to_protocol_lines() {
        assert_eq!(encode(ActuationCommand::Move(5, -12)), "M,5,-12");
        assert_eq!(encode(ActuationCommand::Click(45)), "C,45");
        assert_eq!(encode(ActuationCommand::RightClick), "R");
        assert_eq!(encode(ActuationCommand::Ping), "P");
    }

    #[test]
    fn move_payloads_clamp_to_wire_range() {
        assert_eq!(encode(ActuationCommand::Move(300, -300)), "M,127,-127");
        assert_eq!(encode(ActuationCommand::Move(-127, 127)), "M,-127,127");
    }
}
