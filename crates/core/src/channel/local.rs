use crate::platform::Injector;
use crate::sleep;
use crate::types::ActuationCommand;

use super::{ActuationChannel, ChannelError};

/// Synchronous injection through the host. A failed command affects
/// only itself; there is no connection to lose.
pub struct LocalChannel {
    injector: Box<dyn Injector>,
}

impl LocalChannel {
    pub fn new(injector: Box<dyn Injector>) -> Self {
        Self { injector }
    }
}

impl ActuationChannel for LocalChannel {
    fn name(&self) -> &'static str {
        "local"
    }

    fn connected(&self) -> bool {
        true
    }

    fn send(&mut self, cmd: ActuationCommand) -> Result<(), ChannelError> {
        let res = match cmd {
            ActuationCommand::Move(dx, dy) => self.injector.move_rel(dx, dy),
            ActuationCommand::Click(ms) => match self.injector.press_left() {
                Ok(()) => {
                    sleep::sleep_ms(ms as u64);
                    self.injector.release_left()
                }
                Err(e) => Err(e),
            },
            ActuationCommand::RightClick => self.injector.click_right(),
            ActuationCommand::Ping => Ok(()),
        };
        res.map_err(|e| ChannelError::Send(format!("{e:#}")))
    }

    fn reconnect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        fail_moves: bool,
    }

    impl Injector for Recorder {
        fn move_rel(&mut self, dx: i32, dy: i32) -> Result<()> {
            if self.fail_moves {
                bail!("injection refused");
            }
            self.calls.lock().unwrap().push(format!("move {dx} {dy}"));
            Ok(())
        }

        fn press_left(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push("press".to_string());
            Ok(())
        }

        fn release_left(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push("release".to_string());
            Ok(())
        }

        fn click_right(&mut self) -> Result<()> {
            self.calls.lock().unwrap().push("right".to_string());
            Ok(())
        }

        fn position(&mut self) -> Result<(i32, i32)> {
            Ok((0, 0))
        }
    }

    fn channel(fail_moves: bool) -> (LocalChannel, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let ch = LocalChannel::new(Box::new(Recorder { calls: Arc::clone(&calls), fail_moves }));
        (ch, calls)
    }

    #[test]
    fn move_and_click_reach_the_injector() {
        let (mut ch, calls) = channel(false);
        ch.send(ActuationCommand::Move(3, -4)).unwrap();
        ch.send(ActuationCommand::Click(1)).unwrap();
        ch.send(ActuationCommand::RightClick).unwrap();

        let log = calls.lock().unwrap();
        assert_eq!(*log, vec!["move 3 -4", "press", "release", "right"]);
    }

    #[test]
    fn injection_failure_reports_send_error() {
        let (mut ch, _) = channel(true);
        let err = ch.send(ActuationCommand::Move(1, 1)).unwrap_err();
        assert!(matches!(err, ChannelError::Send(_)));
        assert!(ch.connected());
    }

    #[test]
    fn ping_is_a_no_op_locally() {
        let (mut ch, calls) = channel(false);
        ch.send(ActuationCommand::Ping).unwrap();
        assert!(calls.lock().unwrap().is_empty());
    }
}
