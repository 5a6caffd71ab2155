use std::io::Write;

use crate::keymap::Key;

/// Something that can physically (or virtually) operate keys.
///
/// Every call may fail; the player reports the failure and carries on.
pub trait Actuator {
    fn press(&mut self, key: Key) -> anyhow::Result<()>;
    fn release(&mut self, key: Key) -> anyhow::Result<()>;
    /// Press and immediately release.
    fn tap(&mut self, key: Key) -> anyhow::Result<()>;
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    fn press(&mut self, key: Key) -> anyhow::Result<()> {
        (**self).press(key)
    }

    fn release(&mut self, key: Key) -> anyhow::Result<()> {
        (**self).release(key)
    }

    fn tap(&mut self, key: Key) -> anyhow::Result<()> {
        (**self).tap(key)
    }
}

/// Display-only actuator: writes each action as a line of text.
pub struct ConsoleActuator<W: Write> {
    out: W,
}

impl ConsoleActuator<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleActuator<W> {
    pub fn new(out: W) -> Self {
        ConsoleActuator { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, action: &str, key: Key) -> anyhow::Result<()> {
        writeln!(self.out, "{action}: {key}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Actuator for ConsoleActuator<W> {
    fn press(&mut self, key: Key) -> anyhow::Result<()> {
        self.emit("Press", key)
    }

    fn release(&mut self, key: Key) -> anyhow::Result<()> {
        self.emit("Release", key)
    }

    fn tap(&mut self, key: Key) -> anyhow::Result<()> {
        self.emit("Tap", key)
    }
}
