use std::io::Write;
use std::process::{Child, Command, Stdio};

use super::script::{write_script, Plot};
use crate::error::RenderError;

/// Destination for plot scripts. Owned by the render thread only.
pub trait PlotSink: Send {
    fn draw(&mut self, plots: &[&Plot]) -> Result<(), RenderError>;

    fn finish(self: Box<Self>) -> Result<(), RenderError>;
}

/// A `gnuplot -persist` child process fed through its stdin.
pub struct Gnuplot {
    child: Child,
    buffer: Vec<u8>,
}

impl Gnuplot {
    pub fn spawn(program: &str) -> Result<Self, RenderError> {
        Self::spawn_with_args(program, &["-persist"])
    }

    /// Starts `program` with `args`, reading scripts from its stdin.
    pub fn spawn_with_args(program: &str, args: &[&str]) -> Result<Self, RenderError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: program.to_string(),
                source,
            })?;

        log::info!("Started {} (pid {})", program, child.id());

        Ok(Self {
            child,
            buffer: Vec::new(),
        })
    }
}

impl PlotSink for Gnuplot {
    fn draw(&mut self, plots: &[&Plot]) -> Result<(), RenderError> {
        if let Ok(Some(status)) = self.child.try_wait() {
            return Err(RenderError::Exited(status.to_string()));
        }

        // Format fully before touching the pipe
        self.buffer.clear();
        write_script(&mut self.buffer, plots).map_err(RenderError::Write)?;

        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| RenderError::Exited("stdin closed".into()))?;
        let written = stdin.write_all(&self.buffer).and_then(|()| stdin.flush());

        // A partial script leaves gnuplot inside a data block; nothing sent
        // after it would parse, so give up on the pipe.
        if let Err(err) = written {
            drop(self.child.stdin.take());
            return Err(RenderError::Stream(err));
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), RenderError> {
        // Close stdin to signal EOF
        drop(self.child.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| RenderError::Exited(e.to_string()))?;
        if !status.success() {
            return Err(RenderError::Exited(status.to_string()));
        }

        log::info!("gnuplot closed");
        Ok(())
    }
}

/// Writes scripts to any writer, e.g. stdout for `--dump`.
pub struct ScriptWriter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> ScriptWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> PlotSink for ScriptWriter<W> {
    fn draw(&mut self, plots: &[&Plot]) -> Result<(), RenderError> {
        write_script(&mut self.out, plots).map_err(RenderError::Write)
    }

    fn finish(mut self: Box<Self>) -> Result<(), RenderError> {
        self.out.flush().map_err(RenderError::Write)
    }
}
