use std::io::{self, Write};

use pagepress_core::{AppViewModel, Phase};

type Clock = Box<dyn Fn() -> String>;

/// Incremental terminal view: prints only what changed since the last render.
pub struct Renderer<W: Write> {
    out: W,
    clock: Clock,
    printed_lines: usize,
    announced: Option<String>,
    warned_lost: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self::with_clock(out, Box::new(|| chrono::Local::now().format("%H:%M:%S").to_string()))
    }

    pub fn with_clock(out: W, clock: Clock) -> Self {
        Self {
            out,
            clock,
            printed_lines: 0,
            announced: None,
            warned_lost: false,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        if view.log.len() < self.printed_lines || view.session_id.is_none() {
            // New or cleared session.
            self.printed_lines = 0;
            self.warned_lost = false;
        }

        if let (Some(session_id), Some(url)) = (&view.session_id, &view.source_url) {
            if self.announced.as_deref() != Some(session_id.as_str()) {
                writeln!(self.out, "Converting {url} (session {session_id})")?;
                self.announced = Some(session_id.to_string());
            }
        }

        for line in &view.log[self.printed_lines..] {
            writeln!(self.out, "[{}] {}", (self.clock)(), line)?;
        }
        self.printed_lines = view.log.len();

        if view.connection_lost && !self.warned_lost {
            writeln!(
                self.out,
                "Lost connection to the progress stream; the job may still be running."
            )?;
            self.warned_lost = true;
        }
        self.out.flush()
    }

    pub fn finish(&mut self, view: &AppViewModel) -> io::Result<()> {
        match view.phase {
            Phase::Succeeded => writeln!(self.out, "Conversion finished.")?,
            Phase::Failed => {
                let reason = view.error.as_deref().unwrap_or("unknown error");
                writeln!(self.out, "Conversion failed: {reason}")?;
            }
            Phase::Running | Phase::Idle => {}
        }
        self.out.flush()
    }

    pub fn artifact(&mut self, link: &str) -> io::Result<()> {
        writeln!(self.out, "Download: {link}")?;
        self.out.flush()
    }

    pub fn interrupted(&mut self) -> io::Result<()> {
        writeln!(self.out, "Interrupted; progress tracking stopped.")?;
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
