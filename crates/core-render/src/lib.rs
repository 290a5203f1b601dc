//! Text rendering of the mapping playground.
//!
//! Everything here produces plain `String`s; colour is opt-in through
//! [`RenderOptions`] so tests compare exact layout without escape codes.

pub mod ruler;
pub mod view;

pub use view::{after_range, render_view};

use core_session::{SessionObserver, SessionView};
use crossterm::style::Stylize;
use std::io::Write;
use std::sync::Mutex;
use tracing::warn;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub color: bool,
}

/// Semantic colour roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Highlight,
    Cursor,
    Extra,
    Deleted,
    Title,
}

pub(crate) fn paint(text: &str, tone: Tone, opts: &RenderOptions) -> String {
    if !opts.color {
        return text.to_string();
    }
    match tone {
        Tone::Highlight => text.yellow().to_string(),
        Tone::Cursor => text.cyan().to_string(),
        Tone::Extra => text.magenta().to_string(),
        Tone::Deleted => text.red().to_string(),
        Tone::Title => text.bold().to_string(),
    }
}

/// Observer that writes a freshly rendered view after every session change.
pub struct ViewPrinter<W> {
    out: Mutex<W>,
    opts: RenderOptions,
}

impl<W: Write + Send> ViewPrinter<W> {
    pub fn new(out: W, opts: RenderOptions) -> Self {
        Self {
            out: Mutex::new(out),
            opts,
        }
    }

    pub fn print(&self, view: &SessionView) {
        let frame = render_view(view, &self.opts);
        let Ok(mut out) = self.out.lock() else {
            warn!(target: "render", "printer_lock_poisoned");
            return;
        };
        if let Err(e) = writeln!(out, "{frame}").and_then(|_| out.flush()) {
            warn!(target: "render", error = %e, "view_write_failed");
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> SessionObserver for ViewPrinter<W> {
    fn on_view(&self, view: &SessionView) {
        self.print(view);
    }
}
