//! Where shown figures go.

use crate::figure::Figure;
use crate::{RenderError, Result};
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

pub trait DisplaySurface {
    fn show(&mut self, figure: &Figure) -> Result<()>;
}

/// No display attached. Showing a figure is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl DisplaySurface for Headless {
    fn show(&mut self, figure: &Figure) -> Result<()> {
        tracing::warn!(figure = figure.id(), "show requested without a display");
        Err(RenderError::NoDisplay)
    }
}

/// Writes the figure to a temporary SVG file and opens it with the platform's default viewer.
///
/// The file is kept after the call returns so the viewer can still read it.
#[derive(Debug, Clone, Default)]
pub struct SystemViewer {
    /// Overrides the platform opener (`open`, `xdg-open`, `cmd /C start`).
    pub opener: Option<PathBuf>,
}

impl SystemViewer {
    fn command(&self, file: &std::path::Path) -> Command {
        if let Some(opener) = &self.opener {
            let mut cmd = Command::new(opener);
            cmd.arg(file);
            return cmd;
        }
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(file);
            cmd
        } else if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]).arg(file);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(file);
            cmd
        }
    }
}

impl DisplaySurface for SystemViewer {
    fn show(&mut self, figure: &Figure) -> Result<()> {
        let display_err = |message: String| RenderError::Display { message };

        let file = tempfile::Builder::new()
            .prefix("alluvia-")
            .suffix(".svg")
            .tempfile()
            .map_err(|e| display_err(e.to_string()))?;
        std::fs::write(file.path(), figure.svg()).map_err(|e| display_err(e.to_string()))?;
        let (_, path) = file.keep().map_err(|e| display_err(e.to_string()))?;

        let mut cmd = self.command(&path);
        cmd.spawn().map_err(|e| {
            display_err(format!("failed to launch viewer for `{}`: {e}", path.display()))
        })?;
        tracing::info!(figure = figure.id(), path = %path.display(), "figure opened in viewer");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownFigure {
    pub id: u64,
    pub svg: String,
}

/// Keeps every shown figure in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisplay {
    shown: Arc<Mutex<Vec<ShownFigure>>>,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ShownFigure>> {
        self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn shown(&self) -> Vec<ShownFigure> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl DisplaySurface for MemoryDisplay {
    fn show(&mut self, figure: &Figure) -> Result<()> {
        self.lock().push(ShownFigure {
            id: figure.id(),
            svg: figure.svg().to_string(),
        });
        tracing::debug!(figure = figure.id(), "figure shown in memory");
        Ok(())
    }
}
