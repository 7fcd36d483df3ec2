//! Terminal stylesheet. Every style is plain until `colorize` runs, so
//! `--no-color`, `NO_COLOR`, and non-TTY output need no special casing.

use fleet_common::ContainerStatus;
use owo_colors::Style;

#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Timestamps, image names, and other secondary detail.
    pub dim: Style,
    pub header: Style,
    /// The backup `latest` points at.
    pub latest: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        *self = Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            dim: Style::new().dimmed(),
            header: Style::new().bold().cyan(),
            latest: Style::new().bold().magenta(),
        };
    }

    /// Running is good news, stopped is worth a look, anything else is detail.
    #[must_use]
    pub fn container_status(&self, status: &ContainerStatus) -> Style {
        match status {
            ContainerStatus::Running => self.success,
            ContainerStatus::Stopped => self.warning,
            _ => self.dim,
        }
    }
}
