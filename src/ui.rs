//! Coloured terminal output for the CLI.

use console::Style;

use crate::workflow::{AuditTrail, WorkflowState};

pub struct Printer {
    green: Style,
    cyan: Style,
    dim: Style,
}

impl Default for Printer {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }
}

impl Printer {
    pub fn state(&self, step: usize, state: &WorkflowState, terminal: bool) {
        let marker = if terminal {
            self.green.apply_to("■")
        } else {
            self.cyan.apply_to("→")
        };
        println!("  {marker} {} {}", self.dim.apply_to(format!("#{step}")), state);
    }

    pub fn audit(&self, trail: &AuditTrail) {
        println!();
        println!("{}", self.green.apply_to("─── Audit Trail ───"));
        println!("{}", serde_json::to_string_pretty(trail).unwrap_or_default());
    }

    pub fn json(&self, title: &str, body: &str) {
        println!("{}", self.cyan.apply_to(format!("─── {title} ───")));
        println!("{body}");
    }
}
