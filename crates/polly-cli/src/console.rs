use colored::{Color, ColoredString, Colorize};
use std::io::Write;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Color,
    pub bold: bool,
}

impl Style {
    const fn new(color: Color, bold: bool) -> Self {
        Self { color, bold }
    }
}

/// Colours for each kind of output. Built once at startup and handed to the
/// [`Console`].
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub phase: Style,
    pub agent: Style,
    pub user: Style,
    pub tool: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Emit ANSI escapes at all.
    pub color: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            phase: Style::new(Color::Magenta, true),
            agent: Style::new(Color::Cyan, true),
            user: Style::new(Color::Green, true),
            tool: Style::new(Color::BrightBlack, false),
            success: Style::new(Color::Green, true),
            warning: Style::new(Color::Yellow, false),
            error: Style::new(Color::Red, true),
            info: Style::new(Color::Blue, false),
            color: colored::control::SHOULD_COLORIZE.should_colorize(),
        }
    }
}

impl Theme {
    /// No escapes; used when output is captured.
    pub fn plain() -> Self {
        Self {
            color: false,
            ..Self::default()
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if !self.color {
            return text.to_string();
        }
        let s: ColoredString = text.color(style.color);
        let s = if style.bold { s.bold() } else { s };
        s.to_string()
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

const RULE_WIDTH: usize = 60;

/// All user-facing output. Write failures on the terminal are ignored.
pub struct Console {
    out: Box<dyn Write + Send>,
    theme: Theme,
}

impl Console {
    pub fn new(out: Box<dyn Write + Send>, theme: Theme) -> Self {
        Self { out, theme }
    }

    pub fn stdout(theme: Theme) -> Self {
        Self::new(Box::new(std::io::stdout()), theme)
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn rule(&self, style: Style) -> String {
        self.theme.paint(&"─".repeat(RULE_WIDTH), style)
    }

    pub fn blank(&mut self) {
        self.line("");
    }

    pub fn welcome(&mut self) {
        let t = self.theme.clone();
        let rule = self.rule(t.agent);
        self.line(&rule);
        self.line(&t.paint("Polly", t.agent));
        self.line("Turns high-level feature ideas into incremental coding prompts.");
        self.blank();
        self.line(&format!(
            "  {} start with discovery to map out every feature at once",
            t.paint("New project?", t.user)
        ));
        self.line(&format!(
            "  {} define a new feature or expand a stub",
            t.paint("Existing project?", t.user)
        ));
        self.blank();
        self.line("  Context Gathering → Discovery → Incremental Grouping → Prompt Generation");
        self.line("  Type 'exit' or 'quit' at any prompt to go back.");
        self.line(&rule);
    }

    pub fn phase_header(&mut self, title: &str) {
        let t = self.theme.clone();
        let rule = self.rule(t.phase);
        self.blank();
        self.line(&rule);
        self.line(&t.paint(&format!("Starting: {title}"), t.phase));
        self.line(&rule);
        self.blank();
    }

    pub fn phase_complete(&mut self, title: &str, extra: Option<&str>) {
        let t = self.theme.clone();
        self.blank();
        self.line(&t.paint(&format!("✓ {title} Complete"), t.success));
        if let Some(extra) = extra {
            self.blank();
            for l in extra.lines() {
                self.line(&format!("  {l}"));
            }
        }
        self.blank();
    }

    /// One block of agent text. Leading and trailing blank lines are dropped.
    pub fn agent_text(&mut self, text: &str) {
        let text = text.trim_matches('\n');
        if text.trim().is_empty() {
            return;
        }
        let label = self.theme.paint("Agent:", self.theme.agent);
        self.line(&format!("{label} {text}"));
    }

    pub fn tool_usage(&mut self, tool: &str) {
        let msg = self.theme.paint(&format!("[Using {tool}...]"), self.theme.tool);
        self.line(&msg);
    }

    pub fn error(&mut self, msg: &str) {
        let label = self.theme.paint("Error:", self.theme.error);
        self.line(&format!("{label} {msg}"));
    }

    pub fn info(&mut self, msg: &str) {
        let msg = self.theme.paint(msg, self.theme.info);
        self.line(&msg);
    }

    pub fn success(&mut self, msg: &str) {
        let msg = self.theme.paint(msg, self.theme.success);
        self.line(&msg);
    }

    pub fn warning(&mut self, msg: &str) {
        let msg = self.theme.paint(msg, self.theme.warning);
        self.line(&msg);
    }

    /// Show `label` and leave the cursor on the same line.
    pub fn prompt(&mut self, label: &str) {
        let label = self.theme.paint(label, self.theme.user);
        let _ = write!(self.out, "{label}");
        let _ = self.out.flush();
    }

    pub fn captured_features(&mut self, paths: &[PathBuf]) {
        if paths.is_empty() {
            return;
        }
        let t = self.theme.clone();
        self.blank();
        self.line(&t.paint("Future Features", t.info));
        self.line(&t.paint(
            &format!(
                "Captured {} future feature(s) for later planning:",
                paths.len()
            ),
            t.success,
        ));
        for p in paths {
            self.line(&format!("  • {}", p.display()));
        }
        self.blank();
    }

    pub fn menu(&mut self, options: &[&str]) {
        let t = self.theme.clone();
        self.blank();
        self.line(&t.paint("What would you like to do?", t.agent));
        for (i, opt) in options.iter().enumerate() {
            self.line(&format!("  {}. {opt}", i + 1));
        }
        self.blank();
    }

    pub fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) {
        for l in format_table(headers, rows) {
            self.line(&l);
        }
    }
}

/// Left-aligned columns separated by two spaces, with a dashed rule under
/// the header.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(render_row(headers.iter().copied(), &widths));
    out.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        out.push(render_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .enumerate()
        .map(|(i, cell)| {
            let w = widths.get(i).copied().unwrap_or(0);
            format!("{cell:w$}")
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
