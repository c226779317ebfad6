use async_trait::async_trait;
use chrono::Local;
use inquire::Confirm;
use std::io::{self, Write, stderr};
use weatherwatch_core::{DisplayFields, Notice, Screen};

const PROGRESS: &str = "Updating weather...";

const RATIONALE: &str = "weatherwatch needs your approximate location to look up local weather. \
                         Only a coarse, city-level position is used.";

/// Prints rendered fields to stdout and progress/notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalScreen;

impl TerminalScreen {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Screen for TerminalScreen {
    fn show_in_progress(&mut self) {
        let _ = write_progress(&mut stderr().lock());
    }

    /// The progress line is already finished; nothing to take down.
    fn dismiss_in_progress(&mut self) {}

    fn apply(&mut self, fields: &DisplayFields) {
        println!("{}", format_fields(fields, &Local::now().format("%I:%M %p").to_string()));
    }

    fn notify(&mut self, notice: Notice) {
        if notice.is_persistent() {
            eprintln!("!! {}", notice.message());
        } else {
            eprintln!("{}", notice.message());
        }
    }

    async fn show_rationale(&mut self) -> bool {
        eprintln!("{RATIONALE}");
        let answer = tokio::task::spawn_blocking(|| {
            Confirm::new("OK?").with_default(true).prompt()
        })
        .await;
        matches!(answer, Ok(Ok(true)))
    }
}

/// Progress is a whole line, so log records on the same stream never
/// land in the middle of it.
fn write_progress(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{PROGRESS}")?;
    out.flush()
}

fn format_fields(fields: &DisplayFields, clock: &str) -> String {
    let icon = fields.icon.map(|i| i.glyph()).unwrap_or(" ");
    format!(
        "── {city} ── {connection} ({clock})\n\
         {icon}  {temperature}\n\
         {description}\n\
         Wind: {wind}\n\
         {precipitation}\n\
         {other}\n\
         {sun}\n",
        city = fields.city,
        connection = fields.connection,
        temperature = fields.temperature,
        description = fields.description,
        wind = fields.wind,
        precipitation = fields.precipitation,
        other = fields.other,
        sun = fields.sun,
    )
}
