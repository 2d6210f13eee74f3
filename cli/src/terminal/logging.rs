use colored::{ColoredString, Colorize};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

/// Scanner-style event formatter: a level glyph, the module path for
/// verbose levels, then the message fields.
pub struct WraithFormatter;

fn glyph(level: Level) -> ColoredString {
    match level {
        Level::TRACE => "[.]".dimmed(),
        Level::DEBUG => "[?]".cyan(),
        Level::INFO => "[+]".bright_green().bold(),
        Level::WARN => "[!]".yellow().bold(),
        Level::ERROR => "[x]".bright_red().bold(),
    }
}

impl<S, N> FormatEvent<S, N> for WraithFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let level = *meta.level();

        write!(writer, "{} ", glyph(level))?;
        // Debug and trace carry the emitting module; the user-facing
        // levels stay clean.
        if level >= Level::DEBUG {
            write!(writer, "{} ", meta.target().dimmed())?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(WraithFormatter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_level_gets_a_distinct_glyph() {
        let levels = [
            Level::TRACE,
            Level::DEBUG,
            Level::INFO,
            Level::WARN,
            Level::ERROR,
        ];
        let glyphs: Vec<String> = levels.iter().map(|l| glyph(*l).to_string()).collect();
        for (i, a) in glyphs.iter().enumerate() {
            for b in &glyphs[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(glyph(Level::INFO).to_string().contains("[+]"));
        assert!(glyph(Level::ERROR).to_string().contains("[x]"));
    }
}
