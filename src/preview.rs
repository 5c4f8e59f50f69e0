//! Terminal rendering of generated markdown.

use crate::error::{Error, Result};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Shows a README both ways: markdown source on stdout, then, if asked, a
/// rendered preview on stderr.
///
/// # Errors
///
/// Returns an IO error if either stream cannot be written.
pub fn print_readme(markdown: &str, rendered: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    present(markdown, rendered, &mut stdout.lock(), &mut stderr)
        .map_err(|e| Error::io("<terminal>", e))
}

/// Writes the markdown source to `source`, ending in a single newline,
/// followed by the rendered form on `preview` when `rendered` is set.
///
/// # Errors
///
/// Returns any error raised by either sink.
pub fn present<O, P>(markdown: &str, rendered: bool, source: &mut O, preview: &mut P) -> io::Result<()>
where
    O: io::Write,
    P: WriteColor,
{
    writeln!(source, "{}", markdown.trim_end())?;
    source.flush()?;

    if rendered {
        writeln!(preview, "\n{}", "─".repeat(40))?;
        render(markdown, preview)?;
    }

    Ok(())
}

/// Renders markdown into any color-capable sink.
///
/// # Errors
///
/// Returns any error raised by the sink.
pub fn render<W: WriteColor>(markdown: &str, out: &mut W) -> io::Result<()> {
    let mut state = RenderState::default();
    for event in Parser::new_ext(markdown, Options::all()) {
        state.handle_event(out, event)?;
    }
    out.reset()?;
    out.flush()
}

#[derive(Default)]
struct RenderState {
    list_stack: Vec<Option<u64>>,
    format_stack: Vec<ColorSpec>,
}

impl RenderState {
    fn handle_event<W: WriteColor>(&mut self, out: &mut W, event: Event<'_>) -> io::Result<()> {
        match event {
            Event::Start(tag) => self.handle_start(out, tag),
            Event::End(tag_end) => self.handle_end(out, tag_end),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                write!(out, "{text}")
            }
            Event::Code(code) => self.write_inline_code(out, &code),
            Event::SoftBreak | Event::HardBreak => writeln!(out),
            Event::Rule => writeln!(out, "{}", "─".repeat(40)),
            Event::TaskListMarker(done) => write!(out, "{}", if done { "[x] " } else { "[ ] " }),
            _ => Ok(()),
        }
    }

    fn push_color<W: WriteColor>(&mut self, out: &mut W, spec: ColorSpec) -> io::Result<()> {
        out.set_color(&spec)?;
        self.format_stack.push(spec);
        Ok(())
    }

    fn pop_color<W: WriteColor>(&mut self, out: &mut W) -> io::Result<()> {
        self.format_stack.pop();
        match self.format_stack.last() {
            Some(spec) => out.set_color(spec),
            None => out.reset(),
        }
    }

    fn handle_start<W: WriteColor>(&mut self, out: &mut W, tag: Tag<'_>) -> io::Result<()> {
        match tag {
            Tag::Heading { level, .. } => {
                let color = match level {
                    HeadingLevel::H1 => Color::Rgb(255, 99, 71),
                    HeadingLevel::H2 => Color::Rgb(70, 130, 180),
                    _ => Color::Cyan,
                };
                writeln!(out)?;
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(color)).set_bold(true);
                self.push_color(out, spec)?;
                write!(out, "{} ", "#".repeat(heading_depth(level)))?;
            }
            Tag::Paragraph => {
                if self.list_stack.is_empty() {
                    writeln!(out)?;
                }
            }
            Tag::Strong => {
                let mut spec = ColorSpec::new();
                spec.set_bold(true);
                self.push_color(out, spec)?;
            }
            Tag::Emphasis => {
                let mut spec = ColorSpec::new();
                spec.set_italic(true);
                self.push_color(out, spec)?;
            }
            Tag::BlockQuote(_) => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Yellow));
                self.push_color(out, spec)?;
                write!(out, "  │ ")?;
            }
            Tag::CodeBlock(kind) => {
                writeln!(out)?;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let mut lang_spec = ColorSpec::new();
                        lang_spec.set_fg(Some(Color::Blue)).set_italic(true);
                        out.set_color(&lang_spec)?;
                        writeln!(out, "[{lang}]")?;
                    }
                }
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Green));
                self.push_color(out, spec)?;
            }
            Tag::List(start) => {
                if self.list_stack.is_empty() {
                    writeln!(out)?;
                }
                self.list_stack.push(start);
            }
            Tag::Item => {
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                match self.list_stack.last_mut() {
                    Some(Some(number)) => {
                        write!(out, "{indent}{number:2}. ")?;
                        *number += 1;
                    }
                    _ => write!(out, "{indent}• ")?,
                }
            }
            Tag::Link { .. } => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Blue)).set_underline(true);
                self.push_color(out, spec)?;
            }
            Tag::Image { dest_url, .. } => {
                write!(out, "[image: {dest_url}] ")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_end<W: WriteColor>(&mut self, out: &mut W, tag_end: TagEnd) -> io::Result<()> {
        match tag_end {
            TagEnd::Heading(_) => {
                self.pop_color(out)?;
                writeln!(out)?;
            }
            TagEnd::Paragraph => writeln!(out)?,
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Link => self.pop_color(out)?,
            TagEnd::BlockQuote(_) | TagEnd::CodeBlock => {
                self.pop_color(out)?;
                writeln!(out)?;
            }
            TagEnd::List(_) => {
                self.list_stack.pop();
            }
            TagEnd::Item => writeln!(out)?,
            _ => {}
        }
        Ok(())
    }

    fn write_inline_code<W: WriteColor>(&self, out: &mut W, code: &str) -> io::Result<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::Green));
        out.set_color(&spec)?;
        write!(out, "`{code}`")?;

        match self.format_stack.last() {
            Some(spec) => out.set_color(spec),
            None => out.reset(),
        }
    }
}

const fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::Buffer;

    fn plain(markdown: &str) -> String {
        let mut buffer = Buffer::no_color();
        render(markdown, &mut buffer).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn test_renders_headings_and_paragraphs() {
        let text = plain("# Title\n\nSome **bold** text.\n");
        assert!(text.contains("# Title"));
        assert!(text.contains("Some bold text."));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_renders_lists() {
        let text = plain("- one\n- two\n\n1. first\n2. second\n");
        assert!(text.contains("• one"));
        assert!(text.contains("• two"));
        assert!(text.contains(" 1. first"));
        assert!(text.contains(" 2. second"));
    }

    #[test]
    fn test_renders_code_blocks() {
        let text = plain("```bash\ncargo install readme-gen\n```\n\nUse `readme-gen`.\n");
        assert!(text.contains("[bash]"));
        assert!(text.contains("cargo install readme-gen"));
        assert!(text.contains("`readme-gen`"));
    }

    #[test]
    fn test_renders_badges_as_images() {
        let text = plain("![License](https://img.shields.io/badge/license-MIT-blue)\n");
        assert!(text.contains("[image: https://img.shields.io/badge/license-MIT-blue]"));
    }

    #[test]
    fn test_present_shows_source_and_rendering() {
        let markdown = "# Title\n\n- **one**\n";
        let mut source = Vec::new();
        let mut preview = Buffer::no_color();

        present(markdown, true, &mut source, &mut preview).unwrap();

        assert_eq!(String::from_utf8(source).unwrap(), "# Title\n\n- **one**\n");
        let rendered = String::from_utf8(preview.into_inner()).unwrap();
        assert!(rendered.contains("• one"));
        assert!(!rendered.contains("**"));
    }

    #[test]
    fn test_present_source_only() {
        let mut source = Vec::new();
        let mut preview = Buffer::no_color();

        present("# Title\n", false, &mut source, &mut preview).unwrap();

        assert_eq!(String::from_utf8(source).unwrap(), "# Title\n");
        assert!(preview.into_inner().is_empty());
    }

    #[test]
    fn test_colored_output_has_escapes() {
        let mut buffer = Buffer::ansi();
        render("# Title\n", &mut buffer).unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(text.contains('\u{1b}'));
    }
}
