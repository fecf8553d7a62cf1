use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Remove terminal control characters so server text cannot emit escape
/// sequences. Newlines and tabs survive.
pub fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 | HeadingLevel::H2 => style.fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H3 => style.fg(Color::Magenta),
        _ => style,
    }
}

fn inline_code_style() -> Style {
    Style::default().fg(Color::LightRed).bg(Color::Black)
}

fn chrome_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn raw_markup_style() -> Style {
    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
}

fn pad_display(s: &str, target: usize) -> String {
    let padding = target.saturating_sub(UnicodeWidthStr::width(s));
    format!("{}{}", s, " ".repeat(padding))
}

fn truncate_display(s: &str, max_w: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_w {
        return s.to_string();
    }
    let target = max_w.saturating_sub(1);
    let mut result = String::new();
    let mut col = 0;
    for ch in s.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if col + cw > target {
            break;
        }
        result.push(ch);
        col += cw;
    }
    result.push('\u{2026}');
    result
}

/// Render a turn's markup as styled lines.
///
/// Supports headings, bullet and numbered lists, tables, inline code, code
/// blocks and emphasis. Raw embedded HTML is shown literally (dimmed).
/// `max_width` bounds table borders so they never wrap.
pub fn render_markdown(text: &str, max_width: usize, base: Style) -> Vec<Line<'static>> {
    let mut renderer = MdRenderer::new(max_width, base);
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    for event in parser {
        renderer.process(event);
    }
    renderer.flush_line();
    // Trailing blank lines come from block endings and only add noise
    while renderer.lines.last().is_some_and(|l| l.width() == 0) {
        renderer.lines.pop();
    }
    renderer.lines
}

struct MdRenderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    max_width: usize,
    in_code_block: bool,
    // One entry per open list; Some(n) is the next number of an ordered list
    list_stack: Vec<Option<u64>>,
    item_marker: Option<String>,
    in_table: bool,
    in_table_head: bool,
    table_head: Vec<String>,
    table_rows: Vec<Vec<String>>,
    current_cell: String,
}

impl MdRenderer {
    fn new(max_width: usize, base: Style) -> Self {
        Self {
            lines: Vec::new(),
            spans: Vec::new(),
            style_stack: vec![base],
            max_width,
            in_code_block: false,
            list_stack: Vec::new(),
            item_marker: None,
            in_table: false,
            in_table_head: false,
            table_head: Vec::new(),
            table_rows: Vec::new(),
            current_cell: String::new(),
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn flush_line(&mut self) {
        if !self.spans.is_empty() {
            let spans = std::mem::take(&mut self.spans);
            self.lines.push(Line::from(spans));
        }
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    /// Emit text, prefixing the pending list marker on the first span of an item
    fn push_text(&mut self, text: String, style: Style) {
        if self.in_table {
            self.current_cell.push_str(&text);
            return;
        }
        if let Some(marker) = self.item_marker.take() {
            self.spans.push(Span::styled(marker, self.current_style()));
        }
        self.spans.push(Span::styled(text, style));
    }

    fn flush_table(&mut self) {
        let head = std::mem::take(&mut self.table_head);
        let rows = std::mem::take(&mut self.table_rows);
        if head.is_empty() && rows.is_empty() {
            return;
        }

        let col_count = head.len().max(rows.iter().map(|r| r.len()).max().unwrap_or(0));
        let mut widths = vec![0usize; col_count];
        for row in std::iter::once(&head).chain(rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(UnicodeWidthStr::width(cell.as_str()));
            }
        }

        // Leading border plus " cell |" per column
        let available = self.max_width.saturating_sub(1 + col_count * 3);
        let total: usize = widths.iter().sum();
        if self.max_width > 0 && total > available && available > 0 {
            for w in widths.iter_mut() {
                *w = ((*w * available) / total).max(3);
            }
        }

        let chrome = chrome_style();
        let base = self.current_style();
        let row_line = |cells: &[String], style: Style| -> Line<'static> {
            let mut spans = vec![Span::styled("\u{2502}", chrome)];
            for (i, w) in widths.iter().enumerate() {
                let text = cells.get(i).map(|s| s.as_str()).unwrap_or("");
                let cell = pad_display(&truncate_display(text, *w), *w);
                spans.push(Span::styled(format!(" {} ", cell), style));
                spans.push(Span::styled("\u{2502}", chrome));
            }
            Line::from(spans)
        };
        let separator = |left: &str, mid: &str, right: &str| -> Line<'static> {
            let segments: Vec<String> = widths.iter().map(|w| "\u{2500}".repeat(w + 2)).collect();
            Line::from(Span::styled(
                format!("{}{}{}", left, segments.join(mid), right),
                chrome,
            ))
        };

        self.lines.push(separator("\u{250c}", "\u{252c}", "\u{2510}"));
        if !head.is_empty() {
            self.lines.push(row_line(&head, base.add_modifier(Modifier::BOLD)));
            self.lines.push(separator("\u{251c}", "\u{253c}", "\u{2524}"));
        }
        for row in &rows {
            self.lines.push(row_line(row, base));
        }
        self.lines.push(separator("\u{2514}", "\u{2534}", "\u{2518}"));
        self.blank_line();
    }

    fn process(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Table(_)) => {
                self.flush_line();
                self.in_table = true;
            }
            Event::End(TagEnd::Table) => {
                self.in_table = false;
                self.flush_table();
            }
            Event::Start(Tag::TableHead) => self.in_table_head = true,
            Event::End(TagEnd::TableHead) => self.in_table_head = false,
            Event::Start(Tag::TableRow) => {
                if !self.in_table_head {
                    self.table_rows.push(Vec::new());
                }
            }
            Event::Start(Tag::TableCell) => self.current_cell.clear(),
            Event::End(TagEnd::TableCell) => {
                let cell = std::mem::take(&mut self.current_cell);
                if self.in_table_head {
                    self.table_head.push(cell);
                } else if let Some(row) = self.table_rows.last_mut() {
                    row.push(cell);
                }
            }

            Event::Start(Tag::Heading { level, .. }) => {
                self.flush_line();
                let style = self.current_style().patch(heading_style(level));
                self.style_stack.push(style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush_line();
                self.pop_style();
                self.blank_line();
            }

            Event::End(TagEnd::Paragraph) => {
                self.flush_line();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }

            Event::Start(Tag::Strong) => self.push_modifier(Modifier::BOLD),
            Event::Start(Tag::Emphasis) => self.push_modifier(Modifier::ITALIC),
            Event::Start(Tag::Strikethrough) => self.push_modifier(Modifier::CROSSED_OUT),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => self.pop_style(),

            Event::Code(code) => self.push_text(strip_controls(&code), inline_code_style()),

            Event::Start(Tag::CodeBlock(_)) => {
                self.flush_line();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank_line();
            }

            Event::Start(Tag::List(start)) => {
                self.flush_line();
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.flush_line();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush_line();
                let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}{}. ", indent, n);
                        *n += 1;
                        marker
                    }
                    _ => format!("{}\u{2022} ", indent),
                };
                self.item_marker = Some(marker);
            }
            Event::End(TagEnd::Item) => {
                self.flush_line();
                self.item_marker = None;
            }

            Event::Text(text) => {
                let text = strip_controls(&text);
                if self.in_code_block {
                    for line in text.lines() {
                        self.lines.push(Line::from(vec![
                            Span::styled("\u{2502} ", chrome_style()),
                            Span::styled(line.to_string(), Style::default().fg(Color::Green)),
                        ]));
                    }
                } else {
                    let style = self.current_style();
                    self.push_text(text, style);
                }
            }

            // Raw markup is displayed, never interpreted
            Event::Html(html) => {
                self.flush_line();
                for line in strip_controls(&html).lines().filter(|l| !l.trim().is_empty()) {
                    self.lines.push(Line::from(Span::styled(line.to_string(), raw_markup_style())));
                }
            }
            Event::InlineHtml(html) => self.push_text(strip_controls(&html), raw_markup_style()),

            Event::SoftBreak => {
                if !self.in_table {
                    self.spans.push(Span::raw(" "));
                }
            }
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                let width = self.max_width.clamp(1, 40);
                self.lines.push(Line::from(Span::styled("\u{2500}".repeat(width), chrome_style())));
                self.blank_line();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_text(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render(text: &str) -> Vec<Line<'static>> {
        render_markdown(text, 80, Style::default())
    }

    #[test]
    fn test_plain_paragraph() {
        let lines = render("hello world");
        assert_eq!(lines.len(), 1);
        assert_eq!(all_text(&lines), "hello world");
    }

    #[test]
    fn test_heading_is_bold() {
        let lines = render("### Key Observations\nSome text");
        assert_eq!(lines[0].spans[0].content, "Key Observations");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(all_text(&lines).contains("Some text"));
    }

    #[test]
    fn test_bullet_and_numbered_lists() {
        let text = all_text(&render("- Small sample\n- High variability\n\n1. first\n2. second"));
        assert!(text.contains("\u{2022} Small sample"));
        assert!(text.contains("\u{2022} High variability"));
        assert!(text.contains("1. first"));
        assert!(text.contains("2. second"));
    }

    #[test]
    fn test_table_has_borders_and_cells() {
        let lines = render("| Issue | Description |\n|---|---|\n| Outliers | Max = 91234 |");
        let text = all_text(&lines);
        assert!(text.contains('\u{250c}'));
        assert!(text.contains('\u{2518}'));
        assert!(text.contains("Outliers"));
        assert!(text.contains("Max = 91234"));
    }

    #[test]
    fn test_table_respects_width() {
        let lines = render_markdown(
            "| Name | Description |\n|---|---|\n| short | A very long description that should be truncated |",
            30,
            Style::default(),
        );
        assert!(all_text(&lines).contains('\u{2026}'));
        for line in &lines {
            assert!(line.width() <= 30, "line too wide: {:?}", line);
        }
    }

    #[test]
    fn test_inline_code_and_code_block() {
        let lines = render("Use `df.describe()`\n\n```\nprint(1)\n```");
        let code_span = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "df.describe()")
            .unwrap();
        assert_eq!(code_span.style, inline_code_style());
        assert!(all_text(&lines).contains("\u{2502} print(1)"));
    }

    #[test]
    fn test_raw_html_is_shown_literally() {
        let text = all_text(&render("<div>\n<b>raw</b>\n</div>"));
        assert!(text.contains("<b>raw</b>"));
    }

    #[test]
    fn test_escape_sequences_are_stripped() {
        let text = all_text(&render("\u{1b}[2Jcleared \u{7}bell"));
        assert!(!text.contains('\u{1b}'));
        assert!(!text.contains('\u{7}'));
        assert!(text.contains("cleared"));
    }

    #[test]
    fn test_strip_controls_keeps_newlines_and_tabs() {
        assert_eq!(strip_controls("a\tb\nc\u{1b}d\u{9b}e"), "a\tb\ncde");
    }

    #[test]
    fn test_empty_input() {
        assert!(render("").is_empty());
    }
}
