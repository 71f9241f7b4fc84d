use crate::app::{App, Focus};
use crate::entry_form::{format_day, EntryForm, FormField};
use crate::journal_entry::JournalEntry;
use crate::journal_state::{Listing, ViewMode, Workspace};
use crate::session::{Screen, SignInField, SignInForm};
use crate::text_input::TextInput;
use chrono::{DateTime, Local};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, stdout, Stdout};

const GRID_COLUMNS: u16 = 2;
const CARD_HEIGHT: u16 = 6;
const PREVIEW_CHARS: usize = 60;
const SIGN_IN_HIGHLIGHTS: [&str; 4] = [
    "🔒 Your data is securely stored and private",
    "📱 Access your journal from any device",
    "🎨 Beautiful, distraction-free writing experience",
    "📅 Organize entries by date and mood",
];

/// Owns the terminal for the lifetime of the app; restores it on drop.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Tui {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(Tui { terminal })
    }

    pub fn draw(&mut self, app: &App) -> io::Result<()> {
        self.terminal.draw(|f| render(f, app))?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

fn render(f: &mut Frame, app: &App) {
    match app.gate().screen() {
        Screen::Landing => render_landing(f),
        Screen::SignedOut => render_sign_in(f, app.sign_in_form()),
        Screen::SignedIn(_) => {
            if let Some(ws) = app.workspace() {
                render_workspace(f, ws, app.focus(), &Local::now());
            }
        }
    }
}

fn title_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().add_modifier(Modifier::BOLD))
}

fn field_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

fn input_text(input: &TextInput, focused: bool) -> String {
    if focused {
        input.with_cursor_marker()
    } else {
        input.value().to_string()
    }
}

fn render_landing(f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let title = Paragraph::new("Mood Journal")
        .style(title_style())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    let tagline = Paragraph::new("Write down your day. Track how you feel.")
        .alignment(Alignment::Center);
    f.render_widget(tagline, chunks[1]);

    let features = Text::from(vec![
        Line::from(""),
        Line::from("  Private entries, tied to your account"),
        Line::from("  Tag each day with one of five moods"),
        Line::from("  Search and filter by today, this week or this month"),
        Line::from("  Edits sync back as soon as they are saved"),
    ]);
    f.render_widget(
        Paragraph::new(features).alignment(Alignment::Center),
        chunks[2],
    );

    let controls = Line::from(vec![
        Span::raw("Press "),
        key("Enter"),
        Span::raw(" to get started, "),
        key("q"),
        Span::raw(" to quit"),
    ]);
    f.render_widget(
        Paragraph::new(controls)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center),
        chunks[3],
    );
}

fn render_sign_in(f: &mut Frame, form: &SignInForm) {
    let area = centered_rect(50, 60, f.area());
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Sign in")
        .title_style(title_style());
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(inner);

    let editing = !form.is_pending();
    let email_focused = editing && form.focus() == SignInField::Email;
    let password_focused = editing && form.focus() == SignInField::Password;

    f.render_widget(
        Paragraph::new(input_text(&form.email, email_focused))
            .block(field_block("Email", email_focused)),
        chunks[0],
    );

    let mut masked = form.masked_password();
    if password_focused {
        masked.push('|');
    }
    f.render_widget(
        Paragraph::new(masked).block(field_block("Password", password_focused)),
        chunks[1],
    );

    let status = if form.is_pending() {
        Paragraph::new("Signing in...").style(Style::default().fg(Color::Cyan))
    } else if let Some(error) = form.error() {
        Paragraph::new(error).style(Style::default().fg(Color::Red))
    } else {
        Paragraph::new("")
    };
    f.render_widget(status.wrap(Wrap { trim: true }), chunks[2]);

    let mut highlights = vec![Line::from(Span::styled(
        "Why Journal With Us?",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    highlights.extend(SIGN_IN_HIGHLIGHTS.iter().map(|line| Line::from(*line)));
    f.render_widget(
        Paragraph::new(highlights).wrap(Wrap { trim: true }),
        chunks[3],
    );

    let controls = Line::from(vec![
        key("Tab"),
        Span::raw(" switch field, "),
        key("Enter"),
        Span::raw(" sign in, "),
        key("Esc"),
        Span::raw(" back"),
    ]);
    f.render_widget(
        Paragraph::new(controls)
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center),
        chunks[4],
    );
}

fn render_workspace(f: &mut Frame, ws: &Workspace, focus: Focus, now: &DateTime<Local>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    render_header(f, ws, rows[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[1]);

    render_form(f, &ws.form, focus == Focus::Form, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(columns[1]);

    let searching = focus == Focus::Search;
    f.render_widget(
        Paragraph::new(input_text(&ws.search, searching))
            .block(field_block("Search entries", searching)),
        right[0],
    );

    let (total, shown) = ws.stats(now);
    let summary = Line::from(vec![
        Span::styled(ws.view_mode().label(), Style::default().fg(Color::Cyan)),
        Span::raw("  |  "),
        Span::raw(ws.window().label()),
        Span::raw(format!("  |  {shown} of {total} entries")),
    ]);
    f.render_widget(Paragraph::new(summary), right[1]);

    render_entries(f, ws, focus == Focus::Entries, now, right[2]);

    let status = ws
        .status()
        .map(|s| Paragraph::new(s).style(Style::default().fg(Color::Red)))
        .unwrap_or_else(|| Paragraph::new(""));
    f.render_widget(status, rows[2]);

    f.render_widget(
        Paragraph::new(workspace_controls(focus))
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center),
        rows[3],
    );

    if let Some(entry) = ws.detail() {
        render_detail(f, entry);
    }
    if let Some(entry) = ws.pending_delete() {
        render_delete_confirm(f, entry);
    }
}

fn render_header(f: &mut Frame, ws: &Workspace, area: Rect) {
    let header = Line::from(vec![
        Span::styled("Mood Journal", title_style()),
        Span::raw("   "),
        Span::raw(format!("Welcome, {}", ws.user().greeting_name())),
    ]);
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}

fn workspace_controls(focus: Focus) -> Line<'static> {
    match focus {
        Focus::Entries => Line::from(vec![
            key("Enter"),
            Span::raw(" view, "),
            key("e"),
            Span::raw(" edit, "),
            key("d"),
            Span::raw(" delete, "),
            key("n"),
            Span::raw(" new, "),
            key("/"),
            Span::raw(" search, "),
            key("f"),
            Span::raw(" filter, "),
            key("v"),
            Span::raw(" layout, "),
            key("o"),
            Span::raw(" sign out, "),
            key("q"),
            Span::raw(" quit"),
        ]),
        Focus::Search => Line::from(vec![
            Span::raw("Type to search, "),
            key("Enter"),
            Span::raw(" back to entries"),
        ]),
        Focus::Form => Line::from(vec![
            key("Tab"),
            Span::raw(" next field, "),
            key("Left/Right"),
            Span::raw(" change date or mood, "),
            key("Ctrl-S"),
            Span::raw(" save, "),
            key("Esc"),
            Span::raw(" leave form"),
        ]),
    }
}

fn render_form(f: &mut Frame, form: &EntryForm, focused: bool, area: Rect) {
    let outer = field_block(form.heading(), focused).title_style(title_style());
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(inner);

    let on = |field: FormField| focused && !form.is_saving() && form.focus() == field;

    f.render_widget(
        Paragraph::new(input_text(&form.title, on(FormField::Title)))
            .block(field_block("Title (optional)", on(FormField::Title))),
        chunks[0],
    );

    let pickers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);
    f.render_widget(
        Paragraph::new(format!("< {} >", format_day(form.date())))
            .block(field_block("Date", on(FormField::Date))),
        pickers[0],
    );
    f.render_widget(
        Paragraph::new(format!("< {} {} >", form.mood().emoji(), form.mood().as_str()))
            .block(field_block("Mood", on(FormField::Mood))),
        pickers[1],
    );

    let text_title = format!("How was your day? ({} characters)", form.char_count());
    f.render_widget(
        Paragraph::new(input_text(&form.text, on(FormField::Text)))
            .wrap(Wrap { trim: false })
            .block(field_block(&text_title, on(FormField::Text))),
        chunks[2],
    );

    f.render_widget(
        Paragraph::new(input_text(&form.tags, on(FormField::Tags)))
            .block(field_block("Tags (comma-separated)", on(FormField::Tags))),
        chunks[3],
    );

    let submit_style = if form.can_submit() {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("[ {} ]", form.submit_label()), submit_style),
            Span::raw("  Ctrl-S"),
        ]))
        .alignment(Alignment::Center),
        chunks[4],
    );

    if let Some(message) = form.message() {
        f.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center),
            chunks[5],
        );
    }
}

fn render_entries(
    f: &mut Frame,
    ws: &Workspace,
    focused: bool,
    now: &DateTime<Local>,
    area: Rect,
) {
    let block = field_block("Entries", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    match ws.listing(now) {
        Listing::Loading { placeholders } => {
            let items: Vec<ListItem> = (0..placeholders)
                .map(|_| {
                    ListItem::new(vec![
                        Line::from("░░░░░░░░░░░░░░░░░░"),
                        Line::from("░░░░░░░░░░░░░░░░░░░░░░░░░░░░"),
                        Line::from(""),
                    ])
                })
                .collect();
            f.render_widget(
                List::new(items).style(Style::default().fg(Color::DarkGray)),
                inner,
            );
        }
        Listing::Empty(state) => {
            let text = Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    state.headline(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(state.hint()),
            ]);
            f.render_widget(Paragraph::new(text).alignment(Alignment::Center), inner);
        }
        Listing::Entries { mode, entries } => {
            let cursor = ws.cursor(now);
            let active = ws.active_id();
            match mode {
                ViewMode::List => {
                    let items: Vec<ListItem> = entries
                        .iter()
                        .map(|entry| {
                            let marker = if Some(&entry.id) == active { "● " } else { "" };
                            ListItem::new(vec![
                                Line::from(Span::styled(
                                    format!("{marker}{} {}", entry.mood.emoji(), headline(entry)),
                                    Style::default().add_modifier(Modifier::BOLD),
                                )),
                                Line::from(Span::raw(format!(
                                    "{}  {}",
                                    format_day(entry.date),
                                    hashtags(entry)
                                ))),
                                Line::from(Span::styled(
                                    preview(entry),
                                    Style::default().fg(Color::Gray),
                                )),
                            ])
                        })
                        .collect();

                    let list = List::new(items)
                        .highlight_style(Style::default().fg(Color::Yellow))
                        .highlight_symbol("> ");
                    f.render_stateful_widget(
                        list,
                        inner,
                        &mut ListState::default().with_selected(Some(cursor)),
                    );
                }
                ViewMode::Grid => render_grid(f, &entries, cursor, inner),
            }
        }
    }
}

fn render_grid(f: &mut Frame, entries: &[&JournalEntry], cursor: usize, area: Rect) {
    let card_width = area.width / GRID_COLUMNS;
    let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
    let cursor_row = cursor / GRID_COLUMNS as usize;
    let first_row = cursor_row.saturating_sub(visible_rows - 1);

    for (index, entry) in entries.iter().enumerate() {
        let row = index / GRID_COLUMNS as usize;
        if row < first_row || row >= first_row + visible_rows {
            continue;
        }
        let col = (index % GRID_COLUMNS as usize) as u16;
        let rect = Rect::new(
            area.x + col * card_width,
            area.y + (row - first_row) as u16 * CARD_HEIGHT,
            card_width,
            CARD_HEIGHT,
        )
        .intersection(area);

        let card = Paragraph::new(vec![
            Line::from(format!("{} {}", entry.mood.emoji(), format_day(entry.date))),
            Line::from(hashtags(entry)),
            Line::from(Span::styled(preview(entry), Style::default().fg(Color::Gray))),
        ])
        .wrap(Wrap { trim: true })
        .block(field_block(headline(entry), index == cursor));
        f.render_widget(card, rect);
    }
}

fn render_detail(f: &mut Frame, entry: &JournalEntry) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format_day(entry.date), Style::default().fg(Color::Cyan)),
            Span::raw(format!("   {} {}", entry.mood.emoji(), entry.mood.as_str())),
        ]),
        Line::from(hashtags(entry)),
        Line::from(""),
    ];
    lines.extend(entry.text.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        key("e"),
        Span::raw(" edit, "),
        key("d"),
        Span::raw(" delete, "),
        key("Esc"),
        Span::raw(" close"),
    ]));

    let detail = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(headline(entry))
            .title_style(title_style()),
    );
    f.render_widget(detail, area);
}

fn render_delete_confirm(f: &mut Frame, entry: &JournalEntry) {
    let area = centered_rect(40, 25, f.area());
    f.render_widget(Clear, area);

    let text = vec![
        Line::from("Delete this entry?"),
        Line::from(Span::styled(preview(entry), Style::default().fg(Color::Gray))),
        Line::from(""),
        Line::from(vec![
            key("y"),
            Span::raw(" delete, "),
            key("n"),
            Span::raw(" keep it"),
        ]),
    ];
    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Confirm"),
        );
    f.render_widget(popup, area);
}

fn headline(entry: &JournalEntry) -> &str {
    entry.title.as_deref().unwrap_or("Untitled")
}

fn hashtags(entry: &JournalEntry) -> String {
    entry
        .tags
        .iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn preview(entry: &JournalEntry) -> String {
    let first = entry.text.lines().next().unwrap_or("");
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        first.to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_entry::{EntryId, Mood, UserId};
    use chrono::Utc;

    fn entry(text: &str, tags: &[&str]) -> JournalEntry {
        JournalEntry {
            id: EntryId::new("e"),
            owner_id: UserId::new("u"),
            title: None,
            text: text.to_string(),
            date: Utc::now(),
            mood: Mood::Happy,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: None,
        }
    }

    #[test]
    fn preview_truncates_first_line_on_char_boundary() {
        let long = "é".repeat(PREVIEW_CHARS + 5);
        let shown = preview(&entry(&format!("{long}\nsecond"), &[]));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview(&entry("short\nrest", &[])), "short");
    }

    #[test]
    fn untitled_entries_get_a_headline() {
        assert_eq!(headline(&entry("x", &[])), "Untitled");
        assert_eq!(hashtags(&entry("x", &["work", "gym"])), "#work #gym");
    }

    #[test]
    fn sign_in_screen_lists_highlights() {
        use ratatui::backend::TestBackend;

        let mut terminal = Terminal::new(TestBackend::new(120, 50)).unwrap();
        terminal
            .draw(|f| render_sign_in(f, &SignInForm::default()))
            .unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Why Journal With Us?"));
        assert!(screen.contains("Organize entries by date and mood"));
    }

    #[test]
    fn centered_rect_stays_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, outer);
        assert!(inner.x >= 25 && inner.right() <= 75);
        assert!(inner.y >= 10 && inner.bottom() <= 30);
    }
}
