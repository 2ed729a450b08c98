use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::highscore::Highscore;

const HORIZONTAL_MARGIN: u16 = 2;
const PLAYER_COLUMN_MAX: usize = 24;

/// Pads or cuts a player name to a fixed display width
pub fn fit_name(name: &str, width: usize) -> String {
    if name.width() <= width {
        return name.to_string();
    }
    let mut out = String::new();
    for c in name.chars() {
        if out.width() + c.to_string().width() + 1 > width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

/// Pure presenter for one highscore row
pub fn present_row(rank: usize, entry: &Highscore) -> Row<'static> {
    let rank_color = match rank {
        1 => Color::Yellow,
        2 => Color::White,
        3 => Color::LightRed,
        _ => Color::Gray,
    };

    Row::new(vec![
        Cell::from(format!("{rank:>3}")).style(Style::default().fg(rank_color)),
        Cell::from(fit_name(&entry.player, PLAYER_COLUMN_MAX)),
        Cell::from(entry.game_mode.clone()),
        Cell::from(entry.score.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(entry.darts.to_string()),
        Cell::from(entry.played_ago()).style(Style::default().add_modifier(Modifier::DIM)),
    ])
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let magenta_style = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(area);

        let theme = match (self.theme_name(), self.board_bytes()) {
            (Some(name), Some(bytes)) => format!("{name} ({} KiB board)", bytes.div_ceil(1024)),
            (Some(name), None) => name.to_string(),
            (None, _) => "none".to_string(),
        };
        let sound = match (self.sounds.is_enabled(), self.is_playing()) {
            (false, _) => "off",
            (true, true) => "playing",
            (true, false) => "on",
        };
        let header = Paragraph::new(vec![
            Line::from(Span::styled("yadarts highscores", bold_style.fg(Color::Green))),
            Line::from(vec![
                Span::styled(self.mode_label().to_string(), magenta_style),
                Span::styled(format!("  theme: {theme}  sound: {sound}"), dim_style),
            ]),
        ])
        .alignment(Alignment::Center);
        header.render(chunks[0], buf);

        if self.entries.is_empty() {
            Paragraph::new(Span::styled(
                "No highscores yet. Go throw some darts!",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .render(chunks[1], buf);
        } else {
            let rows: Vec<Row> = self
                .entries
                .iter()
                .enumerate()
                .skip(self.scroll_offset)
                .map(|(i, entry)| present_row(i + 1, entry))
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Length(PLAYER_COLUMN_MAX as u16 + 1),
                Constraint::Length(10),
                Constraint::Length(7),
                Constraint::Length(6),
                Constraint::Min(12),
            ];
            Table::new(rows, widths)
                .header(
                    Row::new(vec!["#", "player", "mode", "score", "darts", "played"])
                        .style(bold_style.add_modifier(Modifier::UNDERLINED)),
                )
                .block(Block::default().borders(Borders::ALL))
                .render(chunks[1], buf);
        }

        let help = "(tab) mode / (t)heme / (s)ound / (r)efresh / (q)uit";
        let footer = match &self.status {
            Some(status) => vec![
                Line::from(Span::styled(status.clone(), Style::default().fg(Color::Cyan))),
                Line::from(Span::styled(help, dim_style.add_modifier(Modifier::ITALIC))),
            ],
            None => vec![
                Line::from(Span::styled(
                    self.store_path.display().to_string(),
                    dim_style,
                )),
                Line::from(Span::styled(help, dim_style.add_modifier(Modifier::ITALIC))),
            ],
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}
