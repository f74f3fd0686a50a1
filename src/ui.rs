use crate::{
    client::{
        AppSnapshot,
        RevealState,
        short_address,
    },
    rewards::Rarity,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::{
        canvas::Canvas,
        *,
    },
};
use std::io::stdout;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub type InputEvents = EventStream;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    ConnectWallet,
    RefreshBalance,
    CheckIn,
    CloseReveal,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    reveal_open: bool,
    wallet_connected: bool,
    frame: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    Collection { scroll: u16 },
    QuitModal,
}

pub fn input_event_stream() -> InputEvents {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEvents) -> Result<Event> {
    let event = events
        .next()
        .await
        .ok_or_else(|| eyre!("terminal input stream closed"))??;
    Ok(event)
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.reveal_open = snap.reveal.is_open();
    state.wallet_connected = snap.session.connected;
    state.frame = state.frame.wrapping_add(1);
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to an application action, updating local modal
/// state on the way.
pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    match state.mode {
        Mode::QuitModal => {
            return match k.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Collection { scroll } => {
            return match k.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('c') => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    state.mode = Mode::Collection {
                        scroll: scroll.saturating_add(1),
                    };
                    Some(UserEvent::Redraw)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    state.mode = Mode::Collection {
                        scroll: scroll.saturating_sub(1),
                    };
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    if state.reveal_open {
        return match k.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ') => Some(UserEvent::CloseReveal),
            KeyCode::Char('q') => {
                state.mode = Mode::QuitModal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('w') if !state.wallet_connected => Some(UserEvent::ConnectWallet),
        KeyCode::Char('b') => Some(UserEvent::RefreshBalance),
        KeyCode::Enter | KeyCode::Char(' ') => Some(UserEvent::CheckIn),
        KeyCode::Char('c') => {
            state.mode = Mode::Collection { scroll: 0 };
            Some(UserEvent::Redraw)
        }
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // wallet
            Constraint::Min(10),   // map + points
            Constraint::Length(3), // check-in
            Constraint::Length(5), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_wallet_panel(f, chunks[0], snap);
    draw_map(f, chunks[1], snap);
    draw_check_in(f, chunks[2], snap);
    draw_status(f, chunks[3], snap);
    let help = if snap.session.connected {
        "b refresh balance | Enter check in | c collection | q/Esc quit"
    } else {
        "w connect wallet | b refresh balance | Enter check in | c collection | q/Esc quit"
    };
    let help = Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[4]);
    draw_modals(f, state, snap);
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    match snap.session.address.as_deref() {
        Some(address) if snap.session.connected => {
            let gas = if snap.balance.has_enough_for_gas {
                Span::raw("")
            } else {
                Span::styled("  (not enough for gas)", Style::default().fg(Color::Yellow))
            };
            lines.push(Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Green)),
                Span::raw(format!(
                    "{} | {} {}",
                    short_address(address),
                    snap.session.native_balance,
                    snap.network.currency_symbol
                )),
                gas,
            ]));
            if let Some(url) = &snap.explorer_url {
                lines.push(Line::from(format!("Explorer: {url}")));
            }
        }
        _ if !snap.has_agent => {
            lines.push(Line::styled(
                "No wallet detected (start with --agent-url)",
                Style::default().fg(Color::Red),
            ));
        }
        _ => {
            lines.push(Line::styled(
                "Wallet disconnected (press w to connect)",
                Style::default().fg(Color::Gray),
            ));
        }
    }
    lines.push(Line::from(format!("Network: {} | GPS: connected", snap.network)));
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_map(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let canvas = Canvas::default()
        .block(Block::default().borders(Borders::ALL).title("Map"))
        .x_bounds([0.0, 100.0])
        .y_bounds([0.0, 100.0])
        .paint(|ctx| {
            ctx.print(50.0, 50.0, Span::styled("@", Style::default().fg(Color::Cyan)));
            for point in &snap.points {
                let style = if point.in_range() {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Magenta)
                };
                ctx.print(
                    f64::from(point.x),
                    100.0 - f64::from(point.y),
                    Span::styled(format!("◆{}", point.id), style),
                );
            }
        });
    f.render_widget(canvas, cols[0]);

    let items: Vec<ListItem> = snap
        .points
        .iter()
        .map(|point| {
            let marker = if point.in_range() { "*" } else { " " };
            let style = if point.in_range() {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            ListItem::new(format!(
                "{} {} {} ({:.1} km)",
                marker, point.id, point.name, point.distance_km
            ))
            .style(style)
        })
        .collect();
    let list =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Gacha Points"));
    f.render_widget(list, cols[1]);
}

fn draw_check_in(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let (text, style) = match (&snap.nearby, snap.session.connected) {
        (Some(point), true) => (
            format!("Enter: Check in at {}", point.name),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        (_, false) => (
            String::from("Connect wallet to check in"),
            Style::default().fg(Color::Gray),
        ),
        (None, true) => (
            String::from("Move closer to a gacha point"),
            Style::default().fg(Color::Gray),
        ),
    };
    let widget = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Check In"));
    f.render_widget(widget, area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        let status = if snap.status.trim().is_empty() {
            "Ready"
        } else {
            snap.status.as_str()
        };
        Paragraph::new(status)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        // newest first so the latest failure stays visible
        let lines: Vec<Line> = snap
            .errors
            .iter()
            .rev()
            .map(|e| Line::from(e.clone()))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &snap.reveal {
        RevealState::Hidden => {}
        RevealState::Revealing => {
            let area = centered_rect(50, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Check In");
            let spinner = SPINNER[state.frame % SPINNER.len()];
            let p = Paragraph::new(format!(
                "{spinner} Revealing your reward...\n\nCalling the randomness contract"
            ))
            .alignment(Alignment::Center);
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        RevealState::Revealed(reward) => {
            let area = centered_rect(50, 40, f.area());
            let title = if reward.is_new {
                "New Reward!"
            } else {
                "Reward"
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(rarity_style(reward.rarity))
                .title(title);
            let origin = if reward.sourced_on_chain {
                "Generated on-chain"
            } else {
                "Generated locally"
            };
            let mut lines = vec![
                Line::styled(
                    reward.name.clone(),
                    rarity_style(reward.rarity).add_modifier(Modifier::BOLD),
                ),
                Line::styled(reward.rarity.label().to_uppercase(), rarity_style(reward.rarity)),
                Line::from(""),
                Line::from(origin),
            ];
            if snap.celebrating {
                lines.insert(0, Line::styled("* * * * *", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Enter/Esc to close"));
            let p = Paragraph::new(lines).alignment(Alignment::Center);
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
    }

    match state.mode {
        Mode::Collection { scroll } => {
            let area = centered_rect(70, 70, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .title(format!("My Collection ({} items)", snap.collection_size));
            let mut lines = Vec::new();
            for (rarity, items) in &snap.collection {
                lines.push(Line::styled(
                    format!("{} ({})", rarity.label().to_uppercase(), items.len()),
                    rarity_style(*rarity).add_modifier(Modifier::BOLD),
                ));
                if items.is_empty() {
                    lines.push(Line::styled(
                        "  nothing found yet",
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                for item in items {
                    let when = item
                        .obtained_at
                        .map(|t| t.format(" %Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default();
                    lines.push(Line::from(format!("  {}{}", item.name, when)));
                    lines.push(Line::styled(
                        format!("    {}", item.description),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            let p = Paragraph::new(lines).scroll((scroll, 0));
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit Geo Gacha? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn rarity_style(rarity: Rarity) -> Style {
    match rarity {
        Rarity::Common => Style::default().fg(Color::Gray),
        Rarity::Rare => Style::default().fg(Color::Blue),
        Rarity::Legendary => Style::default().fg(Color::Magenta),
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crossterm::event::{
        KeyEvent,
        KeyModifiers,
    };

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn interpret_event__enter_checks_in_when_no_modal_is_open() {
        let mut state = UiState::default();

        let ev = interpret_event(&mut state, press(KeyCode::Enter));

        assert_eq!(ev, Some(UserEvent::CheckIn));
    }

    #[test]
    fn interpret_event__enter_closes_open_reveal() {
        // given
        let mut state = UiState {
            reveal_open: true,
            ..UiState::default()
        };

        // when
        let ev = interpret_event(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(ev, Some(UserEvent::CloseReveal));
    }

    #[test]
    fn interpret_event__quit_requires_confirmation() {
        // given
        let mut state = UiState::default();

        // when
        let first = interpret_event(&mut state, press(KeyCode::Char('q')));
        let second = interpret_event(&mut state, press(KeyCode::Char('y')));

        // then
        assert_eq!(first, Some(UserEvent::Redraw));
        assert_eq!(second, Some(UserEvent::Quit));
    }

    #[test]
    fn interpret_event__collection_swallows_check_in_key() {
        // given
        let mut state = UiState::default();
        interpret_event(&mut state, press(KeyCode::Char('c')));

        // when
        let ev = interpret_event(&mut state, press(KeyCode::Char('w')));

        // then
        assert_eq!(ev, None);
        assert_eq!(state.mode, Mode::Collection { scroll: 0 });
    }

    #[test]
    fn interpret_event__connect_key_is_ignored_once_connected() {
        // given
        let mut state = UiState {
            wallet_connected: true,
            ..UiState::default()
        };

        // when
        let ev = interpret_event(&mut state, press(KeyCode::Char('w')));

        // then
        assert_eq!(ev, None);
        assert_eq!(state.mode, Mode::Normal);
    }
}
