use std::collections::HashSet;
use std::io::{self, Write};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};

use crate::model::Playlist;

const INSTRUCTION: &str = "(Use space to select, enter to confirm)";
const VISIBLE_ROWS: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("Selection cancelled")]
    Cancelled,
    #[error("No playlist named {}", .0.join(", "))]
    UnknownPlaylists(Vec<String>),
}

/// Top level things that can be migrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Playlists,
    LikedTracks,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Playlists, Category::LikedTracks];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Playlists => "Playlists",
            Category::LikedTracks => "Liked Tracks",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Confirm,
    Cancel,
}

/// Checkbox list state, driven by key events.
#[derive(Debug)]
struct MultiSelect {
    labels: Vec<String>,
    checked: Vec<bool>,
    cursor: usize,
    scroll: usize,
}

impl MultiSelect {
    fn new(labels: Vec<String>) -> Self {
        let checked = vec![false; labels.len()];
        Self {
            labels,
            checked,
            cursor: 0,
            scroll: 0,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyAction {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                KeyAction::Cancel
            }
            KeyCode::Esc | KeyCode::Char('q') => KeyAction::Cancel,
            KeyCode::Enter => KeyAction::Confirm,
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(-1);
                KeyAction::Continue
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(1);
                KeyAction::Continue
            }
            KeyCode::Char(' ') => {
                if let Some(checked) = self.checked.get_mut(self.cursor) {
                    *checked = !*checked;
                }
                KeyAction::Continue
            }
            KeyCode::Char('a') => {
                let all = self.checked.iter().all(|c| *c);
                self.checked.iter_mut().for_each(|c| *c = !all);
                KeyAction::Continue
            }
            _ => KeyAction::Continue,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.labels.is_empty() {
            return;
        }
        let len = self.labels.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;

        if self.cursor < self.scroll {
            self.scroll = self.cursor;
        } else if self.cursor >= self.scroll + VISIBLE_ROWS {
            self.scroll = self.cursor + 1 - VISIBLE_ROWS;
        }
    }

    fn selected(&self) -> Vec<usize> {
        self.checked
            .iter()
            .enumerate()
            .filter(|(_, checked)| **checked)
            .map(|(index, _)| index)
            .collect()
    }

    fn visible_rows(&self) -> Vec<String> {
        self.labels
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(VISIBLE_ROWS)
            .map(|(index, label)| {
                format!(
                    "{} [{}] {}",
                    if index == self.cursor { ">" } else { " " },
                    if self.checked[index] { "x" } else { " " },
                    label
                )
            })
            .collect()
    }
}

/// Restores cooked mode when dropped.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

fn render(out: &mut impl Write, message: &str, state: &MultiSelect, first: bool) -> io::Result<()> {
    let rows = state.visible_rows();
    if !first {
        queue!(out, cursor::MoveToPreviousLine(rows.len() as u16 + 1))?;
    }
    queue!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::FromCursorDown),
        SetAttribute(Attribute::Bold),
        Print(format!("? {} ", message)),
        SetAttribute(Attribute::Reset),
        Print(INSTRUCTION),
        Print("\r\n")
    )?;
    for row in &rows {
        queue!(out, Print(row), Print("\r\n"))?;
    }
    out.flush()
}

fn run_multi_select(message: &str, labels: Vec<String>) -> Result<Vec<usize>, SelectionError> {
    let mut state = MultiSelect::new(labels);
    let mut out = io::stdout();
    let _guard = RawModeGuard::enable()?;

    queue!(out, cursor::Hide)?;
    render(&mut out, message, &state, true)?;
    let action = loop {
        let Event::Key(key) = crossterm::event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match state.handle_key(key) {
            KeyAction::Continue => {
                render(&mut out, message, &state, false)?;
            }
            action => break action,
        }
    };
    queue!(out, cursor::Show)?;
    out.flush()?;

    match action {
        KeyAction::Cancel => Err(SelectionError::Cancelled),
        _ => Ok(state.selected()),
    }
}

async fn multi_select(
    message: &'static str,
    labels: Vec<String>,
) -> Result<Vec<usize>, SelectionError> {
    tokio::task::spawn_blocking(move || run_multi_select(message, labels))
        .await
        .map_err(|e| SelectionError::Terminal(io::Error::other(e)))?
}

/// Ask which categories to migrate. An empty result means nothing was chosen.
pub async fn prompt_categories() -> Result<Vec<Category>, SelectionError> {
    let labels = Category::ALL.iter().map(|c| c.label().to_string()).collect();
    let chosen = multi_select("What would you like to migrate?", labels).await?;
    Ok(chosen.into_iter().map(|index| Category::ALL[index]).collect())
}

/// Ask which of `playlists` to migrate, labelled `name (N Tracks)`.
pub async fn prompt_playlists(playlists: Vec<Playlist>) -> Result<Vec<Playlist>, SelectionError> {
    if playlists.is_empty() {
        println!("No playlists found");
        return Ok(Vec::new());
    }
    let labels = playlists.iter().map(Playlist::label).collect();
    let chosen: HashSet<usize> = multi_select("Which playlists do you want to migrate?", labels)
        .await?
        .into_iter()
        .collect();
    Ok(playlists
        .into_iter()
        .enumerate()
        .filter(|(index, _)| chosen.contains(index))
        .map(|(_, playlist)| playlist)
        .collect())
}

/// Pick playlists by exact name, keeping the source listing order.
///
/// Every playlist carrying a requested name is selected. Fails if any name matches nothing.
pub fn select_by_name(
    playlists: Vec<Playlist>,
    names: &[String],
) -> Result<Vec<Playlist>, SelectionError> {
    let known: HashSet<&str> = playlists.iter().map(|p| p.name.as_str()).collect();
    let unknown: Vec<String> = names
        .iter()
        .filter(|name| !known.contains(name.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(SelectionError::UnknownPlaylists(unknown));
    }

    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    Ok(playlists
        .into_iter()
        .filter(|playlist| wanted.contains(playlist.name.as_str()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn playlist(id: &str, name: &str) -> Playlist {
        Playlist {
            id: id.into(),
            name: name.into(),
            description: None,
            total_tracks: 1,
        }
    }

    fn labels(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("item {}", i)).collect()
    }

    #[test]
    fn test_toggle_and_confirm() {
        let mut state = MultiSelect::new(labels(3));

        assert_eq!(state.handle_key(key(KeyCode::Down)), KeyAction::Continue);
        state.handle_key(key(KeyCode::Char(' ')));
        state.handle_key(key(KeyCode::Down));
        state.handle_key(key(KeyCode::Char(' ')));
        state.handle_key(key(KeyCode::Char(' ')));
        state.handle_key(key(KeyCode::Up));
        state.handle_key(key(KeyCode::Up));
        state.handle_key(key(KeyCode::Char(' ')));

        assert_eq!(state.handle_key(key(KeyCode::Enter)), KeyAction::Confirm);
        assert_eq!(state.selected(), vec![0, 1]);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut state = MultiSelect::new(labels(3));

        state.handle_key(key(KeyCode::Up));
        assert_eq!(state.cursor, 2);
        state.handle_key(key(KeyCode::Down));
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_toggle_all() {
        let mut state = MultiSelect::new(labels(3));

        state.handle_key(key(KeyCode::Char('a')));
        assert_eq!(state.selected(), vec![0, 1, 2]);
        state.handle_key(key(KeyCode::Char('a')));
        assert!(state.selected().is_empty());
    }

    #[test]
    fn test_cancel_keys() {
        let mut state = MultiSelect::new(labels(2));

        assert_eq!(state.handle_key(key(KeyCode::Esc)), KeyAction::Cancel);
        assert_eq!(
            state.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Cancel
        );
    }

    #[test]
    fn test_long_list_scrolls_with_cursor() {
        let mut state = MultiSelect::new(labels(30));

        for _ in 0..VISIBLE_ROWS {
            state.handle_key(key(KeyCode::Down));
        }

        let rows = state.visible_rows();
        assert_eq!(rows.len(), VISIBLE_ROWS);
        assert_eq!(rows.last().unwrap(), &format!("> [ ] item {}", VISIBLE_ROWS));
        assert_eq!(rows[0], "  [ ] item 1");
    }

    #[test]
    fn test_empty_list_confirms_nothing() {
        let mut state = MultiSelect::new(Vec::new());

        state.handle_key(key(KeyCode::Down));
        state.handle_key(key(KeyCode::Char(' ')));

        assert_eq!(state.handle_key(key(KeyCode::Enter)), KeyAction::Confirm);
        assert!(state.selected().is_empty());
    }

    #[test]
    fn test_select_by_name_keeps_listing_order() {
        let playlists = vec![
            playlist("p1", "Road Trip"),
            playlist("p2", "Focus"),
            playlist("p3", "Gym"),
        ];

        let selected =
            select_by_name(playlists, &["Gym".to_string(), "Road Trip".to_string()]).unwrap();

        let ids: Vec<_> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[test]
    fn test_select_by_name_rejects_unknown() {
        let playlists = vec![playlist("p1", "Road Trip")];

        let result = select_by_name(playlists, &["Road Trip".to_string(), "Nope".to_string()]);

        match result {
            Err(SelectionError::UnknownPlaylists(names)) => assert_eq!(names, vec!["Nope"]),
            other => panic!("Expected unknown playlist error, got {:?}", other),
        }
    }
}
