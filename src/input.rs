//! Keyboard input handling.
//!
//! Navigation keys mutate [`App`] directly.  Keys that affect sources come
//! back as a [`Command`] for the main loop, which owns the registry and the
//! aggregator.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] or a [`Command`] variant for the action.
//! 2. Add a `KeyCode` match arm in [`handle_key_event`].
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;

/// Source-level actions requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Flip the active flag of the filter at this index.
    ToggleSource(usize),
    /// Load the next page of every active source.
    LoadMore,
    /// Cancel every outstanding request.
    CancelLoading,
}

/// Process a single key event.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => {
            let was_at_end = app.at_end();
            app.select_next();
            // Scrolling past the bottom asks for more.
            if was_at_end {
                return Some(Command::LoadMore);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('n') => return Some(Command::LoadMore),
        KeyCode::Char('c') => return Some(Command::CancelLoading),
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            if index < app.filters.len() {
                return Some(Command::ToggleSource(index));
            }
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FilterView;
    use crate::source::FeedItem;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_filters(n: usize) -> App {
        let mut app = App::new();
        app.filters = (0..n)
            .map(|i| FilterView {
                key: format!("k{i}"),
                name: format!("Source {i}"),
                active: true,
                loading: false,
                pages: 0,
            })
            .collect();
        app
    }

    #[test]
    fn q_and_esc_quit() {
        let mut app = App::new();
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('q'))), None);
        assert!(app.quit);

        let mut app = App::new();
        handle_key_event(&mut app, press(KeyCode::Esc));
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = App::new();
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        key.state = KeyEventState::NONE;
        assert_eq!(handle_key_event(&mut app, key), None);
        assert!(!app.quit);
    }

    #[test]
    fn digits_toggle_existing_filters_only() {
        let mut app = app_with_filters(2);
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('2'))),
            Some(Command::ToggleSource(1))
        );
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Char('3'))), None);
    }

    #[test]
    fn load_and_cancel_keys() {
        let mut app = App::new();
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('n'))),
            Some(Command::LoadMore)
        );
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('c'))),
            Some(Command::CancelLoading)
        );
    }

    #[test]
    fn scrolling_past_the_last_item_loads_more() {
        let mut app = App::new();
        app.merge_batch(vec![FeedItem::new("1", "a"), FeedItem::new("2", "b")]);

        assert_eq!(handle_key_event(&mut app, press(KeyCode::Down)), None);
        assert_eq!(handle_key_event(&mut app, press(KeyCode::Down)), None);
        assert_eq!(
            handle_key_event(&mut app, press(KeyCode::Char('j'))),
            Some(Command::LoadMore)
        );
        assert_eq!(app.list_state.selected(), Some(1));
    }
}
