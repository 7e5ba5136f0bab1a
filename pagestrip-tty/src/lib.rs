use std::io::Write;

use anyhow::Result;
use crossterm::{
    cursor,
    event::{
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType},
};
use pagestrip_core::{Key, KeyPress, ScrollShortcut};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Pointer {
        phase: PointerPhase,
        column: u16,
        row: u16,
    },
    Key(KeyPress),
    Scroll { rows: i32 },
    Shortcut(ScrollShortcut),
    Resize { columns: u16, rows: u16 },
    Quit,
    None,
}

/// Translates crossterm events into reader inputs.
#[derive(Debug, Default)]
pub struct EventMapper {
    dragging: bool,
}

impl EventMapper {
    pub const WHEEL_ROWS: i32 = 3;
    pub const PAGE_ROWS: i32 = 20;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) => self.map_key(key),
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::Resize(columns, rows) => UiEvent::Resize { columns, rows },
            _ => UiEvent::None,
        }
    }

    fn map_key(&mut self, event: KeyEvent) -> UiEvent {
        if event.kind == KeyEventKind::Release {
            return UiEvent::None;
        }
        let KeyEvent {
            code, modifiers, ..
        } = event;
        match (code, modifiers) {
            (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                UiEvent::Quit
            }
            (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => UiEvent::Quit,
            (KeyCode::Left, _) => UiEvent::Key(KeyPress::new(Key::ArrowLeft)),
            (KeyCode::Right, _) => UiEvent::Key(KeyPress::new(Key::ArrowRight)),
            (KeyCode::Char(' '), _) => UiEvent::Key(KeyPress::new(Key::Space)),
            (KeyCode::PageDown, _) => UiEvent::Key(KeyPress::new(Key::PageDown)),
            (KeyCode::PageUp, _) => UiEvent::Scroll {
                rows: -Self::PAGE_ROWS,
            },
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => UiEvent::Scroll {
                rows: Self::WHEEL_ROWS,
            },
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => UiEvent::Scroll {
                rows: -Self::WHEEL_ROWS,
            },
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => {
                UiEvent::Shortcut(ScrollShortcut::ToTop)
            }
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => {
                UiEvent::Shortcut(ScrollShortcut::ToBottom)
            }
            (KeyCode::Char(c), _) => UiEvent::Key(KeyPress::new(Key::Char(c))),
            _ => UiEvent::Key(KeyPress::new(Key::Other)),
        }
    }

    fn map_mouse(&mut self, event: MouseEvent) -> UiEvent {
        let MouseEvent {
            kind, column, row, ..
        } = event;
        let phase = match kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.dragging = true;
                PointerPhase::Down
            }
            MouseEventKind::Drag(MouseButton::Left) if self.dragging => PointerPhase::Move,
            MouseEventKind::Up(MouseButton::Left) => {
                self.dragging = false;
                PointerPhase::Up
            }
            MouseEventKind::ScrollDown => {
                return UiEvent::Scroll {
                    rows: Self::WHEEL_ROWS,
                }
            }
            MouseEventKind::ScrollUp => {
                return UiEvent::Scroll {
                    rows: -Self::WHEEL_ROWS,
                }
            }
            other => {
                trace!(?other, "ignored mouse event");
                return UiEvent::None;
            }
        };
        UiEvent::Pointer { phase, column, row }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Plain,
    Inverted,
    Dim,
}

/// Writes whole terminal rows. Frames are bracketed with synchronized-update
/// escapes so the strip never tears while scrolling.
pub struct TerminalPainter<W: Write> {
    writer: W,
}

impl<W: Write> TerminalPainter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// The terminal renders all buffered changes at once.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }

    /// Paints `content` on `row`, padded or truncated to `width` columns.
    pub fn draw_line(
        &mut self,
        row: u16,
        width: usize,
        content: &str,
        style: LineStyle,
    ) -> Result<()> {
        let text = fit_to_width(content, width);
        let attribute = match style {
            LineStyle::Plain => Attribute::Reset,
            LineStyle::Inverted => Attribute::Reverse,
            LineStyle::Dim => Attribute::Dim,
        };
        crossterm::queue!(
            self.writer,
            cursor::MoveTo(0, row),
            SetAttribute(attribute),
            Print(text),
            SetAttribute(Attribute::Reset)
        )?;
        Ok(())
    }
}

/// Truncates with an ellipsis or pads with spaces to exactly `width` chars.
pub fn fit_to_width(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        if width <= 3 {
            text.chars().take(width).collect()
        } else {
            let mut truncated: String = text.chars().take(width - 3).collect();
            truncated.push_str("...");
            truncated
        }
    } else {
        let mut padded = text.to_string();
        padded.push_str(&" ".repeat(width - count));
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse_event(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn arrows_map_to_navigation_keys() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Left)),
            UiEvent::Key(KeyPress::new(Key::ArrowLeft))
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Right)),
            UiEvent::Key(KeyPress::new(Key::ArrowRight))
        );
    }

    #[test]
    fn space_and_page_down_map_to_page_advance() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char(' '))),
            UiEvent::Key(KeyPress::new(Key::Space))
        );
        assert_eq!(
            mapper.map_event(key_event(KeyCode::PageDown)),
            UiEvent::Key(KeyPress::new(Key::PageDown))
        );
    }

    #[test]
    fn letters_pass_through_for_reader_shortcuts() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('h'))),
            UiEvent::Key(KeyPress::new(Key::Char('h')))
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('T'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Key(KeyPress::new(Key::Char('T')))
        );
    }

    #[test]
    fn quit_keys() {
        let mut mapper = EventMapper::new();
        assert_eq!(mapper.map_event(key_event(KeyCode::Char('q'))), UiEvent::Quit);
        assert_eq!(mapper.map_event(key_event(KeyCode::Esc)), UiEvent::Quit);
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )),
            UiEvent::Quit
        );
    }

    #[test]
    fn g_keys_map_to_scroll_shortcuts() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Shortcut(ScrollShortcut::ToTop)
        );
        assert_eq!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Shortcut(ScrollShortcut::ToBottom)
        );
    }

    #[test]
    fn key_release_is_ignored() {
        let mut mapper = EventMapper::new();
        let event = Event::Key(KeyEvent {
            code: KeyCode::Right,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(mapper.map_event(event), UiEvent::None);
    }

    #[test]
    fn left_button_sequence_maps_to_pointer_phases() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::Down(MouseButton::Left), 4, 9)),
            UiEvent::Pointer {
                phase: PointerPhase::Down,
                column: 4,
                row: 9
            }
        );
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::Drag(MouseButton::Left), 4, 11)),
            UiEvent::Pointer {
                phase: PointerPhase::Move,
                column: 4,
                row: 11
            }
        );
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::Up(MouseButton::Left), 4, 11)),
            UiEvent::Pointer {
                phase: PointerPhase::Up,
                column: 4,
                row: 11
            }
        );
    }

    #[test]
    fn drag_without_press_is_dropped() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::Drag(MouseButton::Left), 1, 1)),
            UiEvent::None
        );
    }

    #[test]
    fn wheel_scrolls_three_rows() {
        let mut mapper = EventMapper::new();
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::ScrollDown, 0, 0)),
            UiEvent::Scroll { rows: 3 }
        );
        assert_eq!(
            mapper.map_event(mouse_event(MouseEventKind::ScrollUp, 0, 0)),
            UiEvent::Scroll { rows: -3 }
        );
    }

    #[test]
    fn fit_to_width_pads_and_truncates() {
        assert_eq!(fit_to_width("abc", 5), "abc  ");
        assert_eq!(fit_to_width("abcdefgh", 6), "abc...");
        assert_eq!(fit_to_width("abcdef", 2), "ab");
    }

    #[test]
    fn painter_brackets_frames_with_sync_escapes() {
        let mut painter = TerminalPainter::new(Vec::new());
        painter.begin_sync_update().unwrap();
        painter.draw_line(0, 4, "hi", LineStyle::Inverted).unwrap();
        painter.end_sync_update().unwrap();
        let output = String::from_utf8(painter.writer).unwrap();
        assert!(output.starts_with("\u{1b}[?2026h"));
        assert!(output.contains("hi  "));
        assert!(output.ends_with("\u{1b}[?2026l"));
    }
}
