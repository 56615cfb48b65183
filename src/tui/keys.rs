use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

// ── Byte sequences ───────────────────────────────────────────────────

/// Raw byte sequences a terminal in raw mode emits for the named keys.
pub mod bytes {
    pub const ENTER: &[u8] = b"\r";
    pub const ESC: &[u8] = b"\x1b";
    pub const BACKSPACE: &[u8] = b"\x7f";
    pub const UP: &[u8] = b"\x1b[A";
    pub const DOWN: &[u8] = b"\x1b[B";
    pub const RIGHT: &[u8] = b"\x1b[C";
    pub const LEFT: &[u8] = b"\x1b[D";
    pub const TAB: &[u8] = b"\t";
    pub const BACK_TAB: &[u8] = b"\x1b[Z";
    pub const SPACE: &[u8] = b" ";
    pub const CTRL_C: &[u8] = b"\x03";
}

/// A decoded key press: a printable character or one of the named keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    Tab,
    BackTab,
    Space,
    CtrlC,
}

const NAMED: &[(&[u8], Key)] = &[
    (bytes::ENTER, Key::Enter),
    (bytes::ESC, Key::Esc),
    (bytes::BACKSPACE, Key::Backspace),
    (bytes::UP, Key::Up),
    (bytes::DOWN, Key::Down),
    (bytes::RIGHT, Key::Right),
    (bytes::LEFT, Key::Left),
    (bytes::TAB, Key::Tab),
    (bytes::BACK_TAB, Key::BackTab),
    (bytes::SPACE, Key::Space),
    (bytes::CTRL_C, Key::CtrlC),
];

impl Key {
    /// Decode one raw input chunk. Named sequences match exactly; anything
    /// else must be a single printable character.
    pub fn from_bytes(raw: &[u8]) -> Option<Key> {
        if let Some((_, key)) = NAMED.iter().find(|(seq, _)| *seq == raw) {
            return Some(*key);
        }
        let s = std::str::from_utf8(raw).ok()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(Key::Char(c)),
            _ => None,
        }
    }

    /// Adapt an already-decoded crossterm event by mapping it back to the
    /// bytes the terminal sent and decoding those.
    pub fn from_event(event: KeyEvent) -> Option<Key> {
        let mut buf = [0; 4];
        let raw: &[u8] = match event.code {
            KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => bytes::CTRL_C,
            KeyCode::Char(_) if event.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                return None;
            }
            KeyCode::Char(c) => c.encode_utf8(&mut buf).as_bytes(),
            KeyCode::Enter => bytes::ENTER,
            KeyCode::Esc => bytes::ESC,
            KeyCode::Backspace => bytes::BACKSPACE,
            KeyCode::Up => bytes::UP,
            KeyCode::Down => bytes::DOWN,
            KeyCode::Left => bytes::LEFT,
            KeyCode::Right => bytes::RIGHT,
            KeyCode::Tab if event.modifiers.contains(KeyModifiers::SHIFT) => bytes::BACK_TAB,
            KeyCode::Tab => bytes::TAB,
            KeyCode::BackTab => bytes::BACK_TAB,
            _ => return None,
        };
        Key::from_bytes(raw)
    }

    /// The character this key types into a text field, if any.
    pub fn as_char(self) -> Option<char> {
        match self {
            Key::Char(c) => Some(c),
            Key::Space => Some(' '),
            _ => None,
        }
    }

    /// Short label shown in the hint bar.
    pub fn label(self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Enter => "Enter".into(),
            Key::Esc => "Esc".into(),
            Key::Backspace => "Bksp".into(),
            Key::Up => "↑".into(),
            Key::Down => "↓".into(),
            Key::Left => "←".into(),
            Key::Right => "→".into(),
            Key::Tab => "Tab".into(),
            Key::BackTab => "S-Tab".into(),
            Key::Space => "Space".into(),
            Key::CtrlC => "C-c".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_sequences_decode() {
        assert_eq!(Key::from_bytes(b"\r"), Some(Key::Enter));
        assert_eq!(Key::from_bytes(b"\x1b"), Some(Key::Esc));
        assert_eq!(Key::from_bytes(b"\x7f"), Some(Key::Backspace));
        assert_eq!(Key::from_bytes(b"\x1b[A"), Some(Key::Up));
        assert_eq!(Key::from_bytes(b"\x1b[D"), Some(Key::Left));
        assert_eq!(Key::from_bytes(b"\x1b[Z"), Some(Key::BackTab));
        assert_eq!(Key::from_bytes(b" "), Some(Key::Space));
    }

    #[test]
    fn printable_and_unknown() {
        assert_eq!(Key::from_bytes(b"d"), Some(Key::Char('d')));
        assert_eq!(Key::from_bytes("é".as_bytes()), Some(Key::Char('é')));
        assert_eq!(Key::from_bytes(b"ab"), None);
        assert_eq!(Key::from_bytes(b"\x1b[15~"), None);
        assert_eq!(Key::from_bytes(b""), None);
    }

    #[test]
    fn events_decode_through_the_byte_table() {
        let cases = [
            (KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), Key::Enter),
            (KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), Key::Esc),
            (KeyEvent::new(KeyCode::Up, KeyModifiers::NONE), Key::Up),
            (KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT), Key::BackTab),
            (KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE), Key::Space),
            (KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Key::CtrlC),
            (KeyEvent::new(KeyCode::Char('y'), KeyModifiers::NONE), Key::Char('y')),
        ];
        for (event, key) in cases {
            assert_eq!(Key::from_event(event), Some(key));
        }
    }

    #[test]
    fn ctrl_chords_other_than_ctrl_c_are_ignored() {
        let event = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(Key::from_event(event), None);
    }
}
