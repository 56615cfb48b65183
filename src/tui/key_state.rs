//! Per-frame key state.
//!
//! The terminal reports key presses only, so a press is held until a
//! release deadline passes. Pressing the same key again moves the deadline
//! instead of queueing a second release. `update_key_states` diffs the held
//! set against the previous frame to expose one-frame "just pressed" and
//! "just released" edges.

use std::time::{Duration, Instant};

use super::keys::Key;

#[derive(Debug, Clone, Copy)]
struct Press {
    key: Key,
    release_at: Option<Instant>,
}

#[derive(Debug)]
pub struct KeyState {
    /// Currently held keys, in press order.
    held: Vec<Press>,
    previous: Vec<Key>,
    just_pressed: Vec<Key>,
    just_released: Vec<Key>,
    release_after: Duration,
}

impl KeyState {
    pub fn new(release_after: Duration) -> Self {
        KeyState {
            held: Vec::new(),
            previous: Vec::new(),
            just_pressed: Vec::new(),
            just_released: Vec::new(),
            release_after,
        }
    }

    /// Record a key arriving from the terminal and schedule its release.
    pub fn press(&mut self, key: Key, now: Instant) {
        let release_at = Some(now + self.release_after);
        if let Some(p) = self.held.iter_mut().find(|p| p.key == key) {
            p.release_at = release_at;
        } else {
            self.held.push(Press { key, release_at });
        }
    }

    /// Set a key's held flag directly. A manual press has no release deadline.
    pub fn set_key_state(&mut self, key: Key, pressed: bool) {
        if pressed {
            if !self.is_pressed(key) {
                self.held.push(Press {
                    key,
                    release_at: None,
                });
            }
        } else {
            self.held.retain(|p| p.key != key);
        }
    }

    /// Release every key whose deadline has passed.
    pub fn release_expired(&mut self, now: Instant) {
        self.held
            .retain(|p| p.release_at.is_none_or(|deadline| deadline > now));
    }

    /// Start-of-frame snapshot: recompute the edges against the last frame.
    pub fn update_key_states(&mut self) {
        let current: Vec<Key> = self.held.iter().map(|p| p.key).collect();
        self.just_pressed = current
            .iter()
            .filter(|k| !self.previous.contains(k))
            .copied()
            .collect();
        self.just_released = self
            .previous
            .iter()
            .filter(|k| !current.contains(k))
            .copied()
            .collect();
        self.previous = current;
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.held.iter().any(|p| p.key == key)
    }

    pub fn just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    /// If `key` is held, clear it and run `f`. Returns whether `f` ran.
    pub fn consume_key(&mut self, key: Key, f: impl FnOnce()) -> bool {
        let Some(idx) = self.held.iter().position(|p| p.key == key) else {
            return false;
        };
        self.held.remove(idx);
        self.forget(key);
        f();
        true
    }

    /// Hand the earliest held key to `f`, clearing only that key.
    pub fn consume_any_key(&mut self, f: impl FnOnce(Key)) -> bool {
        if self.held.is_empty() {
            return false;
        }
        let press = self.held.remove(0);
        self.forget(press.key);
        f(press.key);
        true
    }

    /// A consumed key counts as released, so pressing it again before the
    /// next snapshot is still a fresh edge.
    fn forget(&mut self, key: Key) {
        self.previous.retain(|k| *k != key);
    }

    /// Drop all held keys, e.g. when switching pages.
    pub fn clear(&mut self) {
        self.held.clear();
        self.previous.clear();
    }
}
