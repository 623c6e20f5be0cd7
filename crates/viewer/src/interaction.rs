//! Raw input classification.
//!
//! Translates the pointer/drag/wheel event stream into the two
//! edge-triggered signals the state machine consumes: `Started` on the
//! first manual input after quiescence, `Ended` once no input has been
//! seen for a short debounce window with no button held. Repeated inputs
//! while already interacting are coalesced. The monitor holds no
//! orbit-mode state and never samples the clock itself, so
//! classification is deterministic under test.

use std::time::{Duration, Instant};

use glam::Vec2;
use tracing::trace;

/// How long after the last input (with the pointer up) an interaction
/// counts as ended.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// A raw input event from the canvas surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// A button went down at this position.
    Pressed { position: Vec2 },
    /// The pointer moved. Only counts as manual input while a button is
    /// held; hover movement is not interaction.
    Moved { position: Vec2 },
    /// The held button was released.
    Released,
    /// Scroll wheel movement (zoom).
    Wheel { delta: f32 },
}

/// Edge-triggered classification of the raw stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionSignal {
    /// First manual input after a quiescent period.
    Started,
    /// No manual input for the debounce window.
    Ended,
}

/// Classifies raw pointer events into interaction edges.
#[derive(Debug)]
pub struct InteractionMonitor {
    debounce: Duration,
    active: bool,
    pointer_down: bool,
    last_input: Option<Instant>,
}

impl Default for InteractionMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl InteractionMonitor {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            active: false,
            pointer_down: false,
            last_input: None,
        }
    }

    /// Whether an interaction is currently considered live.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed one raw event; returns a signal on an activity edge.
    pub fn feed(&mut self, event: PointerEvent, now: Instant) -> Option<InteractionSignal> {
        match event {
            PointerEvent::Pressed { .. } => {
                self.pointer_down = true;
                self.mark_input(now)
            }
            PointerEvent::Moved { .. } => {
                if self.pointer_down {
                    self.mark_input(now)
                } else {
                    None
                }
            }
            PointerEvent::Released => {
                self.pointer_down = false;
                // Release itself is input; the end edge comes from the
                // debounce window in `tick`.
                self.last_input = Some(now);
                None
            }
            PointerEvent::Wheel { .. } => self.mark_input(now),
        }
    }

    /// Advance the monitor's clock; returns `Ended` once the debounce
    /// window elapses with the pointer up and no further input.
    pub fn tick(&mut self, now: Instant) -> Option<InteractionSignal> {
        if !self.active || self.pointer_down {
            return None;
        }
        let quiet = self
            .last_input
            .is_none_or(|last| now.saturating_duration_since(last) >= self.debounce);
        if quiet {
            self.active = false;
            trace!("interaction ended");
            return Some(InteractionSignal::Ended);
        }
        None
    }

    fn mark_input(&mut self, now: Instant) -> Option<InteractionSignal> {
        self.last_input = Some(now);
        if self.active {
            return None;
        }
        self.active = true;
        trace!("interaction started");
        Some(InteractionSignal::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_press_starts_once() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();

        let signal = monitor.feed(
            PointerEvent::Pressed {
                position: Vec2::ZERO,
            },
            base,
        );
        assert_eq!(signal, Some(InteractionSignal::Started));

        // Further input while active is coalesced.
        assert_eq!(
            monitor.feed(
                PointerEvent::Moved {
                    position: Vec2::new(4.0, 2.0)
                },
                at(base, 10)
            ),
            None
        );
        assert_eq!(
            monitor.feed(PointerEvent::Wheel { delta: 1.0 }, at(base, 20)),
            None
        );
        assert!(monitor.is_active());
    }

    #[test]
    fn test_hover_movement_is_not_interaction() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();
        assert_eq!(
            monitor.feed(
                PointerEvent::Moved {
                    position: Vec2::new(1.0, 1.0)
                },
                base
            ),
            None
        );
        assert!(!monitor.is_active());
    }

    #[test]
    fn test_wheel_starts_interaction() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();
        assert_eq!(
            monitor.feed(PointerEvent::Wheel { delta: -0.5 }, base),
            Some(InteractionSignal::Started)
        );
    }

    #[test]
    fn test_end_debounces_after_release() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();
        monitor.feed(
            PointerEvent::Pressed {
                position: Vec2::ZERO,
            },
            base,
        );
        monitor.feed(PointerEvent::Released, at(base, 100));

        // Still inside the window.
        assert_eq!(monitor.tick(at(base, 100 + 149)), None);
        assert!(monitor.is_active());

        assert_eq!(
            monitor.tick(at(base, 100 + 150)),
            Some(InteractionSignal::Ended)
        );
        assert!(!monitor.is_active());
        // The edge fires once.
        assert_eq!(monitor.tick(at(base, 1000)), None);
    }

    #[test]
    fn test_no_end_while_pointer_held() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();
        monitor.feed(
            PointerEvent::Pressed {
                position: Vec2::ZERO,
            },
            base,
        );
        assert_eq!(monitor.tick(at(base, 10_000)), None);
        assert!(monitor.is_active());
    }

    #[test]
    fn test_repress_during_debounce_keeps_interaction_alive() {
        let base = Instant::now();
        let mut monitor = InteractionMonitor::default();
        monitor.feed(
            PointerEvent::Pressed {
                position: Vec2::ZERO,
            },
            base,
        );
        monitor.feed(PointerEvent::Released, at(base, 50));

        // New press inside the window: no new Started edge, no Ended.
        assert_eq!(
            monitor.feed(
                PointerEvent::Pressed {
                    position: Vec2::ZERO
                },
                at(base, 100)
            ),
            None
        );
        assert_eq!(monitor.tick(at(base, 400)), None);

        monitor.feed(PointerEvent::Released, at(base, 500));
        assert_eq!(
            monitor.tick(at(base, 700)),
            Some(InteractionSignal::Ended)
        );
    }
}
