//! Chat bubble lifecycle: attach, become visible, fade, detach.
//!
//! At most one bubble exists per entity. Each scheduled step remembers the
//! bubble it was scheduled for and is discarded unless that bubble is still
//! the current one when the step comes due.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OverlayId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPhase {
    Attached,
    Visible,
    Fading,
}

/// Renderer-facing bubble changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OverlayEvent {
    Attached { overlay: OverlayId, text: String },
    Visible { overlay: OverlayId },
    Fading { overlay: OverlayId },
    Detached { overlay: OverlayId },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Reveal,
    Fade,
    Detach,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: f64,
    overlay: OverlayId,
    step: Step,
}

#[derive(Debug, Clone)]
struct Bubble {
    id: OverlayId,
    text: String,
    phase: OverlayPhase,
}

/// One entity's bubble slot and its pending timers.
#[derive(Debug, Clone)]
pub struct SpeechBubble {
    fade_delay: f64,
    detach_delay: f64,
    current: Option<Bubble>,
    schedule: Vec<Scheduled>,
    next_id: u64,
}

impl SpeechBubble {
    pub fn new(fade_delay: f32, detach_delay: f32) -> Self {
        Self {
            fade_delay: f64::from(fade_delay),
            detach_delay: f64::from(detach_delay),
            current: None,
            schedule: Vec::new(),
            next_id: 0,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|b| b.text.as_str())
    }

    pub fn phase(&self) -> Option<OverlayPhase> {
        self.current.as_ref().map(|b| b.phase)
    }

    pub fn current_id(&self) -> Option<OverlayId> {
        self.current.as_ref().map(|b| b.id)
    }

    /// Replaces any active bubble with `text`, starting at session time `now`.
    pub fn show(&mut self, text: impl Into<String>, now: f64) -> Vec<OverlayEvent> {
        let mut events = Vec::new();
        if let Some(old) = self.current.take() {
            events.push(OverlayEvent::Detached { overlay: old.id });
        }

        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.schedule.retain(|s| s.overlay == id);
        let text = text.into();
        self.current = Some(Bubble {
            id,
            text: text.clone(),
            phase: OverlayPhase::Attached,
        });

        let fade_at = now + self.fade_delay;
        self.schedule.push(Scheduled {
            due: now,
            overlay: id,
            step: Step::Reveal,
        });
        self.schedule.push(Scheduled {
            due: fade_at,
            overlay: id,
            step: Step::Fade,
        });
        self.schedule.push(Scheduled {
            due: fade_at + self.detach_delay,
            overlay: id,
            step: Step::Detach,
        });

        events.push(OverlayEvent::Attached { overlay: id, text });
        events
    }

    /// Fires every step due at or before `now`.
    pub fn advance(&mut self, now: f64) -> Vec<OverlayEvent> {
        let (due, pending): (Vec<_>, Vec<_>) =
            self.schedule.drain(..).partition(|s| s.due <= now);
        self.schedule = pending;

        let mut events = Vec::new();
        for scheduled in due {
            let Some(bubble) = self.current.as_mut() else {
                continue;
            };
            if bubble.id != scheduled.overlay {
                continue;
            }
            match scheduled.step {
                Step::Reveal => {
                    bubble.phase = OverlayPhase::Visible;
                    events.push(OverlayEvent::Visible { overlay: bubble.id });
                }
                Step::Fade => {
                    bubble.phase = OverlayPhase::Fading;
                    events.push(OverlayEvent::Fading { overlay: bubble.id });
                }
                Step::Detach => {
                    events.push(OverlayEvent::Detached { overlay: bubble.id });
                    self.current = None;
                }
            }
        }
        events
    }

    /// Detaches immediately and forgets every pending step.
    pub fn clear(&mut self) -> Option<OverlayEvent> {
        self.schedule.clear();
        self.current
            .take()
            .map(|b| OverlayEvent::Detached { overlay: b.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble() -> SpeechBubble {
        SpeechBubble::new(5.0, 0.5)
    }

    #[test]
    fn full_lifecycle() {
        let mut b = bubble();
        let ev = b.show("hello", 0.0);
        assert!(matches!(ev.as_slice(), [OverlayEvent::Attached { .. }]));

        let ev = b.advance(0.016);
        assert!(matches!(ev.as_slice(), [OverlayEvent::Visible { .. }]));
        assert_eq!(b.phase(), Some(OverlayPhase::Visible));

        assert!(b.advance(4.9).is_empty());

        let ev = b.advance(5.0);
        assert!(matches!(ev.as_slice(), [OverlayEvent::Fading { .. }]));

        let ev = b.advance(5.5);
        assert!(matches!(ev.as_slice(), [OverlayEvent::Detached { .. }]));
        assert_eq!(b.text(), None);
    }

    #[test]
    fn superseding_show_leaves_one_bubble() {
        let mut b = bubble();
        b.show("a", 0.0);
        b.advance(0.1);
        let ev = b.show("b", 3.0);
        let first_detach = ev
            .iter()
            .filter(|e| matches!(e, OverlayEvent::Detached { .. }))
            .count();
        assert_eq!(first_detach, 1);
        let second = b.current_id().unwrap();

        // The first bubble's fade (5.0) and detach (5.5) come due here and
        // must not touch the second one.
        let ev = b.advance(5.6);
        assert!(ev.iter().all(|e| match e {
            OverlayEvent::Visible { overlay } => *overlay == second,
            _ => false,
        }));
        assert_eq!(b.text(), Some("b"));
        assert_eq!(b.phase(), Some(OverlayPhase::Visible));

        let ev = b.advance(8.0);
        assert_eq!(ev, vec![OverlayEvent::Fading { overlay: second }]);
        let ev = b.advance(8.5);
        assert_eq!(ev, vec![OverlayEvent::Detached { overlay: second }]);
        assert_eq!(b.text(), None);
    }

    #[test]
    fn superseded_steps_are_pruned() {
        let mut b = bubble();
        b.show("a", 0.0);
        b.show("b", 1.0);
        assert_eq!(b.schedule.len(), 3);
        assert!(b.schedule.iter().all(|s| Some(s.overlay) == b.current_id()));
    }

    #[test]
    fn timers_hold_precision_late_in_a_session() {
        let mut b = bubble();
        let start = 524_288.0;
        b.show("hi", start);
        assert_eq!(b.advance(start + 1.0 / 60.0).len(), 1);
        assert!(b.advance(start + 4.9).is_empty());
        assert!(matches!(b.advance(start + 5.0).as_slice(), [OverlayEvent::Fading { .. }]));
        assert!(matches!(b.advance(start + 5.5).as_slice(), [OverlayEvent::Detached { .. }]));
    }

    #[test]
    fn clear_cancels_pending_steps() {
        let mut b = bubble();
        b.show("bye", 0.0);
        assert!(b.clear().is_some());
        assert!(b.advance(10.0).is_empty());
        assert!(b.clear().is_none());
    }
}
