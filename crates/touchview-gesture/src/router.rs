use std::collections::BTreeMap;

use touchview_core::{
    CommandSink, PointerId, Position, TouchAction, TouchPoint, ViewerCommand, ViewerSettings,
};

use crate::selection::SelectionCandidate;

/// Turns raw multi-touch input into ordered per-pointer viewer commands.
///
/// Lives on the UI thread. It never talks to the engine directly; every
/// command goes through the [`CommandSink`] and is followed by a redraw
/// request.
#[derive(Debug, Clone)]
pub struct GestureRouter {
    touches: BTreeMap<PointerId, Position>,
    candidate: Option<SelectionCandidate>,
    tap_threshold: f32,
}

impl GestureRouter {
    /// `tap_threshold` is the per-axis drift, in pixels, a tap may have.
    pub fn new(tap_threshold: f32) -> Self {
        Self {
            touches: BTreeMap::new(),
            candidate: None,
            tap_threshold,
        }
    }

    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self::new(settings.tap_threshold())
    }

    pub fn tap_threshold(&self) -> f32 {
        self.tap_threshold
    }

    pub fn active_pointers(&self) -> impl Iterator<Item = TouchPoint> + '_ {
        self.touches
            .iter()
            .map(|(&pointer_id, &position)| TouchPoint { pointer_id, position })
    }

    pub fn active_count(&self) -> usize {
        self.touches.len()
    }

    pub fn candidate(&self) -> Option<&SelectionCandidate> {
        self.candidate.as_ref()
    }

    /// Single-pointer entry point matching the UI layer's event shape.
    pub fn on_touch(
        &mut self,
        sink: &impl CommandSink,
        action: TouchAction,
        pointer_id: PointerId,
        x: f32,
        y: f32,
    ) {
        match action {
            TouchAction::Down => self.pointer_down(sink, pointer_id, x, y),
            TouchAction::Move => self.pointer_move(sink, &[TouchPoint::new(pointer_id, x, y)]),
            TouchAction::Up => self.pointer_up(sink, pointer_id, x, y),
            TouchAction::Cancel => self.pointer_cancel(sink, pointer_id),
        }
    }

    pub fn pointer_down(&mut self, sink: &impl CommandSink, pointer_id: PointerId, x: f32, y: f32) {
        let position = Position::new(x, y);
        if self.touches.insert(pointer_id, position).is_some() {
            log::debug!("Pointer {} went down twice without lifting", pointer_id);
        }
        emit(sink, ViewerCommand::AddTouchPoint { id: pointer_id, x, y });

        // Only the first finger of a gesture may start a tap; a second
        // finger kills it for the rest of the gesture.
        self.candidate = if self.touches.len() == 1 {
            Some(SelectionCandidate::new(position))
        } else {
            None
        };
    }

    /// Apply one move event carrying any number of pointers, then mirror
    /// every active pointer into the engine.
    pub fn pointer_move(&mut self, sink: &impl CommandSink, moved: &[TouchPoint]) {
        for point in moved {
            let Some(slot) = self.touches.get_mut(&point.pointer_id) else {
                log::trace!("Ignoring move for unknown pointer {}", point.pointer_id);
                continue;
            };
            *slot = point.position;

            if let Some(candidate) = self.candidate.as_mut() {
                if !candidate.track(point.position, self.tap_threshold) {
                    log::trace!("Pointer {} drifted, tap becomes drag", point.pointer_id);
                    self.candidate = None;
                }
            }
        }

        for (&id, position) in &self.touches {
            emit(
                sink,
                ViewerCommand::UpdateTouchPoint {
                    id,
                    x: position.x,
                    y: position.y,
                },
            );
        }
    }

    pub fn pointer_up(&mut self, sink: &impl CommandSink, pointer_id: PointerId, x: f32, y: f32) {
        if self.touches.remove(&pointer_id).is_none() {
            log::debug!("Ignoring release of unknown pointer {}", pointer_id);
            return;
        }

        let mut candidate = self.candidate.take();
        if let Some(tap) = candidate.as_mut() {
            if !tap.track(Position::new(x, y), self.tap_threshold) {
                candidate = None;
            }
        }

        emit(sink, ViewerCommand::RemoveTouchPoint { id: pointer_id });
        if let Some(tap) = candidate {
            let at = tap.position();
            emit(sink, ViewerCommand::Select { x: at.x, y: at.y });
        }
    }

    pub fn pointer_cancel(&mut self, sink: &impl CommandSink, pointer_id: PointerId) {
        self.candidate = None;
        if self.touches.remove(&pointer_id).is_some() {
            emit(sink, ViewerCommand::RemoveTouchPoint { id: pointer_id });
        }
    }

    /// Release every active pointer, e.g. when the surface goes away mid-gesture.
    pub fn cancel_all(&mut self, sink: &impl CommandSink) {
        self.candidate = None;
        for id in std::mem::take(&mut self.touches).into_keys() {
            emit(sink, ViewerCommand::RemoveTouchPoint { id });
        }
    }
}

fn emit(sink: &impl CommandSink, command: ViewerCommand) {
    sink.post(command);
    sink.request_redraw();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Command(ViewerCommand),
        Redraw,
    }

    #[derive(Default)]
    struct RecordingSink {
        events: RefCell<Vec<Event>>,
    }

    impl RecordingSink {
        fn commands(&self) -> Vec<ViewerCommand> {
            self.events
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    Event::Command(c) => Some(c.clone()),
                    Event::Redraw => None,
                })
                .collect()
        }

        fn selects(&self) -> usize {
            self.commands()
                .iter()
                .filter(|c| matches!(c, ViewerCommand::Select { .. }))
                .count()
        }
    }

    impl CommandSink for RecordingSink {
        fn post(&self, command: ViewerCommand) {
            self.events.borrow_mut().push(Event::Command(command));
        }

        fn request_redraw(&self) {
            self.events.borrow_mut().push(Event::Redraw);
        }
    }

    #[test]
    fn test_tap_selects() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Move, 1, 12.0, 11.0);
        router.on_touch(&sink, TouchAction::Up, 1, 12.0, 11.0);

        assert_eq!(
            *sink.events.borrow(),
            vec![
                Event::Command(ViewerCommand::AddTouchPoint { id: 1, x: 10.0, y: 10.0 }),
                Event::Redraw,
                Event::Command(ViewerCommand::UpdateTouchPoint { id: 1, x: 12.0, y: 11.0 }),
                Event::Redraw,
                Event::Command(ViewerCommand::RemoveTouchPoint { id: 1 }),
                Event::Redraw,
                Event::Command(ViewerCommand::Select { x: 12.0, y: 11.0 }),
                Event::Redraw,
            ]
        );
        assert!(router.candidate().is_none());
        assert_eq!(router.active_count(), 0);
    }

    #[test]
    fn test_drag_beyond_threshold_never_selects() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Move, 1, 40.0, 10.0);
        // Coming back inside the allowance does not revive the tap.
        router.on_touch(&sink, TouchAction::Move, 1, 11.0, 10.0);
        router.on_touch(&sink, TouchAction::Up, 1, 11.0, 10.0);

        assert_eq!(sink.selects(), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 7, 0.0, 0.0);
        router.on_touch(&sink, TouchAction::Move, 7, 5.0, -5.0);
        router.on_touch(&sink, TouchAction::Up, 7, 5.0, -5.0);

        assert_eq!(sink.selects(), 1);
    }

    #[test]
    fn test_threshold_scales_with_density() {
        let settings = ViewerSettings::default().with_density(3.0);
        let sink = RecordingSink::default();
        let mut router = GestureRouter::from_settings(&settings);

        router.on_touch(&sink, TouchAction::Down, 1, 100.0, 100.0);
        router.on_touch(&sink, TouchAction::Move, 1, 114.0, 100.0);
        router.on_touch(&sink, TouchAction::Up, 1, 114.0, 100.0);
        assert_eq!(sink.selects(), 1);

        router.on_touch(&sink, TouchAction::Down, 1, 100.0, 100.0);
        router.on_touch(&sink, TouchAction::Move, 1, 116.0, 100.0);
        router.on_touch(&sink, TouchAction::Up, 1, 116.0, 100.0);
        assert_eq!(sink.selects(), 1);
    }

    #[test]
    fn test_second_pointer_kills_tap() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Down, 2, 50.0, 50.0);
        router.on_touch(&sink, TouchAction::Up, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Up, 2, 50.0, 50.0);

        assert_eq!(sink.selects(), 0);
        assert_eq!(
            sink.commands(),
            vec![
                ViewerCommand::AddTouchPoint { id: 1, x: 10.0, y: 10.0 },
                ViewerCommand::AddTouchPoint { id: 2, x: 50.0, y: 50.0 },
                ViewerCommand::RemoveTouchPoint { id: 1 },
                ViewerCommand::RemoveTouchPoint { id: 2 },
            ]
        );
    }

    #[test]
    fn test_no_resurrection_after_second_pointer_lifts() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Down, 2, 11.0, 11.0);
        router.on_touch(&sink, TouchAction::Up, 2, 11.0, 11.0);
        router.on_touch(&sink, TouchAction::Move, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Up, 1, 10.0, 10.0);

        assert_eq!(sink.selects(), 0);

        // A fresh gesture may tap again.
        router.on_touch(&sink, TouchAction::Down, 3, 20.0, 20.0);
        router.on_touch(&sink, TouchAction::Up, 3, 20.0, 20.0);
        assert_eq!(sink.selects(), 1);
    }

    #[test]
    fn test_move_updates_every_active_pointer() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.pointer_down(&sink, 4, 0.0, 0.0);
        router.pointer_down(&sink, 2, 100.0, 100.0);
        sink.events.borrow_mut().clear();

        router.pointer_move(&sink, &[TouchPoint::new(4, 10.0, 0.0)]);
        assert_eq!(
            sink.commands(),
            vec![
                ViewerCommand::UpdateTouchPoint { id: 2, x: 100.0, y: 100.0 },
                ViewerCommand::UpdateTouchPoint { id: 4, x: 10.0, y: 0.0 },
            ]
        );
        // Each command is followed by its own redraw request.
        assert_eq!(sink.events.borrow().len(), 4);
    }

    #[test]
    fn test_cancel_never_selects() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Down, 1, 10.0, 10.0);
        router.on_touch(&sink, TouchAction::Cancel, 1, 10.0, 10.0);

        assert_eq!(sink.selects(), 0);
        assert_eq!(
            sink.commands().last(),
            Some(&ViewerCommand::RemoveTouchPoint { id: 1 })
        );
    }

    #[test]
    fn test_unknown_pointer_is_ignored() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.on_touch(&sink, TouchAction::Up, 9, 0.0, 0.0);
        router.on_touch(&sink, TouchAction::Move, 9, 0.0, 0.0);

        assert!(sink.events.borrow().is_empty());
    }

    #[test]
    fn test_cancel_all_releases_pointers() {
        let sink = RecordingSink::default();
        let mut router = GestureRouter::new(5.0);

        router.pointer_down(&sink, 1, 0.0, 0.0);
        router.pointer_down(&sink, 2, 0.0, 0.0);
        router.cancel_all(&sink);

        assert_eq!(router.active_count(), 0);
        assert!(router.candidate().is_none());
        assert_eq!(
            sink.commands()[2..].to_vec(),
            vec![
                ViewerCommand::RemoveTouchPoint { id: 1 },
                ViewerCommand::RemoveTouchPoint { id: 2 },
            ]
        );
    }
}
