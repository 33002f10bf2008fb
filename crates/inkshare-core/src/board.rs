//! One client's view of the shared board.
//!
//! [`Board`] owns the camera, the stroke store and the sync client, turns
//! input events into operations on them, and raises a redraw flag whenever
//! something visible changes. The host drives it from a single event loop:
//! feed input, call [`Board::pump`] regularly, and call [`Board::render`]
//! when [`Board::take_redraw`] says so.

use kurbo::{Point, Size};

use crate::camera::{Camera, wheel_factor};
use crate::config::BoardConfig;
use crate::input::{Gesture, PointerEvent, PressAction, WheelEvent};
use crate::protocol::ConnectionState;
use crate::render::Surface;
use crate::store::StrokeStore;
use crate::stroke::Stroke;
use crate::sync::SyncClient;
use crate::transport::Connector;

pub struct Board<C: Connector> {
    config: BoardConfig,
    camera: Camera,
    store: StrokeStore,
    sync: SyncClient<C>,
    viewport: Size,
    gesture: Gesture,
    needs_redraw: bool,
}

impl<C: Connector> Board<C> {
    /// Create a board that reaches the relay through `connector`.
    ///
    /// An invalid config is accepted but logged; the camera ignores zoom
    /// factors it cannot apply.
    pub fn new(config: BoardConfig, connector: C) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("Invalid board config: {}", e);
        }
        let sync = SyncClient::new(connector, config.relay_url.clone(), config.topic.clone());
        Self {
            config,
            camera: Camera::new(),
            store: StrokeStore::new(),
            sync,
            viewport: Size::ZERO,
            gesture: Gesture::Idle,
            needs_redraw: true,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn sync(&self) -> &SyncClient<C> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncClient<C> {
        &mut self.sync
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.sync.connection_state()
    }

    /// Whether a redraw is pending.
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Consume the pending redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Mark the board as needing a redraw.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Surface size changed.
    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.request_redraw();
    }

    /// Process a pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => {
                if self.gesture != Gesture::Idle {
                    return;
                }
                match PressAction::classify(button, modifiers) {
                    PressAction::Pan => {
                        self.gesture = Gesture::Panning { last: position };
                    }
                    PressAction::Draw => {
                        let world = self.camera.screen_to_world(position);
                        if self.store.begin_stroke(world) {
                            self.gesture = Gesture::Drawing;
                            self.request_redraw();
                        }
                    }
                }
            }
            PointerEvent::Move { position } => match self.gesture {
                Gesture::Panning { .. } => {
                    if let Some(delta) = self.gesture.pan_delta(position) {
                        self.pan(delta.x, delta.y);
                    }
                }
                Gesture::Drawing => {
                    let world = self.camera.screen_to_world(position);
                    if self.store.extend_stroke(world) {
                        self.request_redraw();
                    }
                }
                Gesture::Idle => {}
            },
            PointerEvent::Up { .. } | PointerEvent::Cancel => self.end_gesture(),
        }
    }

    /// Zoom at the cursor.
    pub fn handle_wheel(&mut self, event: WheelEvent) {
        let factor = wheel_factor(event.delta_y, self.config.wheel_intensity);
        self.zoom_at(event.position, factor);
    }

    /// Zoom keeping `anchor` fixed on screen.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        self.camera.zoom_at(anchor, factor);
        self.request_redraw();
    }

    /// Pan the view by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.camera.pan((dx, dy).into());
        self.request_redraw();
    }

    /// Zoom in around the viewport center.
    pub fn zoom_in(&mut self) {
        self.camera.zoom_in(self.viewport, self.config.zoom_step);
        self.request_redraw();
    }

    /// Zoom out around the viewport center.
    pub fn zoom_out(&mut self) {
        self.camera.zoom_out(self.viewport, self.config.zoom_step);
        self.request_redraw();
    }

    /// Back to the home view.
    pub fn reset(&mut self) {
        self.camera.reset();
        self.request_redraw();
    }

    /// Apply strokes peers have drawn since the last call.
    ///
    /// Returns how many strokes were added.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        for stroke in self.sync.poll() {
            if self.apply_remote_stroke(stroke) {
                applied += 1;
            }
        }
        applied
    }

    /// Add a stroke drawn elsewhere.
    pub fn apply_remote_stroke(&mut self, stroke: Stroke) -> bool {
        let applied = self.store.apply_remote_stroke(stroke);
        if applied {
            self.request_redraw();
        }
        applied
    }

    /// Draw the board into `surface`.
    pub fn render(&self, surface: &mut dyn Surface) {
        self.store
            .render(surface, &self.camera, self.config.stroke_width);
    }

    fn end_gesture(&mut self) {
        let gesture = std::mem::take(&mut self.gesture);
        if gesture != Gesture::Drawing {
            return;
        }
        let Some(stroke) = self.store.commit_stroke() else {
            return;
        };
        self.request_redraw();
        if let Err(e) = self.sync.publish_stroke(&stroke) {
            log::debug!("Stroke not sent: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Modifiers, MouseButton};
    use crate::render::DisplayList;
    use crate::transport::MemoryHub;
    use kurbo::PathEl;

    fn board(hub: &MemoryHub) -> Board<MemoryHub> {
        let mut board = Board::new(BoardConfig::default(), hub.clone());
        board.resize(Size::new(800.0, 600.0));
        // Connected, then Subscribed
        board.pump();
        board.pump();
        board
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    fn move_to(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
        }
    }

    fn draw(board: &mut Board<MemoryHub>, points: &[(f64, f64)]) {
        let (first, rest) = points.split_first().unwrap();
        board.handle_pointer(down(first.0, first.1));
        for (x, y) in rest {
            board.handle_pointer(move_to(*x, *y));
        }
        board.handle_pointer(up(0.0, 0.0));
    }

    #[test]
    fn test_drawn_stroke_is_world_space_and_shared() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let mut b = board(&hub);

        draw(&mut a, &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);

        assert_eq!(a.store().strokes().len(), 1);
        assert_eq!(b.pump(), 1);
        assert_eq!(b.store().strokes(), a.store().strokes());
        assert_eq!(
            b.store().strokes()[0].points(),
            &[
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0)
            ]
        );
    }

    #[test]
    fn test_remote_stroke_renders_under_own_view() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let mut b = board(&hub);

        a.pan(50.0, -20.0);
        a.zoom_at(Point::new(100.0, 100.0), 1.2);

        draw(&mut b, &[(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(a.pump(), 1);

        let mut surface = DisplayList::new();
        a.render(&mut surface);
        let paths = surface.paths();
        assert_eq!(paths.len(), 1);

        let camera = *a.camera();
        let expected_start = camera.world_to_screen(Point::new(0.0, 0.0));
        let expected_end = camera.world_to_screen(Point::new(10.0, 0.0));
        let elements = paths[0].elements();
        match (elements[0], elements[1]) {
            (PathEl::MoveTo(start), PathEl::LineTo(end)) => {
                assert!((start - expected_start).hypot() < 1e-9);
                assert!((end - expected_end).hypot() < 1e-9);
            }
            other => panic!("unexpected path: {other:?}"),
        }
        // B's own view is untouched by A's pan/zoom
        assert_eq!(*b.camera(), Camera::default());
    }

    #[test]
    fn test_drawing_under_zoom_stores_world_points() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        a.pan(100.0, 100.0);
        a.camera.zoom = 2.0;

        draw(&mut a, &[(100.0, 100.0), (120.0, 140.0)]);
        assert_eq!(
            a.store().strokes()[0].points(),
            &[Point::new(0.0, 0.0), Point::new(10.0, 20.0)]
        );
    }

    #[test]
    fn test_pan_gesture_moves_view_without_drawing() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);

        a.handle_pointer(PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: MouseButton::Middle,
            modifiers: Modifiers::default(),
        });
        a.handle_pointer(move_to(40.0, 30.0));
        a.handle_pointer(move_to(50.0, 30.0));
        a.handle_pointer(up(50.0, 30.0));

        assert!((a.camera().offset.x - 40.0).abs() < f64::EPSILON);
        assert!((a.camera().offset.y - 20.0).abs() < f64::EPSILON);
        assert!(a.store().strokes().is_empty());
    }

    #[test]
    fn test_cancel_commits_partial_stroke() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let mut b = board(&hub);

        a.handle_pointer(down(1.0, 1.0));
        a.handle_pointer(move_to(2.0, 2.0));
        a.handle_pointer(PointerEvent::Cancel);

        assert_eq!(a.store().strokes().len(), 1);
        assert!(!a.store().is_drawing());
        assert_eq!(b.pump(), 1);
    }

    #[test]
    fn test_wheel_zooms_at_cursor() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let cursor = Point::new(200.0, 150.0);
        let before = a.camera().screen_to_world(cursor);

        a.handle_wheel(WheelEvent {
            position: cursor,
            delta_y: -100.0,
        });
        assert!(a.camera().zoom > 1.0);
        let after = a.camera().screen_to_world(cursor);
        assert!((after - before).hypot() < 1e-9);

        a.handle_wheel(WheelEvent {
            position: cursor,
            delta_y: 100.0,
        });
        assert!((a.camera().zoom - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_commands_and_reset() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        a.zoom_in();
        assert!((a.camera().zoom - 1.2).abs() < 1e-12);
        a.zoom_out();
        a.zoom_out();
        assert!(a.camera().zoom < 1.0);
        a.pan(5.0, 5.0);
        a.reset();
        assert_eq!(*a.camera(), Camera::default());
    }

    #[test]
    fn test_every_mutation_requests_redraw() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        a.take_redraw();

        a.pan(1.0, 0.0);
        assert!(a.take_redraw());
        assert!(!a.needs_redraw());

        a.zoom_in();
        assert!(a.take_redraw());

        a.handle_pointer(down(0.0, 0.0));
        assert!(a.take_redraw());
        a.handle_pointer(move_to(3.0, 0.0));
        assert!(a.take_redraw());
        a.handle_pointer(up(3.0, 0.0));
        assert!(a.take_redraw());

        a.reset();
        assert!(a.take_redraw());
    }

    #[test]
    fn test_nan_press_publishes_nothing() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let mut b = board(&hub);

        for _ in 0..2 {
            a.handle_pointer(down(f64::NAN, 0.0));
            a.handle_pointer(move_to(5.0, 5.0));
            a.handle_pointer(up(5.0, 5.0));
        }

        assert!(a.store().strokes().is_empty());
        assert_eq!(b.pump(), 0);
        assert!(b.store().strokes().is_empty());
    }

    #[test]
    fn test_invalid_config_keeps_zoom_in_range() {
        let config = BoardConfig {
            zoom_step: f64::NAN,
            wheel_intensity: f64::INFINITY,
            ..BoardConfig::default()
        };
        let mut a = Board::new(config, MemoryHub::new());
        a.resize(Size::new(800.0, 600.0));

        a.zoom_in();
        a.zoom_out();
        a.handle_wheel(WheelEvent {
            position: Point::new(10.0, 10.0),
            delta_y: -1.0,
        });
        assert_eq!(*a.camera(), Camera::default());
    }

    #[test]
    fn test_strokes_committed_offline_are_dropped() {
        let hub = MemoryHub::new();
        let mut a = board(&hub);
        let mut b = board(&hub);

        if let Some(relay) = a.sync_mut().relay_mut() {
            relay.close();
        }
        a.pump();
        assert_eq!(a.connection_state(), ConnectionState::Disconnected);

        draw(&mut a, &[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(a.store().strokes().len(), 1);
        assert_eq!(b.pump(), 0);
    }
}
