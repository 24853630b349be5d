//! Gesture-driven image viewer state
//!
//! A song's files are shown as horizontally paged, full-width pages. Zoom and
//! pan are handled by exactly one strategy per viewer:
//!
//! - `PinchPan`: a bounded pinch plus a pan that only unlocks once a pinch
//!   has begun. Releasing below 1.0 animates back to the rest transform and
//!   locks pan again.
//! - `Zoomable`: a container with min/max zoom and panning clamped so the
//!   content never leaves its borders.
//!
//! Paging does not depend on zoom. The current page comes either from the
//! scroll offset or from visibility callbacks.

use std::time::{Duration, Instant};

use crate::config::{
    MAX_ZOOM, MIN_ZOOM, PINCH_MAX_SCALE, PINCH_MIN_SCALE, REST_ANIMATION, VISIBILITY_THRESHOLD,
    ZOOM_CONTENT_SIZE,
};

use super::selection::Pager;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ZoomStrategy {
    #[default]
    PinchPan,
    Zoomable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PagingStrategy {
    /// `floor(content_offset / page_width)`
    #[default]
    Offset,
    /// First page reported at least half visible
    Visibility,
}

/// Scale and translation applied to the focal image
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Transform {
    pub const REST: Transform = Transform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    fn lerp(self, to: Transform, t: f32) -> Transform {
        let t = t.clamp(0.0, 1.0);
        Transform {
            scale: self.scale + (to.scale - self.scale) * t,
            translate_x: self.translate_x + (to.translate_x - self.translate_x) * t,
            translate_y: self.translate_y + (to.translate_y - self.translate_y) * t,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::REST
    }
}

#[derive(Clone, Copy, Debug)]
struct RestAnimation {
    from: Transform,
    started: Instant,
    duration: Duration,
}

impl RestAnimation {
    fn sample(&self, now: Instant) -> Option<Transform> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.duration {
            return None;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        Some(self.from.lerp(Transform::REST, t))
    }
}

/// Pinch-to-zoom paired with a pan that needs an active pinch first
#[derive(Clone, Debug, Default)]
pub struct PinchPan {
    transform: Transform,
    pinch_active: bool,
    pinch_base: f32,
    pan_enabled: bool,
    pan_base: (f32, f32),
    animation: Option<RestAnimation>,
}

impl PinchPan {
    pub fn pinch_began(&mut self) {
        self.animation = None;
        self.pinch_active = true;
        self.pinch_base = self.transform.scale;
        self.pan_enabled = true;
    }

    /// `gesture_scale` is relative to the scale at the start of the pinch.
    pub fn pinch_changed(&mut self, gesture_scale: f32) {
        if !self.pinch_active {
            return;
        }
        self.transform.scale = (self.pinch_base * gesture_scale).clamp(PINCH_MIN_SCALE, PINCH_MAX_SCALE);
    }

    pub fn pinch_ended(&mut self, now: Instant) {
        if !self.pinch_active {
            return;
        }
        self.pinch_active = false;
        if self.transform.scale < 1.0 {
            self.animation = Some(RestAnimation {
                from: self.transform,
                started: now,
                duration: REST_ANIMATION,
            });
            self.transform = Transform::REST;
            self.pan_base = (0.0, 0.0);
            self.pan_enabled = false;
        }
    }

    /// `(dx, dy)` is the translation since the pan began.
    pub fn pan_changed(&mut self, dx: f32, dy: f32) {
        if !self.pan_enabled {
            return;
        }
        self.transform.translate_x = self.pan_base.0 + dx;
        self.transform.translate_y = self.pan_base.1 + dy;
    }

    pub fn pan_ended(&mut self) {
        self.pan_base = (self.transform.translate_x, self.transform.translate_y);
    }

    pub fn is_pan_enabled(&self) -> bool {
        self.pan_enabled
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.animation.is_some_and(|a| a.sample(now).is_some())
    }

    /// Transform to draw at `now`, including any running rest animation.
    pub fn transform_at(&self, now: Instant) -> Transform {
        self.animation
            .and_then(|a| a.sample(now))
            .unwrap_or(self.transform)
    }
}

/// Zoom container with declared bounds and border-clamped panning
#[derive(Clone, Debug)]
pub struct Zoomable {
    zoom: f32,
    offset: (f32, f32),
    content: (f32, f32),
    viewport: (f32, f32),
}

impl Zoomable {
    pub fn new(content: (f32, f32), viewport: (f32, f32)) -> Self {
        Self {
            zoom: MIN_ZOOM,
            offset: (0.0, 0.0),
            content,
            viewport,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.offset = self.clamp_offset(self.offset);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset = self.clamp_offset((self.offset.0 + dx, self.offset.1 + dy));
    }

    pub fn transform(&self) -> Transform {
        Transform {
            scale: self.zoom,
            translate_x: self.offset.0,
            translate_y: self.offset.1,
        }
    }

    fn clamp_offset(&self, (x, y): (f32, f32)) -> (f32, f32) {
        let max_x = ((self.content.0 * self.zoom - self.viewport.0) / 2.0).max(0.0);
        let max_y = ((self.content.1 * self.zoom - self.viewport.1) / 2.0).max(0.0);
        (x.clamp(-max_x, max_x), y.clamp(-max_y, max_y))
    }
}

#[derive(Clone, Debug)]
pub enum ZoomState {
    PinchPan(PinchPan),
    Zoomable(Zoomable),
}

/// Visibility report for one page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewableItem {
    pub index: usize,
    pub visible_fraction: f32,
}

/// Page index for a horizontal scroll offset, clamped to the page count.
pub fn page_from_offset(content_offset: f32, page_width: f32, count: usize) -> usize {
    if count == 0 || page_width <= 0.0 || !content_offset.is_finite() {
        return 0;
    }
    let page = (content_offset / page_width).floor().max(0.0) as usize;
    page.min(count - 1)
}

/// Most visible page at or above the threshold. Ties go to the lower index.
pub fn page_from_visibility(items: &[ViewableItem], count: usize) -> Option<usize> {
    items
        .iter()
        .filter(|item| item.index < count && item.visible_fraction >= VISIBILITY_THRESHOLD)
        .fold(None::<ViewableItem>, |best, item| match best {
            Some(b) if b.visible_fraction > item.visible_fraction => Some(b),
            Some(b) if b.visible_fraction == item.visible_fraction && b.index < item.index => Some(b),
            _ => Some(*item),
        })
        .map(|item| item.index)
}

#[derive(Clone, Debug)]
pub struct ImageViewer {
    strategy: ZoomStrategy,
    paging: PagingStrategy,
    page_width: f32,
    zoom: ZoomState,
}

impl ImageViewer {
    pub fn new(strategy: ZoomStrategy, paging: PagingStrategy, page_width: f32) -> Self {
        Self {
            strategy,
            paging,
            page_width,
            zoom: Self::fresh_zoom(strategy, page_width),
        }
    }

    fn fresh_zoom(strategy: ZoomStrategy, page_width: f32) -> ZoomState {
        match strategy {
            ZoomStrategy::PinchPan => ZoomState::PinchPan(PinchPan::default()),
            ZoomStrategy::Zoomable => {
                ZoomState::Zoomable(Zoomable::new(ZOOM_CONTENT_SIZE, (page_width, page_width)))
            }
        }
    }

    pub fn strategy(&self) -> ZoomStrategy {
        self.strategy
    }

    pub fn paging(&self) -> PagingStrategy {
        self.paging
    }

    pub fn page_width(&self) -> f32 {
        self.page_width
    }

    pub fn zoom_state_mut(&mut self) -> &mut ZoomState {
        &mut self.zoom
    }

    /// Back to the rest transform, e.g. when a song is opened or closed.
    pub fn reset(&mut self) {
        self.zoom = Self::fresh_zoom(self.strategy, self.page_width);
    }

    /// Offset the pager snaps to for a page.
    pub fn snap_offset(&self, index: usize) -> f32 {
        index as f32 * self.page_width
    }

    /// Scroll callback. Ignored unless paging by offset.
    pub fn on_scroll(&self, pager: &mut Pager, content_offset: f32) -> bool {
        if self.paging != PagingStrategy::Offset {
            return false;
        }
        pager.go_to(page_from_offset(content_offset, self.page_width, pager.count()));
        true
    }

    /// Viewability callback. Ignored unless paging by visibility.
    pub fn on_viewable_items(&self, pager: &mut Pager, items: &[ViewableItem]) -> bool {
        if self.paging != PagingStrategy::Visibility {
            return false;
        }
        match page_from_visibility(items, pager.count()) {
            Some(index) => {
                pager.go_to(index);
                true
            }
            None => false,
        }
    }

    /// Moves the pager to `target` the way a finished swipe would: a snapped
    /// scroll offset under offset paging, a fully visible page under
    /// visibility paging. Out-of-range targets clamp or are ignored.
    pub fn settle_on(&self, pager: &mut Pager, target: usize) -> bool {
        match self.paging {
            PagingStrategy::Offset => self.on_scroll(pager, self.snap_offset(target)),
            PagingStrategy::Visibility => self.on_viewable_items(
                pager,
                &[ViewableItem {
                    index: target,
                    visible_fraction: 1.0,
                }],
            ),
        }
    }

    pub fn transform_at(&self, now: Instant) -> Transform {
        match &self.zoom {
            ZoomState::PinchPan(p) => p.transform_at(now),
            ZoomState::Zoomable(z) => z.transform(),
        }
    }
}
