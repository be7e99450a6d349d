//! Draw requests handed to the rendering collaborator.
//!
//! Components and scripts never draw directly. They push fully resolved
//! [`DrawRequest`]s during the frame; at the end of the frame the runtime
//! drains the queue and passes it to the backend together with the
//! [`Camera`].
//!
//! Requests are layered the way the renderer composes a frame: world images
//! first, then UI images, text and finally pixels. World and UI images are
//! ordered by `sorting_order` inside their layer; text and pixels keep
//! submission order.

use crate::components::vector2::Vector2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Colour from script-side channel values, clamped to `0..=255`.
    pub fn from_channels(r: f32, g: f32, b: f32, a: f32) -> Self {
        let channel = |v: f32| v.clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b), channel(a))
    }
}

/// What a request draws and in which space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    /// Image in world units, offset by the camera and scaled by its zoom.
    Image,
    /// Image in screen pixels.
    Ui,
    /// Text in screen pixels.
    Text { text: String, font: String, size: u32 },
    /// A single screen pixel.
    Pixel,
}

impl DrawKind {
    fn layer(&self) -> u8 {
        match self {
            DrawKind::Image => 0,
            DrawKind::Ui => 1,
            DrawKind::Text { .. } => 2,
            DrawKind::Pixel => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawRequest {
    pub kind: DrawKind,
    /// Image name; empty means the renderer's default texture.
    pub image: String,
    pub position: Vector2,
    /// Degrees.
    pub rotation: f32,
    pub scale: Vector2,
    /// Fraction of the image size the image is placed and rotated around.
    pub pivot: Vector2,
    pub color: Color,
    pub sorting_order: i32,
}

impl DrawRequest {
    /// White, unrotated world image centred on `position`.
    pub fn image(image: impl Into<String>, position: Vector2) -> Self {
        Self {
            kind: DrawKind::Image,
            image: image.into(),
            position,
            rotation: 0.0,
            scale: Vector2::new(1.0, 1.0),
            pivot: Vector2::new(0.5, 0.5),
            color: Color::WHITE,
            sorting_order: 0,
        }
    }

    /// White UI image whose top-left corner sits at `position`.
    pub fn ui(image: impl Into<String>, position: Vector2) -> Self {
        Self {
            kind: DrawKind::Ui,
            pivot: Vector2::ZERO,
            ..Self::image(image, position)
        }
    }

    pub fn text(
        text: impl Into<String>,
        font: impl Into<String>,
        size: u32,
        position: Vector2,
    ) -> Self {
        Self {
            kind: DrawKind::Text {
                text: text.into(),
                font: font.into(),
                size,
            },
            pivot: Vector2::ZERO,
            ..Self::image(String::new(), position)
        }
    }

    pub fn pixel(position: Vector2, color: Color) -> Self {
        Self {
            kind: DrawKind::Pixel,
            pivot: Vector2::ZERO,
            color,
            ..Self::image(String::new(), position)
        }
    }
}

/// View onto the world used for [`DrawKind::Image`] requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World position shown at the centre of the screen.
    pub position: Vector2,
    pub zoom: f32,
    /// Render size in pixels.
    pub width: u32,
    pub height: u32,
}

impl Camera {
    pub fn new(width: u32, height: u32, zoom: f32) -> Self {
        Self {
            position: Vector2::ZERO,
            zoom,
            width,
            height,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(640, 360, 1.0)
    }
}

#[derive(Debug, Default)]
pub struct DrawQueue {
    requests: Vec<DrawRequest>,
}

impl DrawQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: DrawRequest) {
        self.requests.push(request);
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Take every queued request in composition order.
    pub fn drain_sorted(&mut self) -> Vec<DrawRequest> {
        let mut requests = std::mem::take(&mut self.requests);
        requests.sort_by_key(|r| match r.kind {
            DrawKind::Image | DrawKind::Ui => (r.kind.layer(), r.sorting_order),
            _ => (r.kind.layer(), 0),
        });
        requests
    }
}
