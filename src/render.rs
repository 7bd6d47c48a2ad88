use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const DARK_GRAY: Color = Color::rgb(80, 80, 80);
    pub const DARK_GREEN: Color = Color::rgb(0, 117, 44);
    pub const BROWN: Color = Color::rgb(127, 106, 79);
    pub const RED: Color = Color::rgb(230, 41, 55);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// Drawing surface handed to scenes during the draw and overlay passes.
///
/// Coordinates are canvas pixels. The core never rasterizes anything itself;
/// a platform layer (or [`RecordingCanvas`] in headless runs) implements this.
pub trait Canvas {
    /// Drawable area in pixels.
    fn size(&self) -> Vec2;
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, min: Vec2, size: Vec2, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn fill_polygon(&mut self, points: &[Vec2], color: Color);
    fn text(&mut self, line: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Rect { min: Vec2, size: Vec2, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
    Polygon { points: Vec<Vec2>, color: Color },
    Text(String),
}

pub const DEFAULT_CANVAS_SIZE: Vec2 = Vec2::new(800.0, 800.0);

#[derive(Debug)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
    size: Vec2,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::with_size(DEFAULT_CANVAS_SIZE.x as u32, DEFAULT_CANVAS_SIZE.y as u32)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self { commands: Vec::new(), size: Vec2::new(width as f32, height as f32) }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(line) => Some(line.as_str()),
            _ => None,
        })
    }

    pub fn shape_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Circle { .. } | DrawCommand::Polygon { .. }))
            .count()
    }
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, min: Vec2, size: Vec2, color: Color) {
        self.commands.push(DrawCommand::Rect { min, size, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle { center, radius, color });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon { points: points.to_vec(), color });
    }

    fn text(&mut self, line: &str) {
        self.commands.push(DrawCommand::Text(line.to_string()));
    }
}
