use serde::Serialize;
use tsgen_codegen::{TypeScript, typescript};

/// Anything with an area.
#[typescript(namespace = "Geometry", derived_union)]
pub trait Shape {
    fn area(&self) -> f64;

    /// Display label.
    fn label(&self) -> String {
        String::from("shape")
    }
}

/// A 2D point.
#[derive(TypeScript, Serialize, Debug, Clone, Copy, PartialEq)]
#[ts(namespace = "Geometry")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(TypeScript, Serialize, Debug, Clone, PartialEq)]
#[ts(namespace = "Geometry", type_member)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub const SIDES: u32 = 0;
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }
}

#[derive(TypeScript, Serialize, Debug, Clone, PartialEq)]
#[ts(namespace = "Geometry", type_member)]
pub struct Rect {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    pub cached_area: Option<f64>,
}

impl Rect {
    pub const SIDES: u32 = 4;
}

impl Shape for Rect {
    fn area(&self) -> f64 {
        self.cached_area.unwrap_or(self.width * self.height)
    }

    fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}
