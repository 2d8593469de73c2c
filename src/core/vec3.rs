//! Purpose: Carry 3-component world positions across the channel boundary.
//! Exports: `Vec3`.
//! Invariants: Wire form is always a 3-element numeric array in (x, y, z) order.

use serde_json::{Value, json};

use super::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_json(self) -> Value {
        json!([self.x as f64, self.y as f64, self.z as f64])
    }

    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let items = value.as_array().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument).with_message("vector must be an array")
        })?;
        if items.len() != 3 {
            return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                "vector must have exactly 3 components, got {}",
                items.len()
            )));
        }
        let mut coords = [0.0f32; 3];
        for (slot, item) in coords.iter_mut().zip(items) {
            *slot = item.as_f64().ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message("vector components must be numbers")
            })? as f32;
        }
        Self::finite(coords[0], coords[1], coords[2])
    }

    /// Components past the `f32` range would reach the engine as infinities.
    fn finite(x: f32, y: f32, z: f32) -> Result<Self, Error> {
        if [x, y, z].iter().all(|coord| coord.is_finite()) {
            Ok(Self::new(x, y, z))
        } else {
            Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("vector components must be finite 32-bit floats"))
        }
    }

    /// Parses the `x,y,z` form used on the command line.
    pub fn parse_csv(text: &str) -> Result<Self, Error> {
        let parts = text
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("invalid vector `{text}`"))
                    .with_source(err)
            })?;
        match parts.as_slice() {
            [x, y, z] => Self::finite(*x, *y, *z),
            _ => Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("vector `{text}` must have 3 components"))),
        }
    }
}
