//! Two-component vector shared by native components and scripts.
//!
//! Scripts construct vectors with `Vector2(x, y)` or `Vector2.new(x, y)`; the
//! same type carries positions, velocities and contact data across the Lua
//! boundary.

use mlua::prelude::*;
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(self, other: Vector2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Vector2) -> f32 {
        (self - other).length()
    }

    /// Normalize in place and return the previous length.
    ///
    /// Vectors shorter than `f32::EPSILON` are left untouched and report 0.
    pub fn normalize(&mut self) -> f32 {
        let length = self.length();
        if length < f32::EPSILON {
            return 0.0;
        }
        self.x /= length;
        self.y /= length;
        length
    }

    pub fn normalized(self) -> Self {
        let mut v = self;
        v.normalize();
        v
    }

    /// Unit vector for an angle in degrees, measured clockwise from +x
    /// (screen space, y grows downwards).
    pub fn from_degrees(degrees: f32) -> Self {
        let radians = degrees.to_radians();
        Self::new(radians.cos(), radians.sin())
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f32) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl FromLua for Vector2 {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        match value {
            LuaValue::UserData(ud) => Ok(*ud.borrow::<Vector2>()?),
            other => Err(LuaError::runtime(format!(
                "expected a Vector2, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Accepts `vector * number` and `number * vector`.
fn scale_operands(lhs: LuaValue, rhs: LuaValue) -> LuaResult<Vector2> {
    match (lhs, rhs) {
        (LuaValue::UserData(ud), LuaValue::Number(n)) => Ok(*ud.borrow::<Vector2>()? * n as f32),
        (LuaValue::UserData(ud), LuaValue::Integer(n)) => Ok(*ud.borrow::<Vector2>()? * n as f32),
        (LuaValue::Number(n), LuaValue::UserData(ud)) => Ok(*ud.borrow::<Vector2>()? * n as f32),
        (LuaValue::Integer(n), LuaValue::UserData(ud)) => Ok(*ud.borrow::<Vector2>()? * n as f32),
        _ => Err(LuaError::runtime("Vector2 can only be multiplied by a number")),
    }
}

impl LuaUserData for Vector2 {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("x", |_, this| Ok(this.x));
        fields.add_field_method_set("x", |_, this, x: f32| {
            this.x = x;
            Ok(())
        });
        fields.add_field_method_get("y", |_, this| Ok(this.y));
        fields.add_field_method_set("y", |_, this, y: f32| {
            this.y = y;
            Ok(())
        });
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method_mut("Normalize", |_, this, ()| Ok(this.normalize()));
        methods.add_method("Length", |_, this, ()| Ok(this.length()));

        methods.add_meta_method(LuaMetaMethod::Add, |_, this, other: Vector2| {
            Ok(*this + other)
        });
        methods.add_meta_method(LuaMetaMethod::Sub, |_, this, other: Vector2| {
            Ok(*this - other)
        });
        methods.add_meta_function(LuaMetaMethod::Mul, |_, (lhs, rhs): (LuaValue, LuaValue)| {
            scale_operands(lhs, rhs)
        });
        methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: Vector2| {
            Ok(*this == other)
        });
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| {
            Ok(format!("({}, {})", this.x, this.y))
        });
    }
}

/// Register the global `Vector2` table.
pub fn register_vector2_api(lua: &Lua) -> LuaResult<()> {
    let vector2 = lua.create_table()?;
    vector2.set(
        "new",
        lua.create_function(|_, (x, y): (Option<f32>, Option<f32>)| {
            Ok(Vector2::new(x.unwrap_or(0.0), y.unwrap_or(0.0)))
        })?,
    )?;
    vector2.set(
        "Distance",
        lua.create_function(|_, (a, b): (Vector2, Vector2)| Ok(a.distance(b)))?,
    )?;
    vector2.set(
        "Dot",
        lua.create_function(|_, (a, b): (Vector2, Vector2)| Ok(a.dot(b)))?,
    )?;
    lua.globals().set("Vector2", vector2)?;

    // Vector2(x, y) is sugar for Vector2.new(x, y)
    lua.load("setmetatable(Vector2, { __call = function(_, x, y) return Vector2.new(x, y) end })")
        .set_name("=Vector2")
        .exec()
}
