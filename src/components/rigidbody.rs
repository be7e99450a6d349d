//! Native `Rigidbody` component.
//!
//! Before the component starts, every field is a plain definition value that
//! scene files and scripts may override. `OnStart` turns the definition into a
//! body in the [`PhysicsWorld`](crate::resources::physics::PhysicsWorld);
//! from then on the getters and setters talk to that body, and `OnDestroy`
//! removes it again.
//!
//! ```lua
//! local rb = self.actor:GetComponent("Rigidbody")
//! rb:SetVelocity(Vector2(0, -5))
//! rb:AddForce(Vector2(10, 0))
//! local up = rb:GetUpDirection()
//! ```

use mlua::prelude::*;

use crate::components::vector2::Vector2;
use crate::resources::actor::ActorId;
use crate::resources::context::{RuntimeContext, context};
use crate::resources::lua_runtime::ActorRef;
use crate::resources::physics::{Body, BodyDesc, BodyHandle, BodyKind, Collider, Shape};

#[derive(Debug, Clone, PartialEq)]
pub struct Rigidbody {
    pub key: String,
    pub actor: Option<ActorId>,
    pub enabled: bool,

    pub x: f32,
    pub y: f32,
    /// Degrees, clockwise.
    pub rotation: f32,
    pub body_type: String,
    pub precise: bool,
    pub gravity_scale: f32,
    pub density: f32,
    pub angular_friction: f32,

    pub has_collider: bool,
    pub collider_type: String,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
    pub friction: f32,
    pub bounciness: f32,
    pub mask_layer: i32,

    pub has_trigger: bool,
    pub trigger_type: String,
    pub trigger_width: f32,
    pub trigger_height: f32,
    pub trigger_radius: f32,

    initial_velocity: Vector2,
    initial_angular_velocity: f32,
    body: Option<BodyHandle>,
}

impl Default for Rigidbody {
    fn default() -> Self {
        Self {
            key: String::new(),
            actor: None,
            enabled: true,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            body_type: "dynamic".to_string(),
            precise: true,
            gravity_scale: 1.0,
            density: 1.0,
            angular_friction: 0.3,
            has_collider: true,
            collider_type: "box".to_string(),
            width: 1.0,
            height: 1.0,
            radius: 0.5,
            friction: 0.3,
            bounciness: 0.3,
            mask_layer: -1,
            has_trigger: true,
            trigger_type: "box".to_string(),
            trigger_width: 1.0,
            trigger_height: 1.0,
            trigger_radius: 0.5,
            initial_velocity: Vector2::ZERO,
            initial_angular_velocity: 0.0,
            body: None,
        }
    }
}

impl Rigidbody {
    /// Copy of the definition fields, detached from any actor or body.
    pub fn copy_definition(&self) -> Self {
        Self {
            key: String::new(),
            actor: None,
            body: None,
            ..self.clone()
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn body_desc(&self, actor: ActorId) -> BodyDesc {
        let collider = self.has_collider.then(|| {
            Collider::with_layer(
                Shape::parse(&self.collider_type, self.width, self.height, self.radius),
                self.friction,
                self.bounciness,
                self.mask_layer,
            )
        });
        let trigger = self.has_trigger.then(|| {
            Shape::parse(
                &self.trigger_type,
                self.trigger_width,
                self.trigger_height,
                self.trigger_radius,
            )
        });
        BodyDesc {
            actor,
            kind: BodyKind::parse(&self.body_type),
            position: Vector2::new(self.x, self.y),
            rotation: self.rotation,
            velocity: self.initial_velocity,
            angular_velocity: self.initial_angular_velocity,
            gravity_scale: self.gravity_scale,
            density: self.density,
            angular_damping: self.angular_friction,
            bullet: self.precise,
            collider,
            trigger,
        }
    }

    pub fn get_field(&self, lua: &Lua, name: &str) -> LuaResult<LuaValue> {
        Ok(match name {
            "enabled" => LuaValue::Boolean(self.enabled),
            "key" => LuaValue::String(lua.create_string(&self.key)?),
            "type" => LuaValue::String(lua.create_string("Rigidbody")?),
            "actor" => match self.actor {
                Some(id) => LuaValue::UserData(lua.create_userdata(ActorRef(id))?),
                None => LuaValue::Nil,
            },
            "x" => LuaValue::Number(self.x as f64),
            "y" => LuaValue::Number(self.y as f64),
            "rotation" => LuaValue::Number(self.rotation as f64),
            "body_type" => LuaValue::String(lua.create_string(&self.body_type)?),
            "precise" => LuaValue::Boolean(self.precise),
            "gravity_scale" => LuaValue::Number(self.gravity_scale as f64),
            "density" => LuaValue::Number(self.density as f64),
            "angular_friction" => LuaValue::Number(self.angular_friction as f64),
            "has_collider" => LuaValue::Boolean(self.has_collider),
            "collider_type" => LuaValue::String(lua.create_string(&self.collider_type)?),
            "width" => LuaValue::Number(self.width as f64),
            "height" => LuaValue::Number(self.height as f64),
            "radius" => LuaValue::Number(self.radius as f64),
            "friction" => LuaValue::Number(self.friction as f64),
            "bounciness" => LuaValue::Number(self.bounciness as f64),
            "mask_layer" => LuaValue::Integer(self.mask_layer as _),
            "has_trigger" => LuaValue::Boolean(self.has_trigger),
            "trigger_type" => LuaValue::String(lua.create_string(&self.trigger_type)?),
            "trigger_width" => LuaValue::Number(self.trigger_width as f64),
            "trigger_height" => LuaValue::Number(self.trigger_height as f64),
            "trigger_radius" => LuaValue::Number(self.trigger_radius as f64),
            _ => LuaValue::Nil,
        })
    }

    /// Returns `false` for names the component does not define.
    pub fn set_field(&mut self, lua: &Lua, name: &str, value: LuaValue) -> LuaResult<bool> {
        match name {
            "enabled" => self.enabled = lua.unpack(value)?,
            "x" => self.x = lua.unpack(value)?,
            "y" => self.y = lua.unpack(value)?,
            "rotation" => self.rotation = lua.unpack(value)?,
            "body_type" => self.body_type = lua.unpack(value)?,
            "precise" => self.precise = lua.unpack(value)?,
            "gravity_scale" => self.gravity_scale = lua.unpack(value)?,
            "density" => self.density = lua.unpack(value)?,
            "angular_friction" => self.angular_friction = lua.unpack(value)?,
            "has_collider" => self.has_collider = lua.unpack(value)?,
            "collider_type" => self.collider_type = lua.unpack(value)?,
            "width" => self.width = lua.unpack(value)?,
            "height" => self.height = lua.unpack(value)?,
            "radius" => self.radius = lua.unpack(value)?,
            "friction" => self.friction = lua.unpack(value)?,
            "bounciness" => self.bounciness = lua.unpack(value)?,
            "mask_layer" => self.mask_layer = lua.unpack(value)?,
            "has_trigger" => self.has_trigger = lua.unpack(value)?,
            "trigger_type" => self.trigger_type = lua.unpack(value)?,
            "trigger_width" => self.trigger_width = lua.unpack(value)?,
            "trigger_height" => self.trigger_height = lua.unpack(value)?,
            "trigger_radius" => self.trigger_radius = lua.unpack(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Create the physics body.
pub fn on_start(ctx: &RuntimeContext, userdata: &LuaAnyUserData) -> LuaResult<()> {
    let mut rb = userdata.borrow_mut::<Rigidbody>()?;
    let Some(actor) = rb.actor else {
        return Ok(());
    };
    if rb.body.is_none() {
        let handle = ctx.physics.borrow_mut().create_body(rb.body_desc(actor));
        rb.body = Some(handle);
    }
    Ok(())
}

/// Remove the physics body.
pub fn on_destroy(ctx: &RuntimeContext, userdata: &LuaAnyUserData) -> LuaResult<()> {
    let mut rb = userdata.borrow_mut::<Rigidbody>()?;
    if let Some(handle) = rb.body.take() {
        ctx.physics.borrow_mut().remove_body(handle);
    }
    Ok(())
}

fn read_body<R>(
    lua: &Lua,
    handle: Option<BodyHandle>,
    read: impl FnOnce(&Body) -> R,
) -> LuaResult<Option<R>> {
    let Some(handle) = handle else {
        return Ok(None);
    };
    let ctx = context(lua)?;
    let physics = ctx.physics.borrow();
    Ok(physics.body(handle).map(read))
}

fn write_body(
    lua: &Lua,
    handle: Option<BodyHandle>,
    write: impl FnOnce(&mut Body),
) -> LuaResult<bool> {
    let Some(handle) = handle else {
        return Ok(false);
    };
    let ctx = context(lua)?;
    let mut physics = ctx.physics.borrow_mut();
    match physics.body_mut(handle) {
        Some(body) => {
            write(body);
            Ok(true)
        }
        None => Ok(false),
    }
}

fn up_from_degrees(degrees: f32) -> Vector2 {
    let radians = degrees.to_radians();
    Vector2::new(radians.sin(), -radians.cos())
}

fn degrees_from_up(up: Vector2) -> f32 {
    let up = up.normalized();
    up.x.atan2(-up.y).to_degrees()
}

fn degrees_from_right(right: Vector2) -> f32 {
    let right = right.normalized();
    right.y.atan2(right.x).to_degrees()
}

impl LuaUserData for Rigidbody {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Index, |lua, this, name: String| {
            this.get_field(lua, &name)
        });
        methods.add_meta_method_mut(
            LuaMetaMethod::NewIndex,
            |lua, this, (name, value): (String, LuaValue)| {
                if this.set_field(lua, &name, value)? {
                    Ok(())
                } else {
                    Err(LuaError::runtime(format!("Rigidbody has no field '{}'", name)))
                }
            },
        );

        methods.add_method("GetPosition", |lua, this, ()| {
            Ok(read_body(lua, this.body, |b| b.position)?.unwrap_or(Vector2::new(this.x, this.y)))
        });
        methods.add_method_mut("SetPosition", |lua, this, position: Vector2| {
            if !write_body(lua, this.body, |b| b.position = position)? {
                this.x = position.x;
                this.y = position.y;
            }
            Ok(())
        });

        methods.add_method("GetRotation", |lua, this, ()| {
            Ok(read_body(lua, this.body, |b| b.rotation)?.unwrap_or(this.rotation))
        });
        methods.add_method_mut("SetRotation", |lua, this, degrees: f32| {
            if !write_body(lua, this.body, |b| b.rotation = degrees)? {
                this.rotation = degrees;
            }
            Ok(())
        });

        methods.add_method("GetVelocity", |lua, this, ()| {
            Ok(read_body(lua, this.body, |b| b.velocity)?.unwrap_or(this.initial_velocity))
        });
        methods.add_method_mut("SetVelocity", |lua, this, velocity: Vector2| {
            if !write_body(lua, this.body, |b| b.velocity = velocity)? {
                this.initial_velocity = velocity;
            }
            Ok(())
        });

        methods.add_method("AddForce", |lua, this, force: Vector2| {
            if let Some(handle) = this.body {
                context(lua)?.physics.borrow_mut().apply_force(handle, force);
            }
            Ok(())
        });

        methods.add_method("GetAngularVelocity", |lua, this, ()| {
            Ok(read_body(lua, this.body, |b| b.angular_velocity)?
                .unwrap_or(this.initial_angular_velocity))
        });
        methods.add_method_mut("SetAngularVelocity", |lua, this, degrees: f32| {
            if !write_body(lua, this.body, |b| b.angular_velocity = degrees)? {
                this.initial_angular_velocity = degrees;
            }
            Ok(())
        });

        methods.add_method("GetGravityScale", |lua, this, ()| {
            Ok(read_body(lua, this.body, |b| b.gravity_scale)?.unwrap_or(this.gravity_scale))
        });
        methods.add_method_mut("SetGravityScale", |lua, this, scale: f32| {
            if !write_body(lua, this.body, |b| b.gravity_scale = scale)? {
                this.gravity_scale = scale;
            }
            Ok(())
        });

        methods.add_method("GetUpDirection", |lua, this, ()| {
            let degrees = read_body(lua, this.body, |b| b.rotation)?.unwrap_or(this.rotation);
            Ok(up_from_degrees(degrees))
        });
        methods.add_method_mut("SetUpDirection", |lua, this, up: Vector2| {
            let degrees = degrees_from_up(up);
            if !write_body(lua, this.body, |b| b.rotation = degrees)? {
                this.rotation = degrees;
            }
            Ok(())
        });

        methods.add_method("GetRightDirection", |lua, this, ()| {
            let degrees = read_body(lua, this.body, |b| b.rotation)?.unwrap_or(this.rotation);
            Ok(Vector2::from_degrees(degrees))
        });
        methods.add_method_mut("SetRightDirection", |lua, this, right: Vector2| {
            let degrees = degrees_from_right(right);
            if !write_body(lua, this.body, |b| b.rotation = degrees)? {
                this.rotation = degrees;
            }
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn defaults_describe_a_dynamic_box() {
        let rb = Rigidbody::default();
        assert_eq!(rb.body_type, "dynamic");
        assert!(rb.has_collider && rb.has_trigger);
        assert_eq!(rb.mask_layer, -1);
        assert!(approx_eq(rb.radius, 0.5));
    }

    #[test]
    fn set_field_converts_lua_values() {
        let lua = Lua::new();
        let mut rb = Rigidbody::default();
        assert!(rb.set_field(&lua, "x", LuaValue::Integer(4)).unwrap());
        assert!(rb.set_field(&lua, "body_type", lua.pack("static").unwrap()).unwrap());
        assert!(rb.set_field(&lua, "has_trigger", LuaValue::Boolean(false)).unwrap());
        assert!(!rb.set_field(&lua, "colour", LuaValue::Nil).unwrap());
        assert!(approx_eq(rb.x, 4.0));
        assert_eq!(rb.body_type, "static");
        assert!(!rb.has_trigger);
    }

    #[test]
    fn body_desc_reflects_fields() {
        let mut slots: slotmap::SlotMap<ActorId, ()> = slotmap::SlotMap::with_key();
        let actor = slots.insert(());
        let rb = Rigidbody {
            collider_type: "circle".to_string(),
            radius: 2.0,
            has_trigger: false,
            body_type: "kinematic".to_string(),
            mask_layer: 3,
            ..Rigidbody::default()
        };
        let desc = rb.body_desc(actor);
        assert_eq!(desc.kind, BodyKind::Kinematic);
        assert!(desc.trigger.is_none());
        let collider = desc.collider.unwrap();
        assert_eq!(collider.shape, Shape::Circle { radius: 2.0 });
        assert_eq!(collider.category, 1 << 3);
    }

    #[test]
    fn copy_definition_detaches() {
        let mut slots: slotmap::SlotMap<ActorId, ()> = slotmap::SlotMap::with_key();
        let rb = Rigidbody {
            key: "body".to_string(),
            actor: Some(slots.insert(())),
            x: 3.0,
            ..Rigidbody::default()
        };
        let copy = rb.copy_definition();
        assert!(copy.key.is_empty());
        assert!(copy.actor.is_none());
        assert!(approx_eq(copy.x, 3.0));
    }

    #[test]
    fn direction_helpers_are_inverse() {
        for degrees in [0.0_f32, 45.0, 90.0, -135.0] {
            assert!(approx_eq(degrees_from_up(up_from_degrees(degrees)), degrees));
            assert!(approx_eq(
                degrees_from_right(Vector2::from_degrees(degrees)),
                degrees
            ));
        }
        let up = up_from_degrees(0.0);
        assert!(approx_eq(up.x, 0.0) && approx_eq(up.y, -1.0));
    }

    #[test]
    fn script_access_before_start_uses_definition() {
        let lua = Lua::new();
        crate::components::vector2::register_vector2_api(&lua).unwrap();
        lua.globals()
            .set("rb", Rigidbody::default())
            .unwrap();
        let (x, kind, vx): (f32, String, f32) = lua
            .load(
                r#"
            rb.x = 7
            rb.body_type = "static"
            rb:SetVelocity(Vector2(2, 0))
            return rb:GetPosition().x, rb.body_type, rb:GetVelocity().x
        "#,
            )
            .eval()
            .unwrap();
        assert!(approx_eq(x, 7.0));
        assert_eq!(kind, "static");
        assert!(approx_eq(vx, 2.0));
    }

    #[test]
    fn unknown_field_assignment_is_a_script_error() {
        let lua = Lua::new();
        lua.globals().set("rb", Rigidbody::default()).unwrap();
        assert!(lua.load("rb.colour = 3").exec().is_err());
    }
}
