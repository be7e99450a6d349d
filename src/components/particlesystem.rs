//! Native `ParticleSystem` component.
//!
//! Emits bursts of particles around `(x, y)` and simulates them once per
//! frame: gravity is added to the velocity, the velocity is scaled by the drag
//! factor and then added to the position. Every live particle produces one
//! [`DrawRequest`] per frame.
//!
//! Each sampled quantity (emit angle, emit radius, rotation, scale, speed,
//! rotation speed) draws from its own fixed-seed generator so a given
//! configuration always produces the same particles.

use fastrand::Rng;
use mlua::prelude::*;

use crate::components::vector2::Vector2;
use crate::resources::actor::ActorId;
use crate::resources::context::RuntimeContext;
use crate::resources::drawqueue::{Color, DrawRequest};
use crate::resources::lua_runtime::ActorRef;

const SEED_EMIT_ANGLE: u64 = 298;
const SEED_EMIT_RADIUS: u64 = 404;
const SEED_ROTATION: u64 = 440;
const SEED_SCALE: u64 = 494;
const SEED_SPEED: u64 = 498;
const SEED_ROTATION_SPEED: u64 = 305;

/// Sentinel for "same as start" colour channels and "no end scale".
const UNSET: i32 = -1;

#[derive(Debug, Clone)]
struct Sampler {
    rng: Rng,
    min: f32,
    max: f32,
}

impl Sampler {
    fn new(min: f32, max: f32, seed: u64) -> Self {
        Self {
            rng: Rng::with_seed(seed),
            min,
            max,
        }
    }

    fn sample(&mut self) -> f32 {
        random_f32_range(&mut self.rng, self.min, self.max)
    }
}

fn random_f32_range(rng: &mut Rng, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range < f32::EPSILON {
        return min;
    }
    min + rng.f32() * range
}

#[derive(Debug, Clone)]
struct Samplers {
    emit_angle: Sampler,
    emit_radius: Sampler,
    rotation: Sampler,
    scale: Sampler,
    speed: Sampler,
    rotation_speed: Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Particle {
    start_frame: u64,
    position: Vector2,
    velocity: Vector2,
    rotation: f32,
    rotation_speed: f32,
    initial_scale: f32,
    scale: f32,
}

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub key: String,
    pub actor: Option<ActorId>,
    pub enabled: bool,

    pub emit_angle_min: f32,
    pub emit_angle_max: f32,
    pub emit_radius_min: f32,
    pub emit_radius_max: f32,
    pub rotation_min: f32,
    pub rotation_max: f32,
    pub start_scale_min: f32,
    pub start_scale_max: f32,
    pub start_speed_min: f32,
    pub start_speed_max: f32,
    pub rotation_speed_min: f32,
    pub rotation_speed_max: f32,
    pub x: f32,
    pub y: f32,
    pub frames_between_bursts: i32,
    pub burst_quantity: i32,
    pub start_color_r: i32,
    pub start_color_g: i32,
    pub start_color_b: i32,
    pub start_color_a: i32,
    pub end_color_r: i32,
    pub end_color_g: i32,
    pub end_color_b: i32,
    pub end_color_a: i32,
    pub image: String,
    pub sorting_order: i32,
    pub duration_frames: i32,
    pub gravity_scale_x: f32,
    pub gravity_scale_y: f32,
    pub drag_factor: f32,
    pub angular_drag_factor: f32,
    pub end_scale: f32,

    stopped: bool,
    local_frame: u64,
    particles: Vec<Option<Particle>>,
    free_slots: Vec<usize>,
    colors: Vec<Color>,
    samplers: Option<Samplers>,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self {
            key: String::new(),
            actor: None,
            enabled: true,
            emit_angle_min: 0.0,
            emit_angle_max: 360.0,
            emit_radius_min: 0.0,
            emit_radius_max: 0.5,
            rotation_min: 0.0,
            rotation_max: 0.0,
            start_scale_min: 1.0,
            start_scale_max: 1.0,
            start_speed_min: 0.0,
            start_speed_max: 0.0,
            rotation_speed_min: 0.0,
            rotation_speed_max: 0.0,
            x: 0.0,
            y: 0.0,
            frames_between_bursts: 1,
            burst_quantity: 1,
            start_color_r: 255,
            start_color_g: 255,
            start_color_b: 255,
            start_color_a: 255,
            end_color_r: UNSET,
            end_color_g: UNSET,
            end_color_b: UNSET,
            end_color_a: UNSET,
            image: String::new(),
            sorting_order: 9999,
            duration_frames: 300,
            gravity_scale_x: 0.0,
            gravity_scale_y: 0.0,
            drag_factor: 1.0,
            angular_drag_factor: 1.0,
            end_scale: UNSET as f32,
            stopped: false,
            local_frame: 0,
            particles: Vec::new(),
            free_slots: Vec::new(),
            colors: Vec::new(),
            samplers: None,
        }
    }
}

fn channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl ParticleSystem {
    /// Copy of the configuration with fresh runtime state.
    pub fn copy_definition(&self) -> Self {
        let defaults = ParticleSystem::default();
        Self {
            key: String::new(),
            actor: None,
            stopped: false,
            local_frame: 0,
            particles: defaults.particles,
            free_slots: defaults.free_slots,
            colors: defaults.colors,
            samplers: None,
            ..self.clone()
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn live_particles(&self) -> usize {
        self.particles.iter().filter(|p| p.is_some()).count()
    }

    /// Clamp the configuration and prepare generators and colours.
    pub fn start(&mut self) {
        self.frames_between_bursts = self.frames_between_bursts.max(1);
        self.burst_quantity = self.burst_quantity.max(1);
        self.duration_frames = self.duration_frames.max(1);

        self.samplers = Some(Samplers {
            emit_angle: Sampler::new(self.emit_angle_min, self.emit_angle_max, SEED_EMIT_ANGLE),
            emit_radius: Sampler::new(self.emit_radius_min, self.emit_radius_max, SEED_EMIT_RADIUS),
            rotation: Sampler::new(self.rotation_min, self.rotation_max, SEED_ROTATION),
            scale: Sampler::new(self.start_scale_min, self.start_scale_max, SEED_SCALE),
            speed: Sampler::new(self.start_speed_min, self.start_speed_max, SEED_SPEED),
            rotation_speed: Sampler::new(
                self.rotation_speed_min,
                self.rotation_speed_max,
                SEED_ROTATION_SPEED,
            ),
        });

        let capacity = (self.duration_frames as usize).div_ceil(self.frames_between_bursts as usize)
            * self.burst_quantity as usize;
        self.particles.reserve(capacity);
        self.compute_colors();
    }

    fn compute_colors(&mut self) {
        let start = [
            self.start_color_r,
            self.start_color_g,
            self.start_color_b,
            self.start_color_a,
        ];
        let end_raw = [
            self.end_color_r,
            self.end_color_g,
            self.end_color_b,
            self.end_color_a,
        ];
        let end: Vec<i32> = end_raw
            .iter()
            .zip(start)
            .map(|(&e, s)| if e == UNSET { s } else { e })
            .collect();
        let duration = self.duration_frames as usize;
        self.colors = (0..duration)
            .map(|age| {
                let t = age as f32 / duration as f32;
                let mix = |i: usize| {
                    if start[i] == end[i] {
                        channel(start[i])
                    } else {
                        channel(lerp(start[i] as f32, end[i] as f32, t) as i32)
                    }
                };
                Color::new(mix(0), mix(1), mix(2), mix(3))
            })
            .collect();
    }

    pub fn play(&mut self) {
        self.stopped = false;
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Emit one burst immediately, regardless of the stopped flag.
    pub fn burst(&mut self) {
        let quantity = self.burst_quantity.max(1) as usize;
        self.emit(quantity);
    }

    fn emit(&mut self, quantity: usize) {
        let origin = Vector2::new(self.x, self.y);
        let frame = self.local_frame;
        let Some(samplers) = self.samplers.as_mut() else {
            return;
        };
        for _ in 0..quantity {
            let direction = Vector2::from_degrees(samplers.emit_angle.sample());
            let radius = samplers.emit_radius.sample();
            let speed = samplers.speed.sample();
            let scale = samplers.scale.sample();
            let particle = Particle {
                start_frame: frame,
                position: origin + direction * radius,
                velocity: direction * speed,
                rotation: samplers.rotation.sample(),
                rotation_speed: samplers.rotation_speed.sample(),
                initial_scale: scale,
                scale,
            };
            match self.free_slots.pop() {
                Some(slot) => self.particles[slot] = Some(particle),
                None => self.particles.push(Some(particle)),
            }
        }
    }

    /// Advance one frame and collect draw requests for live particles.
    pub fn update(&mut self, out: &mut Vec<DrawRequest>) {
        if self.samplers.is_none() {
            self.start();
        }
        let interval = self.frames_between_bursts.max(1) as u64;
        if !self.stopped && self.local_frame % interval == 0 {
            self.emit(self.burst_quantity.max(1) as usize);
        }

        let gravity = Vector2::new(self.gravity_scale_x, self.gravity_scale_y);
        let spins = self.rotation_speed_min != 0.0
            || self.rotation_speed_max != 0.0
            || self.angular_drag_factor != 1.0;
        let duration = self.duration_frames.max(1) as u64;

        for (slot, entry) in self.particles.iter_mut().enumerate() {
            let Some(particle) = entry else {
                continue;
            };
            let age = self.local_frame - particle.start_frame;
            if age >= duration {
                *entry = None;
                self.free_slots.push(slot);
                continue;
            }

            particle.velocity = (particle.velocity + gravity) * self.drag_factor;
            particle.position = particle.position + particle.velocity;
            if spins {
                particle.rotation_speed *= self.angular_drag_factor;
                particle.rotation += particle.rotation_speed;
            }
            if self.end_scale != UNSET as f32 {
                let progress = age as f32 / duration as f32;
                particle.scale = lerp(particle.initial_scale, self.end_scale, progress);
            }

            out.push(DrawRequest {
                rotation: particle.rotation,
                scale: Vector2::new(particle.scale, particle.scale),
                color: self.colors.get(age as usize).copied().unwrap_or(Color::WHITE),
                sorting_order: self.sorting_order,
                ..DrawRequest::image(self.image.clone(), particle.position)
            });
        }

        self.local_frame += 1;
    }

    pub fn get_field(&self, lua: &Lua, name: &str) -> LuaResult<LuaValue> {
        let number = |v: f32| LuaValue::Number(v as f64);
        let integer = |v: i32| LuaValue::Integer(v as _);
        Ok(match name {
            "enabled" => LuaValue::Boolean(self.enabled),
            "key" => LuaValue::String(lua.create_string(&self.key)?),
            "type" => LuaValue::String(lua.create_string("ParticleSystem")?),
            "actor" => match self.actor {
                Some(id) => LuaValue::UserData(lua.create_userdata(ActorRef(id))?),
                None => LuaValue::Nil,
            },
            "emit_angle_min" => number(self.emit_angle_min),
            "emit_angle_max" => number(self.emit_angle_max),
            "emit_radius_min" => number(self.emit_radius_min),
            "emit_radius_max" => number(self.emit_radius_max),
            "rotation_min" => number(self.rotation_min),
            "rotation_max" => number(self.rotation_max),
            "start_scale_min" => number(self.start_scale_min),
            "start_scale_max" => number(self.start_scale_max),
            "start_speed_min" => number(self.start_speed_min),
            "start_speed_max" => number(self.start_speed_max),
            "rotation_speed_min" => number(self.rotation_speed_min),
            "rotation_speed_max" => number(self.rotation_speed_max),
            "x" => number(self.x),
            "y" => number(self.y),
            "frames_between_bursts" => integer(self.frames_between_bursts),
            "burst_quantity" => integer(self.burst_quantity),
            "start_color_r" => integer(self.start_color_r),
            "start_color_g" => integer(self.start_color_g),
            "start_color_b" => integer(self.start_color_b),
            "start_color_a" => integer(self.start_color_a),
            "end_color_r" => integer(self.end_color_r),
            "end_color_g" => integer(self.end_color_g),
            "end_color_b" => integer(self.end_color_b),
            "end_color_a" => integer(self.end_color_a),
            "image" => LuaValue::String(lua.create_string(&self.image)?),
            "sorting_order" => integer(self.sorting_order),
            "duration_frames" => integer(self.duration_frames),
            "gravity_scale_x" => number(self.gravity_scale_x),
            "gravity_scale_y" => number(self.gravity_scale_y),
            "drag_factor" => number(self.drag_factor),
            "angular_drag_factor" => number(self.angular_drag_factor),
            "end_scale" => number(self.end_scale),
            _ => LuaValue::Nil,
        })
    }

    /// Returns `false` for names the component does not define.
    ///
    /// Burst interval, burst size and lifetime never drop below one frame or
    /// particle, and a running system re-derives its colour ramp when the
    /// lifetime or a colour channel changes.
    pub fn set_field(&mut self, lua: &Lua, name: &str, value: LuaValue) -> LuaResult<bool> {
        if !self.assign_field(lua, name, value)? {
            return Ok(false);
        }
        match name {
            "frames_between_bursts" => {
                self.frames_between_bursts = self.frames_between_bursts.max(1)
            }
            "burst_quantity" => self.burst_quantity = self.burst_quantity.max(1),
            "duration_frames" => self.duration_frames = self.duration_frames.max(1),
            _ => {}
        }
        if self.samplers.is_some() && (name == "duration_frames" || name.contains("_color_")) {
            self.compute_colors();
        }
        Ok(true)
    }

    fn assign_field(&mut self, lua: &Lua, name: &str, value: LuaValue) -> LuaResult<bool> {
        match name {
            "enabled" => self.enabled = lua.unpack(value)?,
            "emit_angle_min" => self.emit_angle_min = lua.unpack(value)?,
            "emit_angle_max" => self.emit_angle_max = lua.unpack(value)?,
            "emit_radius_min" => self.emit_radius_min = lua.unpack(value)?,
            "emit_radius_max" => self.emit_radius_max = lua.unpack(value)?,
            "rotation_min" => self.rotation_min = lua.unpack(value)?,
            "rotation_max" => self.rotation_max = lua.unpack(value)?,
            "start_scale_min" => self.start_scale_min = lua.unpack(value)?,
            "start_scale_max" => self.start_scale_max = lua.unpack(value)?,
            "start_speed_min" => self.start_speed_min = lua.unpack(value)?,
            "start_speed_max" => self.start_speed_max = lua.unpack(value)?,
            "rotation_speed_min" => self.rotation_speed_min = lua.unpack(value)?,
            "rotation_speed_max" => self.rotation_speed_max = lua.unpack(value)?,
            "x" => self.x = lua.unpack(value)?,
            "y" => self.y = lua.unpack(value)?,
            "frames_between_bursts" => self.frames_between_bursts = lua.unpack(value)?,
            "burst_quantity" => self.burst_quantity = lua.unpack(value)?,
            "start_color_r" => self.start_color_r = lua.unpack(value)?,
            "start_color_g" => self.start_color_g = lua.unpack(value)?,
            "start_color_b" => self.start_color_b = lua.unpack(value)?,
            "start_color_a" => self.start_color_a = lua.unpack(value)?,
            "end_color_r" => self.end_color_r = lua.unpack(value)?,
            "end_color_g" => self.end_color_g = lua.unpack(value)?,
            "end_color_b" => self.end_color_b = lua.unpack(value)?,
            "end_color_a" => self.end_color_a = lua.unpack(value)?,
            "image" => self.image = lua.unpack(value)?,
            "sorting_order" => self.sorting_order = lua.unpack(value)?,
            "duration_frames" => self.duration_frames = lua.unpack(value)?,
            "gravity_scale_x" => self.gravity_scale_x = lua.unpack(value)?,
            "gravity_scale_y" => self.gravity_scale_y = lua.unpack(value)?,
            "drag_factor" => self.drag_factor = lua.unpack(value)?,
            "angular_drag_factor" => self.angular_drag_factor = lua.unpack(value)?,
            "end_scale" => self.end_scale = lua.unpack(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

pub fn on_start(userdata: &LuaAnyUserData) -> LuaResult<()> {
    userdata.borrow_mut::<ParticleSystem>()?.start();
    Ok(())
}

pub fn on_update(ctx: &RuntimeContext, userdata: &LuaAnyUserData) -> LuaResult<()> {
    let mut requests = Vec::new();
    userdata.borrow_mut::<ParticleSystem>()?.update(&mut requests);
    let mut queue = ctx.draw_queue.borrow_mut();
    for request in requests {
        queue.push(request);
    }
    Ok(())
}

impl LuaUserData for ParticleSystem {
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
                    Err(LuaError::runtime(format!(
                        "ParticleSystem has no field '{}'",
                        name
                    )))
                }
            },
        );
        methods.add_method_mut("Play", |_, this, ()| {
            this.play();
            Ok(())
        });
        methods.add_method_mut("Stop", |_, this, ()| {
            this.stop();
            Ok(())
        });
        methods.add_method_mut("Burst", |_, this, ()| {
            this.burst();
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

    fn run_frames(ps: &mut ParticleSystem, frames: usize) -> Vec<DrawRequest> {
        let mut out = Vec::new();
        for _ in 0..frames {
            out.clear();
            ps.update(&mut out);
        }
        out
    }

    #[test]
    fn start_clamps_configuration() {
        let mut ps = ParticleSystem {
            frames_between_bursts: 0,
            burst_quantity: -3,
            duration_frames: 0,
            ..ParticleSystem::default()
        };
        ps.start();
        assert_eq!(ps.frames_between_bursts, 1);
        assert_eq!(ps.burst_quantity, 1);
        assert_eq!(ps.duration_frames, 1);
    }

    #[test]
    fn bursts_every_n_frames_and_expires() {
        let mut ps = ParticleSystem {
            frames_between_bursts: 2,
            burst_quantity: 3,
            duration_frames: 3,
            ..ParticleSystem::default()
        };
        ps.start();
        // frame 0 bursts 3
        assert_eq!(run_frames(&mut ps, 1).len(), 3);
        // frame 1 no burst, same 3 alive
        assert_eq!(run_frames(&mut ps, 1).len(), 3);
        // frame 2 bursts 3 more
        assert_eq!(run_frames(&mut ps, 1).len(), 6);
        // frame 3: the first burst is three frames old and expires
        assert_eq!(run_frames(&mut ps, 1).len(), 3);
    }

    #[test]
    fn stop_play_and_burst() {
        let mut ps = ParticleSystem::default();
        ps.start();
        ps.stop();
        assert!(run_frames(&mut ps, 3).is_empty());
        ps.burst();
        assert_eq!(ps.live_particles(), 1);
        ps.play();
        assert_eq!(run_frames(&mut ps, 1).len(), 2);
    }

    #[test]
    fn velocity_gravity_then_drag() {
        let mut ps = ParticleSystem {
            emit_radius_max: 0.0,
            gravity_scale_y: 1.0,
            drag_factor: 0.5,
            ..ParticleSystem::default()
        };
        ps.start();
        let out = run_frames(&mut ps, 1);
        // (0 + 1) * 0.5 = 0.5
        assert!(approx_eq(out[0].position.y, 0.5));
    }

    #[test]
    fn colors_interpolate_over_lifetime() {
        let mut ps = ParticleSystem {
            duration_frames: 4,
            end_color_a: 0,
            ..ParticleSystem::default()
        };
        ps.start();
        assert_eq!(ps.colors.len(), 4);
        assert_eq!(ps.colors[0], Color::new(255, 255, 255, 255));
        assert_eq!(ps.colors[2].a, 127);
        // unset channels follow the start colour
        assert_eq!(ps.colors[3].r, 255);
    }

    #[test]
    fn end_scale_lerps() {
        let mut ps = ParticleSystem {
            duration_frames: 2,
            end_scale: 0.0,
            frames_between_bursts: 100,
            ..ParticleSystem::default()
        };
        ps.start();
        let first = run_frames(&mut ps, 1);
        assert!(approx_eq(first[0].scale.x, 1.0));
        let second = run_frames(&mut ps, 1);
        assert!(approx_eq(second[0].scale.y, 0.5));
    }

    #[test]
    fn same_configuration_same_particles() {
        let config = ParticleSystem {
            start_speed_min: 1.0,
            start_speed_max: 4.0,
            ..ParticleSystem::default()
        };
        let mut a = config.copy_definition();
        let mut b = config.copy_definition();
        a.start();
        b.start();
        assert_eq!(run_frames(&mut a, 5), run_frames(&mut b, 5));
    }

    #[test]
    fn zero_interval_written_after_start_is_clamped() {
        let lua = Lua::new();
        let mut ps = ParticleSystem::default();
        ps.start();
        for name in ["frames_between_bursts", "burst_quantity", "duration_frames"] {
            assert!(ps.set_field(&lua, name, LuaValue::Integer(0)).unwrap());
        }
        assert_eq!(ps.frames_between_bursts, 1);
        assert_eq!(ps.burst_quantity, 1);
        assert_eq!(ps.duration_frames, 1);
        assert_eq!(ps.colors.len(), 1);
        assert_eq!(run_frames(&mut ps, 3).len(), 1);
    }

    #[test]
    fn negative_lifetime_still_expires_particles() {
        let lua = Lua::new();
        let mut ps = ParticleSystem {
            frames_between_bursts: 100,
            ..ParticleSystem::default()
        };
        ps.start();
        ps.set_field(&lua, "duration_frames", LuaValue::Integer(-5))
            .unwrap();
        run_frames(&mut ps, 2);
        assert_eq!(ps.live_particles(), 0);
    }
}
