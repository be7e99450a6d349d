//! Minimal rigid-body world used by the `Rigidbody` component.
//!
//! The world owns every body in a slot map, integrates them with a fixed
//! step, separates overlapping colliders and reports contact begin/end
//! through a crossbeam channel. The runtime drains that channel after each
//! step and turns reports into `OnCollision*` / `OnTrigger*` callbacks.
//!
//! Shapes are axis-aligned boxes and circles; body rotation is tracked for
//! scripts but does not rotate box shapes.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use rustc_hash::FxHashSet;
use slotmap::{SlotMap, new_key_type};

use crate::components::vector2::Vector2;
use crate::resources::actor::ActorId;

new_key_type! {
    /// Handle of a body inside a [`PhysicsWorld`].
    pub struct BodyHandle;
}

/// Reported for points and normals that have no meaning (trigger contacts and
/// every exit).
pub const NO_CONTACT_POINT: Vector2 = Vector2::new(-999.0, -999.0);

const DEFAULT_CATEGORY: u16 = 0x0001;
const ALL_CATEGORIES: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Kinematic,
    Static,
}

impl BodyKind {
    /// Unknown names fall back to dynamic.
    pub fn parse(name: &str) -> Self {
        match name {
            "static" => BodyKind::Static,
            "kinematic" => BodyKind::Kinematic,
            _ => BodyKind::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl Shape {
    /// `"circle"` selects a circle, anything else a box.
    pub fn parse(kind: &str, width: f32, height: f32, radius: f32) -> Self {
        match kind {
            "circle" => Shape::Circle { radius },
            _ => Shape::Box { width, height },
        }
    }

    pub fn area(&self) -> f32 {
        match *self {
            Shape::Box { width, height } => width * height,
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
        }
    }

    fn half_extents(&self) -> Vector2 {
        match *self {
            Shape::Box { width, height } => Vector2::new(width * 0.5, height * 0.5),
            Shape::Circle { radius } => Vector2::new(radius, radius),
        }
    }
}

/// Solid fixture of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: Shape,
    pub friction: f32,
    pub bounciness: f32,
    pub category: u16,
    pub mask: u16,
}

impl Collider {
    /// Layer `-1` collides with everything. Any other layer gets its own
    /// category bit and ignores bodies on the same layer.
    pub fn with_layer(shape: Shape, friction: f32, bounciness: f32, mask_layer: i32) -> Self {
        let (category, mask) = if (0..16).contains(&mask_layer) {
            let bit = 1u16 << mask_layer;
            (bit, ALL_CATEGORIES & !bit)
        } else {
            (DEFAULT_CATEGORY, ALL_CATEGORIES)
        };
        Self {
            shape,
            friction,
            bounciness,
            category,
            mask,
        }
    }

    fn accepts(&self, other: &Collider) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub actor: ActorId,
    pub kind: BodyKind,
    pub position: Vector2,
    /// Degrees.
    pub rotation: f32,
    pub velocity: Vector2,
    /// Degrees per second.
    pub angular_velocity: f32,
    pub gravity_scale: f32,
    pub density: f32,
    pub angular_damping: f32,
    /// Continuous collision flag; kept for scripts, the solver treats all
    /// bodies alike.
    pub bullet: bool,
    pub collider: Option<Collider>,
    pub trigger: Option<Shape>,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub actor: ActorId,
    pub kind: BodyKind,
    pub position: Vector2,
    pub rotation: f32,
    pub velocity: Vector2,
    pub angular_velocity: f32,
    pub gravity_scale: f32,
    pub angular_damping: f32,
    pub bullet: bool,
    pub collider: Option<Collider>,
    pub trigger: Option<Shape>,
    mass: f32,
    force: Vector2,
}

impl Body {
    fn from_desc(desc: BodyDesc) -> Self {
        let area = desc
            .collider
            .map(|c| c.shape.area())
            .unwrap_or(1.0);
        let mass = desc.density * area;
        Self {
            actor: desc.actor,
            kind: desc.kind,
            position: desc.position,
            rotation: desc.rotation,
            velocity: desc.velocity,
            angular_velocity: desc.angular_velocity,
            gravity_scale: desc.gravity_scale,
            angular_damping: desc.angular_damping,
            bullet: desc.bullet,
            collider: desc.collider,
            trigger: desc.trigger,
            mass: if mass > f32::EPSILON { mass } else { 1.0 },
            force: Vector2::ZERO,
        }
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    fn inverse_mass(&self) -> f32 {
        match self.kind {
            BodyKind::Dynamic => 1.0 / self.mass,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    Collision,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    Enter,
    Exit,
}

/// A contact begin/end between the bodies of two actors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub kind: ContactKind,
    pub phase: ContactPhase,
    pub a: ActorId,
    pub b: ActorId,
    pub point: Vector2,
    /// Points from `a` towards `b`.
    pub normal: Vector2,
    /// Velocity of `a` minus velocity of `b`.
    pub relative_velocity: Vector2,
}

/// A shape crossed by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub actor: ActorId,
    pub point: Vector2,
    /// Surface normal at `point`, facing the ray origin.
    pub normal: Vector2,
    pub is_trigger: bool,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
}

type ContactKey = (BodyHandle, BodyHandle, ContactKind);

struct Manifold {
    normal: Vector2,
    depth: f32,
    point: Vector2,
}

pub struct PhysicsWorld {
    bodies: SlotMap<BodyHandle, Body>,
    gravity: Vector2,
    step: f32,
    contacts: Vec<ContactKey>,
    sender: Sender<ContactEvent>,
    receiver: Receiver<ContactEvent>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector2, step: f32) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            bodies: SlotMap::with_key(),
            gravity,
            step,
            contacts: Vec::new(),
            sender,
            receiver,
        }
    }

    pub fn gravity(&self) -> Vector2 {
        self.gravity
    }

    pub fn step_size(&self) -> f32 {
        self.step
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.bodies.insert(Body::from_desc(desc))
    }

    /// Remove a body. Contacts it took part in are reported as exits.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.remove(handle) else {
            return;
        };
        let mut kept = Vec::with_capacity(self.contacts.len());
        for key in std::mem::take(&mut self.contacts) {
            let (a, b, kind) = key;
            if a != handle && b != handle {
                kept.push(key);
                continue;
            }
            let other = if a == handle { b } else { a };
            if let Some(other_body) = self.bodies.get(other) {
                let (first, second) = if a == handle {
                    (&body, other_body)
                } else {
                    (other_body, &body)
                };
                self.report(
                    kind,
                    ContactPhase::Exit,
                    first.actor,
                    second.actor,
                    None,
                    first.velocity - second.velocity,
                );
            }
        }
        self.contacts = kept;
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Accumulate a force for the next step. Only dynamic bodies react.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vector2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.force = body.force + force;
        }
    }

    /// Every contact report produced since the last drain, in order.
    pub fn drain_contacts(&self) -> Vec<ContactEvent> {
        self.receiver.try_iter().collect()
    }

    /// Nearest shape crossed by the segment `origin + direction * [0, distance]`.
    pub fn raycast(&self, origin: Vector2, direction: Vector2, distance: f32) -> Option<RayHit> {
        self.raycast_all(origin, direction, distance).into_iter().next()
    }

    /// Every shape crossed by the segment, nearest first.
    ///
    /// Colliders and triggers are both reported; a body with both can appear
    /// twice. Shapes that contain the origin are not hit.
    pub fn raycast_all(&self, origin: Vector2, direction: Vector2, distance: f32) -> Vec<RayHit> {
        let segment = direction * distance;
        if distance <= 0.0 || segment.length() <= f32::EPSILON {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for body in self.bodies.values() {
            let shapes = [
                body.collider.map(|c| (c.shape, false)),
                body.trigger.map(|t| (t, true)),
            ];
            for (shape, is_trigger) in shapes.into_iter().flatten() {
                if let Some((fraction, normal)) = ray_shape(origin, segment, body.position, shape) {
                    hits.push(RayHit {
                        actor: body.actor,
                        point: origin + segment * fraction,
                        normal,
                        is_trigger,
                        distance: segment.length() * fraction,
                    });
                }
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Advance the simulation by one fixed step.
    pub fn step(&mut self) {
        let dt = self.step;
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            match body.kind {
                BodyKind::Static => {}
                BodyKind::Kinematic => {
                    body.position = body.position + body.velocity * dt;
                    body.rotation += body.angular_velocity * dt;
                }
                BodyKind::Dynamic => {
                    let acceleration =
                        gravity * body.gravity_scale + body.force * (1.0 / body.mass);
                    body.velocity = body.velocity + acceleration * dt;
                    body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
                    body.position = body.position + body.velocity * dt;
                    body.rotation += body.angular_velocity * dt;
                }
            }
            body.force = Vector2::ZERO;
        }
        self.detect_contacts();
    }

    fn detect_contacts(&mut self) {
        let handles: Vec<BodyHandle> = self.bodies.keys().collect();
        let mut current: Vec<ContactKey> = Vec::new();
        let mut entered: Vec<(ContactKey, Option<Manifold>)> = Vec::new();
        let previous: FxHashSet<ContactKey> = self.contacts.iter().copied().collect();

        for (i, &ha) in handles.iter().enumerate() {
            for &hb in &handles[i + 1..] {
                let (a, b) = (&self.bodies[ha], &self.bodies[hb]);
                if a.kind != BodyKind::Dynamic && b.kind != BodyKind::Dynamic {
                    continue;
                }

                if let (Some(ca), Some(cb)) = (a.collider, b.collider)
                    && ca.accepts(&cb)
                    && let Some(manifold) = manifold(a.position, ca.shape, b.position, cb.shape)
                {
                    let key = (ha, hb, ContactKind::Collision);
                    current.push(key);
                    self.resolve(ha, hb, &manifold);
                    if !previous.contains(&key) {
                        entered.push((key, Some(manifold)));
                    }
                }

                let (a, b) = (&self.bodies[ha], &self.bodies[hb]);
                if let (Some(ta), Some(tb)) = (a.trigger, b.trigger)
                    && manifold(a.position, ta, b.position, tb).is_some()
                {
                    let key = (ha, hb, ContactKind::Trigger);
                    current.push(key);
                    if !previous.contains(&key) {
                        entered.push((key, None));
                    }
                }
            }
        }

        let current_set: FxHashSet<ContactKey> = current.iter().copied().collect();
        for &(ha, hb, kind) in &self.contacts {
            if current_set.contains(&(ha, hb, kind)) {
                continue;
            }
            if let (Some(a), Some(b)) = (self.bodies.get(ha), self.bodies.get(hb)) {
                self.report(
                    kind,
                    ContactPhase::Exit,
                    a.actor,
                    b.actor,
                    None,
                    a.velocity - b.velocity,
                );
            }
        }
        for ((ha, hb, kind), manifold) in entered {
            let (a, b) = (&self.bodies[ha], &self.bodies[hb]);
            let relative_velocity = a.velocity - b.velocity;
            let (actor_a, actor_b) = (a.actor, b.actor);
            self.report(
                kind,
                ContactPhase::Enter,
                actor_a,
                actor_b,
                manifold.map(|m| (m.point, m.normal)),
                relative_velocity,
            );
        }
        self.contacts = current;
    }

    /// Push overlapping solids apart and bounce their velocities.
    fn resolve(&mut self, ha: BodyHandle, hb: BodyHandle, m: &Manifold) {
        let (inv_a, inv_b, restitution, approaching) = {
            let (a, b) = (&self.bodies[ha], &self.bodies[hb]);
            let restitution = match (a.collider, b.collider) {
                (Some(ca), Some(cb)) => ca.bounciness.max(cb.bounciness),
                _ => 0.0,
            };
            let vn = (b.velocity - a.velocity).dot(m.normal);
            (a.inverse_mass(), b.inverse_mass(), restitution, vn)
        };
        let total = inv_a + inv_b;
        if total <= 0.0 {
            return;
        }
        let correction = m.normal * (m.depth / total);
        let impulse = if approaching < 0.0 {
            -(1.0 + restitution) * approaching / total
        } else {
            0.0
        };
        if let Some(a) = self.bodies.get_mut(ha) {
            a.position = a.position - correction * inv_a;
            a.velocity = a.velocity - m.normal * (impulse * inv_a);
        }
        if let Some(b) = self.bodies.get_mut(hb) {
            b.position = b.position + correction * inv_b;
            b.velocity = b.velocity + m.normal * (impulse * inv_b);
        }
    }

    fn report(
        &self,
        kind: ContactKind,
        phase: ContactPhase,
        a: ActorId,
        b: ActorId,
        point_normal: Option<(Vector2, Vector2)>,
        relative_velocity: Vector2,
    ) {
        let (point, normal) = match (kind, phase, point_normal) {
            (ContactKind::Collision, ContactPhase::Enter, Some(pn)) => pn,
            _ => (NO_CONTACT_POINT, NO_CONTACT_POINT),
        };
        let event = ContactEvent {
            kind,
            phase,
            a,
            b,
            point,
            normal,
            relative_velocity,
        };
        if self.sender.send(event).is_err() {
            debug!("contact report dropped, receiver gone");
        }
    }
}

/// Overlap test between two shapes. The normal points from `a` to `b`.
fn manifold(pa: Vector2, sa: Shape, pb: Vector2, sb: Shape) -> Option<Manifold> {
    match (sa, sb) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let delta = pb - pa;
            let distance = delta.length();
            if distance >= ra + rb {
                return None;
            }
            let normal = if distance > f32::EPSILON {
                delta * (1.0 / distance)
            } else {
                Vector2::new(0.0, 1.0)
            };
            Some(Manifold {
                normal,
                depth: ra + rb - distance,
                point: pa + normal * ra,
            })
        }
        (Shape::Box { .. }, Shape::Circle { radius }) => box_circle(pa, sa, pb, radius),
        (Shape::Circle { radius }, Shape::Box { .. }) => {
            box_circle(pb, sb, pa, radius).map(|m| Manifold {
                normal: m.normal * -1.0,
                ..m
            })
        }
        (Shape::Box { .. }, Shape::Box { .. }) => {
            box_box(pa, sa.half_extents(), pb, sb.half_extents())
        }
    }
}

/// Entry fraction along `segment` and the entry normal, if the segment
/// enters `shape` placed at `center`.
fn ray_shape(
    origin: Vector2,
    segment: Vector2,
    center: Vector2,
    shape: Shape,
) -> Option<(f32, Vector2)> {
    match shape {
        Shape::Circle { radius } => ray_circle(origin, segment, center, radius),
        Shape::Box { .. } => ray_box(origin, segment, center, shape.half_extents()),
    }
}

fn ray_circle(
    origin: Vector2,
    segment: Vector2,
    center: Vector2,
    radius: f32,
) -> Option<(f32, Vector2)> {
    let s = origin - center;
    let b = s.dot(s) - radius * radius;
    if b < 0.0 {
        return None;
    }
    let c = s.dot(segment);
    let rr = segment.dot(segment);
    let sigma = c * c - rr * b;
    if sigma < 0.0 || rr < f32::EPSILON {
        return None;
    }
    let a = -(c + sigma.sqrt());
    if !(0.0..=rr).contains(&a) {
        return None;
    }
    let fraction = a / rr;
    Some((fraction, (s + segment * fraction).normalized()))
}

fn ray_box(
    origin: Vector2,
    segment: Vector2,
    center: Vector2,
    half: Vector2,
) -> Option<(f32, Vector2)> {
    let axes = [
        (origin.x, segment.x, center.x - half.x, center.x + half.x, Vector2::new(1.0, 0.0)),
        (origin.y, segment.y, center.y - half.y, center.y + half.y, Vector2::new(0.0, 1.0)),
    ];
    let mut enter = 0.0f32;
    let mut exit = 1.0f32;
    let mut normal = Vector2::ZERO;
    for (start, delta, low, high, axis) in axes {
        if delta.abs() < f32::EPSILON {
            if start < low || start > high {
                return None;
            }
            continue;
        }
        let inverse = 1.0 / delta;
        let (mut near, mut far) = ((low - start) * inverse, (high - start) * inverse);
        let mut side = -1.0;
        if near > far {
            std::mem::swap(&mut near, &mut far);
            side = 1.0;
        }
        if near > enter {
            enter = near;
            normal = axis * side;
        }
        exit = exit.min(far);
        if enter > exit {
            return None;
        }
    }
    // zero normal: the origin is inside the box
    if normal == Vector2::ZERO {
        return None;
    }
    Some((enter, normal))
}

fn box_box(pa: Vector2, ha: Vector2, pb: Vector2, hb: Vector2) -> Option<Manifold> {
    let delta = pb - pa;
    let overlap_x = ha.x + hb.x - delta.x.abs();
    let overlap_y = ha.y + hb.y - delta.y.abs();
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }
    let min = Vector2::new((pa.x - ha.x).max(pb.x - hb.x), (pa.y - ha.y).max(pb.y - hb.y));
    let max = Vector2::new((pa.x + ha.x).min(pb.x + hb.x), (pa.y + ha.y).min(pb.y + hb.y));
    let point = (min + max) * 0.5;
    if overlap_x < overlap_y {
        Some(Manifold {
            normal: Vector2::new(if delta.x < 0.0 { -1.0 } else { 1.0 }, 0.0),
            depth: overlap_x,
            point,
        })
    } else {
        Some(Manifold {
            normal: Vector2::new(0.0, if delta.y < 0.0 { -1.0 } else { 1.0 }),
            depth: overlap_y,
            point,
        })
    }
}

fn box_circle(pa: Vector2, sa: Shape, center: Vector2, radius: f32) -> Option<Manifold> {
    let half = sa.half_extents();
    let closest = Vector2::new(
        center.x.clamp(pa.x - half.x, pa.x + half.x),
        center.y.clamp(pa.y - half.y, pa.y + half.y),
    );
    let delta = center - closest;
    let distance = delta.length();
    if distance > f32::EPSILON {
        if distance >= radius {
            return None;
        }
        return Some(Manifold {
            normal: delta * (1.0 / distance),
            depth: radius - distance,
            point: closest,
        });
    }
    // centre inside the box
    box_box(pa, half, center, Vector2::new(radius, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn actors(n: usize) -> Vec<ActorId> {
        let mut arena: SlotMap<ActorId, ()> = SlotMap::with_key();
        (0..n).map(|_| arena.insert(())).collect()
    }

    fn desc(actor: ActorId, kind: BodyKind, position: Vector2) -> BodyDesc {
        BodyDesc {
            actor,
            kind,
            position,
            rotation: 0.0,
            velocity: Vector2::ZERO,
            angular_velocity: 0.0,
            gravity_scale: 1.0,
            density: 1.0,
            angular_damping: 0.3,
            bullet: true,
            collider: Some(Collider::with_layer(
                Shape::Box { width: 1.0, height: 1.0 },
                0.3,
                0.0,
                -1,
            )),
            trigger: None,
        }
    }

    #[test]
    fn gravity_integrates_velocity_then_position() {
        let ids = actors(1);
        let mut world = PhysicsWorld::new(Vector2::new(0.0, 10.0), 0.5);
        let h = world.create_body(desc(ids[0], BodyKind::Dynamic, Vector2::ZERO));
        world.step();
        let body = world.body(h).unwrap();
        assert!(approx_eq(body.velocity.y, 5.0));
        assert!(approx_eq(body.position.y, 2.5));
    }

    #[test]
    fn static_bodies_do_not_move() {
        let ids = actors(1);
        let mut world = PhysicsWorld::new(Vector2::new(0.0, 10.0), 0.5);
        let h = world.create_body(desc(ids[0], BodyKind::Static, Vector2::new(1.0, 1.0)));
        world.step();
        assert_eq!(world.body(h).unwrap().position, Vector2::new(1.0, 1.0));
    }

    #[test]
    fn force_is_divided_by_mass_and_cleared() {
        let ids = actors(1);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0);
        let mut d = desc(ids[0], BodyKind::Dynamic, Vector2::ZERO);
        d.density = 2.0;
        let h = world.create_body(d);
        world.apply_force(h, Vector2::new(4.0, 0.0));
        world.step();
        assert!(approx_eq(world.body(h).unwrap().velocity.x, 2.0));
        world.step();
        assert!(approx_eq(world.body(h).unwrap().velocity.x, 2.0));
    }

    #[test]
    fn overlap_reports_enter_then_exit() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        let ha = world.create_body(desc(ids[0], BodyKind::Dynamic, Vector2::ZERO));
        let hb = world.create_body(desc(ids[1], BodyKind::Static, Vector2::new(0.5, 0.0)));
        world.step();
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, ContactPhase::Enter);
        assert_eq!(events[0].kind, ContactKind::Collision);
        assert_eq!(events[0].a, ids[0]);
        assert!(approx_eq(events[0].normal.x, 1.0));

        // staying in contact reports nothing new
        let a_position = world.body(ha).unwrap().position;
        world.body_mut(hb).unwrap().position = a_position + Vector2::new(0.5, 0.0);
        world.step();
        assert!(world.drain_contacts().is_empty());

        world.body_mut(hb).unwrap().position = Vector2::new(5.0, 0.0);
        world.step();
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, ContactPhase::Exit);
        assert_eq!(events[0].point, NO_CONTACT_POINT);
    }

    #[test]
    fn same_layer_colliders_ignore_each_other() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        let layer = Collider::with_layer(Shape::Box { width: 1.0, height: 1.0 }, 0.3, 0.3, 2);
        let mut a = desc(ids[0], BodyKind::Dynamic, Vector2::ZERO);
        a.collider = Some(layer);
        let mut b = desc(ids[1], BodyKind::Dynamic, Vector2::new(0.2, 0.0));
        b.collider = Some(layer);
        world.create_body(a);
        world.create_body(b);
        world.step();
        assert!(world.drain_contacts().is_empty());
    }

    #[test]
    fn triggers_only_meet_triggers() {
        let ids = actors(3);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        let mut sensor = desc(ids[0], BodyKind::Dynamic, Vector2::ZERO);
        sensor.collider = None;
        sensor.trigger = Some(Shape::Circle { radius: 0.5 });
        let mut solid = desc(ids[1], BodyKind::Static, Vector2::new(0.1, 0.0));
        solid.collider = Some(Collider::with_layer(
            Shape::Box {
                width: 1.0,
                height: 1.0,
            },
            0.3,
            0.3,
            -1,
        ));
        let mut other_sensor = desc(ids[2], BodyKind::Static, Vector2::new(0.0, 0.5));
        other_sensor.collider = None;
        other_sensor.trigger = Some(Shape::Box { width: 1.0, height: 1.0 });
        world.create_body(sensor);
        world.create_body(solid);
        world.create_body(other_sensor);
        world.step();
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ContactKind::Trigger);
        assert_eq!(events[0].b, ids[2]);
        assert_eq!(events[0].point, NO_CONTACT_POINT);
    }

    #[test]
    fn trigger_exit_carries_relative_velocity() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0);
        let mut mover = desc(ids[0], BodyKind::Dynamic, Vector2::ZERO);
        mover.collider = None;
        mover.trigger = Some(Shape::Box { width: 1.0, height: 1.0 });
        mover.velocity = Vector2::new(3.0, 0.0);
        let mut zone = desc(ids[1], BodyKind::Static, Vector2::new(3.5, 0.0));
        zone.collider = None;
        zone.trigger = Some(Shape::Box { width: 1.0, height: 1.0 });
        world.create_body(mover);
        world.create_body(zone);

        world.step();
        let enter = world.drain_contacts();
        assert_eq!(enter.len(), 1);
        assert_eq!(enter[0].phase, ContactPhase::Enter);
        assert_eq!(enter[0].relative_velocity, Vector2::new(3.0, 0.0));

        world.step();
        let exit = world.drain_contacts();
        assert_eq!(exit.len(), 1);
        assert_eq!(exit[0].phase, ContactPhase::Exit);
        assert_eq!(exit[0].relative_velocity, Vector2::new(3.0, 0.0));
        assert_eq!(exit[0].point, NO_CONTACT_POINT);
    }

    #[test]
    fn removed_body_exit_carries_relative_velocity() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        let mut d = desc(ids[0], BodyKind::Static, Vector2::new(0.5, 0.0));
        d.velocity = Vector2::new(0.0, 2.0);
        world.create_body(desc(ids[1], BodyKind::Dynamic, Vector2::ZERO));
        let hb = world.create_body(d);
        world.step();
        world.drain_contacts();
        world.remove_body(hb);
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].a, ids[1]);
        assert_eq!(events[0].relative_velocity.y, -2.0);
    }

    #[test]
    fn removing_a_body_ends_its_contacts() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        let ha = world.create_body(desc(ids[0], BodyKind::Dynamic, Vector2::ZERO));
        world.create_body(desc(ids[1], BodyKind::Static, Vector2::new(0.5, 0.0)));
        world.step();
        world.drain_contacts();
        world.remove_body(ha);
        let events = world.drain_contacts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].phase, ContactPhase::Exit);
        assert_eq!(world.body_count(), 1);
    }

    fn sensor(actor: ActorId, position: Vector2, shape: Shape) -> BodyDesc {
        BodyDesc {
            collider: None,
            trigger: Some(shape),
            ..desc(actor, BodyKind::Static, position)
        }
    }

    #[test]
    fn raycast_returns_nearest_shape() {
        let ids = actors(3);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        world.create_body(desc(ids[0], BodyKind::Static, Vector2::new(5.0, 0.0)));
        world.create_body(desc(ids[1], BodyKind::Static, Vector2::new(2.0, 0.0)));
        world.create_body(sensor(ids[2], Vector2::new(8.0, 0.0), Shape::Circle { radius: 1.0 }));

        let hit = world
            .raycast(Vector2::ZERO, Vector2::new(1.0, 0.0), 10.0)
            .unwrap();
        assert_eq!(hit.actor, ids[1]);
        assert!(approx_eq(hit.point.x, 1.5));
        assert_eq!(hit.normal, Vector2::new(-1.0, 0.0));
        assert!(!hit.is_trigger);

        let all = world.raycast_all(Vector2::ZERO, Vector2::new(1.0, 0.0), 10.0);
        let order: Vec<ActorId> = all.iter().map(|h| h.actor).collect();
        assert_eq!(order, vec![ids[1], ids[0], ids[2]]);
        assert!(all[2].is_trigger);
        assert!(approx_eq(all[2].point.x, 7.0));
        assert!(approx_eq(all[2].normal.x, -1.0));
    }

    #[test]
    fn raycast_respects_length_and_origin() {
        let ids = actors(2);
        let mut world = PhysicsWorld::new(Vector2::ZERO, 1.0 / 60.0);
        world.create_body(desc(ids[0], BodyKind::Static, Vector2::ZERO));
        world.create_body(desc(ids[1], BodyKind::Static, Vector2::new(0.0, -4.0)));

        // starts inside the first box, stops short of the second
        assert!(world.raycast(Vector2::ZERO, Vector2::new(0.0, -1.0), 3.0).is_none());
        let hit = world
            .raycast(Vector2::ZERO, Vector2::new(0.0, -1.0), 4.0)
            .unwrap();
        assert_eq!(hit.actor, ids[1]);
        assert_eq!(hit.normal, Vector2::new(0.0, 1.0));
        assert!(world.raycast(Vector2::ZERO, Vector2::new(0.0, -1.0), 0.0).is_none());
        assert!(world.raycast_all(Vector2::new(0.0, 9.0), Vector2::ZERO, 5.0).is_empty());
    }

    #[test]
    fn circle_box_normal_points_from_a_to_b() {
        let m = manifold(
            Vector2::ZERO,
            Shape::Circle { radius: 1.0 },
            Vector2::new(1.2, 0.0),
            Shape::Box { width: 1.0, height: 1.0 },
        )
        .unwrap();
        assert!(approx_eq(m.normal.x, 1.0));
        assert!(approx_eq(m.depth, 0.3));
    }
}
