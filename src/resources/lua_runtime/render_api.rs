//! `Text`, `Image` and `Camera` namespaces.
//!
//! Draw calls only queue [`DrawRequest`]s on the runtime context; the backend
//! renders them at the end of the frame. World images use world units and
//! follow the camera. UI images, text and pixels use screen pixels, truncated
//! to whole pixels.

use mlua::prelude::*;

use crate::components::vector2::Vector2;
use crate::resources::context::{RuntimeContext, context};
use crate::resources::drawqueue::{Color, DrawRequest};

type TextArgs = (String, f32, f32, String, f32, f32, f32, f32, f32);
type ImageExArgs = (
    String,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
    f32,
);
type UiExArgs = (String, f32, f32, f32, f32, f32, f32, f32);

fn screen_position(x: f32, y: f32) -> Vector2 {
    Vector2::new(x.trunc(), y.trunc())
}

fn queue(ctx: &RuntimeContext, request: DrawRequest) {
    ctx.draw_queue.borrow_mut().push(request);
}

pub(super) fn register_text_api(lua: &Lua) -> LuaResult<()> {
    let text = lua.create_table()?;

    // Text.Draw(text, x, y, font, size, r, g, b, a)
    text.set(
        "Draw",
        lua.create_function(|lua, args: TextArgs| {
            let (content, x, y, font, size, r, g, b, a) = args;
            let ctx = context(lua)?;
            let request = DrawRequest {
                color: Color::from_channels(r, g, b, a),
                ..DrawRequest::text(content, font, size as u32, screen_position(x, y))
            };
            queue(&ctx, request);
            Ok(())
        })?,
    )?;

    lua.globals().set("Text", text)
}

pub(super) fn register_image_api(lua: &Lua) -> LuaResult<()> {
    let image = lua.create_table()?;

    image.set(
        "Draw",
        lua.create_function(|lua, (name, x, y): (String, f32, f32)| {
            let ctx = context(lua)?;
            queue(&ctx, DrawRequest::image(name, Vector2::new(x, y)));
            Ok(())
        })?,
    )?;

    // Image.DrawEx(image, x, y, rotation, scale_x, scale_y, pivot_x, pivot_y,
    //              r, g, b, a, sorting_order)
    image.set(
        "DrawEx",
        lua.create_function(|lua, args: ImageExArgs| {
            let (
                name,
                x,
                y,
                rotation,
                scale_x,
                scale_y,
                pivot_x,
                pivot_y,
                r,
                g,
                b,
                a,
                sorting_order,
            ) = args;
            let ctx = context(lua)?;
            let request = DrawRequest {
                rotation,
                scale: Vector2::new(scale_x, scale_y),
                pivot: Vector2::new(pivot_x, pivot_y),
                color: Color::from_channels(r, g, b, a),
                sorting_order: sorting_order as i32,
                ..DrawRequest::image(name, Vector2::new(x, y))
            };
            queue(&ctx, request);
            Ok(())
        })?,
    )?;

    image.set(
        "DrawUI",
        lua.create_function(|lua, (name, x, y): (String, f32, f32)| {
            let ctx = context(lua)?;
            queue(&ctx, DrawRequest::ui(name, screen_position(x, y)));
            Ok(())
        })?,
    )?;

    // Image.DrawUIEx(image, x, y, r, g, b, a, sorting_order)
    image.set(
        "DrawUIEx",
        lua.create_function(|lua, args: UiExArgs| {
            let (name, x, y, r, g, b, a, sorting_order) = args;
            let ctx = context(lua)?;
            let request = DrawRequest {
                color: Color::from_channels(r, g, b, a),
                sorting_order: sorting_order as i32,
                ..DrawRequest::ui(name, screen_position(x, y))
            };
            queue(&ctx, request);
            Ok(())
        })?,
    )?;

    // Image.DrawPixel(x, y, r, g, b, a)
    image.set(
        "DrawPixel",
        lua.create_function(
            |lua, (x, y, r, g, b, a): (f32, f32, f32, f32, f32, f32)| {
                let ctx = context(lua)?;
                let color = Color::from_channels(r, g, b, a);
                queue(&ctx, DrawRequest::pixel(screen_position(x, y), color));
                Ok(())
            },
        )?,
    )?;

    lua.globals().set("Image", image)
}

pub(super) fn register_camera_api(lua: &Lua) -> LuaResult<()> {
    let camera = lua.create_table()?;

    camera.set(
        "SetPosition",
        lua.create_function(|lua, (x, y): (f32, f32)| {
            let ctx = context(lua)?;
            let mut view = ctx.camera.get();
            view.position = Vector2::new(x, y);
            ctx.camera.set(view);
            Ok(())
        })?,
    )?;

    camera.set(
        "GetPositionX",
        lua.create_function(|lua, ()| Ok(context(lua)?.camera.get().position.x))?,
    )?;

    camera.set(
        "GetPositionY",
        lua.create_function(|lua, ()| Ok(context(lua)?.camera.get().position.y))?,
    )?;

    camera.set(
        "SetZoom",
        lua.create_function(|lua, zoom: f32| {
            if zoom <= 0.0 {
                return Err(LuaError::runtime("Camera.SetZoom expects a positive zoom"));
            }
            let ctx = context(lua)?;
            let mut view = ctx.camera.get();
            view.zoom = zoom;
            ctx.camera.set(view);
            Ok(())
        })?,
    )?;

    camera.set(
        "GetZoom",
        lua.create_function(|lua, ()| Ok(context(lua)?.camera.get().zoom))?,
    )?;

    camera.set(
        "GetCameraWidth",
        lua.create_function(|lua, ()| Ok(context(lua)?.camera.get().width))?,
    )?;

    camera.set(
        "GetCameraHeight",
        lua.create_function(|lua, ()| Ok(context(lua)?.camera.get().height))?,
    )?;

    lua.globals().set("Camera", camera)
}
