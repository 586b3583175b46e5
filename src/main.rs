// main.rs — 交互式窗口：拖拽移动/旋转球体，圆柱展开图实时刷新

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod renderer;

use anyhow::Context;
use globe_projection::map::load_in_background;
use globe_projection::{
    DragMode, DragState, EquirectMap, InteractionAdapter, LaunchOptions, MapError,
    ProjectedTexture, SessionConfig, Viewport,
};
use renderer::Renderer;

use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, WindowBuilder},
};

use glam::Vec3;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

const MAP_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = LaunchOptions::from_env()?;
    let config = options.resolve_config()?;
    let adapter = InteractionAdapter::new(&config)?;

    if let Some(out) = &options.export_path {
        return export(&config, &adapter, out);
    }

    run_viewer(config, adapter)
}

/// Headless path: one full CPU pass for the configured pose, written as PNG.
fn export(config: &SessionConfig, adapter: &InteractionAdapter, out: &Path) -> anyhow::Result<()> {
    let map_path = config
        .map
        .as_ref()
        .context("--export needs a map (use --map or set \"map\" in the config)")?;
    let map = EquirectMap::open(map_path)?;

    let size = config.texture_size;
    let mut texture = ProjectedTexture::new(map, size, size, Rgba(config.void_color));
    texture.refresh(&adapter.on_pose_changed());

    texture
        .image()
        .save(out)
        .map_err(|source| MapError::Save {
            path: out.to_path_buf(),
            source,
        })?;
    log::info!("wrote {}x{} projection to {}", size, size, out.display());
    Ok(())
}

fn run_viewer(config: SessionConfig, mut adapter: InteractionAdapter) -> anyhow::Result<()> {
    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Globe Projection")
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(
        window.clone(),
        &adapter.on_pose_changed(),
        config.void_color,
    ))?;

    // 交互状态
    let mut drag = DragState::default();
    let mut pose_dirty = false;
    let mut is_fullscreen = false;
    let mut is_loading = false;
    let mut load_error: Option<String> = None;

    // 异步加载通道
    let (tx, rx): MapChannel = channel();
    if let Some(path) = config.map.clone() {
        is_loading = true;
        load_in_background(path, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        if let Ok(result) = rx.try_recv() {
            match result {
                Ok(rgba) => {
                    renderer.load_map(rgba);
                    load_error = None;
                }
                Err(e) => load_error = Some(e.to_string()),
            }
            is_loading = false;
            window.request_redraw();
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 松开按键总是结束拖拽，即使 egui 吞掉了这个事件
                match &event {
                    WindowEvent::MouseInput {
                        state: ElementState::Released,
                        button,
                        ..
                    } => {
                        if let Some(mode) = drag_mode(*button) {
                            drag.release(mode);
                        }
                    }
                    WindowEvent::Focused(false) => drag.release_all(),
                    _ => {}
                }

                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.repaint {
                    window.request_redraw();
                }
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_map_file() {
                                        is_loading = true;
                                        load_in_background(path, tx.clone());
                                    }
                                }
                                Some(VirtualKeyCode::R) => {
                                    adapter.reset();
                                    pose_dirty = true;
                                }
                                Some(VirtualKeyCode::F11) => {
                                    is_fullscreen = !is_fullscreen;
                                    set_fullscreen(&window, is_fullscreen);
                                }
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button,
                        ..
                    } => {
                        if let Some(mode) = drag_mode(button) {
                            drag.press(mode);
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if let Some((mode, dx, dy)) = drag.cursor_moved(position.x, position.y) {
                            let viewport = Viewport::new(
                                renderer.size.width as f32,
                                renderer.size.height as f32,
                            );
                            match adapter.apply_drag(mode, dx, dy, viewport) {
                                Ok(()) => pose_dirty = true,
                                Err(e) => log::warn!("drag ignored: {e}"),
                            }
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        let step = 0.05 * adapter.sensitivity_scale;
                        if adapter.translate(Vec3::new(0.0, 0.0, scroll * step)).is_ok() {
                            pose_dirty = true;
                        }
                    }

                    WindowEvent::DroppedFile(path) => {
                        is_loading = true;
                        load_in_background(path, tx.clone());
                    }

                    _ => {}
                }

                window.request_redraw();
            }

            Event::RedrawRequested(_) => {
                let mut next_map = None;
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    let ui_changed = draw_ui(
                        ctx,
                        &mut adapter,
                        &mut next_map,
                        &mut is_fullscreen,
                        is_loading,
                        load_error.as_deref(),
                        &window,
                    );
                    pose_dirty |= ui_changed;
                });

                if let Some(path) = next_map {
                    is_loading = true;
                    load_in_background(path, tx.clone());
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {e:?}"),
                }

                // UI 修改的姿态在下一帧生效
                if pose_dirty {
                    window.request_redraw();
                }
            }

            Event::MainEventsCleared => {
                // 每次姿态变化只重建一次参数，而不是每帧
                if pose_dirty {
                    let params = adapter.on_pose_changed();
                    log::debug!(
                        "pose changed: center={:?} to_local={:?}",
                        params.sphere_center(),
                        params.to_sphere_local()
                    );
                    renderer.update_projection(&params);
                    pose_dirty = false;
                    window.request_redraw();
                }
                if is_loading {
                    *control_flow = ControlFlow::Poll;
                }
            }

            _ => {}
        }
    })
}

fn set_fullscreen(window: &winit::window::Window, fullscreen: bool) {
    if fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn pick_map_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", MAP_EXTENSIONS)
        .pick_file()
}

type MapChannel = (
    Sender<Result<RgbaImage, MapError>>,
    Receiver<Result<RgbaImage, MapError>>,
);

/// 左键旋转，右键平移
fn drag_mode(button: MouseButton) -> Option<DragMode> {
    match button {
        MouseButton::Left => Some(DragMode::Rotate),
        MouseButton::Right => Some(DragMode::Translate),
        _ => None,
    }
}

/// Returns true when the panel changed the pose.
fn draw_ui(
    ctx: &egui::Context,
    adapter: &mut InteractionAdapter,
    next_map: &mut Option<PathBuf>,
    is_fullscreen: &mut bool,
    is_loading: bool,
    load_error: Option<&str>,
    window: &winit::window::Window,
) -> bool {
    let mut changed = false;

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open map…").clicked() {
                    ui.close_menu();
                    *next_map = pick_map_file();
                }
                if ui.button("Exit").clicked() {
                    std::process::exit(0);
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Reset pose").clicked() {
                    adapter.reset();
                    changed = true;
                    ui.close_menu();
                }
                let label = if *is_fullscreen {
                    "Exit fullscreen"
                } else {
                    "Fullscreen"
                };
                if ui.button(label).clicked() {
                    *is_fullscreen = !*is_fullscreen;
                    set_fullscreen(window, *is_fullscreen);
                    ui.close_menu();
                }
                ui.separator();
                ui.menu_button("Drag sensitivity", |ui| {
                    ui.add(
                        egui::Slider::new(&mut adapter.sensitivity_scale, 0.1..=5.0)
                            .text("multiplier"),
                    );
                    if ui.button("Reset to 1.0").clicked() {
                        adapter.sensitivity_scale = 1.0;
                    }
                });
            });
        });
    });

    egui::SidePanel::right("pose_panel").show(ctx, |ui| {
        ui.heading("Sphere");
        let pose = adapter.pose();
        let mut position = pose.position.to_array();
        let mut moved = false;
        ui.horizontal(|ui| {
            for (axis, value) in ["x", "y", "z"].iter().zip(position.iter_mut()) {
                ui.label(*axis);
                moved |= ui.add(egui::DragValue::new(value).speed(0.01)).changed();
            }
        });
        if moved {
            match adapter.set_position(Vec3::from_array(position)) {
                Ok(()) => changed = true,
                Err(e) => log::warn!("position rejected: {e}"),
            }
        }

        let (axis, angle) = pose.orientation.to_axis_angle();
        ui.label(format!(
            "Rotation: {:.1}° about ({:.2}, {:.2}, {:.2})",
            angle.to_degrees(),
            axis.x,
            axis.y,
            axis.z
        ));
        let geometry = adapter.geometry();
        ui.separator();
        ui.label(format!(
            "Cylinder r={:.2} h={:.2}",
            geometry.radius(),
            geometry.height()
        ));
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if is_loading {
                ui.label(egui::RichText::new("Loading map…").color(egui::Color32::YELLOW));
                ui.label("|");
            } else if let Some(err) = load_error {
                ui.label(egui::RichText::new(err).color(egui::Color32::RED));
                ui.label("|");
            }
            let p = adapter.pose().position;
            ui.label(format!("Center: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
            ui.label("|");
            ui.label("Left drag: rotate  Right drag: move  Wheel: depth  R: reset");
        });
    });

    changed
}
