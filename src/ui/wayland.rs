use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_output, delegate_registry, delegate_seat,
    delegate_shm, delegate_layer,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Modifiers},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            LayerShell, LayerShellHandler, LayerSurface, LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{slot::SlotPool, Shm, ShmHandler},
};
use wayland_client::{
    globals::GlobalList,
    protocol::{wl_keyboard, wl_output, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};
use xkbcommon::xkb::{self, keysyms};
use anyhow::Context;
use log::warn;
use crate::state::{AppState, Command, Key};
use crate::ui::render::Renderer;
use crate::executor::{self, DetachedSpawner};

pub struct WaylandApp {
    pub registry_state: RegistryState,
    pub seat_state: SeatState,
    pub output_state: OutputState,
    pub compositor_state: CompositorState,
    pub shm_state: Shm,
    pub layer_shell_state: LayerShell,

    pub layer_surface: Option<LayerSurface>,
    pub pool: Option<SlotPool>,
    pub width: u32,
    pub height: u32,
    pub first_configure: bool,
    pub should_exit: bool,

    pub state: AppState,
    pub renderer: Renderer,
}

impl WaylandApp {
    pub fn new(globals: &GlobalList, qh: &QueueHandle<Self>, state: AppState, renderer: Renderer) -> anyhow::Result<Self> {
        let (width, height) = (state.config.theme.width, state.config.theme.height);

        Ok(Self {
            registry_state: RegistryState::new(globals),
            seat_state: SeatState::new(globals, qh),
            output_state: OutputState::new(globals, qh),
            compositor_state: CompositorState::bind(globals, qh).context("wl_compositor not available")?,
            shm_state: Shm::bind(globals, qh).context("wl_shm not available")?,
            layer_shell_state: LayerShell::bind(globals, qh).context("zwlr_layer_shell_v1 not available")?,
            layer_surface: None,
            pool: None,
            width,
            height,
            first_configure: true,
            should_exit: false,
            state,
            renderer,
        })
    }

    pub fn draw(&mut self) {
        let Some(layer_surface) = &self.layer_surface else { return };
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 { return; }

        let Some(pool) = self.pool.as_mut() else { return; };

        let (buffer, canvas) = match pool.create_buffer(
            width as i32,
            height as i32,
            (width * 4) as i32,
            wl_shm::Format::Argb8888,
        ) {
            Ok(created) => created,
            Err(e) => {
                warn!("Failed to create shm buffer: {}", e);
                return;
            }
        };

        if let Some(mut pixmap) = tiny_skia::PixmapMut::from_bytes(canvas, width, height) {
            self.renderer.draw(&mut pixmap, &self.state);

            // tiny-skia is RGBA, wl_shm Argb8888 is BGRA in memory.
            for chunk in canvas.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }

            layer_surface.wl_surface().attach(Some(buffer.wl_buffer()), 0, 0);
            layer_surface.wl_surface().damage(0, 0, width as i32, height as i32);
            layer_surface.wl_surface().commit();
        }
    }

    /// Called once the event loop stops.
    pub fn teardown(&mut self) {
        self.state.shutdown();
        self.layer_surface = None;
    }
}

impl LayerShellHandler for WaylandApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        self.should_exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        if configure.new_size.0 > 0 {
            self.width = configure.new_size.0;
        }
        if configure.new_size.1 > 0 {
            self.height = configure.new_size.1;
        }

        let needed = self.width as usize * self.height as usize * 4;
        if self.first_configure {
            self.first_configure = false;
            match SlotPool::new(needed, &self.shm_state) {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    warn!("Failed to create shm pool: {}", e);
                    self.should_exit = true;
                    return;
                }
            }
        }

        if let Some(pool) = &mut self.pool {
            if pool.len() < needed {
                if let Err(e) = pool.resize(needed) {
                    warn!("Failed to grow shm pool: {}", e);
                }
            }
        }

        self.draw();
    }
}

impl CompositorHandler for WaylandApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {}

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        self.draw();
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {}

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {}
}

impl OutputHandler for WaylandApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }
    fn new_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
    fn update_output(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
    fn output_destroyed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _output: wl_output::WlOutput) {}
}

impl SeatHandler for WaylandApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        if capability == Capability::Keyboard {
            if let Err(e) = self.seat_state.get_keyboard(qh, &seat, None) {
                warn!("Failed to bind keyboard: {}", e);
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _: &QueueHandle<Self>,
        _: wl_seat::WlSeat,
        _capability: Capability,
    ) {}

    fn remove_seat(&mut self, _: &Connection, _: &QueueHandle<Self>, _: wl_seat::WlSeat) {}
}

impl KeyboardHandler for WaylandApp {
    fn enter(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
        _: &[u32],
        _: &[xkb::Keysym],
    ) {}

    fn leave(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: &wl_surface::WlSurface,
        _: u32,
    ) {
        self.should_exit = true;
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        let Some(key) = translate_key(&event) else { return };

        match self.state.handle_key(key) {
            Command::Redraw => {}
            Command::Exit => self.should_exit = true,
            Command::Launch(entry) => {
                if let Err(e) = executor::launch(&entry, &self.state.config, &DetachedSpawner) {
                    warn!("Failed to launch {}: {}", entry.name(), e);
                }
                self.should_exit = true;
            }
        }

        if let Some(layer_surface) = &self.layer_surface {
            layer_surface.wl_surface().frame(qh, layer_surface.wl_surface().clone());
            layer_surface.wl_surface().commit();
        }
    }

    fn release_key(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _: u32,
        _: KeyEvent,
    ) {}

    fn update_modifiers(
        &mut self,
        _: &Connection,
        _: &QueueHandle<Self>,
        _: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {}
}


fn translate_key(event: &KeyEvent) -> Option<Key> {
    let key = match u32::from(event.keysym) {
        keysyms::KEY_Escape => Key::Escape,
        keysyms::KEY_Return | keysyms::KEY_KP_Enter => Key::Return,
        keysyms::KEY_Up => Key::Up,
        keysyms::KEY_Down => Key::Down,
        keysyms::KEY_Left => Key::Left,
        keysyms::KEY_Right => Key::Right,
        keysyms::KEY_Tab | keysyms::KEY_ISO_Left_Tab => Key::Tab,
        keysyms::KEY_Menu => Key::Menu,
        keysyms::KEY_BackSpace => Key::Backspace,
        _ => {
            let text = event.utf8.as_ref()?;
            if text.is_empty() || text.chars().any(|c| c.is_control()) {
                return None;
            }
            Key::Text(text.clone())
        }
    };
    Some(key)
}

impl ShmHandler for WaylandApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm_state
    }
}

delegate_compositor!(WaylandApp);
delegate_output!(WaylandApp);
delegate_shm!(WaylandApp);
delegate_seat!(WaylandApp);
delegate_keyboard!(WaylandApp);
delegate_layer!(WaylandApp);
delegate_registry!(WaylandApp);

impl ProvidesRegistryState for WaylandApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }
    
    fn runtime_add_global(&mut self, _: &Connection, _: &QueueHandle<Self>, _: u32, _: &str, _: u32) {
    }
    fn runtime_remove_global(&mut self, _: &Connection, _: &QueueHandle<Self>, _: u32, _: &str) {
    }
}
