//! Reverse input-event channel: wire-framed events from viewer to host,
//! injected locally, plus the scroll-velocity estimator the engine's input
//! signal feeds on. Grounded in the teacher's `input.rs` enigo mapping.

use enigo::{Enigo, Key, KeyboardControllable, MouseButton, MouseControllable};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::engine::types::InputPhysics;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    MouseMove { x: i32, y: i32 },
    MouseDown { button: String, x: i32, y: i32 },
    MouseUp { button: String, x: i32, y: i32 },
    MouseScroll { delta_x: f64, delta_y: f64 },
    KeyDown { key: String, modifiers: Vec<String> },
    KeyUp { key: String, modifiers: Vec<String> },
    ZoomRequest { scale: f64 },
    Telemetry { current_fps: f64, battery: f64, is_charging: bool, thermal: u8 },
    Registration { identity: String },
}

/// Converts viewer scroll deltas into a velocity estimate, and declares
/// scrolling over once 200ms pass without a new sample.
pub struct ScrollPhysics {
    last_sample: Option<Instant>,
    vx: f64,
    vy: f64,
}

const SCROLL_IDLE_TIMEOUT_MS: u128 = 200;

impl ScrollPhysics {
    pub fn new() -> Self {
        ScrollPhysics { last_sample: None, vx: 0.0, vy: 0.0 }
    }

    pub fn observe(&mut self, delta_x: f64, delta_y: f64) {
        let now = Instant::now();
        let dt = self
            .last_sample
            .map(|prev| now.duration_since(prev).as_secs_f64())
            .unwrap_or(1.0 / 60.0)
            .max(1.0 / 1000.0);
        self.vx = delta_x / dt;
        self.vy = delta_y / dt;
        self.last_sample = Some(now);
    }

    pub fn physics(&self) -> InputPhysics {
        let is_scrolling = self
            .last_sample
            .map(|t| t.elapsed().as_millis() < SCROLL_IDLE_TIMEOUT_MS)
            .unwrap_or(false);
        InputPhysics {
            scroll_vx: if is_scrolling { self.vx } else { 0.0 },
            scroll_vy: if is_scrolling { self.vy } else { 0.0 },
            is_scrolling,
        }
    }
}

impl Default for ScrollPhysics {
    fn default() -> Self {
        Self::new()
    }
}

/// Replays received input events on the local desktop.
pub struct InputInjector {
    enigo: Enigo,
}

impl InputInjector {
    pub fn new() -> Self {
        InputInjector { enigo: Enigo::new() }
    }

    pub fn handle(&mut self, event: &InputEvent) -> Result<(), String> {
        match event {
            InputEvent::MouseMove { x, y } => {
                self.enigo.mouse_move_to(*x, *y);
            }
            InputEvent::MouseDown { button, x, y } => {
                self.enigo.mouse_move_to(*x, *y);
                self.enigo.mouse_down(map_mouse_button(button)?);
            }
            InputEvent::MouseUp { button, x, y } => {
                self.enigo.mouse_move_to(*x, *y);
                self.enigo.mouse_up(map_mouse_button(button)?);
            }
            InputEvent::MouseScroll { delta_x: _, delta_y } => {
                let clicks = (*delta_y / 120.0).abs() as i32;
                for _ in 0..clicks.max(1) {
                    self.enigo.mouse_scroll_y(if *delta_y > 0.0 { -1 } else { 1 });
                }
            }
            InputEvent::KeyDown { key, modifiers } => {
                set_modifiers(&mut self.enigo, modifiers, true)?;
                self.enigo.key_down(map_key(key)?);
            }
            InputEvent::KeyUp { key, modifiers } => {
                self.enigo.key_up(map_key(key)?);
                set_modifiers(&mut self.enigo, modifiers, false)?;
            }
            InputEvent::ZoomRequest { .. } | InputEvent::Telemetry { .. } | InputEvent::Registration { .. } => {
                // Not local-injection events: the transport/session layers consume these.
            }
        }
        Ok(())
    }
}

impl Default for InputInjector {
    fn default() -> Self {
        Self::new()
    }
}

fn map_mouse_button(button: &str) -> Result<MouseButton, String> {
    match button {
        "left" => Ok(MouseButton::Left),
        "right" => Ok(MouseButton::Right),
        "middle" => Ok(MouseButton::Middle),
        other => Err(format!("unsupported mouse button: {other}")),
    }
}

fn map_key(key: &str) -> Result<Key, String> {
    match key {
        "Space" => Ok(Key::Space),
        "Enter" => Ok(Key::Return),
        "Backspace" => Ok(Key::Backspace),
        "Escape" => Ok(Key::Escape),
        "Tab" => Ok(Key::Tab),
        "ArrowUp" => Ok(Key::UpArrow),
        "ArrowDown" => Ok(Key::DownArrow),
        "ArrowLeft" => Ok(Key::LeftArrow),
        "ArrowRight" => Ok(Key::RightArrow),
        single if single.chars().count() == 1 => Ok(Key::Layout(single.chars().next().unwrap())),
        other => Err(format!("unsupported key: {other}")),
    }
}

fn set_modifiers(enigo: &mut Enigo, modifiers: &[String], down: bool) -> Result<(), String> {
    for modifier in modifiers {
        let key = match modifier.as_str() {
            "Control" => Key::Control,
            "Alt" => Key::Alt,
            "Shift" => Key::Shift,
            "Meta" | "Command" => Key::Meta,
            other => return Err(format!("unsupported modifier: {other}")),
        };
        if down {
            enigo.key_down(key);
        } else {
            enigo.key_up(key);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_physics_reports_idle_before_first_sample() {
        let physics = ScrollPhysics::new();
        assert!(!physics.physics().is_scrolling);
    }

    #[test]
    fn scroll_physics_tracks_velocity_direction() {
        let mut physics = ScrollPhysics::new();
        physics.observe(0.0, 100.0);
        let p = physics.physics();
        assert!(p.is_scrolling);
        assert!(p.scroll_vy > 0.0);
    }

    #[test]
    fn mouse_scroll_event_deserializes_from_camel_case() {
        let json = r#"{"type":"mouseScroll","deltaX":0.0,"deltaY":-240.0}"#;
        let event: InputEvent = serde_json::from_str(json).unwrap();
        matches!(event, InputEvent::MouseScroll { .. });
    }
}
</content>
