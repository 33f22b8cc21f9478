//! Triangle scene health check
//!
//! Runs the triangle application for one frame on the headless backend and
//! inspects what it submitted.

use crate::app::{AppConfig, BackendKind, Engine, Platform};
use crate::gfx::{FramePlan, HeadlessBackend, UniformValue, Viewport};
use crate::health::check::{CheckResult, SystemCheck};
use crate::triangle::{CLEAR_COLOR, TRIANGLE_COLOR, TriangleApp, VERTEX_COUNT, VERTICES};

/// Checks that one triangle frame resolves to the expected draw
pub struct TriangleSceneCheck {
    width: u32,
    height: u32,
}

impl TriangleSceneCheck {
    pub fn new() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn inspect(&self, backend: &HeadlessBackend, frame: &FramePlan) -> Result<Vec<String>, String> {
        let mut details = Vec::new();

        if frame.final_clear() != Some(CLEAR_COLOR) {
            return Err(format!("clear colour was {:?}", frame.final_clear()));
        }
        details.push(format!("  ✓ Cleared to {:?}", CLEAR_COLOR));

        let draws: Vec<_> = frame.draws().collect();
        let [draw] = draws.as_slice() else {
            return Err(format!("expected 1 draw, found {}", draws.len()));
        };

        if draw.start != 0 || draw.count != VERTEX_COUNT {
            return Err(format!(
                "draw covered {}..{}",
                draw.start,
                draw.start + draw.count
            ));
        }
        details.push(format!("  ✓ Draw 0..{}", VERTEX_COUNT));

        let expected_viewport = Viewport::new(self.width, self.height);
        if draw.viewport != expected_viewport {
            return Err(format!(
                "viewport was {}x{}",
                draw.viewport.width, draw.viewport.height
            ));
        }
        details.push(format!("  ✓ Viewport {}x{}", self.width, self.height));

        let colour = UniformValue::Vec4(TRIANGLE_COLOR);
        if !draw.uniforms.iter().any(|(_, value)| *value == colour) {
            return Err(format!("uniforms were {:?}", draw.uniforms));
        }
        details.push(format!("  ✓ Colour {:?}", TRIANGLE_COLOR));

        let data = backend
            .vertex_data(draw.vertex_buffer)
            .map_err(|e| e.to_string())?;
        if data != VERTICES {
            return Err(format!("vertex data was {:?}", data));
        }
        details.push(format!("  ✓ {} vertices uploaded", VERTEX_COUNT));

        Ok(details)
    }
}

impl Default for TriangleSceneCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for TriangleSceneCheck {
    fn name(&self) -> &'static str {
        "Triangle Scene"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Runs one headless frame of the triangle application")
    }

    fn check(&self) -> CheckResult {
        let mut config = AppConfig::builtin("health");
        config.graphics.backend = BackendKind::Headless;
        config.window.width = self.width;
        config.window.height = self.height;

        let mut backend = HeadlessBackend::new(self.width, self.height);
        let mut platform = Platform::new(self.width, self.height);
        let mut engine = Engine::new(config, Box::new(TriangleApp::new()));

        let frames = match engine.run_headless(&mut backend, &mut platform, Some(1), |_, _| {}) {
            Ok(frames) => frames,
            Err(e) => return CheckResult::fail(format!("Triangle run failed: {e}")),
        };

        let frame = match backend.last_frame() {
            Some(frame) if backend.submitted() == 1 => frame,
            _ => {
                return CheckResult::fail(format!(
                    "Expected 1 submitted frame after {} update(s), found {}",
                    frames,
                    backend.submitted()
                ));
            }
        };

        match self.inspect(&backend, frame) {
            Ok(details) => CheckResult::pass("Triangle frame resolved").with_details(details.join("\n")),
            Err(reason) => CheckResult::fail(format!("Unexpected triangle frame: {reason}")),
        }
    }
}
