//! wgpu device health check
//!
//! Asks for the adapter the windowed backend would get, checks its limits
//! against what the backend requests and relies on, creates the same device
//! and validates the triangle shaders on it.

use futures::executor::block_on;

use crate::gfx::wgpu_backend::{compile_stage, device_descriptor};
use crate::gfx::{ShaderStage, UniformType};
use crate::health::check::{CheckResult, SystemCheck};
use crate::triangle::{FRAGMENT_SHADER, VERTEX_LAYOUT, VERTEX_SHADER};

/// Checks that wgpu can host the windowed backend
///
/// A missing or too-weak adapter only warns: the headless backend still works
/// without one. Triangle shaders failing validation on a real device fail.
pub struct GraphicsBackendCheck;

impl GraphicsBackendCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GraphicsBackendCheck {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons an adapter with `limits` cannot serve the wgpu backend
pub fn limit_shortfalls(limits: &wgpu::Limits) -> Vec<String> {
    let required = device_descriptor().required_limits;
    let mut shortfalls = Vec::new();

    // Per-draw uniform slices are packed at this alignment
    let alignment = u64::from(limits.min_uniform_buffer_offset_alignment);
    let required_alignment = u64::from(required.min_uniform_buffer_offset_alignment);
    if alignment > required_alignment {
        shortfalls.push(format!(
            "uniform offset alignment {alignment} exceeds {required_alignment}"
        ));
    }

    let largest_slot = UniformType::Mat4.padded_size() as u64;
    let binding_size = u64::from(limits.max_uniform_buffer_binding_size);
    if binding_size < largest_slot {
        shortfalls.push(format!(
            "uniform binding size {binding_size} is below one {largest_slot}-byte slot"
        ));
    }

    if limits.max_bind_groups < 1 {
        shortfalls.push("no bind group available for uniforms".to_string());
    }

    if (limits.max_vertex_attributes as usize) < VERTEX_LAYOUT.len() {
        shortfalls.push(format!(
            "{} vertex attributes supported, {} needed",
            limits.max_vertex_attributes,
            VERTEX_LAYOUT.len()
        ));
    }

    if shortfalls.is_empty() && !required.check_limits(limits) {
        shortfalls.push("limits are below the wgpu defaults the device requests".to_string());
    }

    shortfalls
}

impl SystemCheck for GraphicsBackendCheck {
    fn name(&self) -> &'static str {
        "Graphics Backend"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Creates the wgpu device the windowed backend uses and validates its shaders")
    }

    fn check(&self) -> CheckResult {
        let mut details = Vec::new();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = match block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })) {
            Ok(adapter) => adapter,
            Err(e) => {
                return CheckResult::warn("No graphics adapter, only the headless backend is usable")
                    .with_details(format!("  ⚠ {e}"));
            }
        };

        let info = adapter.get_info();
        details.push(format!(
            "  Adapter: {} ({:?}, {:?})",
            info.name, info.backend, info.device_type
        ));

        let limits = adapter.limits();
        details.push(format!(
            "  Uniform offset alignment: {} bytes",
            limits.min_uniform_buffer_offset_alignment
        ));

        let shortfalls = limit_shortfalls(&limits);
        if !shortfalls.is_empty() {
            details.extend(shortfalls.iter().map(|s| format!("  ✗ {s}")));
            return CheckResult::warn(format!("{} cannot host the windowed backend", info.name))
                .with_details(details.join("\n"));
        }

        let device = match block_on(adapter.request_device(&device_descriptor())) {
            Ok((device, _queue)) => device,
            Err(e) => {
                details.push(format!("  ✗ {e}"));
                return CheckResult::warn(format!("{} refused the device request", info.name))
                    .with_details(details.join("\n"));
            }
        };
        details.push("  ✓ Device created with default limits".to_string());

        for (stage, source) in [
            (ShaderStage::Vertex, VERTEX_SHADER),
            (ShaderStage::Fragment, FRAGMENT_SHADER),
        ] {
            if let Err(e) = compile_stage(&device, stage, source) {
                details.push(format!("  ✗ {e}"));
                return CheckResult::fail("Triangle shaders rejected by the device")
                    .with_details(details.join("\n"));
            }
        }
        details.push("  ✓ Triangle shaders validate".to_string());

        CheckResult::pass(format!("{} ready ({:?})", info.name, info.backend))
            .with_details(details.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_have_no_shortfalls() {
        assert!(limit_shortfalls(&wgpu::Limits::default()).is_empty());
    }

    #[test]
    fn test_coarse_uniform_alignment_is_reported() {
        let limits = wgpu::Limits {
            min_uniform_buffer_offset_alignment: 512,
            ..Default::default()
        };

        let shortfalls = limit_shortfalls(&limits);

        assert_eq!(shortfalls.len(), 1);
        assert!(shortfalls[0].contains("alignment 512"), "{shortfalls:?}");
    }

    #[test]
    fn test_downlevel_limits_are_reported() {
        let shortfalls = limit_shortfalls(&wgpu::Limits::downlevel_webgl2_defaults());

        assert!(!shortfalls.is_empty());
    }
}
