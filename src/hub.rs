//! The registry hub: one registry per handle category plus the native API
//! they release through.

use crate::config::Options;
use crate::error::BindError;
use crate::ffi::NativeApi;
use crate::handle::Kind;
use crate::registry::{Registry, RegistryReport};
use crate::resource::{Instance, markers};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// State shared by a hub and every wrapper it hands out.
pub struct Shared {
    pub(crate) api: NativeApi,
    pub(crate) options: Options,
    pub(crate) renderers: Registry<Instance<markers::Renderer>>,
    pub(crate) textures: Registry<Instance<markers::Texture>>,
    pub(crate) surfaces: Registry<Instance<markers::Surface>>,
    pub(crate) palettes: Registry<Instance<markers::Palette>>,
    pub(crate) gpu_render_states: Registry<Instance<markers::GpuRenderState>>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Entry point for all wrappers.
///
/// A hub owns the identity registries for every handle category. Hubs are
/// independent of each other: the same native pointer seen through two hubs
/// gets two identities, so an application normally creates one hub at
/// startup and clones it where needed. Clones share the same registries.
///
/// Teardown is best effort: entries are weak, so dropping the hub while
/// wrappers are still alive only releases the registries once the last
/// wrapper is gone.
#[derive(Clone, Debug)]
pub struct Bindings {
    shared: Arc<Shared>,
}

/// Per-category registry reports.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BindingsReport {
    pub renderers: RegistryReport,
    pub textures: RegistryReport,
    pub surfaces: RegistryReport,
    pub palettes: RegistryReport,
    pub gpu_render_states: RegistryReport,
}

impl Bindings {
    pub fn new(api: NativeApi) -> Self {
        Self::with_options(api, Options::default())
    }

    pub fn with_options(api: NativeApi, options: Options) -> Self {
        let capacity = options.registry_capacity;
        Self {
            shared: Arc::new(Shared {
                api,
                options,
                renderers: Registry::new(Kind::Renderer, capacity),
                textures: Registry::new(Kind::Texture, capacity),
                surfaces: Registry::new(Kind::Surface, capacity),
                palettes: Registry::new(Kind::Palette, capacity),
                gpu_render_states: Registry::new(Kind::GpuRenderState, capacity),
            }),
        }
    }

    /// Hub backed by the linked SDL3 library.
    #[cfg(feature = "sdl3")]
    pub fn sdl3() -> Self {
        Self::new(NativeApi::sdl3())
    }

    pub fn api(&self) -> &NativeApi {
        &self.shared.api
    }

    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    pub fn renderers(&self) -> &Registry<Instance<markers::Renderer>> {
        &self.shared.renderers
    }

    pub fn textures(&self) -> &Registry<Instance<markers::Texture>> {
        &self.shared.textures
    }

    pub fn surfaces(&self) -> &Registry<Instance<markers::Surface>> {
        &self.shared.surfaces
    }

    pub fn palettes(&self) -> &Registry<Instance<markers::Palette>> {
        &self.shared.palettes
    }

    pub fn gpu_render_states(&self) -> &Registry<Instance<markers::GpuRenderState>> {
        &self.shared.gpu_render_states
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    pub fn report(&self) -> BindingsReport {
        BindingsReport {
            renderers: self.shared.renderers.report(),
            textures: self.shared.textures.report(),
            surfaces: self.shared.surfaces.report(),
            palettes: self.shared.palettes.report(),
            gpu_render_states: self.shared.gpu_render_states.report(),
        }
    }

    /// The report as a JSON object keyed by category.
    pub fn report_json(&self) -> Result<String, BindError> {
        Ok(serde_json::to_string(&self.report())?)
    }

    /// Drop dead entries from every registry. Returns how many were removed.
    pub fn prune(&self) -> usize {
        self.shared.renderers.prune()
            + self.shared.textures.prune()
            + self.shared.surfaces.prune()
            + self.shared.palettes.prune()
            + self.shared.gpu_render_states.prune()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_hub_reports_empty() {
        let bindings = Bindings::new(crate::sim::api());
        assert_eq!(bindings.report(), BindingsReport::default());
        assert_eq!(bindings.prune(), 0);
    }

    #[test]
    fn test_report_json_shape() {
        let bindings = Bindings::new(crate::sim::api());
        let json: serde_json::Value = serde_json::from_str(&bindings.report_json().unwrap()).unwrap();
        assert_eq!(json["textures"]["live"], 0);
        assert_eq!(json["gpu_render_states"]["fabricated"], 0);
    }

    #[test]
    fn test_options_flow_into_hub() {
        let options = Options::from_json(r#"{"registry_capacity": 8}"#).unwrap();
        let bindings = Bindings::with_options(crate::sim::api(), options);
        assert_eq!(bindings.options().registry_capacity, 8);
        assert_eq!(bindings.textures().kind(), Kind::Texture);
    }
}
