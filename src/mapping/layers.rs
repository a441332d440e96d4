//! Runtime mapping with layer composition.
//!
//! A [`Mapping`] is a base layer plus named overlay layers that can be
//! toggled at runtime. The effective source→target table is rebuilt lazily:
//! toggles and layer mutations only mark it stale, and [`Mapping::refresh`]
//! rebuilds it by overlaying every active layer over the base in declaration
//! order (last applied wins).

use super::autoload::CompiledAutoload;
use super::config::{ConfigError, MappingConfig};
use super::{DirectTarget, MapSource, MapTarget, PadAxis, PadButton, PadStick, TargetSpec};
use crate::mapping::{VirtualAxis, VirtualButton, VirtualStick};
use crate::motion::GyroConfig;
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{info, warn};

/// One layer's worth of entries and optional gyro override.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub entries: IndexMap<MapSource, TargetSpec>,
    pub gyro: Option<GyroConfig>,
}

/// A named mapping: base layer, declared overlay layers, activation set and
/// the cached effective table.
#[derive(Debug, Clone)]
pub struct Mapping {
    name: String,
    autoload: Option<CompiledAutoload>,
    base: Layer,
    layers: IndexMap<String, Layer>,
    active: HashSet<String>,
    real_world_calibration: f32,
    in_game_sens: f32,
    counter_os_mouse_speed: bool,
    effective: IndexMap<MapSource, TargetSpec>,
    effective_gyro: GyroConfig,
    stale: bool,
}

impl Mapping {
    /// Compile a parsed document, validating its autoload patterns.
    pub fn from_config(config: MappingConfig) -> Result<Self, ConfigError> {
        let autoload = config
            .autoload
            .map(|rule| CompiledAutoload::compile(&config.name, rule))
            .transpose()?;
        let mut mapping = Self {
            name: config.name,
            autoload,
            base: Layer {
                entries: config.mapping,
                gyro: config.gyro,
            },
            layers: config
                .layers
                .into_iter()
                .map(|(name, layer)| {
                    (
                        name,
                        Layer {
                            entries: layer.mapping,
                            gyro: layer.gyro,
                        },
                    )
                })
                .collect(),
            active: HashSet::new(),
            real_world_calibration: config.real_world_calibration,
            in_game_sens: config.in_game_sens,
            counter_os_mouse_speed: config.counter_os_mouse_speed,
            effective: IndexMap::new(),
            effective_gyro: GyroConfig::default(),
            stale: true,
        };
        mapping.refresh();
        Ok(mapping)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn autoload(&self) -> Option<&CompiledAutoload> {
        self.autoload.as_ref()
    }

    pub fn real_world_calibration(&self) -> f32 {
        self.real_world_calibration
    }

    pub fn in_game_sens(&self) -> f32 {
        self.in_game_sens
    }

    pub fn counter_os_mouse_speed(&self) -> bool {
        self.counter_os_mouse_speed
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn is_layer_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Toggle a layer. Idempotent; only an actual transition dirties the
    /// effective table and is logged.
    pub fn set_layer_activation(&mut self, name: &str, active: bool) {
        if !self.layers.contains_key(name) {
            warn!(layer = %name, "ignoring toggle for unknown layer");
            return;
        }
        let transitioned = if active {
            self.active.insert(name.to_string())
        } else {
            self.active.remove(name)
        };
        if transitioned {
            info!(mapping = %self.name, layer = %name, active, "layer toggled");
            self.stale = true;
        }
    }

    /// Rebuild the effective table if anything changed since the last call.
    pub fn refresh(&mut self) {
        if !self.stale {
            return;
        }
        self.effective = self.base.entries.clone();
        self.effective_gyro = self.base.gyro.clone().unwrap_or_default();
        for (name, layer) in &self.layers {
            if !self.active.contains(name) {
                continue;
            }
            for (source, target) in &layer.entries {
                self.effective.insert(*source, target.clone());
            }
            if let Some(gyro) = &layer.gyro {
                self.effective_gyro = gyro.clone();
            }
        }
        self.stale = false;
    }

    /// Effective target(s) for a source. Callers refresh once per tick
    /// before resolving; a stale read sees the previous composition.
    pub fn lookup(&self, source: &MapSource) -> Option<&TargetSpec> {
        self.effective.get(source)
    }

    pub fn gyro_config(&self) -> &GyroConfig {
        &self.effective_gyro
    }

    /// Plain passthrough to a virtual Xbox pad, used when a device has no
    /// mapping of its own.
    pub fn default_xbox() -> Self {
        use DirectTarget::*;
        use MapSource as Src;
        let direct = |target: DirectTarget| TargetSpec::One(MapTarget::Direct(target));
        let entries: IndexMap<MapSource, TargetSpec> = [
            (Src::Button(PadButton::N), direct(Button(VirtualButton::Y))),
            (Src::Button(PadButton::S), direct(Button(VirtualButton::A))),
            (Src::Button(PadButton::E), direct(Button(VirtualButton::B))),
            (Src::Button(PadButton::W), direct(Button(VirtualButton::X))),
            (
                Src::Button(PadButton::Back),
                direct(Button(VirtualButton::Back)),
            ),
            (
                Src::Button(PadButton::Guide),
                direct(Button(VirtualButton::Guide)),
            ),
            (
                Src::Button(PadButton::Start),
                direct(Button(VirtualButton::Start)),
            ),
            (
                Src::Button(PadButton::L3),
                direct(Button(VirtualButton::L3)),
            ),
            (
                Src::Button(PadButton::R3),
                direct(Button(VirtualButton::R3)),
            ),
            (
                Src::Button(PadButton::L1),
                direct(Button(VirtualButton::L1)),
            ),
            (
                Src::Button(PadButton::R1),
                direct(Button(VirtualButton::R1)),
            ),
            (
                Src::Button(PadButton::Up),
                direct(Button(VirtualButton::Up)),
            ),
            (
                Src::Button(PadButton::Down),
                direct(Button(VirtualButton::Down)),
            ),
            (
                Src::Button(PadButton::Left),
                direct(Button(VirtualButton::Left)),
            ),
            (
                Src::Button(PadButton::Right),
                direct(Button(VirtualButton::Right)),
            ),
            (Src::Axis(PadAxis::L2), direct(Axis(VirtualAxis::L2))),
            (Src::Axis(PadAxis::R2), direct(Axis(VirtualAxis::R2))),
            (
                Src::Stick(PadStick::LStick),
                direct(Stick(VirtualStick::LStick)),
            ),
            (
                Src::Stick(PadStick::RStick),
                direct(Stick(VirtualStick::RStick)),
            ),
        ]
        .into_iter()
        .collect();

        let mut mapping = Self {
            name: "Default (Xbox)".to_string(),
            autoload: None,
            base: Layer {
                entries,
                gyro: None,
            },
            layers: IndexMap::new(),
            active: HashSet::new(),
            real_world_calibration: 16.0 / 3.0,
            in_game_sens: 1.0,
            counter_os_mouse_speed: false,
            effective: IndexMap::new(),
            effective_gyro: GyroConfig::default(),
            stale: true,
        };
        mapping.refresh();
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::VirtualButton;

    fn target(targets: &TargetSpec) -> &MapTarget {
        match targets {
            TargetSpec::One(t) => t,
            TargetSpec::Many(ts) => &ts[0],
        }
    }

    fn mapping_with_layer() -> Mapping {
        let doc = r#"
name: overlay-test
mapping:
  S: X_A
layers:
  menu:
    mapping:
      S: X_B
"#;
        Mapping::from_config(MappingConfig::from_yaml(doc).unwrap()).unwrap()
    }

    #[test]
    fn active_layer_shadows_base_and_deactivation_restores() {
        let mut mapping = mapping_with_layer();
        let south = MapSource::Button(crate::mapping::PadButton::S);

        let base = target(mapping.lookup(&south).unwrap());
        assert_eq!(
            base,
            &MapTarget::Direct(DirectTarget::Button(VirtualButton::A))
        );

        mapping.set_layer_activation("menu", true);
        mapping.refresh();
        let shadowed = target(mapping.lookup(&south).unwrap());
        assert_eq!(
            shadowed,
            &MapTarget::Direct(DirectTarget::Button(VirtualButton::B))
        );

        mapping.set_layer_activation("menu", false);
        mapping.refresh();
        let restored = target(mapping.lookup(&south).unwrap());
        assert_eq!(
            restored,
            &MapTarget::Direct(DirectTarget::Button(VirtualButton::A))
        );
    }

    #[test]
    fn later_declared_layer_wins_on_conflict() {
        let doc = r#"
name: order-test
mapping:
  S: X_A
layers:
  first:
    mapping:
      S: X_B
  second:
    mapping:
      S: X_Y
"#;
        let mut mapping = Mapping::from_config(MappingConfig::from_yaml(doc).unwrap()).unwrap();
        // Activate in reverse order; declaration order still decides.
        mapping.set_layer_activation("second", true);
        mapping.set_layer_activation("first", true);
        mapping.refresh();
        let south = MapSource::Button(crate::mapping::PadButton::S);
        assert_eq!(
            target(mapping.lookup(&south).unwrap()),
            &MapTarget::Direct(DirectTarget::Button(VirtualButton::Y))
        );
    }

    #[test]
    fn toggling_is_idempotent() {
        let mut mapping = mapping_with_layer();
        mapping.set_layer_activation("menu", true);
        mapping.refresh();
        mapping.set_layer_activation("menu", true);
        // No transition, nothing to rebuild.
        assert!(!mapping.stale);
        assert!(mapping.is_layer_active("menu"));
    }

    #[test]
    fn unknown_layer_toggle_is_ignored() {
        let mut mapping = mapping_with_layer();
        mapping.set_layer_activation("nope", true);
        assert!(!mapping.is_layer_active("nope"));
    }

    #[test]
    fn default_xbox_is_a_passthrough() {
        let mapping = Mapping::default_xbox();
        let south = MapSource::Button(crate::mapping::PadButton::S);
        assert_eq!(
            target(mapping.lookup(&south).unwrap()),
            &MapTarget::Direct(DirectTarget::Button(VirtualButton::A))
        );
        assert!(mapping
            .lookup(&MapSource::Stick(crate::mapping::PadStick::RStick))
            .is_some());
        // Unmapped synthetic sources stay silent.
        assert!(mapping.lookup(&MapSource::Gyro).is_none());
    }
}
