//! Per-device state machine.
//!
//! One [`GyroGatePad`] per physical controller, owning everything the device
//! needs: its active mapping, input store, gravity estimate, calibration,
//! post-processing pipeline and resolver state. Pads share nothing, so one
//! misbehaving device can never corrupt another.

use crate::device::{InputSample, TouchPhase};
use crate::input_store::InputStore;
use crate::mapping::{
    resolve_source, DirectTarget, InputValue, MapSource, Mapping, PadStick, ResolveCtx,
    ResolvedOutput, ResolverState,
};
use crate::math::{Vec2, Vec3};
use crate::motion::{camera, pipeline, GravityEstimator, GyroCalibration, GyroPipeline};
use crate::output::OutputSink;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Sensor gaps beyond this many tick periods are treated as a reset, not a
/// huge Δt fed into the physics.
const STALE_DT_TICKS: f32 = 5.0;

pub struct GyroGatePad {
    id: u64,
    name: String,
    mapping: Mapping,
    store: InputStore,
    gravity: GravityEstimator,
    calibration: GyroCalibration,
    pipeline: GyroPipeline,
    resolver_state: ResolverState,
    sticks: HashMap<PadStick, Vec2>,
    touches: BTreeMap<u64, Vec2>,
    accel: Vec3,
    last_gyro_timestamp_us: Option<u64>,
    calibrating: bool,
    tick_period: f32,
    /// OS pointer speed divisor, only applied when the mapping counters it.
    os_mouse_speed: f32,
}

impl GyroGatePad {
    pub fn new(id: u64, name: impl Into<String>, mapping: Mapping, tick_period: f32) -> Self {
        Self {
            id,
            name: name.into(),
            mapping,
            store: InputStore::default(),
            gravity: GravityEstimator::default(),
            calibration: GyroCalibration::default(),
            pipeline: GyroPipeline::default(),
            resolver_state: ResolverState::default(),
            sticks: HashMap::new(),
            touches: BTreeMap::new(),
            accel: Vec3::ZERO,
            last_gyro_timestamp_us: None,
            calibrating: false,
            tick_period,
            os_mouse_speed: 1.0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut Mapping {
        &mut self.mapping
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrating
    }

    /// Swap the active mapping (autoload or manual load). Behavioral state
    /// tied to the old mapping's targets is dropped.
    pub fn set_mapping(&mut self, mapping: Mapping) {
        info!(pad = %self.name, mapping = %mapping.name(), "mapping loaded");
        self.mapping = mapping;
        self.resolver_state.reset();
        self.pipeline.reset();
    }

    /// Enter or leave gyro calibration. While calibrating, samples feed the
    /// drift accumulator instead of the camera.
    pub fn set_calibrating(&mut self, calibrating: bool) {
        if calibrating == self.calibrating {
            return;
        }
        self.calibrating = calibrating;
        if calibrating {
            self.calibration.reset();
            self.pipeline.reset();
            info!(pad = %self.name, "gyro calibration started, hold the controller still");
        } else {
            info!(
                pad = %self.name,
                samples = self.calibration.sample_count(),
                offset = ?self.calibration.offset(),
                "gyro calibration finished"
            );
        }
    }

    /// Feed one device sample into the input store.
    pub fn handle_sample(&mut self, sample: InputSample) {
        match sample {
            InputSample::Button { id, pressed } => {
                self.store
                    .set(MapSource::Button(id), InputValue::Bool(pressed));
            }
            InputSample::Axis { id, value } => {
                self.store.set(MapSource::Axis(id), InputValue::Float(value));
                // Stick axes also fold into the paired 2D source.
                if let Some((stick, component)) = id.stick_component() {
                    let entry = self.sticks.entry(stick).or_insert(Vec2::ZERO);
                    if component == 0 {
                        entry.x = value;
                    } else {
                        entry.y = value;
                    }
                    self.store
                        .set(MapSource::Stick(stick), InputValue::Vec2(*entry));
                }
            }
            InputSample::Accel { vec } => {
                self.accel = vec;
            }
            InputSample::Gyro { vec, timestamp_us } => self.handle_gyro(vec, timestamp_us),
            InputSample::Touch { finger, pos, phase } => {
                match phase {
                    TouchPhase::Began | TouchPhase::Moved => {
                        self.touches.insert(finger, pos);
                    }
                    TouchPhase::Ended => {
                        self.touches.remove(&finger);
                    }
                }
                self.store
                    .set(MapSource::Touch, InputValue::Touches(self.touches.clone()));
            }
        }
    }

    fn handle_gyro(&mut self, raw: Vec3, timestamp_us: u64) {
        let dt = match self.last_gyro_timestamp_us {
            Some(last) => timestamp_us.saturating_sub(last) as f32 / 1_000_000.0,
            None => 0.0,
        };
        self.last_gyro_timestamp_us = Some(timestamp_us);
        let dt = if dt > STALE_DT_TICKS * self.tick_period {
            debug!(pad = %self.name, dt, "stale gyro delta, resetting to zero");
            0.0
        } else {
            dt
        };

        if self.calibrating {
            self.calibration.record(raw);
            return;
        }

        let gyro = self.calibration.apply(raw);
        self.gravity.update(gyro, self.accel, dt);

        let cfg = self.mapping.gyro_config();
        let camera = camera::convert(
            cfg.mode,
            cfg.yaw_turn_axis,
            gyro,
            self.gravity.normalized(),
            dt,
        );
        let mut value = self.pipeline.process(cfg, camera, gyro.length(), dt);

        // Several sensor samples can land within one tick; their camera
        // deltas accumulate until resolution drains the source.
        if self.store.is_changed(&MapSource::Gyro) {
            if let Some(pending) = self.store.get(&MapSource::Gyro).and_then(InputValue::as_vec2)
            {
                value += pending;
            }
        }
        self.store.set(MapSource::Gyro, InputValue::Vec2(value));
    }

    /// Resolve every framed source and emit the results. Resolution is
    /// staged completely before anything reaches the sink, so one source's
    /// mapping is applied all-or-nothing.
    pub async fn tick(&mut self, dt: f32, sink: &mut dyn OutputSink) -> Result<()> {
        self.mapping.refresh();
        let ctx = ResolveCtx { dt };

        let mut staged: Vec<(MapSource, Vec<ResolvedOutput>)> = Vec::new();
        for (source, value) in self.store.frame() {
            let mut outputs = Vec::new();
            resolve_source(
                &self.mapping,
                source,
                value,
                &ctx,
                &mut self.resolver_state,
                &mut outputs,
            );
            if !outputs.is_empty() {
                staged.push((source, outputs));
            }
        }

        let mouse_scale = self.mouse_scale();
        for (source, outputs) in staged {
            for output in outputs {
                match output {
                    ResolvedOutput::Write(target, value) => {
                        self.emit(&target, &value, mouse_scale, sink).await?;
                    }
                    ResolvedOutput::LayerToggle(layer, active) => {
                        self.mapping.set_layer_activation(&layer, active);
                        let name = self.mapping.name().to_string();
                        sink.layer_changed(&name, &layer, active).await?;
                    }
                    ResolvedOutput::Preserve(preserved) => {
                        self.store.set_preserved(source, preserved);
                    }
                }
            }
        }

        self.store.end_frame();
        Ok(())
    }

    async fn emit(
        &self,
        target: &DirectTarget,
        value: &InputValue,
        mouse_scale: f32,
        sink: &mut dyn OutputSink,
    ) -> Result<()> {
        match target {
            DirectTarget::Button(button) => sink.virtual_button(*button, value.as_bool()).await,
            DirectTarget::Axis(axis) => sink.virtual_axis(*axis, value.as_float()).await,
            DirectTarget::Stick(stick) => {
                sink.virtual_stick(*stick, value.as_vec2().unwrap_or(Vec2::ZERO))
                    .await
            }
            DirectTarget::Key(key) => sink.key(key, value.as_bool()).await,
            DirectTarget::MouseButton(button) => sink.mouse_button(*button, value.as_bool()).await,
            DirectTarget::MouseMotion => {
                // Camera-space yaw-right maps to a rightward mouse delta
                // through the inverted convention of the injection side.
                let delta = value.as_vec2().unwrap_or(Vec2::ZERO) * (mouse_scale * -1.0);
                sink.mouse_move(delta).await
            }
        }
    }

    fn mouse_scale(&self) -> f32 {
        let os_speed = if self.mapping.counter_os_mouse_speed() {
            self.os_mouse_speed
        } else {
            1.0
        };
        pipeline::mouse_calibration(
            self.mapping.real_world_calibration(),
            os_speed,
            self.mapping.in_game_sens(),
        )
    }
}
