//! Recursive target resolution.
//!
//! Resolving a source walks its mapped target(s): direct targets terminate
//! as `(target, value)` writes, composite targets synthesize sub-values and
//! recurse. Missing nested configuration is skipped silently; partial
//! mappings are valid.
//!
//! Composite behavioral state (aim acceleration, touch start points) lives
//! in the pad-owned [`ResolverState`], keyed by the source and the recursion
//! path to the composite node, so mapping configs stay immutable and
//! shareable between devices.

use super::layers::Mapping;
use super::{CompositeTarget, InputValue, MapSource, MapTarget};
use crate::math::{clamp, Vec2};
use std::collections::{BTreeMap, HashMap};

/// Ambient parameters for one resolution pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolveCtx {
    /// Seconds since the previous tick.
    pub dt: f32,
}

/// One effect produced by resolution. `Write`s go to the output sink;
/// `LayerToggle` and `Preserve` are applied by the owning pad after the
/// whole source resolved (all-or-nothing per source).
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedOutput {
    Write(super::DirectTarget, InputValue),
    LayerToggle(String, bool),
    /// Keep (or stop keeping) this source in every tick's output batch.
    Preserve(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StateKey {
    source: MapSource,
    path: Vec<u16>,
}

#[derive(Debug, Clone)]
struct AimState {
    accel_mult: f32,
}

#[derive(Debug, Clone, Default)]
struct TouchTracker {
    /// finger id → (row, col, start point)
    starts: BTreeMap<u64, (usize, usize, Vec2)>,
}

#[derive(Debug, Clone)]
enum NodeState {
    Aim(AimState),
    Touch(TouchTracker),
}

/// Per-device behavioral state for composite targets.
#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    nodes: HashMap<StateKey, NodeState>,
}

impl ResolverState {
    /// Forget everything, e.g. when the active mapping is swapped.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    fn aim_mut(&mut self, key: StateKey) -> &mut AimState {
        let node = self
            .nodes
            .entry(key)
            .or_insert(NodeState::Aim(AimState { accel_mult: 1.0 }));
        match node {
            NodeState::Aim(aim) => aim,
            other => {
                *other = NodeState::Aim(AimState { accel_mult: 1.0 });
                match other {
                    NodeState::Aim(aim) => aim,
                    _ => unreachable!(),
                }
            }
        }
    }

    fn touch_mut(&mut self, key: StateKey) -> &mut TouchTracker {
        let node = self
            .nodes
            .entry(key)
            .or_insert(NodeState::Touch(TouchTracker::default()));
        match node {
            NodeState::Touch(tracker) => tracker,
            other => {
                *other = NodeState::Touch(TouchTracker::default());
                match other {
                    NodeState::Touch(tracker) => tracker,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// Resolve one source's effective target(s) into outputs.
pub fn resolve_source(
    mapping: &Mapping,
    source: MapSource,
    value: &InputValue,
    ctx: &ResolveCtx,
    state: &mut ResolverState,
    outputs: &mut Vec<ResolvedOutput>,
) {
    let Some(targets) = mapping.lookup(&source) else {
        return;
    };
    let mut path = Vec::new();
    for (index, target) in targets.iter().enumerate() {
        path.push(index as u16);
        resolve_target(target, value, ctx, state, source, &mut path, outputs);
        path.pop();
    }
}

fn resolve_target(
    target: &MapTarget,
    value: &InputValue,
    ctx: &ResolveCtx,
    state: &mut ResolverState,
    source: MapSource,
    path: &mut Vec<u16>,
    outputs: &mut Vec<ResolvedOutput>,
) {
    match target {
        MapTarget::Direct(direct) => {
            outputs.push(ResolvedOutput::Write(direct.clone(), value.clone()));
        }
        MapTarget::Composite(composite) => {
            resolve_composite(composite, value, ctx, state, source, path, outputs)
        }
    }
}

fn resolve_composite(
    composite: &CompositeTarget,
    value: &InputValue,
    ctx: &ResolveCtx,
    state: &mut ResolverState,
    source: MapSource,
    path: &mut Vec<u16>,
    outputs: &mut Vec<ResolvedOutput>,
) {
    match composite {
        CompositeTarget::Aim {
            output,
            sens,
            power,
            deadzone_inner,
            deadzone_outer,
            accel_rate,
            accel_cap,
            invert_x,
            invert_y,
        } => {
            let Some(stick) = value.as_vec2() else {
                return;
            };
            let key = StateKey {
                source,
                path: path.clone(),
            };
            let magnitude = stick.length();
            if magnitude < *deadzone_inner || magnitude == 0.0 {
                state.aim_mut(key).accel_mult = 1.0;
                outputs.push(ResolvedOutput::Preserve(false));
                return;
            }
            // Re-evaluated every tick while deflected, so velocity keeps
            // flowing (and acceleration keeps ramping) without new samples.
            outputs.push(ResolvedOutput::Preserve(true));

            let span = deadzone_outer - deadzone_inner;
            let normalized = if span <= 0.0 {
                1.0
            } else {
                clamp((magnitude - deadzone_inner) / span, 0.0, 1.0)
            };
            let curved = normalized.powf(*power);

            let accel_mult = {
                let aim = state.aim_mut(key);
                if normalized >= 1.0 && *accel_rate > 0.0 {
                    aim.accel_mult = (aim.accel_mult + accel_rate * ctx.dt).min(*accel_cap);
                } else {
                    aim.accel_mult = 1.0;
                }
                aim.accel_mult
            };

            let direction = stick / magnitude;
            let mut velocity = direction * (curved * sens * accel_mult * ctx.dt);
            if *invert_x {
                velocity.x = -velocity.x;
            }
            if *invert_y {
                velocity.y = -velocity.y;
            }

            path.push(0);
            resolve_target(
                output,
                &InputValue::Vec2(velocity),
                ctx,
                state,
                source,
                path,
                outputs,
            );
            path.pop();
        }

        CompositeTarget::Dpad {
            up,
            right,
            down,
            left,
        } => {
            let Some(stick) = value.as_vec2() else {
                return;
            };
            // Windows are 50 degrees wide around each cardinal and overlap
            // at the diagonals, enabling chords like UP+LEFT.
            let (up_on, right_on, down_on, left_on) = if stick.length() <= 0.1 {
                (false, false, false, false)
            } else {
                let angle = stick.angle();
                (
                    angle >= 310.0 || angle <= 50.0,
                    (220.0..=320.0).contains(&angle),
                    (130.0..=230.0).contains(&angle),
                    (40.0..=140.0).contains(&angle),
                )
            };
            let directions = [
                (up, up_on),
                (right, right_on),
                (down, down_on),
                (left, left_on),
            ];
            for (index, (sub, pressed)) in directions.into_iter().enumerate() {
                let Some(sub) = sub else { continue };
                path.push(index as u16);
                resolve_target(
                    sub,
                    &InputValue::Bool(pressed),
                    ctx,
                    state,
                    source,
                    path,
                    outputs,
                );
                path.pop();
            }
        }

        CompositeTarget::GridSticks { grid } => {
            let Some(touches) = value.as_touches() else {
                return;
            };
            let rows = grid.len();
            if rows == 0 {
                return;
            }
            let key = StateKey {
                source,
                path: path.clone(),
            };

            // Gather deltas first; the tracker borrow must end before the
            // recursive calls below.
            let mut emissions: Vec<(usize, usize, Vec2)> = Vec::new();
            {
                let tracker = state.touch_mut(key);
                for (finger, position) in touches {
                    let (row, col, start) =
                        *tracker.starts.entry(*finger).or_insert_with(|| {
                            let row = cell_index(position.y, rows);
                            let col = cell_index(position.x, grid[row].len().max(1));
                            (row, col, *position)
                        });
                    emissions.push((row, col, *position - start));
                }
                // Released fingers emit a zero once, then are forgotten.
                let released: Vec<u64> = tracker
                    .starts
                    .keys()
                    .filter(|finger| !touches.contains_key(finger))
                    .copied()
                    .collect();
                for finger in released {
                    if let Some((row, col, _)) = tracker.starts.remove(&finger) {
                        emissions.push((row, col, Vec2::ZERO));
                    }
                }
                outputs.push(ResolvedOutput::Preserve(!tracker.starts.is_empty()));
            }

            for (row, col, delta) in emissions {
                let Some(cell) = grid.get(row).and_then(|r| r.get(col)) else {
                    continue;
                };
                path.push((row * 256 + col) as u16);
                resolve_target(
                    cell,
                    &InputValue::Vec2(delta),
                    ctx,
                    state,
                    source,
                    path,
                    outputs,
                );
                path.pop();
            }
        }

        CompositeTarget::And { targets } => {
            // Falsy input emits nothing at all; the point is gating, not
            // boolean pass-through.
            if !value.as_bool() {
                return;
            }
            for (index, sub) in targets.iter().enumerate() {
                path.push(index as u16);
                resolve_target(sub, value, ctx, state, source, path, outputs);
                path.pop();
            }
        }

        CompositeTarget::Layer { layer } => {
            outputs.push(ResolvedOutput::LayerToggle(layer.clone(), value.as_bool()));
        }
    }
}

fn cell_index(normalized: f32, cells: usize) -> usize {
    let index = (normalized * cells as f32) as usize;
    index.min(cells.saturating_sub(1))
}
