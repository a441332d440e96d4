//! Resolver integration tests over parsed mapping documents.

use super::layers::Mapping;
use super::resolver::{resolve_source, ResolveCtx, ResolvedOutput, ResolverState};
use super::{
    DirectTarget, InputValue, MapSource, MappingConfig, PadButton, PadStick, VirtualButton,
};
use crate::math::Vec2;
use std::collections::BTreeMap;

fn mapping(doc: &str) -> Mapping {
    Mapping::from_config(MappingConfig::from_yaml(doc).unwrap()).unwrap()
}

fn resolve(
    mapping: &Mapping,
    source: MapSource,
    value: InputValue,
    state: &mut ResolverState,
) -> Vec<ResolvedOutput> {
    let mut outputs = Vec::new();
    let ctx = ResolveCtx { dt: 1.0 };
    resolve_source(mapping, source, &value, &ctx, state, &mut outputs);
    outputs
}

fn writes(outputs: &[ResolvedOutput]) -> Vec<(DirectTarget, InputValue)> {
    outputs
        .iter()
        .filter_map(|output| match output {
            ResolvedOutput::Write(target, value) => Some((target.clone(), value.clone())),
            _ => None,
        })
        .collect()
}

const DPAD_DOC: &str = r#"
name: dpad
mapping:
  LSTICK:
    map_as: DPAD
    UP: w
    RIGHT: d
    DOWN: s
    LEFT: a
"#;

#[test]
fn dpad_straight_up_presses_only_up() {
    let mapping = mapping(DPAD_DOC);
    let mut state = ResolverState::default();
    let outputs = resolve(
        &mapping,
        MapSource::Stick(PadStick::LStick),
        InputValue::Vec2(Vec2::new(0.0, 1.0)),
        &mut state,
    );
    let writes = writes(&outputs);
    assert_eq!(writes.len(), 4);
    for (target, value) in &writes {
        let expected = matches!(target, DirectTarget::Key(k) if k.as_str() == "w");
        assert_eq!(value, &InputValue::Bool(expected), "target {target}");
    }
}

#[test]
fn dpad_below_magnitude_threshold_releases_everything() {
    let mapping = mapping(DPAD_DOC);
    let mut state = ResolverState::default();
    let outputs = resolve(
        &mapping,
        MapSource::Stick(PadStick::LStick),
        InputValue::Vec2(Vec2::new(0.03, 0.04)),
        &mut state,
    );
    for (_, value) in writes(&outputs) {
        assert_eq!(value, InputValue::Bool(false));
    }
}

#[test]
fn dpad_diagonal_chords_both_directions() {
    let mapping = mapping(DPAD_DOC);
    let mut state = ResolverState::default();
    // Up-left diagonal, angle 45 degrees: inside both UP and LEFT windows.
    let outputs = resolve(
        &mapping,
        MapSource::Stick(PadStick::LStick),
        InputValue::Vec2(Vec2::new(-0.7, 0.7)),
        &mut state,
    );
    let pressed: Vec<String> = writes(&outputs)
        .into_iter()
        .filter(|(_, value)| value == &InputValue::Bool(true))
        .map(|(target, _)| target.to_string())
        .collect();
    assert_eq!(pressed, ["W", "A"]);
}

#[test]
fn aim_full_deflection_yields_sens_velocity() {
    let mapping = mapping(
        r#"
name: aim
mapping:
  RSTICK:
    map_as: AIM
    output: MOUSE
    sens: 360.0
"#,
    );
    let mut state = ResolverState::default();
    let outputs = resolve(
        &mapping,
        MapSource::Stick(PadStick::RStick),
        InputValue::Vec2(Vec2::new(1.0, 0.0)),
        &mut state,
    );
    assert!(outputs.contains(&ResolvedOutput::Preserve(true)));
    let writes = writes(&outputs);
    assert_eq!(writes.len(), 1);
    let (target, value) = &writes[0];
    assert_eq!(target, &DirectTarget::MouseMotion);
    let velocity = value.as_vec2().unwrap();
    assert!((velocity.x - 360.0).abs() < 1e-3);
    assert!(velocity.y.abs() < 1e-6);
}

#[test]
fn aim_inside_inner_deadzone_emits_nothing_and_unpreserves() {
    let mapping = mapping(
        r#"
name: aim
mapping:
  RSTICK:
    map_as: AIM
    output: MOUSE
    deadzone_inner: 0.2
"#,
    );
    let mut state = ResolverState::default();
    let outputs = resolve(
        &mapping,
        MapSource::Stick(PadStick::RStick),
        InputValue::Vec2(Vec2::new(0.1, 0.0)),
        &mut state,
    );
    assert_eq!(outputs, vec![ResolvedOutput::Preserve(false)]);
}

#[test]
fn aim_acceleration_ramps_and_caps_at_full_deflection() {
    let mapping = mapping(
        r#"
name: aim
mapping:
  RSTICK:
    map_as: AIM
    output: MOUSE
    sens: 100.0
    accel_rate: 0.5
    accel_cap: 1.5
"#,
    );
    let mut state = ResolverState::default();
    let source = MapSource::Stick(PadStick::RStick);
    let full = InputValue::Vec2(Vec2::new(1.0, 0.0));

    // dt = 1.0 per pass: multiplier goes 1.5, then stays capped.
    let first = writes(&resolve(&mapping, source, full.clone(), &mut state));
    let second = writes(&resolve(&mapping, source, full, &mut state));
    let x1 = first[0].1.as_vec2().unwrap().x;
    let x2 = second[0].1.as_vec2().unwrap().x;
    assert!((x1 - 150.0).abs() < 1e-3);
    assert!((x2 - 150.0).abs() < 1e-3);

    // Dropping back inside the deadzone resets the multiplier.
    resolve(
        &mapping,
        source,
        InputValue::Vec2(Vec2::ZERO),
        &mut state,
    );
    let after = writes(&resolve(
        &mapping,
        source,
        InputValue::Vec2(Vec2::new(1.0, 0.0)),
        &mut state,
    ));
    assert!((after[0].1.as_vec2().unwrap().x - 150.0).abs() < 1e-3);
}

#[test]
fn and_gate_passes_truthy_and_swallows_falsy_idempotently() {
    let mapping = mapping(
        r#"
name: gate
mapping:
  L2:
    map_as: AND
    targets: [X_A, X_B]
"#,
    );
    let mut state = ResolverState::default();
    let source = MapSource::Axis(super::PadAxis::L2);

    let pressed = resolve(&mapping, source, InputValue::Float(1.0), &mut state);
    let targets: Vec<DirectTarget> = writes(&pressed).into_iter().map(|(t, _)| t).collect();
    assert_eq!(
        targets,
        [
            DirectTarget::Button(VirtualButton::A),
            DirectTarget::Button(VirtualButton::B)
        ]
    );

    for _ in 0..2 {
        let released = resolve(&mapping, source, InputValue::Float(0.0), &mut state);
        assert!(released.is_empty());
    }
}

#[test]
fn layer_target_toggles_and_overlay_shadows_base() {
    let doc = r#"
name: layered
mapping:
  S: X_A
  R1:
    map_as: LAYER
    layer: menu
layers:
  menu:
    mapping:
      S: X_B
"#;
    let mut mapping = mapping(doc);
    let mut state = ResolverState::default();
    let south = MapSource::Button(PadButton::S);

    let outputs = resolve(
        &mapping,
        MapSource::Button(PadButton::R1),
        InputValue::Bool(true),
        &mut state,
    );
    assert_eq!(
        outputs,
        vec![ResolvedOutput::LayerToggle("menu".into(), true)]
    );

    mapping.set_layer_activation("menu", true);
    mapping.refresh();
    let shadowed = writes(&resolve(
        &mapping,
        south,
        InputValue::Bool(true),
        &mut state,
    ));
    assert_eq!(shadowed[0].0, DirectTarget::Button(VirtualButton::B));

    mapping.set_layer_activation("menu", false);
    mapping.refresh();
    let restored = writes(&resolve(
        &mapping,
        south,
        InputValue::Bool(true),
        &mut state,
    ));
    assert_eq!(restored[0].0, DirectTarget::Button(VirtualButton::A));
}

#[test]
fn grid_sticks_emit_relative_deltas_and_zero_on_release() {
    let mapping = mapping(
        r#"
name: touch
mapping:
  TOUCH:
    map_as: GRID_STICKS
    grid:
      - [X_LSTICK, X_RSTICK]
"#,
    );
    let mut state = ResolverState::default();
    let mut touches = BTreeMap::new();
    // Left half of the pad: cell (0, 0).
    touches.insert(7u64, Vec2::new(0.2, 0.5));
    let first = resolve(
        &mapping,
        MapSource::Touch,
        InputValue::Touches(touches.clone()),
        &mut state,
    );
    assert!(first.contains(&ResolvedOutput::Preserve(true)));
    let first_writes = writes(&first);
    assert_eq!(first_writes[0].0.to_string(), "X_LSTICK");
    assert_eq!(first_writes[0].1.as_vec2().unwrap(), Vec2::ZERO);

    // Finger slides; the delta is relative to the start point.
    touches.insert(7u64, Vec2::new(0.3, 0.4));
    let moved = writes(&resolve(
        &mapping,
        MapSource::Touch,
        InputValue::Touches(touches),
        &mut state,
    ));
    let delta = moved[0].1.as_vec2().unwrap();
    assert!((delta.x - 0.1).abs() < 1e-6);
    assert!((delta.y - -0.1).abs() < 1e-6);

    // Release: one zero emission, then the source is unpreserved.
    let released = resolve(
        &mapping,
        MapSource::Touch,
        InputValue::Touches(BTreeMap::new()),
        &mut state,
    );
    assert!(released.contains(&ResolvedOutput::Preserve(false)));
    let released_writes = writes(&released);
    assert_eq!(released_writes.len(), 1);
    assert_eq!(released_writes[0].1.as_vec2().unwrap(), Vec2::ZERO);
}

#[test]
fn unmapped_source_resolves_to_nothing() {
    let mapping = mapping("name: empty\nmapping:\n  S: X_A\n");
    let mut state = ResolverState::default();
    let outputs = resolve(
        &mapping,
        MapSource::Button(PadButton::N),
        InputValue::Bool(true),
        &mut state,
    );
    assert!(outputs.is_empty());
}

#[test]
fn fan_out_list_hits_every_target() {
    let mapping = mapping("name: fanout\nmapping:\n  S: [X_A, space]\n");
    let mut state = ResolverState::default();
    let outputs = writes(&resolve(
        &mapping,
        MapSource::Button(PadButton::S),
        InputValue::Bool(true),
        &mut state,
    ));
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].0, DirectTarget::Button(VirtualButton::A));
    assert!(matches!(&outputs[1].0, DirectTarget::Key(k) if k.as_str() == "space"));
}
