//! Integration tests for ASCII restart files.

use std::fs;

use approx::assert_relative_eq;
use incflow::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
use incflow::io::{RestartError, read_restart, write_restart};
use incflow::mesh::DualMesh;
use incflow::solver::FlowState;

fn empty_state(mesh: &DualMesh) -> FlowState {
    FlowState::new(
        PrimitiveLayout::new(mesh.n_dim()).unwrap(),
        mesh.n_point(),
        ConstantDensity::new(998.2, 4182.0).into(),
        TransportModel::new(1.0e-3, Default::default()),
    )
}

fn filled_state(mesh: &DualMesh) -> FlowState {
    let mut state = empty_state(mesh);
    for p in 0..mesh.n_point() {
        let x = mesh.coord(p);
        state.set_solution(
            p,
            &[
                101_325.0 + 1.0 / 3.0 * x[0],
                (x[0] * 7.0).sin(),
                -1.0e-7 * x[1],
                293.15 + std::f64::consts::PI * x[1],
            ],
        );
    }
    state
}

#[test]
fn test_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart_flow.dat");
    let mesh = DualMesh::structured_rectangle(4, 3, 2.0, 1.0).unwrap();
    let state = filled_state(&mesh);
    write_restart(&path, &mesh, &state).unwrap();

    let mut restored = empty_state(&mesh);
    read_restart(&path, &mesh, &mut restored).unwrap();
    for p in 0..mesh.n_point() {
        for (a, b) in state.solution(p).iter().zip(restored.solution(p)) {
            assert_relative_eq!(*a, *b, max_relative = 1e-14, epsilon = 1e-300);
        }
    }

    // Properties are refreshed separately.
    assert_eq!(restored.primitive(0)[restored.layout().density()], 0.0);
    restored.update_primitives();
    assert_relative_eq!(restored.primitive(0)[restored.layout().density()], 998.2);
}

#[test]
fn test_header_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart_flow.dat");
    let mesh_2d = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
    write_restart(&path, &mesh_2d, &filled_state(&mesh_2d)).unwrap();

    let text = fs::read_to_string(&path).unwrap().replace("\"Temperature\"", "\"Enthalpy\"");
    fs::write(&path, text).unwrap();
    let result = read_restart(&path, &mesh_2d, &mut empty_state(&mesh_2d));
    assert!(matches!(result, Err(RestartError::HeaderMismatch { .. })));
}

#[test]
fn test_unknown_global_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart_flow.dat");
    let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
    write_restart(&path, &mesh, &filled_state(&mesh)).unwrap();

    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("999\t0.0\t0.0\t1.0\t0.0\t0.0\t300.0\n");
    fs::write(&path, text).unwrap();

    let result = read_restart(&path, &mesh, &mut empty_state(&mesh));
    assert!(matches!(result, Err(RestartError::UnknownIndex { index: 999, .. })));
}

#[test]
fn test_missing_points() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart_flow.dat");
    let coarse = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
    write_restart(&path, &coarse, &filled_state(&coarse)).unwrap();

    let fine = DualMesh::structured_rectangle(3, 3, 1.0, 1.0).unwrap();
    let result = read_restart(&path, &fine, &mut empty_state(&fine));
    assert!(matches!(
        result,
        Err(RestartError::MissingPoints { missing: 7, expected: 16 })
    ));
}

#[test]
fn test_truncated_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("restart_flow.dat");
    let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
    write_restart(&path, &mesh, &filled_state(&mesh)).unwrap();

    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("3\t0.5\t0.5\t1.0\n");
    fs::write(&path, text).unwrap();

    let result = read_restart(&path, &mesh, &mut empty_state(&mesh));
    assert!(matches!(
        result,
        Err(RestartError::ColumnCount { expected: 7, found: 4, .. })
    ));
}
