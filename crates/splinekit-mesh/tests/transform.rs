use cgmath::{Deg, InnerSpace, Rotation3};
use splinekit_mesh::{Quaternion, Result, SourceMesh, SurfaceMesh, Vector3};
use std::sync::Arc;

fn tetrahedron() -> Arc<SurfaceMesh> {
    Arc::new(SurfaceMesh {
        positions: vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ],
        normals: vec![
            Vector3::new(-1.0, -1.0, -1.0).normalize(),
            Vector3::unit_x(),
            Vector3::unit_y(),
            Vector3::unit_z(),
        ],
        triangles: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    })
}

fn assert_close(a: Vector3, b: Vector3) {
    assert!((a - b).magnitude() < 1.0e-9, "{a:?} != {b:?}");
}

#[test]
fn translation_moves_positions_only() -> Result<()> {
    let mesh = tetrahedron();
    let offset = Vector3::new(5.0, -2.0, 0.5);
    let source = SourceMesh::build(Arc::clone(&mesh)).translate(offset);

    for (vertex, (position, normal)) in source
        .vertices()?
        .iter()
        .zip(mesh.positions.iter().zip(&mesh.normals))
    {
        assert_eq!(vertex.position, *position + offset);
        assert_eq!(vertex.normal, *normal);
    }
    assert_eq!(source.triangles()?, mesh.triangles.as_slice());
    Ok(())
}

#[test]
fn one_negative_axis_reverses_winding() -> Result<()> {
    let mesh = tetrahedron();
    let source = SourceMesh::build(Arc::clone(&mesh)).scale(Vector3::new(-1.0, 1.0, 1.0));
    let reversed: Vec<[usize; 3]> = mesh
        .triangles
        .iter()
        .map(|&[a, b, c]| [c, b, a])
        .collect();
    assert_eq!(source.triangles()?, reversed.as_slice());
    assert_eq!(source.vertices()?[1].position, Vector3::new(-1.0, 0.0, 0.0));
    assert_eq!(source.vertices()?[1].normal, Vector3::new(-1.0, 0.0, 0.0));
    Ok(())
}

#[test]
fn two_negative_axes_keep_winding() -> Result<()> {
    let mesh = tetrahedron();
    let source = SourceMesh::build(Arc::clone(&mesh)).scale(Vector3::new(-1.0, -1.0, 1.0));
    assert_eq!(source.triangles()?, mesh.triangles.as_slice());
    Ok(())
}

#[test]
fn winding_ignores_rotation_and_translation() -> Result<()> {
    let mesh = tetrahedron();
    let source = SourceMesh::build(Arc::clone(&mesh))
        .rotate(Quaternion::from_angle_y(Deg(180.0)))
        .translate(Vector3::new(0.0, 3.0, 0.0));
    assert_eq!(source.triangles()?, mesh.triangles.as_slice());
    Ok(())
}

#[test]
fn rotation_then_scale_then_translation() -> Result<()> {
    let source = SourceMesh::build(tetrahedron())
        .rotate(Quaternion::from_angle_z(Deg(90.0)))
        .scale(Vector3::new(2.0, 1.0, 1.0))
        .translate(Vector3::new(1.0, 0.0, 0.0));

    let vertices = source.vertices()?;
    // (0, 1, 0) -> (-1, 0, 0) -> (-2, 0, 0) -> (-1, 0, 0)
    assert_close(vertices[2].position, Vector3::new(-1.0, 0.0, 0.0));
    assert_close(vertices[2].normal, Vector3::new(-2.0, 0.0, 0.0));
    // (1, 0, 0) -> (0, 1, 0) -> (0, 1, 0) -> (1, 1, 0)
    assert_close(vertices[1].position, Vector3::new(1.0, 1.0, 0.0));
    assert_close(vertices[1].normal, Vector3::new(0.0, 1.0, 0.0));

    assert!((source.min_extent_along_axis()? - -1.0).abs() < 1.0e-9);
    assert!((source.span_along_axis()? - 2.0).abs() < 1.0e-9);
    Ok(())
}

#[test]
fn transforms_return_independent_builders() -> Result<()> {
    let mesh = tetrahedron();
    let base = SourceMesh::build(Arc::clone(&mesh));
    let base_min = base.min_extent_along_axis()?;

    let moved = base.translate(Vector3::new(10.0, 0.0, 0.0));
    let flipped = moved.scale(Vector3::new(1.0, 1.0, -1.0));

    assert_eq!(base.translation(), Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(base.min_extent_along_axis()?, base_min);
    assert_eq!(moved.min_extent_along_axis()?, base_min + 10.0);
    assert_eq!(flipped.translation(), Vector3::new(10.0, 0.0, 0.0));
    assert_eq!(flipped.scale_factors(), Vector3::new(1.0, 1.0, -1.0));
    assert_ne!(flipped.triangles()?, moved.triangles()?);

    assert!(Arc::ptr_eq(base.mesh(), flipped.mesh()));
    assert_eq!(mesh.positions[1], Vector3::new(1.0, 0.0, 0.0));
    Ok(())
}

#[test]
fn builders_can_be_shared_across_threads() -> Result<()> {
    let source =
        Arc::new(SourceMesh::build(tetrahedron()).translate(Vector3::new(0.0, 0.0, 2.0)));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let source = Arc::clone(&source);
            std::thread::spawn(move || source.vertices().map(|v| v.len()))
        })
        .collect();
    for handle in handles {
        let count = handle.join().map_err(|_| {
            splinekit_mesh::Error::InternalInvariant("worker panicked".to_string())
        })??;
        assert_eq!(count, 4);
    }
    Ok(())
}
