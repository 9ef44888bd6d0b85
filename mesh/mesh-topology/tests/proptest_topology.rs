//! Scenario and property-based tests for mesh topology.
//!
//! Run with: cargo test -p mesh-topology -- proptest

use hashbrown::HashSet;
use mesh_topology::{
    AdjacencyOptions, NonManifoldKind, TransferOptions, border_face_edges, border_faces,
    border_vertex_chains, border_vertices, connected_components, face_face_adjacencies,
    non_manifold_edges, subset_border_face_edges, subset_border_faces,
    subset_border_vertex_chains, subset_connected_components, transfer_faces, transfer_mesh,
    vertex_face_adjacencies, vertex_vertex_adjacencies,
};
use mesh_types::{FaceId, MeshBuild, MeshView, PolyMesh, Point3, VertexId};
use proptest::prelude::*;

// =============================================================================
// Test Meshes
// =============================================================================

/// Unit cube, 12 outward-facing triangles.
fn cube() -> PolyMesh {
    cube_at(0.0)
}

fn cube_at(offset: f64) -> PolyMesh {
    let verts = [
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    let positions: Vec<f64> = verts
        .iter()
        .flat_map(|v| [v[0] + offset, v[1], v[2]])
        .collect();
    PolyMesh::from_raw(&positions, &cube_faces(0)).unwrap()
}

fn cube_faces(base: VertexId) -> Vec<Vec<VertexId>> {
    [
        [0, 1, 2],
        [0, 2, 3],
        [4, 6, 5],
        [4, 7, 6],
        [0, 4, 5],
        [0, 5, 1],
        [2, 6, 7],
        [2, 7, 3],
        [0, 3, 7],
        [0, 7, 4],
        [1, 5, 6],
        [1, 6, 2],
    ]
    .iter()
    .map(|f| f.iter().map(|&v| v + base).collect())
    .collect()
}

/// Flat `n` x `n` grid of triangulated cells in the XY plane.
///
/// Vertex `(i, j)` has ID `j * (n + 1) + i`.
fn grid(n: u32) -> PolyMesh {
    let id = |i: u32, j: u32| j * (n + 1) + i;
    let mut positions = Vec::new();
    for j in 0..=n {
        for i in 0..=n {
            positions.extend([f64::from(i), f64::from(j), 0.0]);
        }
    }
    let mut faces = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let (a, b, c, d) = (id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1));
            faces.push(vec![a, b, c]);
            faces.push(vec![a, c, d]);
        }
    }
    PolyMesh::from_raw(&positions, &faces).unwrap()
}

/// Boundary of [`grid`] in counter-clockwise order from vertex 0.
fn grid_boundary(n: u32) -> Vec<VertexId> {
    let id = |i: u32, j: u32| j * (n + 1) + i;
    let mut ring = Vec::new();
    ring.extend((0..n).map(|i| id(i, 0)));
    ring.extend((0..n).map(|j| id(n, j)));
    ring.extend((1..=n).rev().map(|i| id(i, n)));
    ring.extend((1..=n).rev().map(|j| id(0, j)));
    ring
}

/// Quad torus with `m` x `n` cells.
fn torus(m: u32, n: u32) -> PolyMesh {
    let id = |i: u32, j: u32| (i % m) * n + (j % n);
    let (big, small) = (3.0, 1.0);
    let mut positions = Vec::new();
    for i in 0..m {
        let u = std::f64::consts::TAU * f64::from(i) / f64::from(m);
        for j in 0..n {
            let v = std::f64::consts::TAU * f64::from(j) / f64::from(n);
            let r = big + small * v.cos();
            positions.extend([r * u.cos(), r * u.sin(), small * v.sin()]);
        }
    }
    let mut faces = Vec::new();
    for i in 0..m {
        for j in 0..n {
            faces.push(vec![id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1)]);
        }
    }
    PolyMesh::from_raw(&positions, &faces).unwrap()
}

fn is_rotation(a: &[VertexId], b: &[VertexId]) -> bool {
    a.len() == b.len()
        && (a.is_empty() || (0..b.len()).any(|k| b[k..].iter().chain(&b[..k]).eq(a.iter())))
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn unit_square_scenario() {
    let mesh = PolyMesh::from_raw(
        &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        &[vec![0, 1, 2], vec![0, 2, 3]],
    )
    .unwrap();

    let vv = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
    assert_eq!(vv[0], vec![1, 2, 3]);

    let ff = face_face_adjacencies(&mesh, None);
    assert_eq!(ff, vec![vec![None, None, Some(1)], vec![Some(0), None, None]]);

    let chains = border_vertex_chains(&mesh, Some(&ff));
    assert_eq!(chains.len(), 1);
    assert!(is_rotation(&chains[0].vertices, &[0, 1, 2, 3]));
}

#[test]
fn closed_meshes_have_no_border() {
    for mesh in [cube(), torus(6, 4)] {
        let ff = face_face_adjacencies(&mesh, None);
        assert!(ff.iter().flatten().all(Option::is_some));
        assert!(border_faces(&mesh, Some(&ff)).is_empty());
        assert!(border_vertices(&mesh, Some(&ff)).is_empty());
        assert!(border_vertex_chains(&mesh, Some(&ff)).is_empty());
        assert_eq!(connected_components(&mesh, Some(&ff)).len(), 1);
        assert!(non_manifold_edges(&mesh).is_empty());
    }
}

#[test]
fn grid_has_one_ordered_border_loop() {
    for n in 1..6 {
        let mesh = grid(n);
        let chains = border_vertex_chains(&mesh, None);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 4 * n as usize);
        assert!(is_rotation(&chains[0].vertices, &grid_boundary(n)));
    }
}

#[test]
fn subset_missing_one_quad_reports_its_edges() {
    let mesh = torus(5, 4);
    let ff = face_face_adjacencies(&mesh, None);
    let hole: FaceId = 7;
    let subset: HashSet<FaceId> = mesh.face_ids().filter(|&f| f != hole).collect();

    let edges = subset_border_face_edges(&mesh, &subset, Some(&ff));
    assert_eq!(edges.len(), 4);
    for (face, pos) in &edges {
        assert_eq!(ff[*face as usize][*pos], Some(hole));
    }
    assert_eq!(subset_border_faces(&mesh, &subset, Some(&ff)).len(), 4);

    let chains = subset_border_vertex_chains(&mesh, &subset, Some(&ff));
    assert_eq!(chains.len(), 1);
    let mut hole_cycle: Vec<VertexId> = mesh.face_vertices(hole).to_vec();
    hole_cycle.reverse();
    assert!(is_rotation(&chains[0].vertices, &hole_cycle));

    // The full mesh is still closed
    assert!(border_face_edges(&mesh, Some(&ff)).is_empty());
}

#[test]
fn hole_in_grid_adds_second_loop() {
    let mut mesh = grid(4);
    // Remove both triangles of the interior cell (1, 1)
    let cell = 4 + 1;
    mesh.delete_face(2 * cell);
    mesh.delete_face(2 * cell + 1);

    let chains = border_vertex_chains(&mesh, None);
    assert_eq!(chains.len(), 2);
    let lengths: Vec<usize> = chains.iter().map(|c| c.len()).collect();
    assert!(lengths.contains(&16));
    assert!(lengths.contains(&4));
}

#[test]
fn disjoint_cubes_are_two_components() {
    let mut mesh = cube();
    let base = mesh.next_vertex_id();
    let other = cube_at(3.0);
    for v in other.vertex_ids() {
        mesh.add_vertex(other.vertex_position(v));
    }
    for face in cube_faces(base) {
        mesh.add_face(&face).unwrap();
    }

    let cc = connected_components(&mesh, None);
    assert_eq!(cc.len(), 2);
    assert_eq!(cc.components[0], (0..12).collect::<Vec<_>>());
    assert_eq!(cc.components[1], (12..24).collect::<Vec<_>>());

    let subset: HashSet<FaceId> = (0..12).collect();
    assert_eq!(subset_connected_components(&mesh, &subset, None).len(), 1);
}

#[test]
fn flipped_face_is_cut_out_of_closed_mesh() {
    let mut faces = cube_faces(0);
    faces[0].reverse();
    let reference = cube();
    let mut positions = Vec::new();
    for v in reference.vertex_ids() {
        let p = reference.vertex_position(v);
        positions.extend([p.x, p.y, p.z]);
    }
    let mesh = PolyMesh::from_raw(&positions, &faces).unwrap();

    let report = non_manifold_edges(&mesh);
    assert_eq!(report.len(), 3);
    assert!(report.iter().all(|e| e.kind == NonManifoldKind::InconsistentOrientation));

    // The flipped face and the rim around it form two loops over the same vertices
    let chains = border_vertex_chains(&mesh, None);
    assert_eq!(chains.len(), 2);
    for chain in &chains {
        assert!(is_rotation(&chain.vertices, &[2, 1, 0]));
    }
    assert_eq!(connected_components(&mesh, None).len(), 2);
}

#[test]
fn transfer_round_trip_preserves_topology() {
    let mut source = torus(4, 3);
    source.delete_face(5);
    let mut target = PolyMesh::new();
    let t = transfer_mesh(&source, &mut target, TransferOptions::default()).unwrap();

    assert_eq!(target.face_count(), source.face_count());
    let ff_source = face_face_adjacencies(&source, None);
    let ff_target = face_face_adjacencies(&target, None);
    let source_of_face = |f: FaceId| t.birth_face[f as usize].unwrap();

    for f in target.face_ids() {
        let original = source_of_face(f);
        let mapped: Vec<Option<FaceId>> = ff_target[f as usize]
            .iter()
            .map(|slot| slot.map(source_of_face))
            .collect();
        assert_eq!(mapped, ff_source[original as usize]);
        for (&tv, &sv) in target.face_vertices(f).iter().zip(source.face_vertices(original)) {
            assert_eq!(t.birth_vertex[tv as usize], Some(sv));
            assert_eq!(target.vertex_position(tv), source.vertex_position(sv));
        }
    }
    assert_eq!(
        border_vertex_chains(&target, None).len(),
        border_vertex_chains(&source, None).len()
    );
}

#[test]
fn transferred_selection_keeps_its_border() {
    let source = grid(3);
    let selection: HashSet<FaceId> = (0..6).collect();
    let mut target = PolyMesh::new();
    transfer_faces(&source, &mut target, &selection).unwrap();

    assert_eq!(target.face_count(), 6);
    assert_eq!(
        border_face_edges(&target, None).len(),
        subset_border_face_edges(&source, &selection, None).len()
    );
}

// =============================================================================
// Strategies
// =============================================================================

/// A triangle soup over `n` vertices, with some faces deleted.
fn arb_soup() -> impl Strategy<Value = PolyMesh> {
    (3u32..20).prop_flat_map(|n| {
        let tri = prop::array::uniform3(0..n)
            .prop_filter("distinct corners", |[a, b, c]| a != b && b != c && a != c);
        (
            prop::collection::vec(tri, 0..40),
            prop::collection::vec(any::<bool>(), 40),
        )
            .prop_map(move |(faces, deleted)| {
                let mut mesh = PolyMesh::new();
                for i in 0..n {
                    mesh.add_vertex(Point3::new(f64::from(i), 0.0, 0.0));
                }
                for f in &faces {
                    mesh.add_face(f).unwrap();
                }
                for (f, &gone) in deleted.iter().enumerate().take(faces.len()) {
                    if gone && f % 3 == 0 {
                        mesh.delete_face(f as FaceId);
                    }
                }
                mesh
            })
    })
}

/// A grid with a random set of faces deleted: manifold, consistently oriented.
fn arb_holey_grid() -> impl Strategy<Value = PolyMesh> {
    (1u32..6).prop_flat_map(|n| {
        let count = (2 * n * n) as usize;
        prop::collection::vec(prop::bool::weighted(0.25), count).prop_map(move |deleted| {
            let mut mesh = grid(n);
            for (f, gone) in deleted.into_iter().enumerate() {
                if gone {
                    mesh.delete_face(f as FaceId);
                }
            }
            mesh
        })
    })
}

// =============================================================================
// Property Tests: Adjacency
// =============================================================================

proptest! {
    /// Vertex-vertex lists are sorted, unique, self-free and symmetric.
    #[test]
    fn vertex_vertex_is_symmetric(mesh in arb_soup()) {
        let vv = vertex_vertex_adjacencies(&mesh, AdjacencyOptions::default());
        for (v, list) in vv.iter().enumerate() {
            prop_assert!(list.windows(2).all(|w| w[0] < w[1]));
            for &u in list {
                prop_assert!(u as usize != v);
                prop_assert!(vv[u as usize].contains(&(v as VertexId)));
            }
        }
    }

    /// Every vertex-face incidence points back at the vertex.
    #[test]
    fn vertex_face_positions_agree(mesh in arb_soup()) {
        let vf = vertex_face_adjacencies(&mesh);
        for v in 0..mesh.next_vertex_id() {
            for (f, pos) in vf.incidences(v) {
                prop_assert!(!mesh.is_face_deleted(f));
                prop_assert_eq!(mesh.face_vertex_id(f, pos), v);
            }
        }
    }

    /// A linked slot always matches an oppositely oriented edge of a live face.
    #[test]
    fn face_face_links_are_opposite_edges(mesh in arb_soup()) {
        let ff = face_face_adjacencies(&mesh, None);
        prop_assert_eq!(ff.len(), mesh.next_face_id() as usize);
        for f in mesh.face_ids() {
            prop_assert_eq!(ff[f as usize].len(), mesh.face_vertices(f).len());
            for (pos, slot) in ff[f as usize].iter().enumerate() {
                let Some(g) = *slot else { continue };
                prop_assert!(g != f && !mesh.is_face_deleted(g));
                let a = mesh.face_vertex_id(f, pos);
                let b = mesh.face_next_vertex_id(f, pos);
                let cycle = mesh.face_vertices(g);
                let reversed = (0..cycle.len()).any(|j| cycle[j] == b && cycle[(j + 1) % cycle.len()] == a);
                prop_assert!(reversed);
            }
        }
    }

    /// On a manifold consistently oriented mesh the links are reciprocal.
    #[test]
    fn face_face_is_reciprocal_on_manifold(mesh in arb_holey_grid()) {
        let ff = face_face_adjacencies(&mesh, None);
        for f in mesh.face_ids() {
            for slot in ff[f as usize].iter().flatten() {
                prop_assert!(ff[*slot as usize].contains(&Some(f)));
            }
        }
    }
}

// =============================================================================
// Property Tests: Components and borders
// =============================================================================

proptest! {
    /// Components partition the live faces and never split a linked pair.
    #[test]
    fn components_partition_faces(mesh in arb_soup()) {
        let ff = face_face_adjacencies(&mesh, None);
        let cc = connected_components(&mesh, Some(&ff));

        let mut all: Vec<FaceId> = cc.components.iter().flatten().copied().collect();
        all.sort_unstable();
        prop_assert_eq!(all, mesh.face_ids().collect::<Vec<_>>());

        for f in mesh.face_ids() {
            for g in ff[f as usize].iter().flatten() {
                prop_assert_eq!(cc.component_of(f), cc.component_of(*g));
            }
        }
    }

    /// Chains use each border edge at most once and only border edges.
    #[test]
    fn chains_use_distinct_border_edges(mesh in arb_soup()) {
        let ff = face_face_adjacencies(&mesh, None);
        let border: Vec<(VertexId, VertexId)> = border_face_edges(&mesh, Some(&ff))
            .into_iter()
            .map(|(f, pos)| (mesh.face_vertex_id(f, pos), mesh.face_next_vertex_id(f, pos)))
            .collect();

        let mut remaining = border.clone();
        for chain in border_vertex_chains(&mesh, Some(&ff)) {
            prop_assert!(chain.len() >= 2);
            for edge in chain.edges() {
                let at = remaining.iter().position(|e| *e == edge);
                prop_assert!(at.is_some(), "edge {:?} used twice or not a border edge", edge);
                if let Some(at) = at {
                    remaining.swap_remove(at);
                }
            }
        }
    }

    /// On a manifold mesh every border edge lies on exactly one loop.
    #[test]
    fn chains_cover_manifold_border(mesh in arb_holey_grid()) {
        let edges = border_face_edges(&mesh, None).len();
        let chains = border_vertex_chains(&mesh, None);
        let covered: usize = chains.iter().map(|c| c.edge_count()).sum();
        prop_assert_eq!(covered, edges);

        let vertices = border_vertices(&mesh, None);
        for chain in &chains {
            for v in &chain.vertices {
                prop_assert!(vertices.binary_search(v).is_ok());
            }
        }
    }

    /// Border faces are exactly the faces owning a border edge.
    #[test]
    fn border_faces_match_edges(mesh in arb_soup()) {
        let mut from_edges: Vec<FaceId> = border_face_edges(&mesh, None).into_iter().map(|(f, _)| f).collect();
        from_edges.dedup();
        prop_assert_eq!(border_faces(&mesh, None), from_edges);
    }
}
