//! Laplacian smoothing over vertex-vertex adjacency.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use hashbrown::{HashMap, HashSet};
use mesh_topology::{AdjacencyOptions, border_vertices, vertex_vertex_adjacencies};
use mesh_types::{MeshViewMut, Point3, Vector3, VertexId};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{SmoothError, SmoothResult};
use crate::params::{SmoothParams, Weighting};
use crate::reproject::{SurfaceProjector, fan_triangles};
use crate::result::SmoothOutput;

/// Below this total weight a vertex falls back to uniform weights.
const MIN_WEIGHT_SUM: f64 = 1e-12;

/// Smooth every live vertex of a mesh in place.
///
/// Each iteration moves a vertex `p` to `(1 - alpha) p + alpha q`, where `q`
/// is the weighted average of its neighbours through face edges and
/// polyline segments. All new positions are computed from the previous
/// iteration's positions. Vertices without neighbours stay put, and border
/// vertices stay put when `fix_borders` is set.
///
/// # Errors
///
/// Returns an error if the parameters are invalid, the mesh has no
/// vertices, or the reprojection index cannot be built.
///
/// # Examples
///
/// ```
/// use mesh_types::{MeshView, PolyMesh};
/// use mesh_smooth::{SmoothParams, smooth};
///
/// // Fan of four triangles around a raised centre vertex
/// let mut mesh = PolyMesh::from_raw(
///     &[0.0, 0.0, 1.0, -1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
///     &[vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 4], vec![0, 4, 1]],
/// )?;
///
/// let output = smooth(&mut mesh, &SmoothParams::new().with_iterations(5))?;
///
/// assert_eq!(output.fixed_vertices, 4);
/// assert!(mesh.vertex_position(0).z < 0.1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn smooth<M: MeshViewMut + Sync>(
    mesh: &mut M,
    params: &SmoothParams,
) -> SmoothResult<SmoothOutput> {
    let movable: Vec<bool> = (0..mesh.next_vertex_id())
        .map(|v| !mesh.is_vertex_deleted(v))
        .collect();
    smooth_where(mesh, movable, params)
}

/// Smooth only the selected vertices; all others act as fixed anchors.
///
/// # Errors
///
/// Same as [`smooth`].
pub fn smooth_vertices<M: MeshViewMut + Sync>(
    mesh: &mut M,
    vertices: &HashSet<VertexId>,
    params: &SmoothParams,
) -> SmoothResult<SmoothOutput> {
    let movable: Vec<bool> = (0..mesh.next_vertex_id())
        .map(|v| vertices.contains(&v) && !mesh.is_vertex_deleted(v))
        .collect();
    smooth_where(mesh, movable, params)
}

/// Outcome of reprojecting one updated vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Off,
    Hit,
    Miss,
}

fn smooth_where<M: MeshViewMut + Sync>(
    mesh: &mut M,
    mut movable: Vec<bool>,
    params: &SmoothParams,
) -> SmoothResult<SmoothOutput> {
    params.validate()?;
    if mesh.vertex_count() == 0 {
        return Err(SmoothError::EmptyMesh);
    }

    let neighbors = vertex_vertex_adjacencies(&*mesh, AdjacencyOptions::default());
    if params.fix_borders {
        for v in border_vertices(&*mesh, None) {
            if let Some(m) = movable.get_mut(v as usize) {
                *m = false;
            }
        }
    }
    let fixed_vertices = mesh
        .vertex_ids()
        .filter(|&v| !movable[v as usize])
        .count();

    let corners = match params.weighting {
        Weighting::Cotangent => fan_triangles(&*mesh),
        Weighting::Uniform => Vec::new(),
    };
    let projector =
        SurfaceProjector::build(&*mesh, params.reprojection, params.octree_max_box_elements)?;

    debug!(
        "Smoothing {} vertices ({} fixed), alpha {:.3}, {} iterations",
        mesh.vertex_count(),
        fixed_vertices,
        params.alpha,
        params.iterations
    );

    let mut output = SmoothOutput {
        iterations: params.iterations,
        fixed_vertices,
        ..SmoothOutput::default()
    };
    let mut moved = vec![false; movable.len()];

    for iter in 0..params.iterations {
        let positions: Vec<Point3<f64>> = (0..mesh.next_vertex_id())
            .map(|v| mesh.vertex_position(v))
            .collect();
        let weights = match params.weighting {
            Weighting::Cotangent => cotangent_weights(&positions, &corners),
            Weighting::Uniform => HashMap::new(),
        };

        let step = |v: usize| -> Option<(Point3<f64>, Projection)> {
            if !movable[v] {
                return None;
            }
            let target = neighbor_average(v as VertexId, &neighbors[v], &positions, &weights)?;
            let p = positions[v];
            let smoothed = p + (target - p) * params.alpha;
            Some(match &projector {
                None => (smoothed, Projection::Off),
                Some(projector) => match projector.project(&smoothed) {
                    Some(q) => (q, Projection::Hit),
                    None => (smoothed, Projection::Miss),
                },
            })
        };
        let updates: Vec<Option<(Point3<f64>, Projection)>> = if params.parallel {
            (0..positions.len()).into_par_iter().map(step).collect()
        } else {
            (0..positions.len()).map(step).collect()
        };

        let mut iter_max = 0.0_f64;
        let mut iter_missed = 0usize;
        for (v, update) in updates.into_iter().enumerate() {
            let Some((q, projection)) = update else {
                continue;
            };
            match projection {
                Projection::Off => {}
                Projection::Hit => output.reprojected += 1,
                Projection::Miss => iter_missed += 1,
            }
            let displacement = (q - positions[v]).norm();
            if displacement > 0.0 {
                moved[v] = true;
            }
            iter_max = iter_max.max(displacement);
            mesh.set_vertex_position(v as VertexId, q);
        }

        if iter_missed > 0 {
            warn!(
                "Iteration {}: {} vertices outside the reprojection octree were not reprojected",
                iter + 1,
                iter_missed
            );
        }
        output.reprojection_skipped += iter_missed;
        output.max_displacement = output.max_displacement.max(iter_max);
        debug!("Iteration {}: max displacement {:.6}", iter + 1, iter_max);
    }

    output.moved_vertices = moved.iter().filter(|&&m| m).count();
    info!("{}", output);
    Ok(output)
}

/// Weighted neighbour average, or `None` for a vertex without neighbours.
fn neighbor_average(
    v: VertexId,
    neighbors: &[VertexId],
    positions: &[Point3<f64>],
    weights: &HashMap<(VertexId, VertexId), f64>,
) -> Option<Point3<f64>> {
    let live: Vec<Point3<f64>> = neighbors
        .iter()
        .filter_map(|&u| positions.get(u as usize).copied())
        .collect();
    if live.is_empty() {
        return None;
    }

    if !weights.is_empty() {
        let mut sum = Vector3::zeros();
        let mut total = 0.0;
        for &u in neighbors {
            let (Some(q), Some(&w)) = (positions.get(u as usize), weights.get(&edge_key(v, u)))
            else {
                continue;
            };
            let w = w.max(0.0);
            sum += q.coords * w;
            total += w;
        }
        if total > MIN_WEIGHT_SUM {
            return Some(Point3::from(sum / total));
        }
    }

    let sum: Vector3<f64> = live.iter().map(|q| q.coords).sum();
    Some(Point3::from(sum / live.len() as f64))
}

const fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a < b { (a, b) } else { (b, a) }
}

/// Cotangent edge weights: half the sum of cotangents of the corners
/// opposite each edge.
fn cotangent_weights(
    positions: &[Point3<f64>],
    triangles: &[[VertexId; 3]],
) -> HashMap<(VertexId, VertexId), f64> {
    let mut weights = HashMap::with_capacity(triangles.len() * 3 / 2);
    for &[a, b, c] in triangles {
        for (i, j, k) in [(a, b, c), (b, c, a), (c, a, b)] {
            let cot = cotangent(
                &positions[k as usize],
                &positions[i as usize],
                &positions[j as usize],
            );
            *weights.entry(edge_key(i, j)).or_insert(0.0) += 0.5 * cot;
        }
    }
    weights
}

/// Cotangent of the angle at `a` in triangle `(a, b, c)`; zero if degenerate.
fn cotangent(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let cross = ab.cross(&ac).norm();
    if cross < 1e-12 {
        return 0.0;
    }
    ab.dot(&ac) / cross
}
