//! Copying mesh elements into another mesh with birth maps.
//!
//! The target receives fresh IDs. [`MeshTransfer`] records, for each new
//! target element, the source element it came from.

use hashbrown::{HashMap, HashSet};
use mesh_types::{FaceId, MeshBuild, MeshError, MeshView, PolylineId, VertexId};
use tracing::{debug, info};

use crate::error::{Element, TopologyError, TopologyResult};

/// Which parts of the source mesh to transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Copy non-deleted faces.
    pub faces: bool,
    /// Copy non-deleted polylines.
    pub polylines: bool,
    /// Copy vertices no transferred face or polyline uses.
    pub isolated_vertices: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            faces: true,
            polylines: true,
            isolated_vertices: true,
        }
    }
}

impl TransferOptions {
    /// Transfer everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Faces and the vertices they use.
    #[must_use]
    pub const fn faces_only() -> Self {
        Self {
            faces: true,
            polylines: false,
            isolated_vertices: false,
        }
    }

    /// Set whether faces are copied.
    #[must_use]
    pub const fn with_faces(mut self, faces: bool) -> Self {
        self.faces = faces;
        self
    }

    /// Set whether polylines are copied.
    #[must_use]
    pub const fn with_polylines(mut self, polylines: bool) -> Self {
        self.polylines = polylines;
        self
    }

    /// Set whether unused vertices are copied.
    #[must_use]
    pub const fn with_isolated_vertices(mut self, isolated: bool) -> Self {
        self.isolated_vertices = isolated;
        self
    }
}

/// Correspondence between a target mesh and the source it was filled from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshTransfer {
    /// Source vertex of each target vertex ID.
    pub birth_vertex: Vec<Option<VertexId>>,
    /// Source face of each target face ID.
    pub birth_face: Vec<Option<FaceId>>,
    /// Source polyline of each target polyline ID.
    pub birth_polyline: Vec<Option<PolylineId>>,
    /// Target vertex of each transferred source vertex.
    pub vertex_map: HashMap<VertexId, VertexId>,
}

impl MeshTransfer {
    /// Target vertex created for `source` vertex, if it was transferred.
    #[must_use]
    pub fn target_vertex(&self, source: VertexId) -> Option<VertexId> {
        self.vertex_map.get(&source).copied()
    }

    /// Number of vertices created in the target.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.birth_vertex.iter().flatten().count()
    }

    /// Number of faces created in the target.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.birth_face.iter().flatten().count()
    }

    /// Number of polylines created in the target.
    #[must_use]
    pub fn polyline_count(&self) -> usize {
        self.birth_polyline.iter().flatten().count()
    }
}

/// Copy the selected parts of `source` into `target`.
///
/// Vertices are added in ascending source ID order, then faces, then
/// polylines. Existing target elements are left alone; their birth entries
/// are `None`.
///
/// # Errors
///
/// Returns [`TopologyError::DanglingVertex`] if a transferred face or
/// polyline references a deleted vertex, and [`TopologyError::Mesh`] if a
/// face has fewer than 3 vertices or a polyline fewer than 2. These checks
/// run before anything is added, so the target is untouched on them. An
/// error raised by the target itself while adding (such as
/// [`MeshError::IdOverflow`]) leaves the elements added so far in place.
///
/// # Example
///
/// ```
/// use mesh_types::{MeshView, PolyMesh};
/// use mesh_topology::{TransferOptions, transfer_mesh};
///
/// let source = PolyMesh::from_raw(
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
///     &[vec![0, 1, 2]],
/// )?;
/// let mut target = PolyMesh::new();
/// let transfer = transfer_mesh(&source, &mut target, TransferOptions::default())?;
///
/// assert_eq!(target.face_count(), 1);
/// assert_eq!(transfer.birth_face, vec![Some(0)]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn transfer_mesh<S, T>(
    source: &S,
    target: &mut T,
    options: TransferOptions,
) -> TopologyResult<MeshTransfer>
where
    S: MeshView,
    T: MeshBuild,
{
    let faces: Vec<FaceId> = if options.faces {
        source.face_ids().collect()
    } else {
        Vec::new()
    };
    let polylines: Vec<PolylineId> = if options.polylines {
        source.polyline_ids().collect()
    } else {
        Vec::new()
    };
    let transfer = transfer_elements(source, target, &faces, &polylines, options.isolated_vertices)?;
    info!(
        "Transferred {} vertices, {} faces, {} polylines",
        transfer.vertex_count(),
        transfer.face_count(),
        transfer.polyline_count()
    );
    Ok(transfer)
}

/// Copy a face selection and the vertices it uses into `target`.
///
/// Deleted faces in the selection are ignored.
///
/// # Errors
///
/// Same as [`transfer_mesh`], restricted to the selected faces.
pub fn transfer_faces<S, T>(
    source: &S,
    target: &mut T,
    faces: &HashSet<FaceId>,
) -> TopologyResult<MeshTransfer>
where
    S: MeshView,
    T: MeshBuild,
{
    let mut selected: Vec<FaceId> = faces
        .iter()
        .copied()
        .filter(|&f| !source.is_face_deleted(f))
        .collect();
    selected.sort_unstable();
    let transfer = transfer_elements(source, target, &selected, &[], false)?;
    info!(
        "Transferred {} of {} selected faces with {} vertices",
        transfer.face_count(),
        faces.len(),
        transfer.vertex_count()
    );
    Ok(transfer)
}

fn transfer_elements<S, T>(
    source: &S,
    target: &mut T,
    faces: &[FaceId],
    polylines: &[PolylineId],
    isolated_vertices: bool,
) -> TopologyResult<MeshTransfer>
where
    S: MeshView,
    T: MeshBuild,
{
    let mut used = vec![isolated_vertices; source.next_vertex_id() as usize];
    mark_used(source, faces.iter().map(|&f| (Element::Face(f), source.face_vertices(f))), &mut used)?;
    mark_used(
        source,
        polylines
            .iter()
            .map(|&p| (Element::Polyline(p), source.polyline_vertices(p))),
        &mut used,
    )?;

    let mut transfer = MeshTransfer {
        birth_vertex: vec![None; target.next_vertex_id() as usize],
        birth_face: vec![None; target.next_face_id() as usize],
        birth_polyline: vec![None; target.next_polyline_id() as usize],
        vertex_map: HashMap::new(),
    };

    for v in source.vertex_ids() {
        if !used[v as usize] {
            continue;
        }
        let new_id = target.add_vertex(source.vertex_position(v));
        record(&mut transfer.birth_vertex, new_id, v);
        transfer.vertex_map.insert(v, new_id);
    }

    let mut cycle = Vec::new();
    for &f in faces {
        map_vertices(source.face_vertices(f), &transfer.vertex_map, &mut cycle);
        let new_id = target.add_face(&cycle)?;
        record(&mut transfer.birth_face, new_id, f);
    }
    for &p in polylines {
        map_vertices(source.polyline_vertices(p), &transfer.vertex_map, &mut cycle);
        let new_id = target.add_polyline(&cycle)?;
        record(&mut transfer.birth_polyline, new_id, p);
    }

    debug!(
        "Target now has {} vertices and {} faces",
        target.vertex_count(),
        target.face_count()
    );
    Ok(transfer)
}

fn mark_used<'a, S: MeshView>(
    source: &S,
    elements: impl Iterator<Item = (Element, &'a [VertexId])>,
    used: &mut [bool],
) -> TopologyResult<()> {
    for (element, vertices) in elements {
        match element {
            Element::Face(_) if vertices.len() < 3 => {
                return Err(MeshError::FaceTooSmall(vertices.len()).into());
            }
            Element::Polyline(_) if vertices.len() < 2 => {
                return Err(MeshError::PolylineTooSmall(vertices.len()).into());
            }
            _ => {}
        }
        for &vertex in vertices {
            if source.is_vertex_deleted(vertex) {
                return Err(TopologyError::DanglingVertex { element, vertex });
            }
            used[vertex as usize] = true;
        }
    }
    Ok(())
}

fn map_vertices(source: &[VertexId], map: &HashMap<VertexId, VertexId>, out: &mut Vec<VertexId>) {
    out.clear();
    out.extend(source.iter().filter_map(|v| map.get(v).copied()));
}

fn record<T: Copy>(births: &mut Vec<Option<T>>, id: u32, source: T) {
    let index = id as usize;
    if births.len() <= index {
        births.resize(index + 1, None);
    }
    births[index] = Some(source);
}
