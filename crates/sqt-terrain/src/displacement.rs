//! Pluggable vertex displacement for cell meshes.

use sqt_mesh::GridBuffers;

use crate::{CancelToken, MaterialParams};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplacementError {
    /// The build was cancelled part way. Buffers are left partially modified.
    #[error("displacement cancelled")]
    Cancelled,

    #[error("buffer length mismatch: {positions} positions, {normals} normals")]
    MismatchedBuffers { positions: usize, normals: usize },

    /// The provider failed (or panicked) while displacing.
    #[error("displacement provider failed: {0}")]
    Provider(String),
}

/// Perturbs a cell's grid along its normals and adjusts the normals to match.
///
/// Implementations run on worker threads and must produce the same surface as
/// the shading path configured through [`modify_material`](Self::modify_material).
pub trait DisplacementProvider: Send + Sync {
    /// Displace `buffers` in place. Should poll `cancel` and bail out with
    /// [`DisplacementError::Cancelled`] once it is set.
    fn modify_vertices(
        &self,
        buffers: &mut GridBuffers,
        cancel: &CancelToken,
    ) -> Result<(), DisplacementError>;

    /// Publish the parameters the shading path needs to reproduce the displacement.
    fn modify_material(&self, material: &mut MaterialParams);

    /// Release provider-owned resources. Further material updates publish no textures.
    fn destroy(&self);

    fn name(&self) -> &'static str;
}

pub(crate) fn check_buffers(buffers: &GridBuffers) -> Result<(), DisplacementError> {
    if buffers.positions.len() != buffers.normals.len() {
        return Err(DisplacementError::MismatchedBuffers {
            positions: buffers.positions.len(),
            normals: buffers.normals.len(),
        });
    }
    Ok(())
}

/// Identity displacement: the mesh stays on the unit sphere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDisplacement;

impl DisplacementProvider for NoDisplacement {
    fn modify_vertices(
        &self,
        buffers: &mut GridBuffers,
        cancel: &CancelToken,
    ) -> Result<(), DisplacementError> {
        if cancel.is_cancelled() {
            return Err(DisplacementError::Cancelled);
        }
        check_buffers(buffers)
    }

    fn modify_material(&self, _material: &mut MaterialParams) {}

    fn destroy(&self) {}

    fn name(&self) -> &'static str {
        "none"
    }
}
