//! Index buffers for every combination of coarser edge neighbors.
//!
//! A cell whose neighbor across an edge is one level coarser only shares every
//! other boundary vertex with it. The triangulation for that edge skips the odd
//! boundary vertices and fans from the even ones into the first interior row,
//! so the two meshes meet without T-junctions.
//!
//! Mask bits select the coarse edges: west=1, east=2, south=4, north=8. All
//! triangles wind counter-clockwise in grid `(x, y)` space, which faces outward
//! on every cube face because `forward × right = up`.

/// Number of tables built: masks `0..=15` plus a trailing copy of mask 0.
pub const TRIANGULATION_COUNT: usize = 17;

/// Errors when building triangulation tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriangulationError {
    #[error("grid resolution must be odd and at least 3, got {0}")]
    InvalidResolution(u32),
}

/// Triangles for a mask: `2·(R−1−w−e)·(R−1−s−n)` interior triangles plus,
/// per coarse edge, `R/2 + 2·(R/2 − 1) + 2` minus one per coarse perpendicular edge.
pub fn triangle_count(resolution: u32, mask: u8) -> usize {
    let r = resolution as usize;
    let bit = |b: u8| usize::from(mask & b != 0);
    let (w, e, s, n) = (bit(1), bit(2), bit(4), bit(8));

    let interior = 2 * (r - 1 - w - e) * (r - 1 - s - n);
    let edge = r / 2 + 2 * (r / 2 - 1) + 2;
    interior + (w + e) * (edge - s - n) + (s + n) * (edge - w - e)
}

/// Precomputed index buffers for one grid resolution.
#[derive(Debug, Clone)]
pub struct TriangulationTables {
    resolution: u32,
    tables: Vec<Vec<u32>>,
}

impl TriangulationTables {
    pub fn new(resolution: u32) -> Result<Self, TriangulationError> {
        if resolution < 3 || resolution % 2 == 0 {
            return Err(TriangulationError::InvalidResolution(resolution));
        }
        let tables = (0..TRIANGULATION_COUNT)
            .map(|mask| build(resolution, (mask & 0x0F) as u8))
            .collect();
        Ok(Self { resolution, tables })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Indices for `mask`. Masks above 16 only use their low four bits.
    pub fn get(&self, mask: u8) -> &[u32] {
        let index = if (mask as usize) < TRIANGULATION_COUNT {
            mask as usize
        } else {
            (mask & 0x0F) as usize
        };
        &self.tables[index]
    }

    pub fn tables(&self) -> &[Vec<u32>] {
        &self.tables
    }
}

struct TriangleWriter {
    resolution: u32,
    indices: Vec<u32>,
}

impl TriangleWriter {
    fn tri(&mut self, a: (u32, u32), b: (u32, u32), c: (u32, u32)) {
        let r = self.resolution;
        self.indices
            .extend([a.0 + r * a.1, b.0 + r * b.1, c.0 + r * c.1]);
    }
}

fn build(resolution: u32, mask: u8) -> Vec<u32> {
    let r = resolution;
    let bit = |b: u8| u32::from(mask & b != 0);
    let (w, e, s, n) = (bit(1), bit(2), bit(4), bit(8));

    let mut out = TriangleWriter {
        resolution,
        indices: Vec::with_capacity(triangle_count(resolution, mask) * 3),
    };

    for y in s..r - n - 1 {
        for x in w..r - e - 1 {
            out.tri((x, y), (x + 1, y + 1), (x, y + 1));
            out.tri((x, y), (x + 1, y), (x + 1, y + 1));
        }
    }

    // Strips along coarse edges. Even steps fan a coarse span into the first
    // interior vertex; odd steps fill the gap between two fans.
    if w == 1 {
        for y in 0..r - 2 {
            if y % 2 == 0 {
                out.tri((0, y), (1, y + 1), (0, y + 2));
            } else {
                out.tri((1, y), (1, y + 1), (0, y + 1));
                out.tri((0, y + 1), (1, y + 1), (1, y + 2));
            }
        }
        if s == 0 {
            out.tri((0, 0), (1, 0), (1, 1));
        }
        if n == 0 {
            out.tri((1, r - 2), (1, r - 1), (0, r - 1));
        }
    }

    if e == 1 {
        for y in 0..r - 2 {
            if y % 2 == 0 {
                out.tri((r - 1, y), (r - 1, y + 2), (r - 2, y + 1));
            } else {
                out.tri((r - 2, y), (r - 1, y + 1), (r - 2, y + 1));
                out.tri((r - 2, y + 1), (r - 1, y + 1), (r - 2, y + 2));
            }
        }
        if s == 0 {
            out.tri((r - 2, 0), (r - 1, 0), (r - 2, 1));
        }
        if n == 0 {
            out.tri((r - 2, r - 2), (r - 1, r - 1), (r - 2, r - 1));
        }
    }

    if s == 1 {
        for x in 0..r - 2 {
            if x % 2 == 0 {
                out.tri((x, 0), (x + 2, 0), (x + 1, 1));
            } else {
                out.tri((x, 1), (x + 1, 0), (x + 1, 1));
                out.tri((x + 1, 0), (x + 2, 1), (x + 1, 1));
            }
        }
        if w == 0 {
            out.tri((0, 0), (1, 1), (0, 1));
        }
        if e == 0 {
            out.tri((r - 1, 0), (r - 1, 1), (r - 2, 1));
        }
    }

    if n == 1 {
        for x in 0..r - 2 {
            if x % 2 == 0 {
                out.tri((x, r - 1), (x + 1, r - 2), (x + 2, r - 1));
            } else {
                out.tri((x, r - 2), (x + 1, r - 2), (x + 1, r - 1));
                out.tri((x + 1, r - 2), (x + 2, r - 2), (x + 1, r - 1));
            }
        }
        if w == 0 {
            out.tri((0, r - 2), (1, r - 2), (0, r - 1));
        }
        if e == 0 {
            out.tri((r - 2, r - 2), (r - 1, r - 2), (r - 1, r - 1));
        }
    }

    out.indices
}
