//! Construction of the nodal admittance matrix and per-bus flow caps.
//!
//! Lines follow the π-model: a series impedance `z = r + jx` plus shunt admittances at the
//! endpoints. The DC flow formulation only uses the imaginary part of the matrix (the
//! susceptance matrix `B`), but the full complex matrix is assembled so that shunt data is not
//! silently discarded.
use crate::system::System;
use num_complex::Complex64;

/// The assembled network quantities used by the transmission submodel.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    n_bus: usize,
    /// Dense admittance matrix in row-major order; element (i, j) at `i * n_bus + j`
    admittance: Vec<Complex64>,
    /// Summed rating of the lines incident to each bus, in MW
    max_flow: Vec<f64>,
}

impl Network {
    /// Assemble the admittance matrix and flow caps from the system's lines.
    ///
    /// For each line, the series admittance `y = 1/(r + jx)` is accumulated into the matrix:
    /// off-diagonal entries are decremented and diagonal entries incremented, so parallel lines
    /// sum additively. When `include_shunts` is set, the line's shunt admittance `g + jb` is
    /// added at **both** endpoints, without the conventional halving. Note this has no effect on
    /// DC flows, since diagonal terms cancel in the angle difference (see
    /// [`Network::susceptance`]).
    ///
    /// # Arguments
    ///
    /// * `system` - The static system data
    /// * `include_shunts` - Whether to add line shunt admittances to the diagonal
    pub fn from_system(system: &System, include_shunts: bool) -> Network {
        let n_bus = system.n_buses();
        let mut admittance = vec![Complex64::new(0.0, 0.0); n_bus * n_bus];
        let mut max_flow = vec![0.0; n_bus];

        for line in &system.lines {
            let (f, t) = (line.from_bus, line.to_bus);
            let y = Complex64::new(line.r, line.x).inv();

            admittance[f * n_bus + t] -= y;
            admittance[t * n_bus + f] -= y;
            admittance[f * n_bus + f] += y;
            admittance[t * n_bus + t] += y;

            if include_shunts {
                let shunt = Complex64::new(line.g, line.b);
                admittance[f * n_bus + f] += shunt;
                admittance[t * n_bus + t] += shunt;
            }

            max_flow[f] += line.rate;
            max_flow[t] += line.rate;
        }

        Network {
            n_bus,
            admittance,
            max_flow,
        }
    }

    /// The number of buses
    pub fn n_bus(&self) -> usize {
        self.n_bus
    }

    /// The complex admittance between buses `i` and `j`
    pub fn admittance(&self, i: usize, j: usize) -> Complex64 {
        self.admittance[i * self.n_bus + j]
    }

    /// The susceptance `B[i,j] = Im(Y[i,j])`, which governs DC flows
    pub fn susceptance(&self, i: usize, j: usize) -> f64 {
        self.admittance[i * self.n_bus + j].im
    }

    /// The aggregate flow cap at the given bus (summed rating of incident lines), in MW
    pub fn max_flow(&self, bus: usize) -> f64 {
        self.max_flow[bus]
    }
}
