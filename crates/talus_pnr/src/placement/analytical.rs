//! Analytical placer: bound-to-bound (B2B) quadratic wire-length model,
//! solved per-dimension by Conjugate Gradient with Jacobi preconditioning,
//! iterated with legalization and pseudo-anchors (§4.3).

use std::collections::HashMap;

use talus_arch::types::Grid;
use talus_arch::ArchitectureContext;
use talus_common::PnrError;
use talus_config::AnalyticalConfig;

use crate::circuit::Circuit;
use crate::cost;
use crate::ids::GlobalBlockId;
use crate::placement::legalizer;

/// Pseudo-anchor weight growth per outer iteration (§4.3). Not user-tunable:
/// the absolute scale only matters relative to `epsilon`/`convergence_gap`,
/// which are.
const PSEUDO_WEIGHT_STEP: f64 = 0.2;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Dim {
    X,
    Y,
}

/// A sparse symmetric positive-definite linear system `A x = b` over
/// movable blocks, built incrementally from B2B springs.
struct SparseSystem {
    diag: Vec<f64>,
    adj: Vec<Vec<(usize, f64)>>,
    rhs: Vec<f64>,
}

impl SparseSystem {
    fn new(n: usize) -> Self {
        Self { diag: vec![0.0; n], adj: vec![Vec::new(); n], rhs: vec![0.0; n] }
    }

    fn add_edge(&mut self, i: usize, j: usize, w: f64) {
        if i == j || w <= 0.0 {
            return;
        }
        self.diag[i] += w;
        self.diag[j] += w;
        self.adj[i].push((j, w));
        self.adj[j].push((i, w));
    }

    fn add_fixed(&mut self, i: usize, w: f64, pos: f64) {
        if w <= 0.0 {
            return;
        }
        self.diag[i] += w;
        self.rhs[i] += w * pos;
    }

    fn matvec(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; x.len()];
        for i in 0..x.len() {
            let mut v = self.diag[i] * x[i];
            for &(j, w) in &self.adj[i] {
                v -= w * x[j];
            }
            out[i] = v;
        }
        out
    }

    /// Conjugate Gradient with Jacobi (diagonal) preconditioning.
    fn solve_cg(&self, x0: &[f64], tol: f64, max_iter: usize) -> Vec<f64> {
        let n = x0.len();
        if n == 0 {
            return vec![];
        }
        let mut x = x0.to_vec();
        let mut r: Vec<f64> = self.rhs.iter().zip(self.matvec(&x)).map(|(b, ax)| b - ax).collect();
        let precond = |v: &[f64]| -> Vec<f64> {
            v.iter().enumerate().map(|(i, &vi)| if self.diag[i] > 0.0 { vi / self.diag[i] } else { vi }).collect()
        };
        let mut z = precond(&r);
        let mut p = z.clone();
        let mut rz = dot(&r, &z);

        for _ in 0..max_iter {
            let rnorm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
            if rnorm < tol {
                break;
            }
            let ap = self.matvec(&p);
            let pap = dot(&p, &ap);
            if pap.abs() < 1e-300 {
                break;
            }
            let alpha = rz / pap;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * ap[i];
            }
            z = precond(&r);
            let rz_new = dot(&r, &z);
            let beta = if rz.abs() > 1e-300 { rz_new / rz } else { 0.0 };
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
            rz = rz_new;
        }
        x
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn position(circuit: &Circuit, id: GlobalBlockId, dim: Dim) -> f64 {
    let b = circuit.block(id);
    match b.site {
        Some(s) => if dim == Dim::X { s.x as f64 } else { s.y as f64 },
        None => if dim == Dim::X { b.continuous.0 } else { b.continuous.1 },
    }
}

/// Builds the B2B system for one dimension over `movable` blocks (indexed by
/// `row_of`), with pseudo-anchors pulling toward each block's `anchor`
/// position at `anchor_weight`.
fn build_b2b_system(
    circuit: &Circuit,
    dim: Dim,
    row_of: &HashMap<GlobalBlockId, usize>,
    anchor_weight: f64,
) -> SparseSystem {
    let mut sys = SparseSystem::new(row_of.len());

    for net in &circuit.nets {
        if net.fanout() == 0 {
            continue;
        }
        let mut members: Vec<GlobalBlockId> = Vec::with_capacity(net.fanout() + 1);
        members.push(net.driver);
        members.extend(net.sinks.iter().copied());

        let positions: Vec<f64> = members.iter().map(|&m| position(circuit, m, dim)).collect();
        let (min_i, _) = positions.iter().enumerate().min_by(|a, b| a.1.total_cmp(b.1)).unwrap();
        let (max_i, _) = positions.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1)).unwrap();
        if (positions[max_i] - positions[min_i]).abs() < 1e-9 {
            continue;
        }

        let weight_factor = cost::q(net.fanout()) / (net.fanout() as f64 - 1.0).max(1.0);
        let min_block = members[min_i];
        let max_block = members[max_i];

        let mut connect = |a: GlobalBlockId, b: GlobalBlockId, sys: &mut SparseSystem| {
            let pa = position(circuit, a, dim);
            let pb = position(circuit, b, dim);
            let dist = (pa - pb).abs().max(1.0);
            let w = weight_factor / dist;
            match (row_of.get(&a), row_of.get(&b)) {
                (Some(&ra), Some(&rb)) => sys.add_edge(ra, rb, w),
                (Some(&ra), None) => sys.add_fixed(ra, w, pb),
                (None, Some(&rb)) => sys.add_fixed(rb, w, pa),
                (None, None) => {}
            }
        };

        connect(min_block, max_block, &mut sys);
        for (i, &m) in members.iter().enumerate() {
            if i == min_i || i == max_i {
                continue;
            }
            connect(m, min_block, &mut sys);
            connect(m, max_block, &mut sys);
        }
    }

    if anchor_weight > 0.0 {
        for (&block, &row) in row_of {
            let anchor_pos = position(circuit, block, dim);
            sys.add_fixed(row, anchor_weight, anchor_pos);
        }
    }

    sys
}

/// Runs the analytical placer: builds and solves the B2B system per
/// dimension, legalizes, adds pseudo-anchors, and repeats until the gap
/// between solved and legalized wire length is small or the iteration cap
/// is reached.
pub fn place_analytical(
    circuit: &mut Circuit,
    arch: &ArchitectureContext,
    grid: &Grid,
    config: &AnalyticalConfig,
) -> Result<(), PnrError> {
    let movable: Vec<GlobalBlockId> = circuit.movable_blocks().collect();
    if movable.is_empty() {
        return Ok(());
    }
    let row_of: HashMap<GlobalBlockId, usize> = movable.iter().enumerate().map(|(i, &b)| (b, i)).collect();

    let block_types: Vec<_> = circuit
        .blocks
        .iter()
        .filter(|b| !b.is_io)
        .map(|b| b.block_type)
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    let (io_type, _) = arch.io_block_type()?;

    let mut anchor_weight = 0.0;
    let mut prev_solved_wl = f64::INFINITY;

    for iteration in 0..config.max_outer_iterations {
        let x_sys = build_b2b_system(circuit, Dim::X, &row_of, anchor_weight);
        let y_sys = build_b2b_system(circuit, Dim::Y, &row_of, anchor_weight);

        let x0: Vec<f64> = movable.iter().map(|&b| position(circuit, b, Dim::X)).collect();
        let y0: Vec<f64> = movable.iter().map(|&b| position(circuit, b, Dim::Y)).collect();

        let xs = x_sys.solve_cg(&x0, config.epsilon, config.max_cg_iterations as usize);
        let ys = y_sys.solve_cg(&y0, config.epsilon, config.max_cg_iterations as usize);

        for (i, &block) in movable.iter().enumerate() {
            circuit.block_mut(block).continuous = (xs[i], ys[i]);
        }

        let solved_wl: f64 = (0..circuit.nets.len())
            .map(|i| circuit.net_bounding_box(crate::ids::NetId::from_raw(i as u32)).half_perimeter())
            .sum();

        for &ty in &block_types {
            legalizer::legalize_block_type(circuit, grid, ty)?;
        }
        legalizer::legalize_io(circuit, grid, io_type)?;

        let legal_wl = cost::total_cost(circuit);
        let gap = if legal_wl > 1e-9 { (legal_wl - solved_wl).abs() / legal_wl } else { 0.0 };

        if gap < config.convergence_gap || (solved_wl - prev_solved_wl).abs() < 1e-9 {
            break;
        }
        prev_solved_wl = solved_wl;
        anchor_weight += PSEUDO_WEIGHT_STEP * (iteration as f64 + 1.0);
    }

    Ok(())
}
