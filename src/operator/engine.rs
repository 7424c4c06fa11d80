//! Matrix elements of one- and two-body operators between Slater
//! determinants.
//!
//! With o = n⁻¹ the inverse overlap matrix,
//!
//!   ⟨O₁⟩ = Σ_kl f_kl o_lk
//!   ⟨O₂⟩ = Σ_klmn v_klmn (o_mk o_nl - o_ml o_nk)
//!
//! where f and v are the operator kernels. The two-body sum runs over
//! ordered pairs of particles, i.e. it evaluates Σ_{i≠j} v(i, j). The
//! off-diagonal functions return the ratio ⟨B|O|K⟩ / ⟨B|K⟩.

use num_complex::Complex64;

use crate::slater::{SlaterDet, SlaterDetAux};

use super::traits::{OneBodyOperator, OpValue, TwoBodyOperator};

/// Expectation value of a one-body operator.
pub fn ob_me<const D: usize, O>(det: &SlaterDet, aux: &SlaterDetAux, op: &O) -> OpValue<D>
where
    O: OneBodyOperator<D> + ?Sized,
{
    ob_me_od(det, det, aux, op)
}

/// ⟨B|O|K⟩ / ⟨B|K⟩ of a one-body operator, `aux` built from (bra, ket).
pub fn ob_me_od<const D: usize, O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    op: &O,
) -> OpValue<D>
where
    O: OneBodyOperator<D> + ?Sized,
{
    let n = aux.len();
    let o = aux.inverse();
    let skip = op.isospin_diagonal();

    let mut me = OpValue::<D>::zeros();
    for k in 0..n {
        for l in 0..n {
            let x = aux.pair(k, l);
            if skip && x.t == 0.0 {
                continue;
            }
            me += op.evaluate(&bra.gaussians[k], &ket.gaussians[l], x) * o[(l, k)];
        }
    }
    me
}

/// Expectation value of a two-body operator.
pub fn tb_me<const D: usize, O>(det: &SlaterDet, aux: &SlaterDetAux, op: &O) -> OpValue<D>
where
    O: TwoBodyOperator<D> + ?Sized,
{
    tb_me_od(det, det, aux, op)
}

/// ⟨B|O|K⟩ / ⟨B|K⟩ of a two-body operator, `aux` built from (bra, ket).
pub fn tb_me_od<const D: usize, O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    op: &O,
) -> OpValue<D>
where
    O: TwoBodyOperator<D> + ?Sized,
{
    let dim = aux.len();
    let mut me = OpValue::<D>::zeros();
    if dim < 2 {
        return me;
    }
    let o = aux.inverse();
    let skip = op.isospin_diagonal();
    let (b, q) = (&bra.gaussians, &ket.gaussians);

    for k in 0..dim {
        for m in 0..dim {
            let x13 = aux.pair(k, m);
            if skip && x13.t == 0.0 {
                continue;
            }
            for l in 0..dim {
                for n in 0..dim {
                    let x24 = aux.pair(l, n);
                    if skip && x24.t == 0.0 {
                        continue;
                    }
                    let w = o[(m, k)] * o[(n, l)] - o[(m, l)] * o[(n, k)];
                    me += op.evaluate(&b[k], &b[l], &q[m], &q[n], x13, x24) * w;
                }
            }
        }
    }
    me
}

/// Full off-diagonal matrix element ⟨B|O|K⟩ from the ratio.
pub fn matrix_element<const D: usize>(aux: &SlaterDetAux, ratio: OpValue<D>) -> OpValue<D> {
    ratio * aux.determinant()
}

/// ⟨B|K⟩
pub fn overlap(aux: &SlaterDetAux) -> Complex64 {
    aux.determinant()
}
