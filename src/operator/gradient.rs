//! Gradients of expectation values with respect to the conjugated bra
//! parameters.
//!
//! Every evaluation splits into a kernel-derivative part, accumulated per
//! bra row, and a sensitivity matrix h_kl = ∂⟨O⟩/∂o_lk. The natural-orbital
//! correction -Σ_c ∂n_pc (o h o)_cp is applied once in
//! [`PartialGradient::finish`]. Both parts are sums over bra rows, so row
//! subsets can be evaluated separately and added.

use nalgebra::DMatrix;
use num_complex::Complex64;
use std::ops::{Add, AddAssign};

use crate::gaussian::{GradGaussian, GradSlaterDet};
use crate::slater::{CenterOfMassComponent, GradSlaterDetAux, SlaterDet, SlaterDetAux};

use super::traits::{GradOneBodyOperator, GradTwoBodyOperator, OpValue};

/// Gradient evaluation before the natural-orbital correction.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialGradient {
    pub value: Complex64,
    pub sensitivity: DMatrix<Complex64>,
    pub kernel: Vec<GradGaussian>,
}

impl PartialGradient {
    pub fn zeros(n: usize) -> Self {
        Self {
            value: Complex64::new(0.0, 0.0),
            sensitivity: DMatrix::zeros(n, n),
            kernel: vec![GradGaussian::zero(); n],
        }
    }

    pub fn finish(self, aux: &SlaterDetAux, daux: &GradSlaterDetAux) -> GradSlaterDet {
        let n = aux.len();
        let o = aux.inverse();
        let z = o * &self.sensitivity * o;

        let mut gradient = self.kernel;
        for (p, g) in gradient.iter_mut().enumerate() {
            for c in 0..n {
                *g -= daux.pair(p, c).dq * z[(c, p)];
            }
        }
        GradSlaterDet {
            value: self.value,
            gradient,
        }
    }
}

impl AddAssign for PartialGradient {
    fn add_assign(&mut self, rhs: Self) {
        self.value += rhs.value;
        self.sensitivity += rhs.sensitivity;
        for (g, h) in self.kernel.iter_mut().zip(rhs.kernel) {
            *g += h;
        }
    }
}

impl Add for PartialGradient {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

/// Rows `k` with `k % size == rank`.
pub fn rows_for(n: usize, rank: usize, size: usize) -> Vec<usize> {
    (0..n).filter(|k| k % size.max(1) == rank).collect()
}

/// One-body contribution of the bra rows in `rows`.
pub fn grad_ob_partial<O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
    rows: &[usize],
) -> PartialGradient
where
    O: GradOneBodyOperator + ?Sized,
{
    let n = aux.len();
    let o = aux.inverse();
    let skip = op.isospin_diagonal();
    let mut acc = PartialGradient::zeros(n);

    for &k in rows {
        for l in 0..n {
            let x = aux.pair(k, l);
            if skip && x.t == 0.0 {
                continue;
            }
            let (f, df) =
                op.evaluate_gradient(&bra.gaussians[k], &ket.gaussians[l], x, daux.pair(k, l));
            acc.value += f * o[(l, k)];
            acc.sensitivity[(k, l)] += f;
            acc.kernel[k] += df * o[(l, k)];
        }
    }
    acc
}

/// Two-body contribution of the bra rows `rows` (first bra index).
pub fn grad_tb_partial<O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
    rows: &[usize],
) -> PartialGradient
where
    O: GradTwoBodyOperator + ?Sized,
{
    let dim = aux.len();
    let mut acc = PartialGradient::zeros(dim);
    if dim < 2 {
        return acc;
    }
    let o = aux.inverse();
    let skip = op.isospin_diagonal();
    let (b, q) = (&bra.gaussians, &ket.gaussians);
    let two = Complex64::new(2.0, 0.0);

    for &k in rows {
        for m in 0..dim {
            let x13 = aux.pair(k, m);
            if skip && x13.t == 0.0 {
                continue;
            }
            let dx13 = daux.pair(k, m);
            for l in 0..dim {
                for n in 0..dim {
                    let x24 = aux.pair(l, n);
                    if skip && x24.t == 0.0 {
                        continue;
                    }
                    let (v, dv) = op.evaluate_gradient(&b[k], &b[l], &q[m], &q[n], x13, x24, dx13);
                    let w = o[(m, k)] * o[(n, l)] - o[(m, l)] * o[(n, k)];
                    acc.value += v * w;
                    acc.sensitivity[(k, m)] += two * v * o[(n, l)];
                    acc.sensitivity[(k, n)] -= two * v * o[(m, l)];
                    acc.kernel[k] += dv * (two * w);
                }
            }
        }
    }
    acc
}

/// Gradient of a one-body expectation value.
pub fn grad_ob_me<O>(
    det: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
) -> GradSlaterDet
where
    O: GradOneBodyOperator + ?Sized,
{
    grad_ob_me_od(det, det, aux, daux, op)
}

/// Gradient of ⟨B|O|K⟩ / ⟨B|K⟩ with respect to the bra.
pub fn grad_ob_me_od<O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
) -> GradSlaterDet
where
    O: GradOneBodyOperator + ?Sized,
{
    let rows: Vec<usize> = (0..aux.len()).collect();
    grad_ob_partial(bra, ket, aux, daux, op, &rows).finish(aux, daux)
}

/// Gradient of a two-body expectation value.
pub fn grad_tb_me<O>(
    det: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
) -> GradSlaterDet
where
    O: GradTwoBodyOperator + ?Sized,
{
    grad_tb_me_od(det, det, aux, daux, op)
}

pub fn grad_tb_me_od<O>(
    bra: &SlaterDet,
    ket: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    op: &O,
) -> GradSlaterDet
where
    O: GradTwoBodyOperator + ?Sized,
{
    let rows: Vec<usize> = (0..aux.len()).collect();
    grad_tb_partial(bra, ket, aux, daux, op, &rows).finish(aux, daux)
}

/// ∂ ln⟨B|K⟩ / ∂ bra, i.e. Σ_c ∂n_pc o_cp.
pub fn grad_log_overlap(aux: &SlaterDetAux, daux: &GradSlaterDetAux) -> Vec<GradGaussian> {
    let n = aux.len();
    let o = aux.inverse();
    (0..n)
        .map(|p| {
            (0..n).fold(GradGaussian::zero(), |acc, c| {
                acc + daux.pair(p, c).dq * o[(c, p)]
            })
        })
        .collect()
}

/// Gradient of the full matrix element ⟨B|O|K⟩ from the gradient of the
/// ratio ⟨B|O|K⟩ / ⟨B|K⟩.
pub fn grad_matrix_element(
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    ratio: GradSlaterDet,
) -> GradSlaterDet {
    let det = aux.determinant();
    let dlog = grad_log_overlap(aux, daux);
    let gradient = ratio
        .gradient
        .into_iter()
        .zip(dlog)
        .map(|(g, d)| (g + d * ratio.value) * det)
        .collect();
    GradSlaterDet {
        value: ratio.value * det,
        gradient,
    }
}

/// Chain rule through the centre of mass.
///
/// Given dE/dc for c = (X, V), returns Σ_j dE/dc_j ∇c_j. The value of the
/// result is zero.
pub fn grad_center_of_mass(
    det: &SlaterDet,
    aux: &SlaterDetAux,
    daux: &GradSlaterDetAux,
    dedc: &OpValue<6>,
) -> GradSlaterDet {
    let total_mass = det.total_mass();
    let mut acc = GradSlaterDet::zeros(det.len());
    for (j, &d) in dedc.iter().enumerate() {
        if d == Complex64::new(0.0, 0.0) {
            continue;
        }
        let component = CenterOfMassComponent::new(j, total_mass);
        let mut g = grad_ob_me(det, aux, daux, &component);
        g.value = Complex64::new(0.0, 0.0);
        acc += g * d;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::{Gaussian, GaussianAux, GradGaussianAux};
    use crate::operator::engine::{matrix_element, ob_me_od};
    use crate::operator::traits::{OneBodyOperator, TwoBodyOperator};
    use crate::slater::test_dets::{assert_gradient, four_nucleons, proton_neutron};
    use approx::assert_relative_eq;

    /// Overlap-weighted x² one-body and (x₁·x₂) two-body kernels.
    struct Moment;

    impl OneBodyOperator<1> for Moment {
        fn evaluate(&self, _: &Gaussian, _: &Gaussian, x: &GaussianAux) -> OpValue<1> {
            OpValue::<1>::new((x.rho.dot(&x.rho) + x.alpha * 3.0) * x.q)
        }

        fn isospin_diagonal(&self) -> bool {
            true
        }
    }

    impl GradOneBodyOperator for Moment {
        fn evaluate_gradient(
            &self,
            _: &Gaussian,
            _: &Gaussian,
            x: &GaussianAux,
            dx: &GradGaussianAux,
        ) -> (Complex64, GradGaussian) {
            let f = x.rho.dot(&x.rho) + x.alpha * 3.0;
            let da = x.rho.dot(&dx.drho.a) * 2.0 + dx.dalpha * 3.0;
            let db = x.rho * (dx.drho.b * 2.0);
            let grad = GradGaussian::new(
                da * x.q + f * dx.dq.a,
                db * x.q + dx.dq.b * f,
                [f * dx.dq.chi[0], f * dx.dq.chi[1]],
            );
            (f * x.q, grad)
        }
    }

    impl TwoBodyOperator<1> for Moment {
        fn evaluate(
            &self,
            _: &Gaussian,
            _: &Gaussian,
            _: &Gaussian,
            _: &Gaussian,
            x13: &GaussianAux,
            x24: &GaussianAux,
        ) -> OpValue<1> {
            OpValue::<1>::new(x13.rho.dot(&x24.rho) * x13.q * x24.q)
        }

        fn isospin_diagonal(&self) -> bool {
            true
        }
    }

    impl GradTwoBodyOperator for Moment {
        fn evaluate_gradient(
            &self,
            _: &Gaussian,
            _: &Gaussian,
            _: &Gaussian,
            _: &Gaussian,
            x13: &GaussianAux,
            x24: &GaussianAux,
            dx13: &GradGaussianAux,
        ) -> (Complex64, GradGaussian) {
            let f = x13.rho.dot(&x24.rho);
            let da = dx13.drho.a.dot(&x24.rho);
            let db = x24.rho * dx13.drho.b;
            let grad = GradGaussian::new(
                da * x13.q + f * dx13.dq.a,
                db * x13.q + dx13.dq.b * f,
                [f * dx13.dq.chi[0], f * dx13.dq.chi[1]],
            ) * x24.q;
            (f * x13.q * x24.q, grad)
        }
    }

    #[test]
    fn test_kernel_gradients() {
        let det = four_nucleons();
        let (g1, g2, g3, g4) = (
            &det.gaussians[0],
            &det.gaussians[1],
            &det.gaussians[2],
            &det.gaussians[0],
        );
        let x = GaussianAux::new(g1, g3);
        let dx = GradGaussianAux::new(g1, g3, &x);
        let (_, grad) = GradOneBodyOperator::evaluate_gradient(&Moment, g1, g3, &x, &dx);
        let num = GradOneBodyOperator::numerical_gradient(&Moment, g1, g3, 1e-5);
        assert_relative_eq!((grad - num).max_norm(), 0.0, epsilon = 1e-6);

        let x24 = GaussianAux::new(g2, g4);
        let (_, grad) = GradTwoBodyOperator::evaluate_gradient(&Moment, g1, g2, g3, g4, &x, &x24, &dx);
        let num = GradTwoBodyOperator::numerical_gradient(&Moment, g1, g2, g3, g4, 1e-5);
        assert_relative_eq!((grad - num).max_norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_one_body_gradient() {
        for det in [four_nucleons(), proton_neutron()] {
            assert_gradient(&det, 1e-5, 1e-6, |d| {
                let aux = SlaterDetAux::new(d)?;
                let daux = GradSlaterDetAux::diagonal(d, &aux);
                Ok(grad_ob_me(d, &aux, &daux, &Moment))
            });
        }
    }

    #[test]
    fn test_two_body_gradient() {
        for det in [four_nucleons(), proton_neutron()] {
            assert_gradient(&det, 1e-5, 1e-6, |d| {
                let aux = SlaterDetAux::new(d)?;
                let daux = GradSlaterDetAux::diagonal(d, &aux);
                Ok(grad_tb_me(d, &aux, &daux, &Moment))
            });
        }
    }

    #[test]
    fn test_row_shards_add_up() {
        let det = four_nucleons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let daux = GradSlaterDetAux::diagonal(&det, &aux);
        let full = grad_tb_me(&det, &aux, &daux, &Moment);

        let mut total = PartialGradient::zeros(det.len());
        for rank in 0..3 {
            let rows = rows_for(det.len(), rank, 3);
            total += grad_tb_partial(&det, &det, &aux, &daux, &Moment, &rows);
        }
        let sharded = total.finish(&aux, &daux);
        assert_relative_eq!(sharded.value.re, full.value.re, max_relative = 1e-12);
        for (a, b) in sharded.gradient.iter().zip(&full.gradient) {
            assert_relative_eq!((*a - *b).max_norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_log_overlap_gradient() {
        let det = four_nucleons();
        let aux = SlaterDetAux::new(&det).unwrap();
        let daux = GradSlaterDetAux::diagonal(&det, &aux);
        let dlog = grad_log_overlap(&aux, &daux);
        // ∂ ln det / ∂ a*_0 by differencing the conjugated width
        let h = 1e-6;
        let shifted = |d: f64| {
            let mut bra = det.clone();
            bra.gaussians[0].a += d;
            SlaterDetAux::cross(&bra, &det).unwrap().determinant().ln()
        };
        let num = (shifted(h) - shifted(-h)) / (2.0 * h);
        assert_relative_eq!(dlog[0].a.re, num.re, epsilon = 1e-6);
        assert_relative_eq!(dlog[0].a.im, num.im, epsilon = 1e-6);
    }

    #[test]
    fn test_full_matrix_element_gradient() {
        let bra = four_nucleons();
        let mut ket = bra.clone();
        ket.gaussians[1].b[0] += Complex64::new(0.3, 0.1);

        let aux = SlaterDetAux::cross(&bra, &ket).unwrap();
        let daux = GradSlaterDetAux::new(&bra, &ket, &aux);
        let ratio = grad_ob_me_od(&bra, &ket, &aux, &daux, &Moment);
        let full = grad_matrix_element(&aux, &daux, ratio);

        let me = |d: f64| {
            let mut shifted = bra.clone();
            shifted.gaussians[0].a += d;
            let cross = SlaterDetAux::cross(&shifted, &ket).unwrap();
            matrix_element(&cross, ob_me_od::<1, _>(&shifted, &ket, &cross, &Moment))[0]
        };
        assert_relative_eq!(full.value.re, me(0.0).re, max_relative = 1e-12);
        let h = 1e-6;
        let num = (me(h) - me(-h)) / (2.0 * h);
        assert_relative_eq!(full.gradient[0].a.re, num.re, epsilon = 1e-6, max_relative = 1e-6);
        assert_relative_eq!(full.gradient[0].a.im, num.im, epsilon = 1e-6, max_relative = 1e-6);
    }
}
