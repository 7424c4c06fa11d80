//! Total, orbital and spin angular momentum squared, and the spin-orbit sum.
//!
//! J² = Σ_i j_i² + Σ_{i≠j} j_i·j_j with orbital parts taken relative to the
//! centre of mass (X, V): l = (x - X) × (p - m V). For expectation values the
//! centre of mass is the state's own, and gradients get the extra chain-rule
//! term through (X, V). Off-diagonal values use a fixed frame, normally the
//! origin.

use num_complex::Complex64;

use crate::gaussian::{CVec3, Gaussian, GaussianAux, GradGaussian, GradGaussianAux, GradSlaterDet};
use crate::operator::{
    grad_center_of_mass, grad_ob_me, grad_ob_me_od, grad_tb_me, grad_tb_me_od, ob_me, ob_me_od,
    tb_me, tb_me_od, GradOneBodyOperator, GradTwoBodyOperator, OneBodyOperator, OpValue,
    TwoBodyOperator,
};
use crate::physics::mass;
use crate::slater::{CenterOfMass, GradSlaterDetAux, SlaterDet, SlaterDetAux};

const I: Complex64 = Complex64::new(0.0, 1.0);

fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

/// Gradient of (ρ × π)·w with respect to B, for fixed w.
fn grad_b_cross_dot(rc: &CVec3, pc: &CVec3, dx: &GradGaussianAux, w: &CVec3) -> CVec3 {
    pc.cross(w) * dx.drho.b + w.cross(rc) * dx.dpi.b
}

/// Gradient of (ρ × π) with respect to A.
fn grad_a_cross(rc: &CVec3, pc: &CVec3, dx: &GradGaussianAux) -> CVec3 {
    dx.drho.a.cross(pc) + rc.cross(&dx.dpi.a)
}

/// Position and momentum of a pair relative to `center`, with the mass of
/// the bra nucleon.
fn relative_to(center: &CenterOfMass, g: &Gaussian, x: &GaussianAux) -> (CVec3, CVec3, f64) {
    let m = mass(g.xi);
    (
        center.relative_position(&x.rho),
        center.relative_momentum(&x.pi, m),
        m,
    )
}

fn pack(x: CVec3, v: CVec3) -> OpValue<6> {
    OpValue::<6>::from_column_slice(&[x[0], x[1], x[2], v[0], v[1], v[2]])
}

/// Single-particle l² / R for a bra/ket pair, with the pieces needed for
/// its derivatives.
struct OrbitalPair {
    beta: Complex64,
    rc2: Complex64,
    pc2: Complex64,
    rp: Complex64,
    l2: Complex64,
}

impl OrbitalPair {
    fn new(g1: &Gaussian, g2: &Gaussian, x: &GaussianAux, rc: &CVec3, pc: &CVec3) -> Self {
        let beta = I * x.lambda * (g1.a.conj() - g2.a);
        let rc2 = rc.dot(rc);
        let pc2 = pc.dot(pc);
        let rp = rc.dot(pc);
        let l2 = x.lambda * rc2 * 2.0 + x.alpha * pc2 * 2.0 - beta * rp * 2.0 + rc2 * pc2 - rp * rp;
        Self {
            beta,
            rc2,
            pc2,
            rp,
            l2,
        }
    }
}

/// J², L² or S² depending on which parts are switched on.
#[derive(Debug, Clone, Copy)]
pub struct AngularMomentum {
    center: CenterOfMass,
    orbital: bool,
    spin: bool,
}

impl AngularMomentum {
    pub fn new(center: CenterOfMass, orbital: bool, spin: bool) -> Self {
        Self {
            center,
            orbital,
            spin,
        }
    }

    pub fn j2(center: CenterOfMass) -> Self {
        Self::new(center, true, true)
    }

    pub fn l2(center: CenterOfMass) -> Self {
        Self::new(center, true, false)
    }

    pub fn s2() -> Self {
        Self::new(CenterOfMass::origin(), false, true)
    }

    fn relative(&self, g: &Gaussian, x: &GaussianAux) -> (CVec3, CVec3, f64) {
        relative_to(&self.center, g, x)
    }

    /// Expectation value, relative to the frame this operator was built with.
    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        let one = ob_me::<1, _>(det, aux, self)[0];
        let two = tb_me::<1, _>(det, aux, self)[0];
        (one + two).re
    }

    /// ⟨B|O|K⟩ / ⟨B|K⟩ in the fixed frame of this operator.
    pub fn value_od(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        ob_me_od::<1, _>(bra, ket, aux, self)[0] + tb_me_od::<1, _>(bra, ket, aux, self)[0]
    }

    /// Gradient of the expectation value. The frame must be the centre of
    /// mass of `det`; its own dependence on the state is included.
    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let mut grad = grad_ob_me(det, aux, daux, self) + grad_tb_me(det, aux, daux, self);
        if self.orbital {
            let cm = CenterOfMassDerivative(self);
            let dedc = ob_me::<6, _>(det, aux, &cm) + tb_me::<6, _>(det, aux, &cm);
            grad += grad_center_of_mass(det, aux, daux, &dedc);
        }
        grad
    }

    /// Bra gradient of the off-diagonal ratio, frame held fixed.
    pub fn gradient_od(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        grad_ob_me_od(bra, ket, aux, daux, self) + grad_tb_me_od(bra, ket, aux, daux, self)
    }
}

impl OneBodyOperator<1> for AngularMomentum {
    fn evaluate(&self, g1: &Gaussian, g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let (rc, pc, _) = self.relative(g1, x);
        let mut v = zero();
        if self.orbital {
            v += OrbitalPair::new(g1, g2, x, &rc, &pc).l2 * x.q;
        }
        if self.spin {
            v += x.q * 0.75;
        }
        if self.orbital && self.spin {
            v += rc.cross(&pc).dot(&x.sig) * x.r * x.t;
        }
        OpValue::<1>::new(v)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for AngularMomentum {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let (rc, pc, _) = self.relative(g1, x);
        let mut v = zero();
        let mut grad = GradGaussian::zero();

        if self.orbital {
            let o = OrbitalPair::new(g1, g2, x, &rc, &pc);
            let dbeta = I * (dx.dlambda * (g1.a.conj() - g2.a) + x.lambda);

            let drc2 = rc.dot(&dx.drho.a) * 2.0;
            let dpc2 = pc.dot(&dx.dpi.a) * 2.0;
            let drp = dx.drho.a.dot(&pc) + rc.dot(&dx.dpi.a);
            let dl2a = (dx.dlambda * o.rc2 + x.lambda * drc2 + dx.dalpha * o.pc2 + x.alpha * dpc2
                - dbeta * o.rp
                - o.beta * drp)
                * 2.0
                + drc2 * o.pc2
                + o.rc2 * dpc2
                - o.rp * drp * 2.0;

            let drc2b = rc * (dx.drho.b * 2.0);
            let dpc2b = pc * (dx.dpi.b * 2.0);
            let drpb = pc * dx.drho.b + rc * dx.dpi.b;
            let dl2b = drc2b * (x.lambda * 2.0 + o.pc2) + dpc2b * (x.alpha * 2.0 + o.rc2)
                - drpb * ((o.beta + o.rp) * 2.0);

            v += o.l2 * x.q;
            grad += GradGaussian::new(
                dl2a * x.q + o.l2 * dx.dq.a,
                dl2b * x.q + dx.dq.b * o.l2,
                [o.l2 * dx.dq.chi[0], o.l2 * dx.dq.chi[1]],
            );
        }

        if self.spin {
            v += x.q * 0.75;
            grad += dx.dq * 0.75;
        }

        if self.orbital && self.spin {
            let l = rc.cross(&pc);
            let ls = l.dot(&x.sig);
            let dlsa = grad_a_cross(&rc, &pc, dx).dot(&x.sig);
            let dlsb = grad_b_cross_dot(&rc, &pc, dx, &x.sig);
            v += ls * x.r * x.t;
            grad += GradGaussian::new(
                dlsa * x.r + ls * dx.dr.a,
                dlsb * x.r + dx.dr.b * ls,
                [l.dot(&dx.dsig[0]) * x.r, l.dot(&dx.dsig[1]) * x.r],
            ) * x.t;
        }

        (v, grad)
    }
}

/// Pair quantities of the (13, 24) kernel.
struct TwoBodyPair {
    rc13: CVec3,
    pc13: CVec3,
    m1: f64,
    rc24: CVec3,
    pc24: CVec3,
    m2: f64,
    l13: CVec3,
    l24: CVec3,
    tt: f64,
    rr: Complex64,
}

impl AngularMomentum {
    fn two_body_pair(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> TwoBodyPair {
        let (rc13, pc13, m1) = self.relative(g1, x13);
        let (rc24, pc24, m2) = self.relative(g2, x24);
        TwoBodyPair {
            l13: rc13.cross(&pc13),
            l24: rc24.cross(&pc24),
            rc13,
            pc13,
            m1,
            rc24,
            pc24,
            m2,
            tt: x13.t * x24.t,
            rr: x13.r * x24.r,
        }
    }
}

impl TwoBodyOperator<1> for AngularMomentum {
    fn evaluate(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<1> {
        let p = self.two_body_pair(g1, g2, x13, x24);
        let mut v = zero();
        if self.orbital {
            v += p.l13.dot(&p.l24) * x13.q * x24.q;
        }
        if self.spin {
            v += x13.sig.dot(&x24.sig) * p.rr * (0.25 * p.tt);
        }
        if self.orbital && self.spin {
            let ls = p.l13.dot(&x24.sig) * x13.s + x13.sig.dot(&p.l24) * x24.s;
            v += ls * p.rr * (0.5 * p.tt);
        }
        OpValue::<1>::new(v)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradTwoBodyOperator for AngularMomentum {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
        dx13: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let p = self.two_body_pair(g1, g2, x13, x24);
        let mut v = zero();
        let mut grad = GradGaussian::zero();

        if self.orbital {
            let f = p.l13.dot(&p.l24);
            let dfa = grad_a_cross(&p.rc13, &p.pc13, dx13).dot(&p.l24);
            let dfb = grad_b_cross_dot(&p.rc13, &p.pc13, dx13, &p.l24);
            v += f * x13.q * x24.q;
            grad += GradGaussian::new(
                dfa * x13.q + f * dx13.dq.a,
                dfb * x13.q + dx13.dq.b * f,
                [f * dx13.dq.chi[0], f * dx13.dq.chi[1]],
            ) * x24.q;
        }

        if self.spin {
            let f = x13.sig.dot(&x24.sig) * 0.25;
            let dchi = [
                dx13.dsig[0].dot(&x24.sig) * 0.25,
                dx13.dsig[1].dot(&x24.sig) * 0.25,
            ];
            v += f * p.rr * p.tt;
            grad += GradGaussian::new(
                f * dx13.dr.a * x24.r,
                dx13.dr.b * (f * x24.r),
                [dchi[0] * p.rr, dchi[1] * p.rr],
            ) * p.tt;
        }

        if self.orbital && self.spin {
            let f = (p.l13.dot(&x24.sig) * x13.s + x13.sig.dot(&p.l24) * x24.s) * 0.5;
            let dfa = grad_a_cross(&p.rc13, &p.pc13, dx13).dot(&x24.sig) * x13.s * 0.5;
            let dfb = grad_b_cross_dot(&p.rc13, &p.pc13, dx13, &x24.sig) * (x13.s * 0.5);
            let dchi = [
                (p.l13.dot(&x24.sig) * dx13.ds[0] + dx13.dsig[0].dot(&p.l24) * x24.s) * 0.5,
                (p.l13.dot(&x24.sig) * dx13.ds[1] + dx13.dsig[1].dot(&p.l24) * x24.s) * 0.5,
            ];
            v += f * p.rr * p.tt;
            grad += GradGaussian::new(
                dfa * p.rr + f * dx13.dr.a * x24.r,
                dfb * p.rr + dx13.dr.b * (f * x24.r),
                [dchi[0] * p.rr, dchi[1] * p.rr],
            ) * p.tt;
        }

        (v, grad)
    }
}

/// Derivatives of the J²/L² kernels with respect to the centre of mass
/// (X, V) at fixed wave packets.
struct CenterOfMassDerivative<'a>(&'a AngularMomentum);

impl OneBodyOperator<6> for CenterOfMassDerivative<'_> {
    fn evaluate(&self, g1: &Gaussian, g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let op = self.0;
        let (rc, pc, m) = op.relative(g1, x);
        let mut dx = CVec3::zeros();
        let mut dv = CVec3::zeros();
        if op.orbital {
            let o = OrbitalPair::new(g1, g2, x, &rc, &pc);
            dx += (rc * (x.lambda * -4.0 - o.pc2 * 2.0) + pc * ((o.beta + o.rp) * 2.0)) * x.q;
            dv += (pc * (x.alpha * -4.0 - o.rc2 * 2.0) + rc * ((o.beta + o.rp) * 2.0)) * (x.q * m);
        }
        if op.orbital && op.spin {
            let tr = x.r * x.t;
            dx -= pc.cross(&x.sig) * tr;
            dv -= x.sig.cross(&rc) * (tr * m);
        }
        pack(dx, dv)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl TwoBodyOperator<6> for CenterOfMassDerivative<'_> {
    fn evaluate(
        &self,
        g1: &Gaussian,
        g2: &Gaussian,
        _g3: &Gaussian,
        _g4: &Gaussian,
        x13: &GaussianAux,
        x24: &GaussianAux,
    ) -> OpValue<6> {
        let op = self.0;
        let p = op.two_body_pair(g1, g2, x13, x24);
        let mut dx = CVec3::zeros();
        let mut dv = CVec3::zeros();
        if op.orbital {
            let qq = x13.q * x24.q;
            dx -= (p.pc13.cross(&p.l24) + p.pc24.cross(&p.l13)) * qq;
            dv -= (p.l24.cross(&p.rc13) * Complex64::from(p.m1) + p.l13.cross(&p.rc24) * Complex64::from(p.m2)) * qq;
        }
        if op.orbital && op.spin {
            let f = p.rr * (0.5 * p.tt);
            dx -= (p.pc13.cross(&x24.sig) * x13.s + p.pc24.cross(&x13.sig) * x24.s) * f;
            dv -= (x24.sig.cross(&p.rc13) * (x13.s * p.m1) + x13.sig.cross(&p.rc24) * (x24.s * p.m2))
                * f;
        }
        pack(dx, dv)
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

/// Σ_i l_i·s_i with l relative to the centre of mass; the one-body part of
/// (J² - L² - S²) / 2.
#[derive(Debug, Clone, Copy)]
pub struct SpinOrbit {
    center: CenterOfMass,
}

impl SpinOrbit {
    pub fn new(center: CenterOfMass) -> Self {
        Self { center }
    }

    pub fn value(&self, det: &SlaterDet, aux: &SlaterDetAux) -> f64 {
        ob_me::<1, _>(det, aux, self)[0].re
    }

    pub fn value_od(&self, bra: &SlaterDet, ket: &SlaterDet, aux: &SlaterDetAux) -> Complex64 {
        ob_me_od::<1, _>(bra, ket, aux, self)[0]
    }

    /// The frame must be the centre of mass of `det`.
    pub fn gradient(
        &self,
        det: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        let dedc = ob_me::<6, _>(det, aux, &SpinOrbitCenterDerivative(self));
        grad_ob_me(det, aux, daux, self) + grad_center_of_mass(det, aux, daux, &dedc)
    }

    pub fn gradient_od(
        &self,
        bra: &SlaterDet,
        ket: &SlaterDet,
        aux: &SlaterDetAux,
        daux: &GradSlaterDetAux,
    ) -> GradSlaterDet {
        grad_ob_me_od(bra, ket, aux, daux, self)
    }
}

impl OneBodyOperator<1> for SpinOrbit {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<1> {
        let (rc, pc, _) = relative_to(&self.center, g1, x);
        OpValue::<1>::new(rc.cross(&pc).dot(&x.sig) * x.r * (0.5 * x.t))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}

impl GradOneBodyOperator for SpinOrbit {
    fn evaluate_gradient(
        &self,
        g1: &Gaussian,
        _g2: &Gaussian,
        x: &GaussianAux,
        dx: &GradGaussianAux,
    ) -> (Complex64, GradGaussian) {
        let (rc, pc, _) = relative_to(&self.center, g1, x);
        let l = rc.cross(&pc);
        let ls = l.dot(&x.sig);
        let dlsa = grad_a_cross(&rc, &pc, dx).dot(&x.sig);
        let dlsb = grad_b_cross_dot(&rc, &pc, dx, &x.sig);
        let grad = GradGaussian::new(
            dlsa * x.r + ls * dx.dr.a,
            dlsb * x.r + dx.dr.b * ls,
            [l.dot(&dx.dsig[0]) * x.r, l.dot(&dx.dsig[1]) * x.r],
        ) * (0.5 * x.t);
        (ls * x.r * (0.5 * x.t), grad)
    }
}

struct SpinOrbitCenterDerivative<'a>(&'a SpinOrbit);

impl OneBodyOperator<6> for SpinOrbitCenterDerivative<'_> {
    fn evaluate(&self, g1: &Gaussian, _g2: &Gaussian, x: &GaussianAux) -> OpValue<6> {
        let (rc, pc, m) = relative_to(&self.0.center, g1, x);
        let tr = x.r * (0.5 * x.t);
        pack(pc.cross(&x.sig) * -tr, x.sig.cross(&rc) * (-tr * m))
    }

    fn isospin_diagonal(&self) -> bool {
        true
    }
}
