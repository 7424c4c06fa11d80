//! Result files: a `#` comment header followed by the YAML Slater
//! determinant, so every result can be read back as input.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::constraint::ConstraintSpec;
use crate::error::{FmdError, Result};
use crate::minimizer::{MinimizationOutcome, MinimizerConfig};
use crate::observables::{Hamiltonian, Interaction, Observables};
use crate::operator::overlap;
use crate::physics::to_mev;
use crate::slater::{SlaterDet, SlaterDetAux};

/// Directory for the time-stamped minimisation results.
pub const MIN_DIR: &str = "MIN";

fn header_info(program: &str) -> String {
    format!(
        "# {} {} ({program})\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

fn push_det(text: &mut String, det: &SlaterDet) -> Result<()> {
    text.push('\n');
    text.push_str(&serde_yaml::to_string(det)?);
    Ok(())
}

/// Output of `calc`.
pub fn calc_report(interaction: &Interaction, det: &SlaterDet, obs: &Observables) -> Result<String> {
    let mut text = header_info("calc");
    writeln!(text, "# {} with {} interaction", det.name, interaction.name)?;
    write!(text, "{obs}")?;
    push_det(&mut text, det)?;
    Ok(text)
}

/// Operators reported by `me`, in the frame of the origin.
const OFF_DIAGONAL: [ConstraintSpec; 5] = [
    ConstraintSpec::J2 { value: 0.0 },
    ConstraintSpec::L2 { value: 0.0 },
    ConstraintSpec::S2 { value: 0.0 },
    ConstraintSpec::Ls { value: 0.0 },
    ConstraintSpec::T2 { value: 0.0 },
];

/// Output of `me`: overlap and ratios ⟨B|O|K⟩ / ⟨B|K⟩ of two determinants.
pub fn matrix_element_report(
    interaction: &Interaction,
    bra: &SlaterDet,
    ket: &SlaterDet,
) -> Result<String> {
    if bra.isospins() != ket.isospins() {
        return Err(FmdError::input(
            bra.name.clone(),
            format!("isospins differ from {}", ket.name),
        ));
    }
    let aux = SlaterDetAux::cross(bra, ket)?;
    let ovl = overlap(&aux);
    let energy = Hamiltonian::new(interaction, ket).energy_od(bra, ket, &aux);

    let mut text = header_info("me");
    writeln!(
        text,
        "# <{}| and |{}> with {} interaction",
        bra.name, ket.name, interaction.name
    )?;
    writeln!(text, "# <B|K>   = ({:14.6e}, {:14.6e})", ovl.re, ovl.im)?;
    writeln!(
        text,
        "# H       = ({:14.6}, {:14.6}) MeV",
        to_mev(energy.re),
        to_mev(energy.im)
    )?;
    for spec in &OFF_DIAGONAL {
        let op = spec.build_off_diagonal()?;
        let v = op.value(bra, ket, &aux);
        writeln!(text, "# {:7} = ({:14.6}, {:14.6})", op.label(), v.re, v.im)?;
    }
    Ok(text)
}

/// Which of the two states of a minimisation a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// The minimised state, always.
    Minimized,
    /// The state chosen by the no-improvement policy.
    Selected,
}

/// Output of `minimize`; `obs` belongs to the state selected by `kind`.
pub fn minimization_report(
    interaction: &Interaction,
    config: &MinimizerConfig,
    outcome: &MinimizationOutcome,
    kind: ResultKind,
    obs: &Observables,
) -> Result<String> {
    let det = match kind {
        ResultKind::Minimized => &outcome.minimized,
        ResultKind::Selected => &outcome.det,
    };
    let hamiltonian = if interaction.subtract_cm { "<Hintr>" } else { "<H>" };

    let mut text = header_info("minimize");
    writeln!(
        text,
        "# minimized {hamiltonian} for {} using {} interaction",
        det.name, interaction.name
    )?;
    writeln!(text, "# einitial: {:10.4} MeV", outcome.e_initial)?;
    writeln!(text, "# efinal:   {:10.4} MeV", outcome.e_final)?;
    writeln!(
        text,
        "# converged: {}, steps: {}, evaluations: {}",
        outcome.converged, outcome.iterations, outcome.evaluations
    )?;
    if kind == ResultKind::Selected {
        if config.overwrite {
            writeln!(text, "# overwrite flag: use new parameters")?;
        }
        if outcome.kept_initial {
            writeln!(text, "# no improvement by minimization: use initial parameters")?;
        }
    }
    for c in &outcome.constraints {
        writeln!(
            text,
            "# constraint {:4} target {:12.6} achieved {:12.6}",
            c.label, c.target, c.achieved
        )?;
    }
    write!(text, "{obs}")?;
    push_det(&mut text, det)?;
    Ok(text)
}

/// Copy an existing file to `<file>.bak`.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    let target = PathBuf::from(name);
    fs::copy(path, &target)?;
    info!("backup of {} in {}", path.display(), target.display());
    Ok(Some(target))
}

/// `<dir>/<file name>-min.<unix time>`
pub fn min_file_path(dir: &Path, source: &Path, unix_time: u64) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| FmdError::input(source.display().to_string(), "not a file name"))?
        .to_string_lossy();
    Ok(dir.join(format!("{name}-min.{unix_time}")))
}

pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, text)?;
    info!("... writing {}", path.display());
    Ok(())
}
