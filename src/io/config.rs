//! YAML input files: interactions, Slater determinants and run files.
//!
//! Example Slater determinant (complex numbers are `[re, im]`):
//!
//! ```yaml
//! name: he4
//! gaussians:
//!   - xi: 1
//!     chi: [[1.0, 0.0], [0.0, 0.0]]
//!     a: [2.0, 0.0]
//!     b: [[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]]
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{FmdError, Result};
use crate::minimizer::MinimizerConfig;
use crate::observables::Interaction;
use crate::slater::SlaterDet;

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Deserialize a YAML file; `#` lines are comments.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| FmdError::input(display(path), e.to_string()))?;
    let reader = BufReader::new(file);
    serde_yaml::from_reader(reader).map_err(|e| FmdError::input(display(path), e.to_string()))
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_interaction(path: &Path) -> Result<Interaction> {
    let interaction: Interaction = read_yaml(path)?;
    if let Some(t) = interaction
        .terms
        .iter()
        .find(|t| !(t.kappa > 0.0) || !t.strength.is_finite())
    {
        return Err(FmdError::input(
            display(path),
            format!("invalid Gaussian term with strength {} and kappa {}", t.strength, t.kappa),
        ));
    }
    Ok(interaction)
}

pub fn read_slater_det(path: &Path) -> Result<SlaterDet> {
    let det: SlaterDet = read_yaml(path)?;
    validate_slater_det(&det).map_err(|message| FmdError::input(display(path), message))?;
    Ok(det)
}

/// Non-empty, finite and normalisable.
pub fn validate_slater_det(det: &SlaterDet) -> std::result::Result<(), String> {
    if det.is_empty() {
        return Err("Slater determinant has no wave packets".to_string());
    }
    for (i, g) in det.gaussians.iter().enumerate() {
        if !(g.a.re > 0.0) {
            return Err(format!("wave packet {i} has width {} with Re a <= 0", g.a));
        }
        let finite = g.a.is_finite()
            && g.b.iter().all(|z| z.is_finite())
            && g.chi.iter().all(|z| z.is_finite());
        if !finite {
            return Err(format!("wave packet {i} has non-finite parameters"));
        }
        if g.chi.iter().all(|z| z.norm_sqr() == 0.0) {
            return Err(format!("wave packet {i} has a vanishing spinor"));
        }
    }
    Ok(())
}

pub fn read_run_config(path: &Path) -> Result<MinimizerConfig> {
    read_yaml(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintSpec;
    use crate::gaussian::Selection;
    use crate::slater::test_dets::four_nucleons;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("rust_fmd-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_slater_det_round_trip() {
        let det = four_nucleons();
        let path = scratch("det.yml");
        write_yaml(&path, &det).unwrap();
        let back = read_slater_det(&path).unwrap();
        assert_eq!(back, det);
    }

    #[test]
    fn test_interaction_round_trip() {
        let interaction = Interaction::minnesota();
        let path = scratch("minnesota.yml");
        write_yaml(&path, &interaction).unwrap();
        assert_eq!(read_interaction(&path).unwrap(), interaction);
    }

    #[test]
    fn test_interaction_defaults() {
        let interaction: Interaction = serde_yaml::from_str(
            "
name: gauss
terms:
  - strength: -50.0
    kappa: 0.5
",
        )
        .unwrap();
        assert!(interaction.subtract_cm);
        assert_eq!(interaction.terms[0].central, 1.0);
        assert_eq!(interaction.terms[0].spin_spin, 0.0);
    }

    #[test]
    fn test_run_config_round_trip() {
        let config = MinimizerConfig {
            max_steps: 123,
            shake: Some(0.01),
            seed: Some(5),
            overwrite: true,
            constraints: vec![
                ConstraintSpec::CenterOfMass,
                ConstraintSpec::Radius {
                    selection: Selection::Neutrons,
                    value: 2.5,
                },
            ],
            ..MinimizerConfig::default()
        };
        let path = scratch("run.yml");
        write_yaml(&path, &config).unwrap();
        assert_eq!(read_run_config(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_inputs() {
        let mut det = four_nucleons();
        det.gaussians[2].a.re = -1.0;
        let path = scratch("bad.yml");
        write_yaml(&path, &det).unwrap();
        assert!(matches!(read_slater_det(&path), Err(FmdError::Input { .. })));

        let empty = SlaterDet::new("empty", vec![]);
        assert!(validate_slater_det(&empty).is_err());

        assert!(matches!(
            read_interaction(&scratch("missing.yml")),
            Err(FmdError::Input { .. })
        ));

        let path = scratch("garbage.yml");
        std::fs::write(&path, "name: [unclosed").unwrap();
        assert!(matches!(read_interaction(&path), Err(FmdError::Input { .. })));
    }
}
