use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, Level};

use rust_fmd::constraint::parse_selected;
use rust_fmd::io::{
    backup, calc_report, matrix_element_report, min_file_path, minimization_report,
    read_interaction, read_run_config, read_slater_det, unix_time, write_text, ResultKind, MIN_DIR,
};
use rust_fmd::{ConstraintSpec, ExecutionContext, Minimizer, MinimizerConfig, Observables, Selection};

/// Gaussian wave-packet Slater determinants: observables and constrained
/// energy minimisation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Energies, radii, angular momenta and multipole moments
    Calc {
        /// Interaction file (YAML)
        interaction: PathBuf,
        /// Slater determinant file (YAML)
        slaterdet: PathBuf,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Minimise the energy under constraints
    Minimize(MinimizeArgs),
    /// Overlap and matrix elements between two Slater determinants
    Me {
        /// Interaction file (YAML)
        interaction: PathBuf,
        /// Bra Slater determinant (YAML)
        bra: PathBuf,
        /// Ket Slater determinant (YAML)
        ket: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct MinimizeArgs {
    /// Interaction file (YAML)
    interaction: PathBuf,
    /// Slater determinant file (YAML), overwritten with the result
    slaterdet: PathBuf,

    /// Overwrite in all cases, even without improvement
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Log every EVERY steps
    #[arg(short = 'l', long = "log", value_name = "EVERY")]
    log_every: Option<usize>,

    /// Maximum number of steps
    #[arg(short = 'm', long, value_name = "MAXSTEPS")]
    max_steps: Option<usize>,

    /// Shake parameters before minimisation
    #[arg(short = 's', long, value_name = "MAGNITUDE")]
    shake: Option<f64>,

    /// Seed for shaking
    #[arg(long)]
    seed: Option<u64>,

    /// Constrain the centre of mass to rest in the origin
    #[arg(short = 'C', long = "cm")]
    center_of_mass: bool,

    /// Constrain J2
    #[arg(short = 'J', long, value_name = "J2")]
    j2: Option<f64>,

    /// Constrain L2
    #[arg(long, value_name = "L2")]
    l2: Option<f64>,

    /// Constrain S2
    #[arg(short = 'S', long, value_name = "S2")]
    s2: Option<f64>,

    /// Constrain the spin-orbit sum Σ l·s
    #[arg(short = 'L', long, value_name = "LS")]
    ls: Option<f64>,

    /// Constrain T2
    #[arg(short = 'T', long, value_name = "T2")]
    t2: Option<f64>,

    /// Constrain the radius (fm), E: proton, N: neutron
    #[arg(short = 'R', long, value_name = "[E:|N:]RADIUS", value_parser = parse_selected)]
    radius: Option<(Selection, f64)>,

    /// Constrain the electric dipole moment (fm)
    #[arg(short = 'D', long, value_name = "DIPOLE")]
    dipole: Option<f64>,

    /// Constrain the quadrupole moment (fm²), E: proton, N: neutron
    #[arg(short = 'Q', long, value_name = "[E:|N:]QUADRUPOLE", value_parser = parse_selected)]
    quadrupole: Option<(Selection, f64)>,

    /// Constrain the octupole moment (fm³), E: proton, N: neutron
    #[arg(short = 'O', long, value_name = "[E:|N:]OCTUPOLE", value_parser = parse_selected)]
    octupole: Option<(Selection, f64)>,

    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Do not move the centre of mass to the origin or orient the result
    #[arg(long)]
    no_recenter: bool,

    /// Run file (YAML); command-line options override it
    #[arg(long, value_name = "run.yml")]
    config: Option<PathBuf>,
}

impl MinimizeArgs {
    fn config(&self) -> Result<MinimizerConfig> {
        let mut config = match &self.config {
            Some(path) => read_run_config(path)
                .with_context(|| format!("reading run file {}", path.display()))?,
            None => MinimizerConfig::default(),
        };

        config.overwrite |= self.overwrite;
        if let Some(every) = self.log_every {
            config.log_every = every;
        }
        if let Some(steps) = self.max_steps {
            config.max_steps = steps;
        }
        if self.shake.is_some() {
            config.shake = self.shake;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_recenter {
            config.recenter = false;
        }

        let constraints = &mut config.constraints;
        if self.center_of_mass {
            constraints.push(ConstraintSpec::CenterOfMass);
        }
        if let Some(value) = self.j2 {
            constraints.push(ConstraintSpec::J2 { value });
        }
        if let Some(value) = self.l2 {
            constraints.push(ConstraintSpec::L2 { value });
        }
        if let Some(value) = self.s2 {
            constraints.push(ConstraintSpec::S2 { value });
        }
        if let Some(value) = self.ls {
            constraints.push(ConstraintSpec::Ls { value });
        }
        if let Some(value) = self.t2 {
            constraints.push(ConstraintSpec::T2 { value });
        }
        if let Some((selection, value)) = self.radius {
            constraints.push(ConstraintSpec::Radius { selection, value });
        }
        if let Some(value) = self.dipole {
            constraints.push(ConstraintSpec::Dipole {
                selection: Selection::Protons,
                value,
            });
        }
        if let Some((selection, value)) = self.quadrupole {
            constraints.push(ConstraintSpec::Quadrupole { selection, value });
        }
        if let Some((selection, value)) = self.octupole {
            constraints.push(ConstraintSpec::Octupole { selection, value });
        }
        Ok(config)
    }
}

fn calc(interaction: &Path, slaterdet: &Path, output: Option<&Path>) -> Result<()> {
    let interaction = read_interaction(interaction)
        .with_context(|| format!("reading interaction {}", interaction.display()))?;
    let det = read_slater_det(slaterdet)
        .with_context(|| format!("reading Slater determinant {}", slaterdet.display()))?;

    let obs = Observables::calculate(&interaction, &det)?;
    let text = calc_report(&interaction, &det, &obs)?;
    match output {
        Some(path) => write_text(path, &text)?,
        None => print!("{text}"),
    }
    Ok(())
}

fn matrix_elements(interaction: &Path, bra: &Path, ket: &Path) -> Result<()> {
    let interaction = read_interaction(interaction)
        .with_context(|| format!("reading interaction {}", interaction.display()))?;
    let bra_det = read_slater_det(bra)
        .with_context(|| format!("reading Slater determinant {}", bra.display()))?;
    let ket_det = read_slater_det(ket)
        .with_context(|| format!("reading Slater determinant {}", ket.display()))?;
    print!("{}", matrix_element_report(&interaction, &bra_det, &ket_det)?);
    Ok(())
}

fn minimize(args: &MinimizeArgs) -> Result<()> {
    let interaction = read_interaction(&args.interaction)
        .with_context(|| format!("reading interaction {}", args.interaction.display()))?;
    let initial = read_slater_det(&args.slaterdet)
        .with_context(|| format!("reading Slater determinant {}", args.slaterdet.display()))?;
    let config = args.config()?;

    let context = ExecutionContext::with_workers(config.workers)?;
    let outcome = Minimizer::new(config.clone()).run(&interaction, &initial, &context)?;
    context.finish()?;

    info!(
        "initial: E = {:8.3} MeV, final: E = {:8.3} MeV",
        outcome.e_initial, outcome.e_final
    );

    let obs = Observables::calculate(&interaction, &outcome.minimized)?;
    let text = minimization_report(&interaction, &config, &outcome, ResultKind::Minimized, &obs)?;
    let min_path = min_file_path(Path::new(MIN_DIR), &args.slaterdet, unix_time())?;
    write_text(&min_path, &text)
        .with_context(|| format!("writing {}", min_path.display()))?;

    backup(&args.slaterdet)?;
    let obs = Observables::calculate(&interaction, &outcome.det)?;
    let text = minimization_report(&interaction, &config, &outcome, ResultKind::Selected, &obs)?;
    write_text(&args.slaterdet, &text)
        .with_context(|| format!("writing {}", args.slaterdet.display()))?;
    Ok(())
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { -1 } else { 0 });
        }
    };

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match &args.command {
        Command::Calc {
            interaction,
            slaterdet,
            output,
        } => calc(interaction, slaterdet, output.as_deref()),
        Command::Minimize(minimize_args) => minimize(minimize_args),
        Command::Me {
            interaction,
            bra,
            ket,
        } => matrix_elements(interaction, bra, ket),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(-1);
    }
}
