//! Simulation runner: ties together materials, slabs, and the stack.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use ndarray::Array1;
use num_complex::Complex64;
use serde::Serialize;

use lamella_core::context::{Context, Polarisation, Wall};
use lamella_core::expression::Expression;
use lamella_core::slab::Slab;
use lamella_core::stack::{Stack, StackExpression, StackTerm};
use lamella_materials::constant::Material;
use lamella_materials::provider::MaterialProvider;
use lamella_materials::sellmeier::Sellmeier;

use crate::config::{IncidenceConfig, JobConfig, MaterialConfig};

/// Results from a simulation run.
pub struct SimulationOutput {
    /// Effective indices of the incidence-side basis.
    pub inc_n_eff: Vec<Complex64>,
    /// Incident modal amplitudes.
    pub inc: Array1<Complex64>,
    /// Reflected modal amplitudes (incidence basis).
    pub refl: Array1<Complex64>,
    /// Transmitted modal amplitudes (exit basis).
    pub trans: Array1<Complex64>,
    /// Optional transverse scan of the exit field.
    pub field_scan: Option<Vec<FieldSample>>,
}

/// One sample of a transverse field scan.
#[derive(Debug, Serialize)]
pub struct FieldSample {
    pub x: f64,
    pub abs_e: f64,
    pub abs_h: f64,
    pub sz: f64,
}

/// Run a full simulation from a parsed job configuration.
pub fn run_simulation(job: &JobConfig) -> Result<SimulationOutput> {
    let ctx = build_context(job)?;

    // Materials by name; dispersive models are sampled at the
    // simulation wavelength.
    let mut materials = BTreeMap::new();
    for (name, cfg) in &job.materials {
        let mat = match cfg {
            MaterialConfig::Constant { n, mur } => {
                let n = Complex64::from(*n);
                match mur {
                    Some(mur) => Material::magnetic(n, Complex64::from(*mur)),
                    None => Material::new(n),
                }
            }
            MaterialConfig::Model { model } => match model.as_str() {
                "fused_silica" => Sellmeier::fused_silica()
                    .at(ctx.lambda)
                    .with_context(|| format!("sampling material '{name}'"))?,
                other => anyhow::bail!("unknown material model '{other}'"),
            },
        };
        materials.insert(name.clone(), mat);
    }

    // Slabs by name, with their mode bases solved up front.
    let mut slabs: BTreeMap<String, Arc<Slab>> = BTreeMap::new();
    for slab_cfg in &job.slabs {
        let mut expr = Expression::new();
        for layer in &slab_cfg.layers {
            let mat = materials
                .get(&layer.material)
                .with_context(|| format!("undefined material '{}'", layer.material))?;
            expr.push(lamella_core::expression::Layer::new(
                *mat,
                Complex64::from(layer.thickness),
            ));
        }

        let mut slab = Slab::new(expr)
            .with_context(|| format!("building slab '{}'", slab_cfg.name))?;
        slab.find_modes(&ctx)
            .with_context(|| format!("solving modes of slab '{}'", slab_cfg.name))?;

        println!(
            "  Slab '{}': {} layers, width {:.4} µm, fundamental n_eff = {:.6}",
            slab_cfg.name,
            slab.layers().len(),
            slab.physical_width(),
            slab.modes()[0].n_eff(&ctx).re
        );

        slabs.insert(slab_cfg.name.clone(), Arc::new(slab));
    }

    // Stack assembly.
    let mut stack_expr = StackExpression::default();
    for term in &job.stack.terms {
        let slab = slabs
            .get(&term.slab)
            .with_context(|| format!("undefined slab '{}'", term.slab))?;
        stack_expr =
            stack_expr + StackTerm::new(Arc::clone(slab), Complex64::from(term.length));
    }

    let mut stack = Stack::new(stack_expr).context("building stack")?;

    match &job.incidence {
        IncidenceConfig::Gaussian {
            height,
            width,
            position,
            eps,
        } => stack.set_inc_field_gaussian(
            &ctx,
            Complex64::from(*height),
            Complex64::from(*width),
            Complex64::from(*position),
            *eps,
        )?,
        IncidenceConfig::PlaneWave { height, slope, eps } => stack.set_inc_field_plane_wave(
            &ctx,
            Complex64::from(*height),
            Complex64::from(*slope),
            *eps,
        )?,
        IncidenceConfig::Modal { amplitudes } => {
            let mut inc = Array1::<Complex64>::zeros(ctx.n_modes);
            for (i, a) in amplitudes.iter().enumerate().take(ctx.n_modes) {
                inc[i] = Complex64::from(*a);
            }
            stack.set_inc_field(inc);
        }
    }

    stack.calc(&ctx).context("assembling scattering matrices")?;
    log::info!(
        "stack of {} terms solved with a {}-mode {} basis",
        job.stack.terms.len(),
        ctx.n_modes,
        ctx.polarisation
    );

    let inc = stack
        .inc_field()
        .context("no incident field set")?
        .clone();
    let refl = stack.refl_field()?;
    let trans = stack.trans_field()?;

    println!(
        "  |R[0]| = {:.6}, |T[0]| = {:.6}",
        refl[0].norm(),
        trans[0].norm()
    );

    let inc_n_eff = stack
        .inc()
        .modes()
        .iter()
        .take(ctx.n_modes)
        .map(|m| m.n_eff(&ctx))
        .collect();

    let field_scan = if job.output.field_points > 0 {
        Some(scan_exit_field(&ctx, &stack, job.output.field_points)?)
    } else {
        None
    };

    Ok(SimulationOutput {
        inc_n_eff,
        inc,
        refl,
        trans,
        field_scan,
    })
}

/// Build the solver context from the simulation section.
pub fn build_context(job: &JobConfig) -> Result<Context> {
    let sim = &job.simulation;

    let polarisation = match sim.polarisation.to_uppercase().as_str() {
        "TE" => Polarisation::TE,
        "TM" => Polarisation::TM,
        other => anyhow::bail!("unknown polarisation '{other}' (expected TE or TM)"),
    };

    let wall = |name: &str| -> Result<Wall> {
        match name.to_lowercase().as_str() {
            "electric" => Ok(Wall::Electric),
            "magnetic" => Ok(Wall::Magnetic),
            other => anyhow::bail!("unknown wall '{other}' (expected electric or magnetic)"),
        }
    };

    Ok(Context::new(sim.wavelength, sim.n_modes)?
        .with_polarisation(polarisation)
        .with_walls(wall(&sim.lower_wall)?, wall(&sim.upper_wall)?))
}

fn scan_exit_field(ctx: &Context, stack: &Stack, points: usize) -> Result<Vec<FieldSample>> {
    let expansion = stack.ext_field_expansion()?;
    let width = stack.ext().physical_width();

    let samples = (0..points)
        .map(|i| {
            let x = width * i as f64 / (points - 1).max(1) as f64;
            let field = expansion.field(ctx, Complex64::from(x));
            FieldSample {
                x,
                abs_e: field.abs_e(),
                abs_h: field.abs_h(),
                sz: field.sz(),
            }
        })
        .collect();

    Ok(samples)
}

/// Write modal amplitudes as CSV: one row per basis mode.
pub fn write_amplitudes_csv(output: &SimulationOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut csv = String::from(
        "mode,n_eff_re,n_eff_im,inc_re,inc_im,refl_re,refl_im,refl_abs,trans_re,trans_im,trans_abs\n",
    );
    for i in 0..output.refl.len() {
        let n_eff = output.inc_n_eff[i];
        let inc = output.inc[i];
        let r = output.refl[i];
        let t = output.trans[i];
        csv.push_str(&format!(
            "{},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9},{:.9}\n",
            i,
            n_eff.re,
            n_eff.im,
            inc.re,
            inc.im,
            r.re,
            r.im,
            r.norm(),
            t.re,
            t.im,
            t.norm()
        ));
    }

    std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
    println!("  Amplitudes written to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonAmplitude {
    mode: usize,
    n_eff: [f64; 2],
    inc: [f64; 2],
    refl: [f64; 2],
    trans: [f64; 2],
}

/// Write the results as JSON.
pub fn write_results_json(output: &SimulationOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let amplitudes: Vec<JsonAmplitude> = (0..output.refl.len())
        .map(|i| JsonAmplitude {
            mode: i,
            n_eff: [output.inc_n_eff[i].re, output.inc_n_eff[i].im],
            inc: [output.inc[i].re, output.inc[i].im],
            refl: [output.refl[i].re, output.refl[i].im],
            trans: [output.trans[i].re, output.trans[i].im],
        })
        .collect();

    let json = serde_json::to_string_pretty(&amplitudes)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("  Results written to {}", path.display());
    Ok(())
}

/// Write a transverse field scan as CSV.
pub fn write_field_csv(samples: &[FieldSample], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut csv = String::from("x,abs_e,abs_h,sz\n");
    for s in samples {
        csv.push_str(&format!(
            "{:.6},{:.9e},{:.9e},{:.9e}\n",
            s.x, s.abs_e, s.abs_h, s.sz
        ));
    }

    std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
    println!("  Field scan written to {}", path.display());
    Ok(())
}
