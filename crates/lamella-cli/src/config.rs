//! TOML configuration deserialisation for simulation jobs.

use std::collections::BTreeMap;

use num_complex::Complex64;
use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub simulation: SimulationConfig,
    pub materials: BTreeMap<String, MaterialConfig>,
    #[serde(rename = "slab")]
    pub slabs: Vec<SlabConfig>,
    pub stack: StackConfig,
    pub incidence: IncidenceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Simulation parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Vacuum wavelength in µm.
    pub wavelength: f64,
    /// Number of modes in the expansion basis.
    pub n_modes: usize,
    /// "TE" or "TM". Default: "TE".
    #[serde(default = "default_polarisation")]
    pub polarisation: String,
    /// "electric" or "magnetic". Default: "electric".
    #[serde(default = "default_wall")]
    pub lower_wall: String,
    #[serde(default = "default_wall")]
    pub upper_wall: String,
}

fn default_polarisation() -> String {
    "TE".into()
}
fn default_wall() -> String {
    "electric".into()
}

/// A complex value: either a plain float or a `[re, im]` pair.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum ComplexSpec {
    Real(f64),
    Pair([f64; 2]),
}

impl From<ComplexSpec> for Complex64 {
    fn from(spec: ComplexSpec) -> Complex64 {
        match spec {
            ComplexSpec::Real(re) => Complex64::from(re),
            ComplexSpec::Pair([re, im]) => Complex64::new(re, im),
        }
    }
}

/// A material definition: either a built-in dispersive model sampled at
/// the simulation wavelength, or a (possibly complex) constant index
/// with an optional relative permeability.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MaterialConfig {
    Model {
        model: String,
    },
    Constant {
        n: ComplexSpec,
        mur: Option<ComplexSpec>,
    },
}

/// A named slab cross-section built from layers.
#[derive(Debug, Deserialize)]
pub struct SlabConfig {
    pub name: String,
    pub layers: Vec<LayerConfig>,
}

/// One layer of a slab: a material reference and a thickness. A complex
/// thickness (`[re, im]` with negative im) acts as a PML absorber.
#[derive(Debug, Deserialize)]
pub struct LayerConfig {
    pub material: String,
    pub thickness: ComplexSpec,
}

/// The stack: an ordered list of slab sections.
#[derive(Debug, Deserialize)]
pub struct StackConfig {
    #[serde(rename = "term")]
    pub terms: Vec<StackTermConfig>,
}

/// One stack section: a slab reference and its length along z.
#[derive(Debug, Deserialize)]
pub struct StackTermConfig {
    pub slab: String,
    #[serde(default = "default_length")]
    pub length: ComplexSpec,
}

fn default_length() -> ComplexSpec {
    ComplexSpec::Real(0.0)
}

/// Incident field specification.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IncidenceConfig {
    /// Gaussian beam `h·exp(-(x-p)²/(2w²))`.
    Gaussian {
        height: ComplexSpec,
        width: ComplexSpec,
        position: ComplexSpec,
        #[serde(default = "default_eps")]
        eps: f64,
    },
    /// Linear profile `h + s·x` (a tilted wavefront).
    PlaneWave {
        height: ComplexSpec,
        slope: ComplexSpec,
        #[serde(default = "default_eps")]
        eps: f64,
    },
    /// Explicit modal amplitudes in the incidence basis.
    Modal { amplitudes: Vec<ComplexSpec> },
}

fn default_eps() -> f64 {
    1e-3
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save modal amplitudes as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_amplitudes: bool,
    /// Whether to also save results as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Number of transverse sample points for the exit field profile
    /// (0 disables the scan).
    #[serde(default)]
    pub field_points: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_amplitudes: true,
            save_json: false,
            field_points: 0,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    validate_references(&config)?;
    Ok(config)
}

/// Cheap cross-reference checks that do not require solving anything.
fn validate_references(config: &JobConfig) -> anyhow::Result<()> {
    for slab in &config.slabs {
        for layer in &slab.layers {
            if !config.materials.contains_key(&layer.material) {
                anyhow::bail!(
                    "slab '{}' references undefined material '{}'",
                    slab.name,
                    layer.material
                );
            }
        }
    }

    for term in &config.stack.terms {
        if !config.slabs.iter().any(|s| s.name == term.slab) {
            anyhow::bail!("stack references undefined slab '{}'", term.slab);
        }
    }

    if config.stack.terms.is_empty() {
        anyhow::bail!("stack needs at least one term");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
        [simulation]
        wavelength = 1.55
        n_modes = 40

        [materials.air]
        n = 1.0
        [materials.gaas]
        n = 3.5

        [[slab]]
        name = "membrane"
        layers = [
            { material = "air", thickness = [2.0, -0.1] },
            { material = "gaas", thickness = 1.0 },
            { material = "air", thickness = [2.0, -0.1] },
        ]

        [[slab]]
        name = "outside"
        layers = [{ material = "air", thickness = 5.0 }]

        [[stack.term]]
        slab = "membrane"

        [[stack.term]]
        slab = "outside"

        [incidence]
        type = "gaussian"
        height = 4.0
        width = 0.5
        position = 2.5
        eps = 1e-3
    "#;

    #[test]
    fn test_full_job_parses() {
        let job: JobConfig = toml::from_str(JOB).unwrap();
        assert_eq!(job.simulation.n_modes, 40);
        assert_eq!(job.simulation.polarisation, "TE");
        assert_eq!(job.slabs.len(), 2);
        assert_eq!(job.stack.terms.len(), 2);

        let pml = Complex64::from(job.slabs[0].layers[0].thickness);
        assert!((pml - Complex64::new(2.0, -0.1)).norm() < 1e-12);

        match &job.incidence {
            IncidenceConfig::Gaussian { eps, .. } => assert_eq!(*eps, 1e-3),
            other => panic!("unexpected incidence {other:?}"),
        }
    }

    #[test]
    fn test_model_material_parses() {
        let with_model = JOB.replace(
            "[materials.gaas]\n        n = 3.5",
            "[materials.gaas]\n        model = \"fused_silica\"",
        );
        let job: JobConfig = toml::from_str(&with_model).unwrap();
        match &job.materials["gaas"] {
            MaterialConfig::Model { model } => assert_eq!(model, "fused_silica"),
            other => panic!("unexpected material {other:?}"),
        }
    }

    #[test]
    fn test_undefined_material_rejected() {
        let broken = JOB.replace("material = \"gaas\"", "material = \"si\"");
        let job: JobConfig = toml::from_str(&broken).unwrap();
        assert!(validate_references(&job).is_err());
    }

    #[test]
    fn test_undefined_slab_rejected() {
        let broken = JOB.replace("slab = \"outside\"", "slab = \"elsewhere\"");
        let job: JobConfig = toml::from_str(&broken).unwrap();
        assert!(validate_references(&job).is_err());
    }
}
