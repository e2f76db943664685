// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The enumerated configuration schema.
//!
//! Every key the launcher understands is a [`ConfKey`] variant. A key carries
//! its config-file name, the cast applied to its raw string, whether it is
//! mandatory, defaulted or derived, and the label shown to users. Anything not
//! listed here is rejected when a config file is read, so a typo can no longer
//! silently fall back to a default.

use std::fmt;

/// How a raw string value is turned into a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    Bool,
    Str,
    /// String with `~` and environment variables expanded
    Path,
    /// `first-last` pair of integers, e.g. a frame range
    SplitInt,
    /// Float that may be written as a product (`12*3600`) or quotient (`1/2`)
    SplitTimesFloat,
}

impl CastKind {
    /// Article + noun used in "should be ..." messages.
    pub fn expected(&self) -> &'static str {
        match self {
            CastKind::Int => "an integer",
            CastKind::Float => "a float",
            CastKind::Bool => "a boolean",
            CastKind::Str => "a string",
            CastKind::Path => "a path",
            CastKind::SplitInt => "an integer range (ie. 2-15)",
            CastKind::SplitTimesFloat => "a float, a product (a*b) or a quotient (a/b)",
        }
    }
}

/// Whether a key must be present, has a fallback, or is computed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Mandatory,
    /// Raw literal cast through the same rules as a configured value
    Default(&'static str),
    /// Filled from other values after loading when not configured
    Derived,
}

/// Static description of one configuration key.
#[derive(Debug, Clone, Copy)]
pub struct KeySpec {
    pub name: &'static str,
    pub cast: CastKind,
    pub requirement: Requirement,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfKey {
    // acquisition
    Pattern,
    DepositionPattern,
    DepositionDir,
    Simulation,
    RawDataSim,
    GainPattern,
    AmplitudeContrast,
    SphericalAberration,
    Voltage,
    Sampling,
    Timeout,
    InvertContrast,
    // movie alignment
    Frames,
    DoseInitial,
    DosePerFrame,
    OpticalFlow,
    // picking
    PartSize,
    Mics2Pick,
    Cryolo,
    RelionPick,
    Sparx,
    DogPick,
    Wait2Pick,
    // 2D
    Do2dClass,
    Sampling2d,
    Parts2Class,
    Relion2d,
    Xmipp2d,
    Cryos2d,
    UseCryosSsd,
    // initial volume
    DoInitVol,
    SymGroup,
    Significant,
    EmanInitial,
    Ransac,
    // 3D
    Do3dClass,
    Sampling3d,
    Parts3d,
    RelionRefine,
    Relion3dcl,
    Cryos3d,
    DoFullSize,
    // resources
    NumCpu,
    MotionCor2Gpu,
    GctfGpu,
    RelionGpu,
    Gl2dGpu,
    // project
    ProjectName,
    ProjectsPath,
    UserName,
    SampleName,
    WindowsTitle,
    SchedulerCmd,
    SimulationCmd,
    // form switches
    AskAll,
    AskPath,
    AskPartSize,
    AskMics2Pick,
    AskPickProt,
    Ask2dSamp,
    AskParts2Class,
    Ask2dProt,
    AskSymGroup,
    AskInitVolProt,
    Ask3dSamp,
    AskParts3d,
    Ask3dProt,
    AskFullSize,
    AskResources,
}

use CastKind::*;
use Requirement::*;

const fn spec(
    name: &'static str,
    cast: CastKind,
    requirement: Requirement,
    label: &'static str,
) -> KeySpec {
    KeySpec {
        name,
        cast,
        requirement,
        label,
    }
}

impl ConfKey {
    pub const ALL: [ConfKey; 69] = [
        ConfKey::Pattern,
        ConfKey::DepositionPattern,
        ConfKey::DepositionDir,
        ConfKey::Simulation,
        ConfKey::RawDataSim,
        ConfKey::GainPattern,
        ConfKey::AmplitudeContrast,
        ConfKey::SphericalAberration,
        ConfKey::Voltage,
        ConfKey::Sampling,
        ConfKey::Timeout,
        ConfKey::InvertContrast,
        ConfKey::Frames,
        ConfKey::DoseInitial,
        ConfKey::DosePerFrame,
        ConfKey::OpticalFlow,
        ConfKey::PartSize,
        ConfKey::Mics2Pick,
        ConfKey::Cryolo,
        ConfKey::RelionPick,
        ConfKey::Sparx,
        ConfKey::DogPick,
        ConfKey::Wait2Pick,
        ConfKey::Do2dClass,
        ConfKey::Sampling2d,
        ConfKey::Parts2Class,
        ConfKey::Relion2d,
        ConfKey::Xmipp2d,
        ConfKey::Cryos2d,
        ConfKey::UseCryosSsd,
        ConfKey::DoInitVol,
        ConfKey::SymGroup,
        ConfKey::Significant,
        ConfKey::EmanInitial,
        ConfKey::Ransac,
        ConfKey::Do3dClass,
        ConfKey::Sampling3d,
        ConfKey::Parts3d,
        ConfKey::RelionRefine,
        ConfKey::Relion3dcl,
        ConfKey::Cryos3d,
        ConfKey::DoFullSize,
        ConfKey::NumCpu,
        ConfKey::MotionCor2Gpu,
        ConfKey::GctfGpu,
        ConfKey::RelionGpu,
        ConfKey::Gl2dGpu,
        ConfKey::ProjectName,
        ConfKey::ProjectsPath,
        ConfKey::UserName,
        ConfKey::SampleName,
        ConfKey::WindowsTitle,
        ConfKey::SchedulerCmd,
        ConfKey::SimulationCmd,
        ConfKey::AskAll,
        ConfKey::AskPath,
        ConfKey::AskPartSize,
        ConfKey::AskMics2Pick,
        ConfKey::AskPickProt,
        ConfKey::Ask2dSamp,
        ConfKey::AskParts2Class,
        ConfKey::Ask2dProt,
        ConfKey::AskSymGroup,
        ConfKey::AskInitVolProt,
        ConfKey::Ask3dSamp,
        ConfKey::AskParts3d,
        ConfKey::Ask3dProt,
        ConfKey::AskFullSize,
        ConfKey::AskResources,
    ];

    pub fn spec(self) -> KeySpec {
        match self {
            ConfKey::Pattern => spec("SCIPION_ACQUISITION_PATTERN", Str, Mandatory, "Acquisition pattern"),
            ConfKey::DepositionPattern => spec("DEPOSITION_PATTERN", Path, Derived, "Acquisition pattern"),
            ConfKey::DepositionDir => spec("DEPOSITION_DIR", Path, Default(""), "Deposition folder"),
            ConfKey::Simulation => spec("SIMULATION", Bool, Default("false"), "Simulate the acquisition"),
            ConfKey::RawDataSim => spec("RAWDATA_SIM", Path, Default(""), "Raw data to simulate"),
            ConfKey::GainPattern => spec("GAIN_PAT", Str, Default(""), "Gain file pattern"),
            ConfKey::AmplitudeContrast => spec("AMP_CONTR", Float, Default("0.1"), "Amplitude contrast"),
            ConfKey::SphericalAberration => spec("SPH_AB", Float, Mandatory, "Spherical aberration"),
            ConfKey::Voltage => spec("VOL_KV", Float, Mandatory, "Voltage (kV)"),
            ConfKey::Sampling => spec("SAMPLING", Float, Mandatory, "Pixel size (A/px)"),
            ConfKey::Timeout => spec("TIMEOUT", SplitTimesFloat, Default("60"), "Acquisition timeout"),
            ConfKey::InvertContrast => spec("INV_CONTR", Bool, Mandatory, "Invert contrast"),
            ConfKey::Frames => spec("FRAMES", SplitInt, Default("3-0"), "Frames range"),
            ConfKey::DoseInitial => spec("DOSE0", Float, Default("0"), "Initial dose"),
            ConfKey::DosePerFrame => spec("DOSEF", Float, Default("1.18"), "Dose per frame"),
            ConfKey::OpticalFlow => spec("OPTICAL_FLOW", Bool, Default("false"), "Optical Flow"),
            ConfKey::PartSize => spec("PARTSIZE", Int, Default("250"), "Estimated particle size"),
            ConfKey::Mics2Pick => spec("MICS2PICK", Int, Default("10"), "Number of mics to manual pick"),
            ConfKey::Cryolo => spec("CRYOLO", Bool, Default("true"), "Cryolo"),
            ConfKey::RelionPick => spec("RELION_PICK", Bool, Default("true"), "Relion LoG"),
            ConfKey::Sparx => spec("SPARX", Bool, Default("false"), "Eman2 Sparx"),
            ConfKey::DogPick => spec("DOGPICK", Bool, Default("false"), "Appion DoG"),
            ConfKey::Wait2Pick => spec("WAIT2PICK", Bool, Default("false"), "Wait for the manual picking"),
            ConfKey::Do2dClass => spec("DO_2DCLASS", Bool, Default("true"), "Do 2D analysis"),
            ConfKey::Sampling2d => spec("SAMPLING_2D", Float, Default("3"), "2D analysis pixel size"),
            ConfKey::Parts2Class => spec("PARTS2CLASS", Int, Default("5000"), "# particles to classify"),
            ConfKey::Relion2d => spec("RELION_2D", Bool, Default("true"), "Relion 2D"),
            ConfKey::Xmipp2d => spec("XMIPP_2D", Bool, Default("true"), "Xmipp CL2D/GL2D"),
            ConfKey::Cryos2d => spec("CRYOS_2D", Bool, Default("true"), "cryosparc2"),
            ConfKey::UseCryosSsd => spec("USE_CRYOS_SSD", Bool, Default("false"), "cryoSPARC SSD cache"),
            ConfKey::DoInitVol => spec("DO_INITVOL", Bool, Default("true"), "Estimate an Initial Volume"),
            ConfKey::SymGroup => spec("SYMGROUP", Str, Default("c1"), "Estimated symmetry group"),
            ConfKey::Significant => spec("SIGNIFICANT", Bool, Default("true"), "Xmipp Significant"),
            ConfKey::EmanInitial => spec("EMAN_INITIAL", Bool, Default("true"), "Eman"),
            ConfKey::Ransac => spec("RANSAC", Bool, Default("false"), "Xmipp Ransac"),
            ConfKey::Do3dClass => spec("DO_3DCLASS", Bool, Default("true"), "Do 3D analysis"),
            ConfKey::Sampling3d => spec("SAMPLING_3D", Float, Default("1"), "3D analysis pixel size"),
            ConfKey::Parts3d => spec("PARTS3D", Int, Default("10000"), "# particles for 3D analysis"),
            ConfKey::RelionRefine => spec("RELION_REFINE", Bool, Default("true"), "Relion auto-refine"),
            ConfKey::Relion3dcl => spec("RELION_3DCL", Bool, Default("true"), "Relion 3D classification"),
            ConfKey::Cryos3d => spec("CRYOS_3D", Bool, Default("true"), "cryosparc2"),
            ConfKey::DoFullSize => spec("DO_FULLSIZE", Bool, Default("true"), "Extract particles at FULL resolution"),
            ConfKey::NumCpu => spec("NUM_CPU", Int, Default("-1"), "CPUs"),
            ConfKey::MotionCor2Gpu => spec("MOTIONCOR2_GPU", Str, Default("2,3"), "MotionCor2"),
            ConfKey::GctfGpu => spec("GCTF_GPU", Str, Default("2"), "gCTF"),
            ConfKey::RelionGpu => spec("RELION_GPU", Str, Default("1"), "Relion"),
            ConfKey::Gl2dGpu => spec("GL2D_GPU", Str, Default("0"), "GL2D"),
            ConfKey::ProjectName => spec("PROJECT_NAME", Str, Derived, "Project name"),
            ConfKey::ProjectsPath => spec("PROJECTS_PATH", Path, Derived, "Projects folder"),
            ConfKey::UserName => spec("USER_NAME", Str, Default("mySelf"), "User name"),
            ConfKey::SampleName => spec("SAMPLE_NAME", Str, Default("myProtein"), "Sample name"),
            ConfKey::WindowsTitle => spec("WINDOWS_TITLE", Str, Default("Scipion wizard"), "Window title"),
            ConfKey::SchedulerCmd => spec("SCHEDULER_CMD", Str, Default("scipion schedule"), "Scheduler command"),
            ConfKey::SimulationCmd => spec(
                "SIMULATION_CMD",
                Str,
                Default("scipion python simulate_acquisition.py"),
                "Simulation command",
            ),
            ConfKey::AskAll => spec("ASK_ALL", Bool, Default("false"), "Ask every field"),
            ConfKey::AskPath => spec("ASK_PATH", Bool, Default("true"), "Ask the data folder"),
            ConfKey::AskPartSize => spec("ASK_PARTSIZE", Bool, Default("true"), "Ask the particle size"),
            ConfKey::AskMics2Pick => spec("ASK_MICS2PIC", Bool, Default("false"), "Ask the mics to pick"),
            ConfKey::AskPickProt => spec("ASK_PICK_PROT", Bool, Default("false"), "Ask the pickers"),
            ConfKey::Ask2dSamp => spec("ASK_2DSAMP", Bool, Default("true"), "Ask the 2D pixel size"),
            ConfKey::AskParts2Class => spec("ASK_PARTS2CLASS", Bool, Default("true"), "Ask the 2D particles"),
            ConfKey::Ask2dProt => spec("ASK_2D_PROT", Bool, Default("false"), "Ask the 2D classifiers"),
            ConfKey::AskSymGroup => spec("ASK_SYMGROUP", Bool, Default("true"), "Ask the symmetry"),
            ConfKey::AskInitVolProt => spec("ASK_INITVOL_PROT", Bool, Default("false"), "Ask the initial volume protocols"),
            ConfKey::Ask3dSamp => spec("ASK_3DSAMP", Bool, Default("true"), "Ask the 3D pixel size"),
            ConfKey::AskParts3d => spec("ASK_PARTS3D", Bool, Default("true"), "Ask the 3D particles"),
            ConfKey::Ask3dProt => spec("ASK_3D_PROT", Bool, Default("true"), "Ask the 3D protocols"),
            ConfKey::AskFullSize => spec("ASK_FULLSIZE", Bool, Default("false"), "Ask the full size extraction"),
            ConfKey::AskResources => spec("ASK_RESOURCES", Bool, Default("false"), "Ask the GPU resources"),
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn cast(self) -> CastKind {
        self.spec().cast
    }

    pub fn requirement(self) -> Requirement {
        self.spec().requirement
    }

    /// Look a key up by its config-file name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<ConfKey> {
        ConfKey::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn mandatory() -> Vec<ConfKey> {
        ConfKey::ALL
            .iter()
            .copied()
            .filter(|k| k.requirement() == Mandatory)
            .collect()
    }

    pub fn mandatory_names() -> Vec<&'static str> {
        Self::mandatory().into_iter().map(|k| k.name()).collect()
    }
}

impl fmt::Display for ConfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for key in ConfKey::ALL {
            assert!(seen.insert(key.name()), "duplicate name {}", key.name());
            assert_eq!(ConfKey::from_name(key.name()), Some(key));
        }
    }

    #[test]
    fn mandatory_keys_match_acquisition_essentials() {
        let mut names = ConfKey::mandatory_names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "INV_CONTR",
                "SAMPLING",
                "SCIPION_ACQUISITION_PATTERN",
                "SPH_AB",
                "VOL_KV"
            ]
        );
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(ConfKey::from_name("sampling"), None);
        assert_eq!(ConfKey::from_name("NOT_A_KEY"), None);
    }

    #[test]
    fn derived_keys_have_no_default() {
        for key in [ConfKey::ProjectName, ConfKey::ProjectsPath, ConfKey::DepositionPattern] {
            assert_eq!(key.requirement(), Derived);
        }
    }
}
