// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Catalog of the protocol classes the acquisition workflow instantiates.
//!
//! Protocols are opaque to this crate. A class is described only by the name
//! the external framework knows it by, the plugin module that provides it and
//! the names of its input and output ports. Port names are what bindings are
//! checked against when the graph is assembled.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolClass {
    // movies
    ImportMovies,
    MovieGain,
    MotionCorr,
    MovieCorr,
    MovieMaxShift,
    OpticalFlowAlignment,
    // ctf
    Gctf,
    XmippCtf,
    CtfFind,
    CtfConsensus,
    // micrographs and picking
    PreprocessMicrographs,
    TriggerData,
    ManualPicking,
    AutomaticPicking,
    CryoloPicking,
    RelionLogPicking,
    SparxPicking,
    DogPicking,
    ConsensusPicking,
    // particles
    ExtractParticles,
    EliminateEmptyParticles,
    ScreenParticles,
    // 2D
    CryosparcClassify2d,
    Cl2d,
    RelionClassify2d,
    EliminateEmptyClasses,
    UnionSet,
    // initial volume
    ReconstructSignificant,
    EmanInitialModel,
    Ransac,
    AlignVolume,
    ReconstructSwarm,
    // 3D
    CropResizeVolumes,
    ExtractCoords,
    SubSet,
    RelionRefine3d,
    RelionClassify3d,
    CryosparcInitialModel,
    // monitors
    Gl2dStreaming,
    Monitor2dStreamer,
    MonitorSummary,
}

/// Static description of a protocol class.
#[derive(Debug, Clone, Copy)]
pub struct ClassSpec {
    pub class_name: &'static str,
    pub module: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

const PW_PROTOCOLS: &str = "pyworkflow.em.protocol";
const XMIPP: &str = "xmipp3.protocols";

const ALIGNED_OUTPUTS: &[&str] = &[
    "outputMovies",
    "outputMicrographs",
    "outputMicrographsDoseWeighted",
];

const fn class(
    class_name: &'static str,
    module: &'static str,
    inputs: &'static [&'static str],
    outputs: &'static [&'static str],
) -> ClassSpec {
    ClassSpec {
        class_name,
        module,
        inputs,
        outputs,
    }
}

impl ProtocolClass {
    pub const ALL: [ProtocolClass; 41] = [
        ProtocolClass::ImportMovies,
        ProtocolClass::MovieGain,
        ProtocolClass::MotionCorr,
        ProtocolClass::MovieCorr,
        ProtocolClass::MovieMaxShift,
        ProtocolClass::OpticalFlowAlignment,
        ProtocolClass::Gctf,
        ProtocolClass::XmippCtf,
        ProtocolClass::CtfFind,
        ProtocolClass::CtfConsensus,
        ProtocolClass::PreprocessMicrographs,
        ProtocolClass::TriggerData,
        ProtocolClass::ManualPicking,
        ProtocolClass::AutomaticPicking,
        ProtocolClass::CryoloPicking,
        ProtocolClass::RelionLogPicking,
        ProtocolClass::SparxPicking,
        ProtocolClass::DogPicking,
        ProtocolClass::ConsensusPicking,
        ProtocolClass::ExtractParticles,
        ProtocolClass::EliminateEmptyParticles,
        ProtocolClass::ScreenParticles,
        ProtocolClass::CryosparcClassify2d,
        ProtocolClass::Cl2d,
        ProtocolClass::RelionClassify2d,
        ProtocolClass::EliminateEmptyClasses,
        ProtocolClass::UnionSet,
        ProtocolClass::ReconstructSignificant,
        ProtocolClass::EmanInitialModel,
        ProtocolClass::Ransac,
        ProtocolClass::AlignVolume,
        ProtocolClass::ReconstructSwarm,
        ProtocolClass::CropResizeVolumes,
        ProtocolClass::ExtractCoords,
        ProtocolClass::SubSet,
        ProtocolClass::RelionRefine3d,
        ProtocolClass::RelionClassify3d,
        ProtocolClass::CryosparcInitialModel,
        ProtocolClass::Gl2dStreaming,
        ProtocolClass::Monitor2dStreamer,
        ProtocolClass::MonitorSummary,
    ];

    pub fn spec(self) -> ClassSpec {
        use ProtocolClass::*;
        match self {
            ImportMovies => class("ProtImportMovies", PW_PROTOCOLS, &[], &["outputMovies"]),
            MovieGain => class(
                "XmippProtMovieGain",
                XMIPP,
                &["inputMovies"],
                &["outputMovies", "outputGains"],
            ),
            MotionCorr => class("ProtMotionCorr", "motioncorr.protocols", &["inputMovies"], ALIGNED_OUTPUTS),
            MovieCorr => class("XmippProtMovieCorr", XMIPP, &["inputMovies"], ALIGNED_OUTPUTS),
            MovieMaxShift => class("XmippProtMovieMaxShift", XMIPP, &["inputMovies"], ALIGNED_OUTPUTS),
            OpticalFlowAlignment => class("XmippProtOFAlignment", XMIPP, &["inputMovies"], ALIGNED_OUTPUTS),
            Gctf => class("ProtGctf", "gctf.protocols", &["inputMicrographs"], &["outputCTF"]),
            XmippCtf => class("XmippProtCTFMicrographs", XMIPP, &["inputMicrographs"], &["outputCTF"]),
            CtfFind => class(
                "ProtCTFFind",
                "grigoriefflab.protocols",
                &["inputMicrographs"],
                &["outputCTF"],
            ),
            CtfConsensus => class(
                "XmippProtCTFConsensus",
                XMIPP,
                &["inputCTF", "inputCTF2"],
                &["outputCTF", "outputMicrographs"],
            ),
            PreprocessMicrographs => class(
                "XmippProtPreprocessMicrographs",
                XMIPP,
                &["inputMicrographs"],
                &["outputMicrographs"],
            ),
            TriggerData => class(
                "XmippProtTriggerData",
                XMIPP,
                &["inputImages"],
                &["outputMicrographs", "outputParticles"],
            ),
            ManualPicking => class(
                "XmippProtParticlePicking",
                XMIPP,
                &["inputMicrographs"],
                &["outputCoordinates", "boxsize"],
            ),
            AutomaticPicking => class(
                "XmippParticlePickingAutomatic",
                XMIPP,
                &["inputMicrographs", "xmippParticlePicking"],
                &["outputCoordinates"],
            ),
            CryoloPicking => class(
                "SphireProtCRYOLOPicking",
                "sphire.protocols",
                &["inputMicrographs"],
                &["outputCoordinates"],
            ),
            RelionLogPicking => class(
                "ProtRelionAutopickLoG",
                "relion.protocols",
                &["inputMicrographs"],
                &["outputCoordinates"],
            ),
            SparxPicking => class(
                "SparxGaussianProtPicking",
                "eman2.protocols",
                &["inputMicrographs"],
                &["outputCoordinates"],
            ),
            DogPicking => class(
                "DogPickerProtPicking",
                "appion.protocols",
                &["inputMicrographs"],
                &["outputCoordinates"],
            ),
            ConsensusPicking => class(
                "XmippProtConsensusPicking",
                XMIPP,
                &["inputCoordinates"],
                &["consensusCoordinates"],
            ),
            ExtractParticles => class(
                "XmippProtExtractParticles",
                XMIPP,
                &["inputCoordinates", "inputMicrographs", "ctfRelations"],
                &["outputParticles"],
            ),
            EliminateEmptyParticles => class(
                "XmippProtEliminateEmptyParticles",
                XMIPP,
                &["inputParticles"],
                &["outputParticles", "eliminatedParticles"],
            ),
            ScreenParticles => class(
                "XmippProtScreenParticles",
                XMIPP,
                &["inputParticles"],
                &["outputParticles"],
            ),
            CryosparcClassify2d => class(
                "ProtCryo2D",
                "cryosparc2.protocols",
                &["inputParticles"],
                &["outputClasses"],
            ),
            Cl2d => class("XmippProtCL2D", XMIPP, &["inputParticles"], &["outputClasses"]),
            RelionClassify2d => class(
                "ProtRelionClassify2D",
                "relion.protocols",
                &["inputParticles"],
                &["outputClasses"],
            ),
            EliminateEmptyClasses => class(
                "XmippProtEliminateEmptyClasses",
                XMIPP,
                &["inputClasses"],
                &["outputAverages", "outputClasses"],
            ),
            UnionSet => class("ProtUnionSet", PW_PROTOCOLS, &["inputSets"], &["outputSet"]),
            ReconstructSignificant => class(
                "XmippProtReconstructSignificant",
                XMIPP,
                &["inputSet"],
                &["outputVolume"],
            ),
            EmanInitialModel => class(
                "EmanProtInitModel",
                "eman2.protocols",
                &["inputSet"],
                &["outputVolumes"],
            ),
            Ransac => class("XmippProtRansac", XMIPP, &["inputSet"], &["outputVolumes"]),
            AlignVolume => class(
                "XmippProtAlignVolume",
                XMIPP,
                &["inputReference", "inputVolumes"],
                &["outputVolumes"],
            ),
            ReconstructSwarm => class(
                "XmippProtReconstructSwarm",
                XMIPP,
                &["inputParticles", "inputVolumes"],
                &["outputVolume"],
            ),
            CropResizeVolumes => class(
                "XmippProtCropResizeVolumes",
                XMIPP,
                &["inputVolumes"],
                &["outputVol"],
            ),
            ExtractCoords => class(
                "ProtExtractCoords",
                PW_PROTOCOLS,
                &["inputParticles", "inputMicrographs"],
                &["outputCoordinates"],
            ),
            SubSet => class(
                "ProtSubSet",
                PW_PROTOCOLS,
                &["inputFullSet", "inputSubSet"],
                &["outputParticles"],
            ),
            RelionRefine3d => class(
                "ProtRelionRefine3D",
                "relion.protocols",
                &["inputParticles", "referenceVolume"],
                &["outputVolume", "outputParticles"],
            ),
            RelionClassify3d => class(
                "ProtRelionClassify3D",
                "relion.protocols",
                &["inputParticles", "referenceVolume"],
                &["outputClasses", "outputVolumes"],
            ),
            CryosparcInitialModel => class(
                "ProtCryoSparcInitialModel",
                "cryosparc2.protocols",
                &["inputParticles"],
                &["outputClasses", "outputVolumes"],
            ),
            Gl2dStreaming => class(
                "XmippProtStrGpuCrrSimple",
                XMIPP,
                &["inputRefs", "inputParticles"],
                &["outputClasses"],
            ),
            Monitor2dStreamer => class(
                "ProtMonitor2dStreamer",
                PW_PROTOCOLS,
                &["inputParticles", "input2dProtocol"],
                &[],
            ),
            MonitorSummary => class("ProtMonitorSummary", PW_PROTOCOLS, &["inputProtocols"], &[]),
        }
    }

    pub fn class_name(self) -> &'static str {
        self.spec().class_name
    }

    pub fn module(self) -> &'static str {
        self.spec().module
    }

    pub fn has_input(self, port: &str) -> bool {
        self.spec().inputs.contains(&port)
    }

    pub fn has_output(self, port: &str) -> bool {
        self.spec().outputs.contains(&port)
    }

    pub fn from_class_name(name: &str) -> Option<ProtocolClass> {
        ProtocolClass::ALL
            .iter()
            .copied()
            .find(|c| c.class_name() == name)
    }
}

impl fmt::Display for ProtocolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl From<ProtocolClass> for String {
    fn from(class: ProtocolClass) -> Self {
        class.class_name().to_string()
    }
}

impl TryFrom<String> for ProtocolClass {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        ProtocolClass::from_class_name(&name)
            .ok_or_else(|| format!("unknown protocol class '{}'", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn class_names_are_unique() {
        let names: HashSet<_> = ProtocolClass::ALL.iter().map(|c| c.class_name()).collect();
        assert_eq!(names.len(), ProtocolClass::ALL.len());
    }

    #[test]
    fn serializes_as_class_name() {
        let json = serde_json::to_string(&ProtocolClass::CtfFind).unwrap();
        assert_eq!(json, "\"ProtCTFFind\"");
        let back: ProtocolClass = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ProtocolClass::CtfFind);
        assert!(serde_json::from_str::<ProtocolClass>("\"ProtNothing\"").is_err());
    }

    #[test]
    fn ports_are_declared() {
        assert!(ProtocolClass::ConsensusPicking.has_output("consensusCoordinates"));
        assert!(!ProtocolClass::ConsensusPicking.has_output("outputCoordinates"));
        assert!(ProtocolClass::ExtractParticles.has_input("ctfRelations"));
        assert!(ProtocolClass::MonitorSummary.spec().outputs.is_empty());
        assert_eq!(ProtocolClass::Gctf.module(), "gctf.protocols");
    }
}
