// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Movies, CTF and micrograph preprocessing.

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, ProtocolClass, Stage};
use crate::workflow::resources::{gpu_param, motioncor_threads};
use std::path::Path;

/// Import mode for files matched by a pattern
const IMPORT_FROM_FILES: i64 = 0;

/// What later stages read from the preprocessing chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Micrographs {
    /// CTF consensus, source of `outputCTF`
    pub ctf: NodeId,
    /// Preprocessed micrographs at the acquisition sampling
    pub full_size: NodeId,
    /// Micrographs used for picking and extraction (possibly downsampled)
    pub for_picking: NodeId,
    pub sampling_2d: f64,
    pub downsampled: bool,
}

pub(crate) fn build_preprocessing(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    gain_file: Option<&Path>,
) -> Result<Micrographs, GraphError> {
    let acq = &cfg.acquisition;
    let align = &cfg.alignment;
    let cpus = cfg.num_cpus() as i64;
    let dose = align.dose_weighting();

    // MOVIES
    let timeout = if acq.simulation {
        acq.timeout
    } else {
        acq.timeout * 10.0
    };
    let gain = gain_file
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let import = b
        .add(ProtocolClass::ImportMovies, "import movies", Stage::Movies)
        .param("importFrom", IMPORT_FROM_FILES)
        .param("filesPath", acq.deposition_dir.to_string_lossy().into_owned())
        .param("filesPattern", acq.pattern.as_str())
        .param("amplitudeContrast", acq.amplitude_contrast)
        .param("sphericalAberration", acq.spherical_aberration)
        .param("voltage", acq.voltage)
        .param("samplingRate", acq.sampling)
        .param("doseInitial", align.dose_initial)
        .param("dosePerFrame", align.dose_per_frame)
        .param("gainFile", gain)
        .param("dataStreaming", true)
        .param("timeout", timeout)
        .summary()
        .id();

    let movie_gain = b
        .add(ProtocolClass::MovieGain, "Xmipp - movie gain", Stage::Movies)
        .param("frameStep", 5)
        .param("movieStep", 40)
        .param("estimateOrientation", false)
        .input("inputMovies", import.port("outputMovies"))?
        .summary()
        .id();

    let motioncor = &cfg.resources.motioncor2;
    let aligner = if motioncor.is_enabled() {
        b.add(ProtocolClass::MotionCorr, "MotionCor2 - movie align.", Stage::Movies)
            .param("gpuList", gpu_param(motioncor))
            .param("numberOfThreads", motioncor_threads(motioncor) as i64)
            .param("doApplyDoseFilter", dose)
            .param("doSaveUnweightedMic", !dose)
            .param("patchX", 5)
            .param("patchY", 5)
            .param("extraParams2", "-SumRange 0 0")
            .param("alignFrame0", align.first_frame)
            .param("alignFrameN", align.last_frame)
            .input("inputMovies", movie_gain.port("outputMovies"))?
            .id()
    } else {
        b.add(ProtocolClass::MovieCorr, "Xmipp - corr. align.", Stage::Movies)
            .param("numberOfThreads", cpus)
            .param("useGpu", false)
            .param("doLocalAlignment", false)
            .param("alignFrame0", align.first_frame)
            .param("alignFrameN", align.last_frame)
            .input("inputMovies", import.port("outputMovies"))?
            .id()
    };

    let max_shift = b
        .add(ProtocolClass::MovieMaxShift, "Xmipp - max shift", Stage::Movies)
        .input("inputMovies", aligner.port("outputMovies"))?
        .summary()
        .id();

    let aligned = if align.optical_flow {
        b.add(ProtocolClass::OpticalFlowAlignment, "Xmipp - OF align.", Stage::Movies)
            .param("doApplyDoseFilter", dose)
            .param("applyDosePreAlign", false)
            .input("inputMovies", max_shift.port("outputMovies"))?
            .id()
    } else {
        max_shift
    };
    let aligned_mics = if dose {
        aligned.port("outputMicrographsDoseWeighted")
    } else {
        aligned.port("outputMicrographs")
    };

    // CTF
    let gctf = &cfg.resources.gctf;
    let ctf_main = if gctf.is_enabled() {
        b.add(ProtocolClass::Gctf, "gCTF estimation", Stage::Ctf)
            .param("gpuList", gpu_param(gctf))
            .input("inputMicrographs", aligned_mics.clone())?
            .id()
    } else {
        b.add(ProtocolClass::XmippCtf, "Xmipp - ctf estimation", Stage::Ctf)
            .input("inputMicrographs", aligned_mics.clone())?
            .id()
    };

    let ctffind = b
        .add(ProtocolClass::CtfFind, "GrigorieffLab - CTFfind", Stage::Ctf)
        .param("numberOfThreads", cpus)
        .input("inputMicrographs", aligned_mics)?
        .id();

    let ctf = b
        .add(ProtocolClass::CtfConsensus, "Xmipp - CTF consensus", Stage::Ctf)
        .param("useDefocus", true)
        .param("useAstigmatism", true)
        .param("useResolution", true)
        .param("resolution", 5)
        .param("useCritXmipp", !gctf.is_enabled())
        .param("calculateConsensus", true)
        .param("minConsResol", 7)
        .input("inputCTF", ctf_main.port("outputCTF"))?
        .input("inputCTF2", ctffind.port("outputCTF"))?
        .summary()
        .id();

    // MICROGRAPHS
    let full_size = b
        .add(
            ProtocolClass::PreprocessMicrographs,
            "Xmipp - preprocess Mics",
            Stage::Micrographs,
        )
        .param("doRemoveBadPix", true)
        .param("doInvert", !acq.invert_contrast)
        .input("inputMicrographs", ctf.port("outputMicrographs"))?
        .id();

    let samp_2d = cfg.classify2d.sampling;
    let downsampled = samp_2d > 0.0 && samp_2d > acq.sampling;
    let for_picking = if downsampled {
        b.add(
            ProtocolClass::PreprocessMicrographs,
            "downSampling to 2D size",
            Stage::Micrographs,
        )
        .param("doDownsample", true)
        .param("downFactor", samp_2d / acq.sampling)
        .input("inputMicrographs", full_size.port("outputMicrographs"))?
        .id()
    } else {
        full_size
    };

    Ok(Micrographs {
        ctf,
        full_size,
        for_picking,
        sampling_2d: if downsampled { samp_2d } else { acq.sampling },
        downsampled,
    })
}
