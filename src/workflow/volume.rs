// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Initial volume estimation.
//!
//! Estimators run one after the other. With several of them their volumes
//! are aligned to the first one and merged by a swarm consensus.

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, PortRef, ProtocolClass, Stage};
use crate::workflow::classify2d::Classified;
use crate::workflow::resources::init_volume_cpus;

/// Fast Fourier alignment
const ALIGN_FAST_FOURIER: i64 = 3;

pub(crate) fn build_initial_volume(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    classified: &Classified,
) -> Result<PortRef, GraphError> {
    let vol = &cfg.initial_volume;
    let cpus = init_volume_cpus(cfg.num_cpus()) as i64;
    let averages = classified.selection.port("outputAverages");
    let mut volumes: Vec<PortRef> = Vec::new();

    if vol.significant {
        let id = b
            .add(
                ProtocolClass::ReconstructSignificant,
                "Xmipp - Recons. significant",
                Stage::InitVol,
            )
            .param("symmetryGroup", vol.symmetry.as_str())
            .param("numberOfMpi", cpus)
            .param("iter", 35)
            .input("inputSet", averages.clone())?
            .id();
        volumes.push(id.port("outputVolume"));
    }

    if vol.eman {
        let mut handle = b
            .add(ProtocolClass::EmanInitialModel, "Eman - Initial vol", Stage::InitVol)
            .param("symmetry", vol.symmetry.as_str())
            .param("numberOfThreads", cpus)
            .param("numberOfModels", 7)
            .input("inputSet", averages.clone())?;
        if let Some(previous) = volumes.last() {
            handle = handle.after(previous.node)?;
        }
        volumes.push(handle.id().port("outputVolumes"));
    }

    if vol.ransac {
        let mut handle = b
            .add(ProtocolClass::Ransac, "Xmipp - Ransac significant", Stage::InitVol)
            .param("symmetryGroup", vol.symmetry.as_str())
            .param("numberOfThreads", cpus)
            .input("inputSet", averages)?;
        if let Some(previous) = volumes.last() {
            handle = handle.after(previous.node)?;
        }
        volumes.push(handle.id().port("outputVolumes"));
    }

    match volumes.as_slice() {
        [] => Err(GraphError::MissingAlternative("initial volume estimator")),
        [only] => Ok(only.clone()),
        [reference, ..] => {
            let align = b
                .add(
                    ProtocolClass::AlignVolume,
                    "Xmipp - Join/Align volumes",
                    Stage::InitVol,
                )
                .param("alignmentAlgorithm", ALIGN_FAST_FOURIER)
                .param("numberOfThreads", cpus)
                .input("inputReference", reference.clone())?
                .fan_in("inputVolumes", volumes.clone())?
                .id();
            let swarm = b
                .add(
                    ProtocolClass::ReconstructSwarm,
                    "Xmipp - Swarm init. vol.",
                    Stage::InitVol,
                )
                .param("symmetryGroup", vol.symmetry.as_str())
                .param("numberOfMpi", cfg.num_cpus() as i64)
                .param("numberOfIterations", 5)
                .input("inputParticles", classified.trigger.port("outputParticles"))?
                .input("inputVolumes", align.port("outputVolumes"))?
                .id();
            Ok(swarm.port("outputVolume"))
        }
    }
}
