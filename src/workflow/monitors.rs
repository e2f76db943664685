// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, ProtocolClass, Stage};
use crate::workflow::classify2d::Classified;
use crate::workflow::particles::Particles;
use crate::workflow::resources::{gpu_param, streamer_interval};

const STREAMER_BATCH_SIZE: i64 = 2000;
const SUMMARY_INTERVAL: i64 = 20;

/// Streaming 2D view of the particles: GL2D assignment on a GPU, otherwise
/// the streamer re-running a 2D classifier.
pub(crate) fn build_streaming_2d(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    particles: &Particles,
    classified: &Classified,
    last_relion: Option<NodeId>,
) -> Result<(), GraphError> {
    let screened = particles.union.screen.port("outputParticles");
    let gl2d = &cfg.resources.gl2d;

    if gl2d.is_enabled() {
        let refs = classified
            .averages
            .last()
            .copied()
            .ok_or(GraphError::MissingAlternative("2D classifier"))?;
        b.add(
            ProtocolClass::Gl2dStreaming,
            "Xmipp - GL2D assignation",
            Stage::UsefulOutputs,
        )
        .param("gpuList", gpu_param(gl2d))
        .input("inputRefs", refs.port("outputAverages"))?
        .input("inputParticles", screened)?;
        return Ok(());
    }

    let classifier = classified
        .streamed_classifier()
        .ok_or(GraphError::MissingAlternative("2D classifier"))?;
    let handle = b
        .add(ProtocolClass::Monitor2dStreamer, "Scipion - Streamer", Stage::Classify2d)
        .param("batchSize", STREAMER_BATCH_SIZE)
        .param("startingNumber", cfg.classify2d.particles)
        .param("samplingInterval", streamer_interval(cfg.acquisition.timeout))
        .protocols("input2dProtocol", vec![classifier])?
        .input("inputParticles", screened)?;
    if let Some(relion) = last_relion {
        handle.after(relion)?;
    }
    Ok(())
}

/// Summary monitor over every protocol put on the summary list.
pub(crate) fn build_summary_monitor(b: &mut GraphBuilder) -> Result<NodeId, GraphError> {
    let watched = b.summary().to_vec();
    Ok(b
        .add(
            ProtocolClass::MonitorSummary,
            "Scipion - Summary Monitor",
            Stage::Monitor,
        )
        .param("samplingInterval", SUMMARY_INTERVAL)
        .protocols("inputProtocols", watched)?
        .id())
}
