// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Particle picking and the consensus branch policy.
//!
//! With two or more pickers an AND and an OR consensus each merge every
//! picker's coordinates and feed their own particle branch. With a single
//! picker its coordinates go straight to extraction.

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, PortRef, ProtocolClass, Stage};
use crate::observability::messages::graph::{ConsensusBranches, SinglePickerPassThrough};
use crate::observability::messages::StructuredLog;
use crate::workflow::preprocess::Micrographs;
use crate::workflow::resources::even_box_size;

/// `consensus` parameter values of the consensus picker
const CONSENSUS_AND: i64 = -1;
const CONSENSUS_OR: i64 = 1;
/// Consensus radius when the box size is set by a manual picking
const DEFAULT_CONSENSUS_RADIUS: i64 = 10;

/// Coordinates handed to the particle branches.
#[derive(Debug, Clone)]
pub(crate) struct Picked {
    /// AND consensus, or the only picker
    pub main: PortRef,
    /// OR consensus, only with several pickers
    pub union: Option<PortRef>,
}

/// Trigger a few micrographs and pick them by hand.
fn manual_picking(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
) -> Result<NodeId, GraphError> {
    let trigger = b
        .add(ProtocolClass::TriggerData, "Xmipp - trigger some mics", Stage::Picking)
        .param("outputSize", cfg.picking.mics_to_pick)
        .param("allImages", true)
        .input("inputImages", mics.for_picking.port("outputMicrographs"))?
        .id();
    let manual = b
        .add(ProtocolClass::ManualPicking, "Xmipp - manual picking", Stage::Picking)
        .param("doInteractive", false)
        .input("inputMicrographs", trigger.port("outputMicrographs"))?
        .id();
    Ok(manual)
}

pub(crate) fn build_picking(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
) -> Result<Picked, GraphError> {
    let picking = &cfg.picking;
    let micrographs = mics.for_picking.port("outputMicrographs");
    let mut pickers: Vec<(NodeId, &'static str)> = Vec::new();

    let box_size = if picking.manual_route() {
        let manual = manual_picking(b, cfg, mics)?;
        let auto = b
            .add(ProtocolClass::AutomaticPicking, "Xmipp - auto picking", Stage::Picking)
            .param("micsToPick", 1)
            .protocols("xmippParticlePicking", vec![manual])?
            .input("inputMicrographs", micrographs)?
            .id();
        pickers.push((auto, "Xmipp auto-picking"));
        None
    } else {
        // the automatic pickers start once the hand-picked mics are done
        let wait_for = if picking.wait_manual {
            Some(manual_picking(b, cfg, mics)?)
        } else {
            None
        };
        let box_size = even_box_size(picking.part_size as f64 / mics.sampling_2d);

        if picking.cryolo {
            let id = b
                .add(
                    ProtocolClass::CryoloPicking,
                    "Sphire - CrYolo auto-picking",
                    Stage::Picking,
                )
                .param("conservPickVar", 0.03)
                .param("streamingBatchSize", 4)
                .param("gpuList", "0")
                .param("boxSize", box_size)
                .input("inputMicrographs", micrographs.clone())?
                .id();
            pickers.push((id, "crYOLO"));
        }
        if picking.relion_log {
            let id = b
                .add(
                    ProtocolClass::RelionLogPicking,
                    "Relion - LoG auto-picking",
                    Stage::Picking,
                )
                .param("conservPickVar", 0.03)
                .param("minDiameter", box_size - 20)
                .param("maxDiameter", box_size + 10)
                .param("maxResolution", -1)
                .param("threshold", -1)
                .param("streamingBatchSize", 4)
                .param("boxSize", box_size)
                .input("inputMicrographs", micrographs.clone())?
                .id();
            pickers.push((id, "Relion LoG"));
        }
        if picking.sparx {
            let id = b
                .add(ProtocolClass::SparxPicking, "Eman - Sparx auto-picking", Stage::Picking)
                .param("lowerThreshold", 0.02)
                .param("boxSize", box_size)
                .input("inputMicrographs", micrographs.clone())?
                .id();
            pickers.push((id, "Sparx"));
        }
        if picking.dog {
            let id = b
                .add(ProtocolClass::DogPicking, "Appion - DoG auto-picking", Stage::Picking)
                .param("diameter", box_size as f64 * cfg.acquisition.sampling)
                .input("inputMicrographs", micrographs)?
                .id();
            pickers.push((id, "DoG"));
        }

        if let Some(manual) = wait_for {
            for (id, _) in &pickers {
                b.add_prerequisite(*id, manual)?;
            }
        }
        Some(box_size)
    };

    match pickers.as_slice() {
        [] => Err(GraphError::MissingAlternative("particle picker")),
        [(only, name)] => {
            SinglePickerPassThrough { picker: name }.log();
            Ok(Picked {
                main: only.port("outputCoordinates"),
                union: None,
            })
        }
        _ => {
            let names: Vec<&str> = pickers.iter().map(|(_, name)| *name).collect();
            ConsensusBranches { pickers: &names }.log();

            let radius = box_size.map_or(DEFAULT_CONSENSUS_RADIUS, |size| size / 3);
            let coords: Vec<PortRef> = pickers
                .iter()
                .map(|(id, _)| id.port("outputCoordinates"))
                .collect();
            let and = b
                .add(
                    ProtocolClass::ConsensusPicking,
                    "Xmipp - consensus picking (AND)",
                    Stage::Picking,
                )
                .param("consensusRadius", radius)
                .param("consensus", CONSENSUS_AND)
                .fan_in("inputCoordinates", coords.clone())?
                .summary()
                .id();
            let or = b
                .add(
                    ProtocolClass::ConsensusPicking,
                    "Xmipp - consensus picking (OR)",
                    Stage::Picking,
                )
                .param("consensusRadius", radius)
                .param("consensus", CONSENSUS_OR)
                .fan_in("inputCoordinates", coords)?
                .id();
            Ok(Picked {
                main: and.port("consensusCoordinates"),
                union: Some(or.port("consensusCoordinates")),
            })
        }
    }
}
