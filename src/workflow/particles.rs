// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, PortRef, ProtocolClass, Stage};
use crate::workflow::picking::Picked;
use crate::workflow::preprocess::Micrographs;

/// Xmipp screening criteria: max z-score, SSNR percentage, variance
const REJ_MAXZSCORE: i64 = 1;
const REJ_PERCENTAGE_SSNR: i64 = 1;
const REJ_VARIANCE: i64 = 1;
/// `downsampleType` "other micrographs"
const DOWNSAMPLE_OTHER: i64 = 1;

/// Ends of one extract → clean → screen chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Branch {
    pub extract: NodeId,
    pub screen: NodeId,
}

/// The AND (or single-picker) branch and, with consensus, the OR branch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Particles {
    pub main: Branch,
    pub union: Branch,
}

/// One particle extraction, in a particle branch or at 3D size.
pub(crate) struct Extraction {
    pub label: String,
    pub stage: Stage,
    pub coordinates: PortRef,
    pub micrographs: PortRef,
    pub down_factor: Option<f64>,
}

pub(crate) fn add_extraction(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    ctf: NodeId,
    extraction: Extraction,
) -> Result<NodeId, GraphError> {
    let Extraction {
        label,
        stage,
        coordinates,
        micrographs,
        down_factor,
    } = extraction;
    let mut handle = b
        .add(ProtocolClass::ExtractParticles, label, stage)
        .param("boxSize", -1)
        .param("downsampleType", DOWNSAMPLE_OTHER)
        .param("doRemoveDust", true)
        .param("doNormalize", true)
        .param("doInvert", cfg.acquisition.invert_contrast)
        .param("doFlip", true);
    if let Some(factor) = down_factor {
        handle = handle.param("downFactor", factor);
    }
    Ok(handle
        .input("inputCoordinates", coordinates)?
        .input("inputMicrographs", micrographs)?
        .input("ctfRelations", ctf.port("outputCTF"))?
        .id())
}

fn build_branch(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
    coordinates: PortRef,
    suffix: &str,
    on_summary: bool,
) -> Result<Branch, GraphError> {
    let extract = add_extraction(
        b,
        cfg,
        mics.ctf,
        Extraction {
            label: format!("Xmipp - extract particles{suffix}"),
            stage: Stage::Particles,
            coordinates,
            micrographs: mics.for_picking.port("outputMicrographs"),
            down_factor: None,
        },
    )?;
    let empty = b
        .add(
            ProtocolClass::EliminateEmptyParticles,
            format!("Xmipp - Elim. empty part.{suffix}"),
            Stage::Particles,
        )
        .param("inputType", 0)
        .param("threshold", 0.6)
        .input("inputParticles", extract.port("outputParticles"))?
        .id();
    let trigger = b
        .add(
            ProtocolClass::TriggerData,
            format!("Xmipp - trigger data to stats{suffix}"),
            Stage::Particles,
        )
        .param("outputSize", 1000)
        .param("delay", 30)
        .param("allImages", true)
        .param("splitImages", false)
        .input("inputImages", empty.port("outputParticles"))?
        .id();
    let screen = b
        .add(
            ProtocolClass::ScreenParticles,
            format!("Xmipp - Screen particles{suffix}"),
            Stage::Particles,
        )
        .param("autoParRejection", REJ_MAXZSCORE)
        .param("autoParRejectionSSNR", REJ_PERCENTAGE_SSNR)
        .param("autoParRejectionVar", REJ_VARIANCE)
        .input("inputParticles", trigger.port("outputParticles"))?
        .summary_if(on_summary)
        .id();
    Ok(Branch { extract, screen })
}

pub(crate) fn build_particles(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
    picked: &Picked,
) -> Result<Particles, GraphError> {
    match &picked.union {
        None => {
            let main = build_branch(b, cfg, mics, picked.main.clone(), "", true)?;
            Ok(Particles { main, union: main })
        }
        Some(union) => {
            let main = build_branch(b, cfg, mics, picked.main.clone(), " (AND)", false)?;
            let union = build_branch(b, cfg, mics, union.clone(), " (OR)", true)?;
            Ok(Particles { main, union })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{config_from, minimal_raw};
    use crate::config::{ConfKey, RawConfig};
    use crate::graph::InputBinding;
    use crate::workflow::picking::build_picking;
    use crate::workflow::preprocess::build_preprocessing;

    fn particles(raw: &RawConfig) -> (GraphBuilder, Picked, Particles) {
        let cfg = config_from(raw);
        let mut b = GraphBuilder::new();
        let mics = build_preprocessing(&mut b, &cfg, None).unwrap();
        let picked = build_picking(&mut b, &cfg, &mics).unwrap();
        let parts = build_particles(&mut b, &cfg, &mics, &picked).unwrap();
        (b, picked, parts)
    }

    #[test]
    fn consensus_feeds_two_branches() {
        let (b, picked, parts) = particles(&minimal_raw());
        let and = b.node(parts.main.extract).unwrap();
        let or = b.node(parts.union.extract).unwrap();
        assert_eq!(and.label, "Xmipp - extract particles (AND)");
        assert_eq!(or.label, "Xmipp - extract particles (OR)");
        assert_eq!(
            and.input("inputCoordinates"),
            Some(&InputBinding::Port(picked.main.clone()))
        );
        assert_eq!(
            or.input("inputCoordinates"),
            picked.union.clone().map(InputBinding::Port).as_ref()
        );
        assert!(!b.summary().contains(&parts.main.screen));
        assert!(b.summary().contains(&parts.union.screen));
    }

    #[test]
    fn single_picker_extraction_reads_picker_output() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Cryolo, "false");
        let (b, picked, parts) = particles(&raw);
        let extract = b.node(parts.main.extract).unwrap();
        assert_eq!(extract.label, "Xmipp - extract particles");
        assert_eq!(
            b.node(picked.main.node).unwrap().class,
            ProtocolClass::RelionLogPicking
        );
        assert_eq!(
            extract.input("inputCoordinates"),
            Some(&InputBinding::Port(picked.main.clone()))
        );
        assert_eq!(parts.main.screen, parts.union.screen);
        assert!(b.summary().contains(&parts.main.screen));
    }
}
