// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! 3D analysis, with an optional move to a finer sampling first.

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, PortRef, ProtocolClass, Stage};
use crate::observability::messages::graph::StageSkipped;
use crate::observability::messages::StructuredLog;
use crate::workflow::particles::{add_extraction, Extraction, Particles};
use crate::workflow::preprocess::Micrographs;
use crate::workflow::resources::{cryosparc_symmetry, gpu_param, relion_mpi};

/// `resizeOption` by sampling rate
const RESIZE_BY_SAMPLING: i64 = 0;

/// Volume and particles at the size the 3D protocols work with.
struct Resized {
    volume: PortRef,
    particles: NodeId,
    tag: &'static str,
}

fn resize(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
    particles: &Particles,
    volume: PortRef,
    to_3d_sampling: bool,
) -> Result<Resized, GraphError> {
    let (tag, sampling) = if to_3d_sampling {
        ("3D", cfg.analysis3d.sampling)
    } else {
        ("FULL", cfg.acquisition.sampling)
    };

    let resized = b
        .add(
            ProtocolClass::CropResizeVolumes,
            format!("Resize volume - {tag} SIZE"),
            Stage::UsefulOutputs,
        )
        .param("doResize", true)
        .param("resizeOption", RESIZE_BY_SAMPLING)
        .param("resizeSamplingRate", sampling)
        .input("inputVolumes", volume)?
        .id();

    let coords = b
        .add(
            ProtocolClass::ExtractCoords,
            format!("extract coords. to {tag} SIZE"),
            Stage::Analysis3d,
        )
        .input("inputParticles", particles.union.screen.port("outputParticles"))?
        .input("inputMicrographs", mics.full_size.port("outputMicrographs"))?
        .id();

    let extract = add_extraction(
        b,
        cfg,
        mics.ctf,
        Extraction {
            label: format!("Xmipp - extract part. {tag} SIZE"),
            stage: Stage::UsefulOutputs,
            coordinates: coords.port("outputCoordinates"),
            micrographs: mics.full_size.port("outputMicrographs"),
            down_factor: Some(sampling / cfg.acquisition.sampling),
        },
    )?;

    Ok(Resized {
        volume: resized.port("outputVol"),
        particles: extract,
        tag,
    })
}

/// Build the 3D stage. Returns the last Relion protocol, which the 2D
/// streamer waits for.
pub(crate) fn build_analysis3d(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    mics: &Micrographs,
    particles: &Particles,
    volume: Option<PortRef>,
) -> Result<Option<NodeId>, GraphError> {
    let c3d = &cfg.analysis3d;
    let Some(volume) = volume else {
        if c3d.enabled {
            return Err(GraphError::MissingAlternative("initial volume"));
        }
        StageSkipped {
            stage: "3D analysis",
            switch: "DO_3DCLASS",
        }
        .log();
        return Ok(None);
    };

    let go_full_size = c3d.full_size && mics.downsampled;
    let to_3d_sampling = c3d.sampling > 0.0 && c3d.sampling < mics.sampling_2d;
    if !c3d.enabled && !go_full_size {
        StageSkipped {
            stage: "3D analysis",
            switch: "DO_3DCLASS",
        }
        .log();
        return Ok(None);
    }

    let resized = if to_3d_sampling || go_full_size {
        resize(b, cfg, mics, particles, volume, to_3d_sampling)?
    } else {
        Resized {
            volume,
            particles: particles.main.extract,
            tag: "2D",
        }
    };
    if !c3d.enabled {
        return Ok(None);
    }

    let sym = cfg.initial_volume.symmetry.as_str();
    let relion_gpu = &cfg.resources.relion;

    let trigger = b
        .add(
            ProtocolClass::TriggerData,
            "Xmipp - trigger data to 3D",
            Stage::Analysis3d,
        )
        .param("outputSize", c3d.particles.max(1))
        .param("delay", 30)
        .param("allImages", false)
        .after(resized.volume.node)?
        .input("inputImages", particles.main.screen.port("outputParticles"))?
        .id();

    let subset = b
        .add(
            ProtocolClass::SubSet,
            format!("Scipion - clean particles {} SIZE", resized.tag),
            Stage::Analysis3d,
        )
        .input("inputFullSet", resized.particles.port("outputParticles"))?
        .input("inputSubSet", trigger.port("outputParticles"))?
        .id();
    let clean = subset.port("outputParticles");

    let mut last_relion: Option<NodeId> = None;
    if c3d.relion_refine {
        let id = b
            .add(ProtocolClass::RelionRefine3d, "Relion - Refine 3D", Stage::Analysis3d)
            .param("initialLowPassFilterA", 15)
            .param("symmetryGroup", sym)
            .param("doGpu", relion_gpu.is_enabled())
            .param("gpusToUse", gpu_param(relion_gpu))
            .param("numberOfMpi", relion_mpi(cfg) as i64)
            .input("inputParticles", clean.clone())?
            .input("referenceVolume", resized.volume.clone())?
            .id();
        last_relion = Some(id);
    }

    if c3d.relion_classify {
        let mut handle = b
            .add(ProtocolClass::RelionClassify3d, "Relion - 3D class.", Stage::Analysis3d)
            .param("symmetryGroup", sym)
            .param("doGpu", relion_gpu.is_enabled())
            .param("gpusToUse", gpu_param(relion_gpu))
            .param("numberOfMpi", relion_mpi(cfg) as i64)
            .input("inputParticles", clean.clone())?
            .input("referenceVolume", resized.volume.clone())?;
        if let Some(previous) = last_relion {
            handle = handle.after(previous)?;
        }
        last_relion = Some(handle.id());
    }

    if c3d.cryosparc {
        let (group, order) = cryosparc_symmetry(sym);
        b.add(
            ProtocolClass::CryosparcInitialModel,
            "Cryosparc2 - 3D class.",
            Stage::Analysis3d,
        )
        .param("compute_use_ssd", cfg.classify2d.cryosparc_ssd)
        .param("abinit_K", 3)
        .param("symmetryGroup", group)
        .param("symmetryOrder", order)
        .param("numberOfMpi", 2)
        .param("numberOfThreads", 2)
        .input("inputParticles", clean)?;
    }

    Ok(last_relion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{config_from, minimal_raw};
    use crate::config::{ConfKey, RawConfig};
    use crate::graph::InputBinding;
    use crate::workflow::classify2d::build_classify2d;
    use crate::workflow::particles::build_particles;
    use crate::workflow::picking::build_picking;
    use crate::workflow::preprocess::build_preprocessing;
    use crate::workflow::volume::build_initial_volume;
    use serde_json::json;

    struct Built {
        b: GraphBuilder,
        mics: Micrographs,
        parts: Particles,
        volume: PortRef,
        last_relion: Option<NodeId>,
    }

    fn analyse(raw: &RawConfig) -> Built {
        let cfg = config_from(raw);
        let mut b = GraphBuilder::new();
        let mics = build_preprocessing(&mut b, &cfg, None).unwrap();
        let picked = build_picking(&mut b, &cfg, &mics).unwrap();
        let parts = build_particles(&mut b, &cfg, &mics, &picked).unwrap();
        let classified = build_classify2d(&mut b, &cfg, &parts).unwrap();
        let volume = build_initial_volume(&mut b, &cfg, &classified).unwrap();
        let last_relion =
            build_analysis3d(&mut b, &cfg, &mics, &parts, Some(volume.clone())).unwrap();
        Built {
            b,
            mics,
            parts,
            volume,
            last_relion,
        }
    }

    fn labelled<'a>(b: &'a GraphBuilder, label: &str) -> Option<&'a crate::graph::ProtocolNode> {
        (1..=b.len() as u32)
            .map(NodeId)
            .filter_map(|id| b.node(id))
            .find(|n| n.label == label)
    }

    #[test]
    fn finer_3d_sampling_resizes_and_re_extracts() {
        let built = analyse(&minimal_raw());
        let b = &built.b;
        let resize = labelled(b, "Resize volume - 3D SIZE").unwrap();
        assert_eq!(
            resize.input("inputVolumes"),
            Some(&InputBinding::Port(built.volume.clone()))
        );
        assert_eq!(resize.param("resizeSamplingRate"), Some(&json!(1.0)));

        let coords = labelled(b, "extract coords. to 3D SIZE").unwrap();
        assert_eq!(
            coords.input("inputParticles"),
            Some(&InputBinding::Port(built.parts.union.screen.port("outputParticles")))
        );
        let extract = labelled(b, "Xmipp - extract part. 3D SIZE").unwrap();
        assert_eq!(
            extract.input("inputMicrographs"),
            Some(&InputBinding::Port(built.mics.full_size.port("outputMicrographs")))
        );
        assert_eq!(
            b.labels().get("useful_OUTPUTs").unwrap().nodes,
            vec![resize.id, extract.id]
        );

        let trigger = labelled(b, "Xmipp - trigger data to 3D").unwrap();
        assert_eq!(trigger.prerequisites, vec![resize.id]);
        assert!(labelled(b, "Scipion - clean particles 3D SIZE").is_some());
    }

    #[test]
    fn relion_protocols_are_chained() {
        let built = analyse(&minimal_raw());
        let b = &built.b;
        let refine = labelled(b, "Relion - Refine 3D").unwrap();
        let class3d = labelled(b, "Relion - 3D class.").unwrap();
        assert_eq!(class3d.prerequisites, vec![refine.id]);
        assert_eq!(built.last_relion, Some(class3d.id));
        assert_eq!(refine.param("numberOfMpi"), Some(&json!(3)));
    }

    #[test]
    fn cryosparc_gets_symmetry_numbers() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::SymGroup, "d2");
        let built = analyse(&raw);
        let cs = labelled(&built.b, "Cryosparc2 - 3D class.").unwrap();
        assert_eq!(cs.param("symmetryGroup"), Some(&json!(1)));
        assert_eq!(cs.param("symmetryOrder"), Some(&json!(2)));
    }

    #[test]
    fn no_resize_keeps_2d_particles() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Sampling3d, "4");
        raw.set(ConfKey::DoFullSize, "false");
        let built = analyse(&raw);
        let b = &built.b;
        assert!(b
            .labels()
            .get("useful_OUTPUTs")
            .map_or(true, |l| l.nodes.is_empty()));
        let subset = labelled(b, "Scipion - clean particles 2D SIZE").unwrap();
        assert_eq!(
            subset.input("inputFullSet"),
            Some(&InputBinding::Port(built.parts.main.extract.port("outputParticles")))
        );
    }

    #[test]
    fn full_size_without_3d_stops_after_extraction() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Do3dClass, "false");
        raw.set(ConfKey::Sampling3d, "-1");
        let built = analyse(&raw);
        let b = &built.b;
        assert!(labelled(b, "Xmipp - extract part. FULL SIZE").is_some());
        assert!(labelled(b, "Xmipp - trigger data to 3D").is_none());
        assert_eq!(built.last_relion, None);
    }
}
