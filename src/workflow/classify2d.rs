// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::WorkflowConfig;
use crate::errors::GraphError;
use crate::graph::{GraphBuilder, NodeId, PortRef, ProtocolClass, Stage};
use crate::workflow::particles::Particles;
use crate::workflow::resources::{cl2d_mpi, gpu_param, relion_mpi};

const NUMBER_OF_CLASSES: i64 = 16;
const AUTO_SELECTION_THRESHOLD: i64 = 12;

#[derive(Debug, Clone)]
pub(crate) struct Classified {
    /// Trigger releasing the particles to classify
    pub trigger: NodeId,
    /// Classifiers in build order
    pub classifiers: Vec<NodeId>,
    pub relion: Option<NodeId>,
    /// Classes-to-averages node of each classifier
    pub averages: Vec<NodeId>,
    /// Automatic class selection, source of the initial volume averages
    pub selection: NodeId,
}

impl Classified {
    /// Classifier followed by the 2D streamer: Relion when enabled.
    pub fn streamed_classifier(&self) -> Option<NodeId> {
        self.relion.or_else(|| self.classifiers.first().copied())
    }
}

/// Classifier followed by its classes-to-averages node.
fn classes_to_averages(
    b: &mut GraphBuilder,
    classifier: NodeId,
    tag: &str,
) -> Result<NodeId, GraphError> {
    Ok(b
        .add(
            ProtocolClass::EliminateEmptyClasses,
            format!("Classes to averages ({tag})"),
            Stage::Classify2d,
        )
        .param("threshold", -1)
        .param("usePopulation", false)
        .input("inputClasses", classifier.port("outputClasses"))?
        .id())
}

pub(crate) fn build_classify2d(
    b: &mut GraphBuilder,
    cfg: &WorkflowConfig,
    particles: &Particles,
) -> Result<Classified, GraphError> {
    let c2d = &cfg.classify2d;
    let res = &cfg.resources;

    let trigger = b
        .add(
            ProtocolClass::TriggerData,
            "Xmipp - trigger data to classify",
            Stage::Classify2d,
        )
        .param("outputSize", c2d.particles)
        .param("delay", 30)
        .param("allImages", false)
        .input("inputImages", particles.main.screen.port("outputParticles"))?
        .id();
    let to_classify = trigger.port("outputParticles");

    let mut classifiers = Vec::new();
    let mut averages = Vec::new();

    if c2d.cryosparc {
        let cs = b
            .add(
                ProtocolClass::CryosparcClassify2d,
                "Cryosparc2 - classify 2D",
                Stage::Classify2d,
            )
            .param("numberOfClasses", NUMBER_OF_CLASSES)
            .param("cacheParticlesSSD", c2d.cryosparc_ssd)
            .input("inputParticles", to_classify.clone())?
            .id();
        classifiers.push(cs);
        averages.push(classes_to_averages(b, cs, "cs2")?);
    }

    let mut cl2d = None;
    if c2d.xmipp {
        let id = b
            .add(ProtocolClass::Cl2d, "Xmipp - CL2D", Stage::Classify2d)
            .param("doCore", false)
            .param("numberOfClasses", NUMBER_OF_CLASSES)
            .param("numberOfMpi", cl2d_mpi(cfg.num_cpus()) as i64)
            .input("inputParticles", to_classify.clone())?
            .id();
        classifiers.push(id);
        averages.push(classes_to_averages(b, id, "xmipp")?);
        cl2d = Some(id);
    }

    let mut relion = None;
    if c2d.relion {
        let mut handle = b
            .add(
                ProtocolClass::RelionClassify2d,
                "Relion - 2D classifying",
                Stage::Classify2d,
            )
            .param("doGpu", res.relion.is_enabled())
            .param("gpusToUse", gpu_param(&res.relion))
            .param("numberOfClasses", NUMBER_OF_CLASSES)
            .param("relionCPUs", relion_mpi(cfg) as i64)
            .input("inputParticles", to_classify)?;
        // both classifiers would share a GPU
        if let Some(cl2d) = cl2d.filter(|_| res.relion == res.gl2d) {
            handle = handle.after(cl2d)?;
        }
        let id = handle.id();
        classifiers.push(id);
        averages.push(classes_to_averages(b, id, "relion")?);
        relion = Some(id);
    }

    let joined: PortRef = match averages.as_slice() {
        [] => return Err(GraphError::MissingAlternative("2D classifier")),
        [only] => only.port("outputAverages"),
        many => {
            let sources = many.iter().map(|id| id.port("outputAverages")).collect();
            b.add(
                ProtocolClass::UnionSet,
                "Scipion - Join all Averages",
                Stage::Classify2d,
            )
            .fan_in("inputSets", sources)?
            .id()
            .port("outputSet")
        }
    };

    let selection = b
        .add(
            ProtocolClass::EliminateEmptyClasses,
            "Xmipp - Auto class selection",
            Stage::InitVol,
        )
        .param("threshold", AUTO_SELECTION_THRESHOLD)
        .param("usePopulation", false)
        .input("inputClasses", joined)?
        .id();

    Ok(Classified {
        trigger,
        classifiers,
        relion,
        averages,
        selection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{config_from, minimal_raw};
    use crate::config::{ConfKey, RawConfig};
    use crate::graph::InputBinding;
    use crate::workflow::particles::build_particles;
    use crate::workflow::picking::build_picking;
    use crate::workflow::preprocess::build_preprocessing;
    use serde_json::json;

    fn classify(raw: &RawConfig) -> Result<(GraphBuilder, Classified), GraphError> {
        let cfg = config_from(raw);
        let mut b = GraphBuilder::new();
        let mics = build_preprocessing(&mut b, &cfg, None)?;
        let picked = build_picking(&mut b, &cfg, &mics)?;
        let parts = build_particles(&mut b, &cfg, &mics, &picked)?;
        let classified = build_classify2d(&mut b, &cfg, &parts)?;
        Ok((b, classified))
    }

    #[test]
    fn every_classifier_is_joined() {
        let (b, c) = classify(&minimal_raw()).unwrap();
        assert_eq!(c.classifiers.len(), 3);
        assert_eq!(c.averages.len(), 3);
        let selection = b.node(c.selection).unwrap();
        let union = match selection.input("inputClasses") {
            Some(InputBinding::Port(port)) => {
                assert_eq!(port.output, "outputSet");
                b.node(port.node).unwrap()
            }
            other => panic!("unexpected binding {other:?}"),
        };
        assert_eq!(union.class, ProtocolClass::UnionSet);
        assert_eq!(
            union.input("inputSets"),
            Some(&InputBinding::FanIn(
                c.averages.iter().map(|id| id.port("outputAverages")).collect()
            ))
        );
        assert_eq!(c.streamed_classifier(), c.relion);
    }

    #[test]
    fn single_classifier_skips_the_union() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Cryos2d, "false");
        raw.set(ConfKey::Relion2d, "false");
        raw.set(ConfKey::NumCpu, "32");
        let (b, c) = classify(&raw).unwrap();
        let cl2d = b.node(c.classifiers[0]).unwrap();
        assert_eq!(cl2d.param("numberOfMpi"), Some(&json!(12)));
        assert_eq!(
            b.node(c.selection).unwrap().input("inputClasses"),
            Some(&InputBinding::Port(c.averages[0].port("outputAverages")))
        );
        assert_eq!(c.streamed_classifier(), Some(c.classifiers[0]));
    }

    #[test]
    fn relion_waits_for_cl2d_on_a_shared_gpu() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::RelionGpu, "0");
        let (b, c) = classify(&raw).unwrap();
        let relion = b.node(c.relion.unwrap()).unwrap();
        assert_eq!(relion.prerequisites, vec![c.classifiers[1]]);

        let (b, c) = classify(&minimal_raw()).unwrap();
        assert!(b.node(c.relion.unwrap()).unwrap().prerequisites.is_empty());
    }

    #[test]
    fn no_classifier_is_reported() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Cryos2d, "false");
        raw.set(ConfKey::Relion2d, "false");
        raw.set(ConfKey::Xmipp2d, "false");
        assert!(matches!(
            classify(&raw),
            Err(GraphError::MissingAlternative("2D classifier"))
        ));
    }
}
