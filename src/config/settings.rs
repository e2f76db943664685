// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The typed configuration the workflow is built from.

use crate::config::cast::{expand_vars, ConfValue};
use crate::config::consts::{
    DEFAULT_USER_DATA_DIR, FALLBACK_CPUS, PATTERN_ENV_VAR, USER_DATA_ENV_VAR,
};
use crate::config::loader::RawConfig;
use crate::config::schema::ConfKey;
use crate::errors::{ConfigError, ConfigProblem};
use crate::observability::messages::config::DerivedValue;
use crate::observability::messages::StructuredLog;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// GPUs assigned to a protocol family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuSelection {
    /// A negative id: run on CPU
    Disabled,
    Devices(Vec<u32>),
}

impl GpuSelection {
    /// A single integer `< 0` disables the GPU; a single id or a list split
    /// on `,`, `:` or `-` selects devices.
    pub fn parse(raw: &str) -> Option<GpuSelection> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(GpuSelection::Disabled);
        }
        if let Ok(id) = trimmed.parse::<i64>() {
            return Some(match u32::try_from(id) {
                Ok(id) => GpuSelection::Devices(vec![id]),
                Err(_) => GpuSelection::Disabled,
            });
        }
        let ids = trimmed
            .split([',', ':', '-'])
            .map(|part| part.trim().parse::<u32>().ok())
            .collect::<Option<Vec<u32>>>()?;
        Some(GpuSelection::Devices(ids))
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, GpuSelection::Devices(ids) if !ids.is_empty())
    }

    pub fn ids(&self) -> &[u32] {
        match self {
            GpuSelection::Disabled => &[],
            GpuSelection::Devices(ids) => ids,
        }
    }

    pub fn count(&self) -> usize {
        self.ids().len()
    }
}

impl fmt::Display for GpuSelection {
    /// Space-separated ids, the form the `gpuList` parameters take.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids().iter().map(|id| id.to_string()).collect();
        f.write_str(&ids.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    pub pattern: String,
    pub deposition_dir: PathBuf,
    pub deposition_pattern: String,
    pub simulation: bool,
    pub raw_data_sim: String,
    pub gain_pattern: String,
    pub amplitude_contrast: f64,
    pub spherical_aberration: f64,
    pub voltage: f64,
    pub sampling: f64,
    /// Seconds without new movies before the import stops
    pub timeout: f64,
    pub invert_contrast: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentSettings {
    pub first_frame: i64,
    pub last_frame: i64,
    pub dose_initial: f64,
    pub dose_per_frame: f64,
    pub optical_flow: bool,
}

impl AlignmentSettings {
    pub fn dose_weighting(&self) -> bool {
        self.dose_per_frame > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickingSettings {
    /// Particle size in Angstroms; `0` selects the manual-picking route
    pub part_size: i64,
    pub mics_to_pick: i64,
    pub cryolo: bool,
    pub relion_log: bool,
    pub sparx: bool,
    pub dog: bool,
    pub wait_manual: bool,
}

impl PickingSettings {
    pub fn manual_route(&self) -> bool {
        self.part_size == 0
    }

    pub fn any_automatic(&self) -> bool {
        self.cryolo || self.relion_log || self.sparx || self.dog
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classify2dSettings {
    pub enabled: bool,
    pub sampling: f64,
    pub particles: i64,
    pub relion: bool,
    pub xmipp: bool,
    pub cryosparc: bool,
    pub cryosparc_ssd: bool,
}

impl Classify2dSettings {
    pub fn any_classifier(&self) -> bool {
        self.relion || self.xmipp || self.cryosparc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitialVolumeSettings {
    pub enabled: bool,
    pub symmetry: String,
    pub significant: bool,
    pub eman: bool,
    pub ransac: bool,
}

impl InitialVolumeSettings {
    pub fn any_estimator(&self) -> bool {
        self.significant || self.eman || self.ransac
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis3dSettings {
    pub enabled: bool,
    pub sampling: f64,
    pub particles: i64,
    pub relion_refine: bool,
    pub relion_classify: bool,
    pub cryosparc: bool,
    pub full_size: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSettings {
    /// `<= 0` means detect from the host
    pub num_cpu: i64,
    pub motioncor2: GpuSelection,
    pub gctf: GpuSelection,
    pub relion: GpuSelection,
    pub gl2d: GpuSelection,
}

impl ResourceSettings {
    pub fn num_cpus(&self) -> usize {
        if self.num_cpu > 0 {
            return self.num_cpu as usize;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_CPUS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSettings {
    pub name: String,
    pub projects_path: PathBuf,
    pub user: String,
    pub sample: String,
    pub scheduler_cmd: String,
    pub simulation_cmd: String,
}

/// Every setting the launcher needs, cast and derived once.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowConfig {
    pub acquisition: AcquisitionSettings,
    pub alignment: AlignmentSettings,
    pub picking: PickingSettings,
    pub classify2d: Classify2dSettings,
    pub initial_volume: InitialVolumeSettings,
    pub analysis3d: Analysis3dSettings,
    pub resources: ResourceSettings,
    pub project: ProjectSettings,
}

/// Typed access to the cast map. Keys are guaranteed present by the schema
/// (mandatory or defaulted) once `cast_all` succeeded.
struct Values<'a> {
    map: &'a BTreeMap<ConfKey, ConfValue>,
    problems: Vec<ConfigProblem>,
}

impl Values<'_> {
    fn mismatch(&mut self, key: ConfKey) {
        self.problems.push(ConfigProblem::InvalidValue {
            key: key.name().to_string(),
            value: self
                .map
                .get(&key)
                .map(|v| format!("{:?}", v))
                .unwrap_or_default(),
            expected: key.cast().expected(),
        });
    }

    fn int(&mut self, key: ConfKey) -> i64 {
        match self.map.get(&key).and_then(ConfValue::as_int) {
            Some(v) => v,
            None => {
                self.mismatch(key);
                0
            }
        }
    }

    fn float(&mut self, key: ConfKey) -> f64 {
        match self.map.get(&key).and_then(ConfValue::as_float) {
            Some(v) => v,
            None => {
                self.mismatch(key);
                0.0
            }
        }
    }

    fn flag(&mut self, key: ConfKey) -> bool {
        match self.map.get(&key).and_then(ConfValue::as_bool) {
            Some(v) => v,
            None => {
                self.mismatch(key);
                false
            }
        }
    }

    fn string(&mut self, key: ConfKey) -> String {
        match self.map.get(&key).and_then(ConfValue::as_str) {
            Some(v) => v.to_string(),
            None => {
                self.mismatch(key);
                String::new()
            }
        }
    }

    fn optional_string(&self, key: ConfKey) -> Option<String> {
        self.map
            .get(&key)
            .and_then(ConfValue::as_str)
            .map(str::to_string)
    }

    fn pair(&mut self, key: ConfKey) -> (i64, i64) {
        match self.map.get(&key).and_then(ConfValue::as_pair) {
            Some(v) => v,
            None => {
                self.mismatch(key);
                (0, 0)
            }
        }
    }

    fn gpu(&mut self, key: ConfKey) -> GpuSelection {
        let raw = self.string(key);
        match GpuSelection::parse(&raw) {
            Some(selection) => selection,
            None => {
                self.problems.push(ConfigProblem::InvalidValue {
                    key: key.name().to_string(),
                    value: raw,
                    expected: "a GPU id or a list of ids (ie. 0,1)",
                });
                GpuSelection::Disabled
            }
        }
    }
}

impl WorkflowConfig {
    /// Cast and derive using today's local date and the process environment.
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let today = chrono::Local::now().date_naive();
        Self::from_raw_with(raw, today, |name| std::env::var(name).ok())
    }

    pub fn from_raw_with<F>(raw: &RawConfig, today: NaiveDate, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let map = raw
            .cast_all(&env)
            .map_err(|problems| ConfigError::Invalid { problems })?;
        let mut v = Values {
            map: &map,
            problems: Vec::new(),
        };

        let (first_frame, last_frame) = v.pair(ConfKey::Frames);
        let mut config = WorkflowConfig {
            acquisition: AcquisitionSettings {
                pattern: v.string(ConfKey::Pattern),
                deposition_dir: PathBuf::from(v.string(ConfKey::DepositionDir)),
                deposition_pattern: String::new(),
                simulation: v.flag(ConfKey::Simulation),
                raw_data_sim: v.string(ConfKey::RawDataSim),
                gain_pattern: v.string(ConfKey::GainPattern),
                amplitude_contrast: v.float(ConfKey::AmplitudeContrast),
                spherical_aberration: v.float(ConfKey::SphericalAberration),
                voltage: v.float(ConfKey::Voltage),
                sampling: v.float(ConfKey::Sampling),
                timeout: v.float(ConfKey::Timeout),
                invert_contrast: v.flag(ConfKey::InvertContrast),
            },
            alignment: AlignmentSettings {
                first_frame,
                last_frame,
                dose_initial: v.float(ConfKey::DoseInitial),
                dose_per_frame: v.float(ConfKey::DosePerFrame),
                optical_flow: v.flag(ConfKey::OpticalFlow),
            },
            picking: PickingSettings {
                part_size: v.int(ConfKey::PartSize),
                mics_to_pick: v.int(ConfKey::Mics2Pick),
                cryolo: v.flag(ConfKey::Cryolo),
                relion_log: v.flag(ConfKey::RelionPick),
                sparx: v.flag(ConfKey::Sparx),
                dog: v.flag(ConfKey::DogPick),
                wait_manual: v.flag(ConfKey::Wait2Pick),
            },
            classify2d: Classify2dSettings {
                enabled: v.flag(ConfKey::Do2dClass),
                sampling: v.float(ConfKey::Sampling2d),
                particles: v.int(ConfKey::Parts2Class),
                relion: v.flag(ConfKey::Relion2d),
                xmipp: v.flag(ConfKey::Xmipp2d),
                cryosparc: v.flag(ConfKey::Cryos2d),
                cryosparc_ssd: v.flag(ConfKey::UseCryosSsd),
            },
            initial_volume: InitialVolumeSettings {
                enabled: v.flag(ConfKey::DoInitVol),
                symmetry: v.string(ConfKey::SymGroup),
                significant: v.flag(ConfKey::Significant),
                eman: v.flag(ConfKey::EmanInitial),
                ransac: v.flag(ConfKey::Ransac),
            },
            analysis3d: Analysis3dSettings {
                enabled: v.flag(ConfKey::Do3dClass),
                sampling: v.float(ConfKey::Sampling3d),
                particles: v.int(ConfKey::Parts3d),
                relion_refine: v.flag(ConfKey::RelionRefine),
                relion_classify: v.flag(ConfKey::Relion3dcl),
                cryosparc: v.flag(ConfKey::Cryos3d),
                full_size: v.flag(ConfKey::DoFullSize),
            },
            resources: ResourceSettings {
                num_cpu: v.int(ConfKey::NumCpu),
                motioncor2: v.gpu(ConfKey::MotionCor2Gpu),
                gctf: v.gpu(ConfKey::GctfGpu),
                relion: v.gpu(ConfKey::RelionGpu),
                gl2d: v.gpu(ConfKey::Gl2dGpu),
            },
            project: ProjectSettings {
                name: String::new(),
                projects_path: PathBuf::new(),
                user: v.string(ConfKey::UserName),
                sample: v.string(ConfKey::SampleName),
                scheduler_cmd: v.string(ConfKey::SchedulerCmd),
                simulation_cmd: v.string(ConfKey::SimulationCmd),
            },
        };

        let configured_name = v.optional_string(ConfKey::ProjectName);
        let configured_projects = v.optional_string(ConfKey::ProjectsPath);
        let configured_pattern = v.optional_string(ConfKey::DepositionPattern);

        if !v.problems.is_empty() {
            return Err(ConfigError::Invalid {
                problems: v.problems,
            });
        }

        config.derive_paths(
            configured_name,
            configured_projects,
            configured_pattern,
            today,
            &env,
        );
        Ok(config)
    }

    /// Fill the values computed from others when they were not configured.
    fn derive_paths<F>(
        &mut self,
        name: Option<String>,
        projects_path: Option<String>,
        deposition_pattern: Option<String>,
        today: NaiveDate,
        env: &F,
    ) where
        F: Fn(&str) -> Option<String>,
    {
        self.project.name = name.unwrap_or_else(|| {
            let derived = default_project_name(today, &self.project.user, &self.project.sample);
            DerivedValue {
                key: ConfKey::ProjectName.name(),
                value: &derived,
            }
            .log();
            derived
        });

        if self.acquisition.simulation {
            self.acquisition.deposition_dir =
                self.acquisition.deposition_dir.join(&self.project.name);
        }

        self.acquisition.deposition_pattern = deposition_pattern.unwrap_or_else(|| {
            let pattern = env(PATTERN_ENV_VAR).unwrap_or_else(|| self.acquisition.pattern.clone());
            let derived = self
                .acquisition
                .deposition_dir
                .join(pattern)
                .to_string_lossy()
                .into_owned();
            DerivedValue {
                key: ConfKey::DepositionPattern.name(),
                value: &derived,
            }
            .log();
            derived
        });

        self.project.projects_path = match projects_path {
            Some(path) => PathBuf::from(path),
            None => {
                let derived = default_projects_path(env);
                DerivedValue {
                    key: ConfKey::ProjectsPath.name(),
                    value: &derived.to_string_lossy(),
                }
                .log();
                derived
            }
        };
    }

    pub fn project_path(&self) -> PathBuf {
        self.project.projects_path.join(&self.project.name)
    }

    pub fn num_cpus(&self) -> usize {
        self.resources.num_cpus()
    }
}

/// `$SCIPION_USER_DATA/projects`, or `~/ScipionUserData/projects`.
pub fn default_projects_path<F>(env: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let base = match env(USER_DATA_ENV_VAR) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(expand_vars("~", env)).join(DEFAULT_USER_DATA_DIR),
    };
    base.join("projects")
}

/// `<YYYYMMDD>_<user>_<sample>`
pub fn default_project_name(today: NaiveDate, user: &str, sample: &str) -> String {
    format!("{}_{}_{}", today.format("%Y%m%d"), user, sample)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn minimal_raw() -> RawConfig {
        let (raw, problems) = RawConfig::from_entries(
            [
                ("SCIPION_ACQUISITION_PATTERN", "GRID_??/*.tiff"),
                ("SPH_AB", "2.7"),
                ("VOL_KV", "300"),
                ("SAMPLING", "1.1"),
                ("INV_CONTR", "true"),
                ("DEPOSITION_DIR", "/data/session"),
                ("PROJECTS_PATH", "/tmp/projects"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        assert!(problems.is_empty());
        raw
    }

    pub(crate) fn config_from(raw: &RawConfig) -> WorkflowConfig {
        let today = NaiveDate::from_ymd_opt(2019, 3, 14).unwrap();
        WorkflowConfig::from_raw_with(raw, today, |_| None).unwrap()
    }

    #[test]
    fn gpu_selection_forms() {
        assert_eq!(GpuSelection::parse("-1"), Some(GpuSelection::Disabled));
        assert_eq!(GpuSelection::parse("2"), Some(GpuSelection::Devices(vec![2])));
        assert_eq!(GpuSelection::parse("2,3"), Some(GpuSelection::Devices(vec![2, 3])));
        assert_eq!(GpuSelection::parse("0:1"), Some(GpuSelection::Devices(vec![0, 1])));
        assert_eq!(GpuSelection::parse("0-1-2").map(|g| g.count()), Some(3));
        assert_eq!(GpuSelection::parse("a,b"), None);
        assert_eq!(GpuSelection::Devices(vec![2, 3]).to_string(), "2 3");
        assert!(!GpuSelection::Disabled.is_enabled());
    }

    #[test]
    fn project_name_is_derived_from_date_user_and_sample() {
        let cfg = config_from(&minimal_raw());
        assert_eq!(cfg.project.name, "20190314_mySelf_myProtein");
        assert_eq!(
            cfg.project_path(),
            PathBuf::from("/tmp/projects/20190314_mySelf_myProtein")
        );
    }

    #[test]
    fn configured_project_name_wins() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::ProjectName, "apoferritin_test");
        raw.set(ConfKey::UserName, "ana");
        assert_eq!(config_from(&raw).project.name, "apoferritin_test");
    }

    #[test]
    fn simulation_nests_deposition_dir_under_project() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::Simulation, "yes");
        let cfg = config_from(&raw);
        assert_eq!(
            cfg.acquisition.deposition_dir,
            PathBuf::from("/data/session/20190314_mySelf_myProtein")
        );
        assert_eq!(
            cfg.acquisition.deposition_pattern,
            "/data/session/20190314_mySelf_myProtein/GRID_??/*.tiff"
        );
    }

    #[test]
    fn pattern_env_var_overrides_configured_pattern() {
        let raw = minimal_raw();
        let today = NaiveDate::from_ymd_opt(2019, 3, 14).unwrap();
        let env = |name: &str| match name {
            "SCIPION_ACQUISITION_PATTERN" => Some("*.mrc".to_string()),
            _ => None,
        };
        let cfg = WorkflowConfig::from_raw_with(&raw, today, env).unwrap();
        assert_eq!(cfg.acquisition.deposition_pattern, "/data/session/*.mrc");
    }

    #[test]
    fn projects_path_comes_from_user_data_env() {
        let (mut raw, _) = RawConfig::from_entries(Vec::new());
        for (k, v) in [
            (ConfKey::Pattern, "*.tiff"),
            (ConfKey::SphericalAberration, "2.7"),
            (ConfKey::Voltage, "300"),
            (ConfKey::Sampling, "1.1"),
            (ConfKey::InvertContrast, "0"),
        ] {
            raw.set(k, v);
        }
        let today = NaiveDate::from_ymd_opt(2019, 3, 14).unwrap();
        let env = |name: &str| match name {
            "SCIPION_USER_DATA" => Some("/opt/scipion-data".to_string()),
            _ => None,
        };
        let cfg = WorkflowConfig::from_raw_with(&raw, today, env).unwrap();
        assert_eq!(cfg.project.projects_path, PathBuf::from("/opt/scipion-data/projects"));
    }

    #[test]
    fn defaults_are_cast() {
        let cfg = config_from(&minimal_raw());
        assert_eq!((cfg.alignment.first_frame, cfg.alignment.last_frame), (3, 0));
        assert!(cfg.alignment.dose_weighting());
        assert_eq!(cfg.picking.part_size, 250);
        assert_eq!(cfg.initial_volume.symmetry, "c1");
        assert_eq!(cfg.resources.motioncor2, GpuSelection::Devices(vec![2, 3]));
        assert_eq!(cfg.acquisition.timeout, 60.0);
    }

    #[test]
    fn explicit_cpu_count_is_used() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::NumCpu, "24");
        assert_eq!(config_from(&raw).num_cpus(), 24);
        assert!(config_from(&minimal_raw()).num_cpus() >= 1);
    }

    #[test]
    fn invalid_gpu_list_is_reported() {
        let mut raw = minimal_raw();
        raw.set(ConfKey::GctfGpu, "first");
        let today = NaiveDate::from_ymd_opt(2019, 3, 14).unwrap();
        let err = WorkflowConfig::from_raw_with(&raw, today, |_| None).unwrap_err();
        assert!(err.to_string().contains("GCTF_GPU"));
    }
}
