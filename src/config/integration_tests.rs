// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_config, GpuSelection, WorkflowConfig};
    use std::path::{Path, PathBuf};

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("configs").join(name)
    }

    fn assert_krios_session(config: &WorkflowConfig) {
        assert_eq!(config.acquisition.sampling, 1.1);
        assert_eq!(config.acquisition.voltage, 300.0);
        assert!(config.acquisition.invert_contrast);
        assert_eq!(config.acquisition.timeout, 43200.0);
        assert_eq!(config.alignment.first_frame, 3);
        assert_eq!(config.picking.part_size, 180);
        assert_eq!(config.initial_volume.symmetry, "d2");
        assert_eq!(config.num_cpus(), 32);
        assert_eq!(config.resources.motioncor2, GpuSelection::Devices(vec![2, 3]));
        assert_eq!(config.project.projects_path, PathBuf::from("/data/projects"));
        assert!(config.project.name.ends_with("_mySelf_apoferritin"));
    }

    /// The unquoted INI config loads, casts and derives
    #[test]
    fn test_krios_ini_loading() {
        let config = load_config(fixture("scipionbox.conf"), &[]).unwrap();
        assert_krios_session(&config);
        assert_eq!(
            config.acquisition.pattern,
            "GRID_??/DATA/Images-Disc1/GridSquare_*/Data/FoilHole_*fractions.tiff"
        );
    }

    /// The TOML flavour of the same session gives the same settings
    #[test]
    fn test_krios_toml_loading() {
        let from_toml = load_config(fixture("scipionbox.toml"), &[]).unwrap();
        assert_krios_session(&from_toml);

        let from_ini = load_config(fixture("scipionbox.conf"), &[]).unwrap();
        assert_eq!(from_toml.acquisition, from_ini.acquisition);
        assert_eq!(from_toml.resources, from_ini.resources);
    }

    /// The YAML variant selects the CPU-only alternatives
    #[test]
    fn test_cpu_yaml_loading() {
        let config = load_config(fixture("scipionbox-cpu.yaml"), &[]).unwrap();

        assert_eq!(config.project.name, "cpu_run");
        assert_eq!(config.project_path(), PathBuf::from("/scratch/projects/cpu_run"));
        assert!(!config.resources.motioncor2.is_enabled());
        assert!(!config.resources.relion.is_enabled());
        assert!(!config.picking.cryolo);
        assert!(config.picking.relion_log);
        assert!(!config.analysis3d.enabled);
        assert!(crate::config::check_launch(&config).is_ok());
    }

    /// `--set` overrides win over the file
    #[test]
    fn test_overrides_on_top_of_fixture() {
        let overrides = vec!["PARTSIZE=0".to_string(), "SAMPLE_NAME=tfiih".to_string()];
        let config = load_config(fixture("scipionbox.conf"), &overrides).unwrap();

        assert!(config.picking.manual_route());
        assert!(config.project.name.ends_with("_mySelf_tfiih"));
    }
}
