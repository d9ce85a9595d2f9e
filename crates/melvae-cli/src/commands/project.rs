//! Project config loading shared by the commands.

use anyhow::{Context, Result};
use melvae_spec::ProjectConfig;
use std::fs;

/// Loads and validates the project config at `path`, or the defaults when no
/// path is given.
pub fn load_project_config(path: Option<&str>) -> Result<ProjectConfig> {
    let Some(path) = path else {
        let config = ProjectConfig::default();
        config.validate().context("Invalid default project config")?;
        return Ok(config);
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project config: {}", path))?;
    ProjectConfig::from_json(&json).with_context(|| format!("Invalid project config: {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use melvae_spec::SegmentShape;

    #[test]
    fn test_defaults_without_path() {
        let config = load_project_config(None).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(
            &path,
            r#"{
                "transform": { "num_mel_bands": 32, "max_frequency": 8000 },
                "model": { "segment_shape": { "mel_bands": 32, "frames": 16 } }
            }"#,
        )
        .unwrap();
        let config = load_project_config(path.to_str()).unwrap();
        assert_eq!(config.model.segment_shape, SegmentShape::new(32, 16));
        assert_eq!(config.transform.sample_rate, 22050);
    }

    #[test]
    fn test_rejects_inconsistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        fs::write(&path, r#"{ "transform": { "num_mel_bands": 32 } }"#).unwrap();
        let err = load_project_config(path.to_str()).unwrap_err();
        assert!(format!("{:#}", err).contains("mel_bands"), "{:#}", err);
    }

    #[test]
    fn test_missing_file() {
        let err = load_project_config(Some("/nonexistent/project.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read project config"));
    }
}
