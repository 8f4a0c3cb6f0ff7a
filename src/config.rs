// <project_dir>/.megaseq/config.json
//
// Everything here is a build-time constant on the console; on the host it is a file so
// the same binary can drive either kit generation or FM level shape.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::pipeline::kit::KitLayout;
use crate::pipeline::persistence::ChecksumPolicy;
use crate::pipeline::project::FmLevelShape;

pub const MEGASEQ_DIR: &str = ".megaseq";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kit_layout: KitLayout,
    /// WAV to build the kit from. Relative paths are taken from the project directory.
    pub kit_path: Option<PathBuf>,
    pub fm_levels: FmLevelShape,
    pub checksum: ChecksumPolicy,
    pub bus_grant_polls: u32,
    pub fm_busy_polls: u32,
    /// Inside the .megaseq directory.
    pub sram_file: String,
    pub log_level: String,
    pub audio: bool,
    /// PSG attenuation for a sounding step, 0 loudest.
    pub psg_step_level: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kit_layout: KitLayout::default(),
            kit_path: None,
            fm_levels: FmLevelShape::default(),
            checksum: ChecksumPolicy::default(),
            bus_grant_polls: 1000,
            fm_busy_polls: 1000,
            sram_file: "sram.bin".into(),
            log_level: "info".into(),
            audio: true,
            psg_step_level: 5,
        }
    }
}

pub fn megaseq_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(MEGASEQ_DIR)
}

fn config_file_path(project_dir: &Path) -> PathBuf {
    megaseq_dir(project_dir).join(CONFIG_FILE)
}

impl Config {
    /// Read the config, writing the defaults out first if there isn't one.
    pub fn load_or_init(project_dir: &Path) -> anyhow::Result<Self> {
        let path = config_file_path(project_dir);
        if !path.exists() {
            let config = Config::default();
            config.save(project_dir)?;
            return Ok(config);
        }
        let data = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn save(&self, project_dir: &Path) -> anyhow::Result<()> {
        let path = config_file_path(project_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn sram_path(&self, project_dir: &Path) -> PathBuf {
        megaseq_dir(project_dir).join(&self.sram_file)
    }

    pub fn kit_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.kit_path.as_ref().map(|p| project_dir.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_init(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(".megaseq/config.json").exists());
    }

    #[test]
    fn partial_file_fills_in_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".megaseq")).unwrap();
        std::fs::write(
            dir.path().join(".megaseq/config.json"),
            r#"{ "kit_layout": "multi", "checksum": "lenient", "fm_levels": "carrier" }"#,
        )
        .unwrap();
        let config = Config::load_or_init(dir.path()).unwrap();
        assert_eq!(config.kit_layout, KitLayout::Multi);
        assert_eq!(config.checksum, ChecksumPolicy::Lenient);
        assert_eq!(config.fm_levels, FmLevelShape::Carrier);
        assert_eq!(config.bus_grant_polls, 1000);
        assert_eq!(config.psg_step_level, 5);
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".megaseq")).unwrap();
        std::fs::write(dir.path().join(".megaseq/config.json"), "{ nope").unwrap();
        assert!(Config::load_or_init(dir.path()).is_err());
    }

    #[test]
    fn paths_hang_off_the_project() {
        let config = Config { kit_path: Some("kits/amen.wav".into()), ..Config::default() };
        let root = Path::new("/tmp/song");
        assert_eq!(config.sram_path(root), Path::new("/tmp/song/.megaseq/sram.bin"));
        assert_eq!(config.kit_path(root).unwrap(), Path::new("/tmp/song/kits/amen.wav"));
    }
}
