// config.rs — 会话配置 (圆柱几何 / 投影原点 / 初始球体姿态)
//
// Config lives in a JSON file; every field is optional and falls back to the
// reference scene. Lookup order:
// - CLI: --config <path>
// - Env: GLOBE_PROJECTION_CONFIG
// - <exe_dir>/assets/projection.json
// - ./assets/projection.json
// - built-in defaults
//
// Other CLI flags: --map <path>, --export <png>, --size <px>

use crate::error::ConfigError;
use crate::projection::{CylinderGeometry, Orientation, SpherePose};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "GLOBE_PROJECTION_CONFIG";
const CONFIG_FILE_NAME: &str = "projection.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub cylinder_radius: f32,
    pub cylinder_height: f32,
    pub projection_origin: [f32; 3],
    pub sphere_position: [f32; 3],
    pub sphere_orientation: Orientation,
    /// Edge length of the projected texture in texels.
    pub texture_size: u32,
    /// RGBA written where the ray does not reach the sphere.
    pub void_color: [u8; 4],
    pub map: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cylinder_radius: 1.01,
            cylinder_height: 5.0,
            projection_origin: [0.0; 3],
            sphere_position: [0.0; 3],
            sphere_orientation: Orientation::default(),
            texture_size: 2048,
            void_color: [0, 0, 0, 255],
            map: None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checked once at startup so nothing downstream sees a malformed parameter set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry()?;
        self.initial_pose()?;
        if !Vec3::from_array(self.projection_origin).is_finite() {
            return Err(ConfigError::NonFiniteOrigin);
        }
        if self.texture_size == 0 {
            return Err(ConfigError::InvalidTextureSize);
        }
        Ok(())
    }

    pub fn geometry(&self) -> Result<CylinderGeometry, ConfigError> {
        CylinderGeometry::new(self.cylinder_radius, self.cylinder_height)
    }

    pub fn projection_origin(&self) -> Vec3 {
        Vec3::from_array(self.projection_origin)
    }

    pub fn initial_pose(&self) -> Result<SpherePose, ConfigError> {
        let orientation = self.sphere_orientation.to_quat()?;
        Ok(SpherePose::new(
            Vec3::from_array(self.sphere_position),
            orientation,
        )?)
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    pub config_path: Option<PathBuf>,
    pub map_path: Option<PathBuf>,
    pub export_path: Option<PathBuf>,
    pub texture_size: Option<u32>,
}

impl LaunchOptions {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(std::env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut it = args.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--config" => options.config_path = Some(next_value(&mut it, &a)?.into()),
                "--map" => options.map_path = Some(next_value(&mut it, &a)?.into()),
                "--export" => options.export_path = Some(next_value(&mut it, &a)?.into()),
                "--size" => {
                    let value = next_value(&mut it, &a)?;
                    let size = value
                        .parse::<u32>()
                        .ok()
                        .filter(|s| *s > 0)
                        .ok_or_else(|| ConfigError::InvalidArgument {
                            arg: a.clone(),
                            value,
                        })?;
                    options.texture_size = Some(size);
                }
                _ => log::warn!("ignoring unknown argument {a:?}"),
            }
        }
        Ok(options)
    }

    /// Load the config this launch points at and apply CLI overrides on top.
    pub fn resolve_config(&self) -> Result<SessionConfig, ConfigError> {
        let from_env = std::env::var(CONFIG_ENV_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        self.resolve_config_with(from_env)
    }

    /// `resolve_config` with the env var already read. `--config` still wins over it.
    fn resolve_config_with(&self, from_env: Option<PathBuf>) -> Result<SessionConfig, ConfigError> {
        let mut config = match self
            .config_path
            .clone()
            .or(from_env)
            .or_else(find_config_file)
        {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                SessionConfig::load(&path)?
            }
            None => {
                log::info!("no config file found, using defaults");
                SessionConfig::default()
            }
        };

        if let Some(map) = &self.map_path {
            config.map = Some(map.clone());
        }
        if let Some(size) = self.texture_size {
            config.texture_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn next_value<I>(it: &mut I, arg: &str) -> Result<String, ConfigError>
where
    I: Iterator<Item = String>,
{
    it.next()
        .ok_or_else(|| ConfigError::MissingArgument(arg.to_string()))
}

/// Find assets/projection.json by searching:
/// 1) <exe_dir>/assets/projection.json
/// 2) ./assets/projection.json  (dev working dir)
fn find_config_file() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(CONFIG_FILE_NAME);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(CONFIG_FILE_NAME);
    if p.exists() {
        return Some(p);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_reference_scene() {
        let config = SessionConfig::default();
        assert_eq!(config.cylinder_radius, 1.01);
        assert_eq!(config.cylinder_height, 5.0);
        assert_eq!(config.void_color, [0, 0, 0, 255]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{
                "cylinder_height": 3.0,
                "sphere_orientation": { "kind": "axis_angle", "axis": [1, 0, 0], "angle_deg": 180 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.cylinder_height, 3.0);
        assert_eq!(config.cylinder_radius, 1.01);
        let pose = config.initial_pose().unwrap();
        assert!((pose.orientation.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<SessionConfig>(r#"{ "cylinder_radus": 2.0 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut config = SessionConfig {
            cylinder_radius: -1.0,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRadius(_))));

        config.cylinder_radius = 1.0;
        config.texture_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTextureSize)));

        config.texture_size = 16;
        config.sphere_orientation = Orientation::Quaternion { xyzw: [0.0; 4] };
        assert!(matches!(config.validate(), Err(ConfigError::Pose(_))));
    }

    #[test]
    fn parse_reads_flags() {
        let options = LaunchOptions::parse(args(&[
            "--map",
            "world.jpg",
            "--export",
            "out.png",
            "--size",
            "512",
        ]))
        .unwrap();
        assert_eq!(options.map_path, Some(PathBuf::from("world.jpg")));
        assert_eq!(options.export_path, Some(PathBuf::from("out.png")));
        assert_eq!(options.texture_size, Some(512));
        assert_eq!(options.config_path, None);
    }

    #[test]
    fn parse_rejects_missing_and_invalid_values() {
        assert!(matches!(
            LaunchOptions::parse(args(&["--config"])),
            Err(ConfigError::MissingArgument(_))
        ));
        assert!(matches!(
            LaunchOptions::parse(args(&["--size", "zero"])),
            Err(ConfigError::InvalidArgument { .. })
        ));
        assert!(matches!(
            LaunchOptions::parse(args(&["--size", "0"])),
            Err(ConfigError::InvalidArgument { .. })
        ));
    }

    /// Write `json` to a per-test file under the temp dir.
    fn temp_config(tag: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "globe_projection_{tag}_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn cli_config_wins_over_env_var() {
        let cli = temp_config("cli", r#"{ "cylinder_height": 3.0 }"#);
        let env = temp_config("env", r#"{ "cylinder_height": 7.0 }"#);

        let options = LaunchOptions {
            config_path: Some(cli.clone()),
            ..LaunchOptions::default()
        };
        let config = options.resolve_config_with(Some(env.clone())).unwrap();
        assert_eq!(config.cylinder_height, 3.0);

        let config = LaunchOptions::default()
            .resolve_config_with(Some(env.clone()))
            .unwrap();
        assert_eq!(config.cylinder_height, 7.0);

        let _ = std::fs::remove_file(cli);
        let _ = std::fs::remove_file(env);
    }

    #[test]
    fn missing_config_falls_back_to_reference_scene() {
        // ./assets/projection.json, when found, holds the same values as the defaults
        let config = LaunchOptions::default().resolve_config_with(None).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn cli_flags_override_file_values() {
        let path = temp_config(
            "overrides",
            r#"{ "cylinder_radius": 2.0, "texture_size": 256, "map": "from_file.jpg" }"#,
        );
        let options = LaunchOptions {
            config_path: Some(path.clone()),
            map_path: Some(PathBuf::from("from_cli.jpg")),
            texture_size: Some(64),
            ..LaunchOptions::default()
        };
        let config = options.resolve_config_with(None).unwrap();
        assert_eq!(config.texture_size, 64);
        assert_eq!(config.map, Some(PathBuf::from("from_cli.jpg")));
        assert_eq!(config.cylinder_radius, 2.0);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn overrides_are_validated() {
        let path = temp_config("bad_override", r#"{ "texture_size": 256 }"#);
        let options = LaunchOptions {
            config_path: Some(path.clone()),
            texture_size: Some(0),
            ..LaunchOptions::default()
        };
        assert!(matches!(
            options.resolve_config_with(None),
            Err(ConfigError::InvalidTextureSize)
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let path = temp_config("bad_file", r#"{ "cylinder_radius": 0.0 }"#);
        let options = LaunchOptions {
            config_path: Some(path.clone()),
            ..LaunchOptions::default()
        };
        assert!(matches!(
            options.resolve_config_with(None),
            Err(ConfigError::InvalidRadius(_))
        ));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_reports_missing_file() {
        let missing = std::env::temp_dir().join("globe_projection_no_such_config.json");
        assert!(matches!(
            SessionConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
