use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::skills::Skill;

#[derive(Debug, Clone, Deserialize)]
pub struct SkillTagsConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub tags: TagConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub window: WindowConfig,
    /// Inline skill list. Takes precedence over `skills_file`.
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// JSON portfolio document holding a `skills` array.
    pub skills_file: Option<PathBuf>,
}

/// World and solver tuning. Units follow the widget's pixel/millisecond space.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity_y: f32,
    pub gravity_scale: f32,
    pub velocity_iterations: usize,
    /// Penetration (px) tolerated between resting bodies.
    pub position_slop: f32,
    pub fixed_delta_ms: f32,
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_y: 1.0,
            gravity_scale: 0.001,
            velocity_iterations: 10,
            position_slop: 0.5,
            fixed_delta_ms: 1000.0 / 60.0,
            max_substeps: 4,
        }
    }
}

/// Material of the tag bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    pub height: f32,
    pub restitution: f32,
    pub friction: f32,
    pub friction_air: f32,
    pub locked_friction_air: f32,
    pub drag_friction_air: f32,
    pub density: f32,
    pub chamfer: f32,
    /// Speed (px/ms) under which a body is put to sleep on lock.
    pub lock_sleep_speed: f32,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            height: 44.0,
            restitution: 0.15,
            friction: 0.1,
            friction_air: 0.015,
            locked_friction_air: 0.2,
            drag_friction_air: 0.005,
            density: 0.003,
            chamfer: 4.0,
            lock_sleep_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margin: f32,
    pub start_y: f32,
    pub gutter: f32,
    pub max_jitter: f32,
    pub jitter_seed: u64,
    pub fallback_char_width: f32,
    pub fallback_padding: f32,
    pub min_container: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 20.0,
            start_y: 30.0,
            gutter: 8.0,
            max_jitter: 10.0,
            jitter_seed: 0x5EED_7A65,
            fallback_char_width: 10.0,
            fallback_padding: 60.0,
            min_container: 300.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub thickness: f32,
    /// Extra width given to floor and ceiling beyond the container.
    pub overhang: f32,
    pub ceiling_y: f32,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            thickness: 60.0,
            overhang: 200.0,
            ceiling_y: -100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub refreeze_delay_ms: f64,
    pub scroll_velocity_limit: f32,
    pub scroll_force_scale: f32,
    pub scroll_jitter: f32,
    pub scroll_min_delta: f32,
    /// Fixed RNG seed for scroll jitter. Random when unset.
    pub seed: Option<u64>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            stiffness: 0.1,
            damping: 0.15,
            refreeze_delay_ms: 50.0,
            scroll_velocity_limit: 40.0,
            scroll_force_scale: 0.00005,
            scroll_jitter: 0.002,
            scroll_min_delta: 2.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_wheel_line_px")]
    pub wheel_line_px: f64,
}

fn default_title() -> String {
    "Skills".into()
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    500.0
}

fn default_font_size() -> f32 {
    14.0
}

fn default_wheel_line_px() -> f64 {
    40.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
            font_path: None,
            font_size: default_font_size(),
            wheel_line_px: default_wheel_line_px(),
        }
    }
}

impl Default for SkillTagsConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            tags: TagConfig::default(),
            layout: LayoutConfig::default(),
            boundary: BoundaryConfig::default(),
            interaction: InteractionConfig::default(),
            window: WindowConfig::default(),
            skills: Vec::new(),
            skills_file: None,
        }
    }
}

/// Parse a config document.
pub fn parse(content: &str) -> Result<SkillTagsConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Load the config file.
/// Search order:
///   1. SKILL_TAGS_CONFIG env var
///   2. ~/.skill-tags/config.toml
///   3. Default values
pub fn load() -> SkillTagsConfig {
    let candidates = [
        std::env::var("SKILL_TAGS_CONFIG").ok().map(PathBuf::from),
        dirs::home_dir().map(|h| h.join(".skill-tags/config.toml")),
    ];
    load_from(candidates.into_iter().flatten())
}

/// First readable and parseable candidate wins; failures are logged and skipped.
pub fn load_from(candidates: impl IntoIterator<Item = PathBuf>) -> SkillTagsConfig {
    for candidate in candidates {
        if !candidate.exists() {
            continue;
        }
        match fs::read_to_string(&candidate) {
            Ok(content) => match parse(&content) {
                Ok(config) => {
                    info!(
                        path = %candidate.display(),
                        skills = config.skills.len(),
                        "loaded skill-tags config"
                    );
                    return config;
                }
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "failed to parse config");
                }
            },
            Err(e) => {
                warn!(path = %candidate.display(), error = %e, "failed to read config");
            }
        }
    }

    info!("no config file found, using defaults");
    SkillTagsConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.tags.height, 44.0);
        assert_eq!(cfg.physics.gravity_scale, 0.001);
        assert_eq!(cfg.interaction.refreeze_delay_ms, 50.0);
        assert_eq!(cfg.window.title, "Skills");
        assert!(cfg.skills.is_empty());
        assert!(cfg.skills_file.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = parse(
            r#"
            [tags]
            friction_air = 0.03

            [interaction]
            seed = 7

            [[skills]]
            name = "Rust"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tags.friction_air, 0.03);
        assert_eq!(cfg.tags.locked_friction_air, 0.2);
        assert_eq!(cfg.interaction.seed, Some(7));
        assert_eq!(cfg.interaction.stiffness, 0.1);
        assert_eq!(cfg.skills.len(), 1);
        assert_eq!(cfg.skills[0].name, "Rust");
    }

    #[test]
    fn load_skips_unparseable_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let good = dir.path().join("good.toml");
        fs::write(&broken, "[tags\nheight = ").unwrap();
        fs::write(&good, "[layout]\ngutter = 12.0\n").unwrap();

        let cfg = load_from([dir.path().join("missing.toml"), broken, good]);
        assert_eq!(cfg.layout.gutter, 12.0);
    }

    #[test]
    fn load_without_candidates_uses_defaults() {
        let cfg = load_from(Vec::<PathBuf>::new());
        assert_eq!(cfg.boundary.thickness, 60.0);
    }
}
