use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::components::viewport::FitOptions;

/// User-tunable editor settings, stored as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Quiet period before the draft is written.
    pub autosave_delay_ms: u64,
    pub fit_padding: f32,
    pub max_fit_scale: f32,
    pub png_pixel_ratio: f32,
    pub pdf_pixel_ratio: f32,
    /// Fold every move of one drag into a single undo step instead of one
    /// step per move event.
    pub coalesce_drag_history: bool,
    /// Where drafts and saved projects live. Empty = platform default.
    pub data_dir: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 2000,
            fit_padding: 60.0,
            max_fit_scale: 0.9,
            png_pixel_ratio: 2.0,
            pdf_pixel_ratio: 1.5,
            coalesce_drag_history: false,
            data_dir: String::new(),
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    ///
    /// On Linux:   $XDG_CONFIG_HOME/flyerfe/flyerfe_settings.cfg
    /// On Windows: %APPDATA%\FlyerFE\flyerfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/FlyerFE/flyerfe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("FlyerFE").join("flyerfe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("FlyerFE")
                    .join("flyerfe_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("flyerfe").join("flyerfe_settings.cfg"))
        }
    }

    /// Load from the platform path (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines. Unknown keys are skipped and bad values keep
    /// their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        let d = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "autosave_delay_ms" => s.autosave_delay_ms = val.parse().unwrap_or(d.autosave_delay_ms),
                "fit_padding" => s.fit_padding = val.parse().unwrap_or(d.fit_padding),
                "max_fit_scale" => s.max_fit_scale = val.parse().unwrap_or(d.max_fit_scale),
                "png_pixel_ratio" => s.png_pixel_ratio = val.parse().unwrap_or(d.png_pixel_ratio),
                "pdf_pixel_ratio" => s.pdf_pixel_ratio = val.parse().unwrap_or(d.pdf_pixel_ratio),
                "coalesce_drag_history" => s.coalesce_drag_history = val == "true",
                "data_dir" => s.data_dir = val.to_string(),
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "autosave_delay_ms={}\n\
             fit_padding={}\n\
             max_fit_scale={}\n\
             png_pixel_ratio={}\n\
             pdf_pixel_ratio={}\n\
             coalesce_drag_history={}\n\
             data_dir={}\n",
            self.autosave_delay_ms,
            self.fit_padding,
            self.max_fit_scale,
            self.png_pixel_ratio,
            self.pdf_pixel_ratio,
            self.coalesce_drag_history,
            self.data_dir,
        )
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_warn!("Could not write settings to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions { padding: self.fit_padding, max_scale: self.max_fit_scale }
    }

    /// Directory for drafts and saved projects.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            crate::logger::app_data_dir()
        } else {
            PathBuf::from(&self.data_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flyerfe_settings.cfg");
        let settings = EditorSettings {
            autosave_delay_ms: 500,
            coalesce_drag_history: true,
            data_dir: "/tmp/flyers".into(),
            ..EditorSettings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path), settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorSettings::load_from(&dir.path().join("nope.cfg")), EditorSettings::default());
    }

    #[test]
    fn bad_values_fall_back() {
        let s = EditorSettings::parse("autosave_delay_ms=soon\nfit_padding=12.5\nunknown=1\nnot a pair\n");
        assert_eq!(s.autosave_delay_ms, 2000);
        assert_eq!(s.fit_padding, 12.5);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let s = EditorSettings { data_dir: "/srv/flyers".into(), ..EditorSettings::default() };
        assert_eq!(s.resolved_data_dir(), PathBuf::from("/srv/flyers"));
    }
}
