//! Environment options and their process-wide defaults.
//!
//! Job-supplied overrides layer over the defaults field by field; an
//! override wins whenever it is present.

use serde::{Deserialize, Serialize};

/// Browser-like User-Agent presented by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default screen profile.
pub const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 1440,
    height: 900,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Fully resolved environment options for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvOptions {
    pub url: String,
    pub screen: Viewport,
    pub user_agent: String,
    pub snapshot: bool,
    pub load_images: bool,
    pub web_security: bool,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            screen: DEFAULT_VIEWPORT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            snapshot: false,
            load_images: true,
            web_security: false,
        }
    }
}

/// Per-job option overrides carried in the job payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvOverrides {
    pub screen: Option<Viewport>,
    pub user_agent: Option<String>,
    pub snapshot: Option<bool>,
    pub load_images: Option<bool>,
    pub web_security: Option<bool>,
}

impl EnvOptions {
    /// Layer job overrides over the defaults.
    pub fn merged(defaults: &EnvOptions, overrides: Option<&EnvOverrides>) -> EnvOptions {
        let mut options = defaults.clone();
        if let Some(o) = overrides {
            if let Some(screen) = o.screen {
                options.screen = screen;
            }
            if let Some(user_agent) = &o.user_agent {
                options.user_agent = user_agent.clone();
            }
            if let Some(snapshot) = o.snapshot {
                options.snapshot = snapshot;
            }
            if let Some(load_images) = o.load_images {
                options.load_images = load_images;
            }
            if let Some(web_security) = o.web_security {
                options.web_security = web_security;
            }
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_without_overrides_keeps_defaults() {
        let defaults = EnvOptions::default();
        let merged = EnvOptions::merged(&defaults, None);
        assert_eq!(merged, defaults);
        assert!(merged.load_images);
        assert!(!merged.snapshot);
    }

    #[test]
    fn merged_overrides_win_field_by_field() {
        let defaults = EnvOptions::default();
        let overrides = EnvOverrides {
            load_images: Some(false),
            user_agent: Some("test-agent".to_string()),
            ..Default::default()
        };

        let merged = EnvOptions::merged(&defaults, Some(&overrides));
        assert!(!merged.load_images);
        assert_eq!(merged.user_agent, "test-agent");
        // Untouched fields stay at their defaults.
        assert_eq!(merged.screen, DEFAULT_VIEWPORT);
        assert!(!merged.web_security);
    }

    #[test]
    fn overrides_deserialize_camel_case() {
        let overrides: EnvOverrides =
            serde_json::from_str(r#"{"loadImages": false, "webSecurity": true}"#).unwrap();
        assert_eq!(overrides.load_images, Some(false));
        assert_eq!(overrides.web_security, Some(true));
        assert!(overrides.screen.is_none());
    }
}
