//! Content catalog: the text, media and menus behind every screen.
//!
//! The dispatcher only decides which screen to show; what a screen says lives here as
//! data. A catalog is a JSON file; the bundled one is compiled in and written out by `init`.

use crate::channels::message::MAX_BUTTONS;
use crate::channels::{Button, MediaType, OutboundMessage};
use crate::dialogue::Screen;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Bundled catalog JSON.
pub const BUILTIN_CATALOG: &str = include_str!("../../config/catalog.json");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("reading catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing catalog {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog has no screen '{0}'")]
    MissingScreen(String),
    #[error("screen '{0}' has no steps")]
    EmptyScreen(String),
    #[error("screen '{screen}' has a button step with {count} buttons (expected 1-{max})", max = MAX_BUTTONS)]
    ButtonCount { screen: String, count: usize },
}

/// One entry within a screen, run in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "StepEntry")]
pub enum Step {
    Send(OutboundMessage),
    /// Pacing delay before the next step; skipped when pacing is disabled.
    Pause(Duration),
}

/// Catalog JSON shape of a step, tagged by `type`.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StepEntry {
    Text {
        body: String,
    },
    Media {
        #[serde(rename = "mediaType")]
        media_type: MediaType,
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Buttons {
        body: String,
        buttons: Vec<Button>,
        #[serde(rename = "showHeader", default = "default_show_header")]
        show_header: bool,
    },
    Pause {
        ms: u64,
    },
}

fn default_show_header() -> bool {
    true
}

impl From<StepEntry> for Step {
    fn from(entry: StepEntry) -> Self {
        match entry {
            StepEntry::Text { body } => Step::Send(OutboundMessage::Text { body }),
            StepEntry::Media {
                media_type,
                url,
                caption,
            } => Step::Send(OutboundMessage::Media {
                media_type,
                url,
                caption,
            }),
            StepEntry::Buttons {
                body,
                buttons,
                show_header,
            } => Step::Send(OutboundMessage::InteractiveButtons {
                body_text: body,
                buttons,
                show_header,
            }),
            StepEntry::Pause { ms } => Step::Pause(Duration::from_millis(ms)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenContent {
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    /// Interactive message header text; the channel default applies when absent.
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub screens: HashMap<String, ScreenContent>,
}

impl Catalog {
    pub fn builtin() -> Result<Catalog, CatalogError> {
        Self::from_json(BUILTIN_CATALOG, "builtin")
    }

    pub fn from_json(json: &str, origin: &str) -> Result<Catalog, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json).map_err(|source| CatalogError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Catalog, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&raw, &path.display().to_string())?;
        log::info!(
            "loaded catalog {} ({} screens)",
            path.display(),
            catalog.screens.len()
        );
        Ok(catalog)
    }

    /// Load from `path` when set, else the bundled catalog.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Catalog, CatalogError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    /// Every screen present and non-empty, button steps within platform limits.
    /// Button ids that no screen routes are logged, not rejected.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for screen in Screen::ALL {
            let content = self
                .screens
                .get(screen.key())
                .ok_or_else(|| CatalogError::MissingScreen(screen.key().to_string()))?;
            if content.steps.is_empty() {
                return Err(CatalogError::EmptyScreen(screen.key().to_string()));
            }
        }
        for (key, content) in &self.screens {
            for step in &content.steps {
                let Step::Send(OutboundMessage::InteractiveButtons { buttons, .. }) = step else {
                    continue;
                };
                if buttons.is_empty() || buttons.len() > MAX_BUTTONS {
                    return Err(CatalogError::ButtonCount {
                        screen: key.clone(),
                        count: buttons.len(),
                    });
                }
                for b in buttons {
                    if Screen::from_button_id(&b.id).is_none() {
                        log::warn!(
                            "catalog screen '{}' has button '{}' that leads nowhere; it will show the main menu",
                            key,
                            b.id
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn steps(&self, screen: Screen) -> Option<&[Step]> {
        self.screens.get(screen.key()).map(|c| c.steps.as_slice())
    }
}
