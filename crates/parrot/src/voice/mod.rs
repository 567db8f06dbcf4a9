//! Voice parameter resolution.
//!
//! - `params` - the resolved parameters and their vocabularies
//! - `layer` - partial layers and the documents they are loaded from
//! - `flags` - command-line flags with sentinel defaults
//! - `resolve` - the per-field precedence merge

mod flags;
mod layer;
mod params;
mod resolve;

use std::path::Path;

pub use flags::VoiceFlags;
pub use layer::{PersonaDescriptor, ProviderSettings, VoiceLayer};
pub use params::{AudioFormat, EffectiveVoiceParameters, Provider, ReadingMode};
pub use resolve::resolve;

use crate::config::{project_persona_descriptor, project_voice_settings, Paths};
use crate::error::ConfigResult;

/// The file-backed layers for one working directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSources {
    pub persona: Option<PersonaDescriptor>,
    pub settings: Option<ProviderSettings>,
}

impl VoiceSources {
    /// Loads the project persona descriptor and the first provider
    /// settings document found (project, then global).
    pub fn load(workdir: &Path, paths: &Paths) -> ConfigResult<Self> {
        let persona = PersonaDescriptor::load(&project_persona_descriptor(workdir))?;
        let settings = ProviderSettings::discover(
            &project_voice_settings(workdir),
            &paths.global_voice_settings(),
        )?
        .map(|(_, settings)| settings);
        Ok(Self { persona, settings })
    }

    /// Resolves against these sources with the process environment.
    pub fn resolve(&self, cli: &VoiceLayer) -> ConfigResult<EffectiveVoiceParameters> {
        resolve(
            cli,
            self.persona.as_ref(),
            self.settings.as_ref(),
            |key| std::env::var(key).ok(),
        )
    }
}
