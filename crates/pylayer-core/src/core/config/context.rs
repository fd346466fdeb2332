use crate::config::{Config, EnvSnapshot, GlobalOptions};
use crate::effects::{LayerPublisher, PackageInstaller, SharedEffects};

/// Everything one layer build needs from the outside world.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Creates a command context from the live process environment.
    #[must_use]
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Self {
        Self::from_snapshot(global, &EnvSnapshot::capture(), effects)
    }

    /// Creates a command context from an explicit environment snapshot.
    #[must_use]
    pub fn from_snapshot(
        global: &'a GlobalOptions,
        env: &EnvSnapshot,
        effects: SharedEffects,
    ) -> Self {
        Self {
            global,
            config: Config::from_snapshot(env),
            effects,
        }
    }

    pub fn installer(&self) -> &dyn PackageInstaller {
        self.effects.installer()
    }

    pub fn publisher(&self) -> &dyn LayerPublisher {
        self.effects.publisher()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
