//! Key manager configuration.

use mek_crypto::DEFAULT_PIN_ITERATIONS;

/// Configuration for [`crate::KeyManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MekConfig {
    /// PBKDF2 rounds for PIN stretching. Changing this changes every PIN key.
    pub pin_iterations: u32,
    /// Spawn republication of a same-source key on the current Tokio
    /// runtime instead of awaiting it. Publishes that establish or change
    /// an identity's source are always awaited.
    pub background_publish: bool,
    /// Treat identities established as `legacy` as unestablished and
    /// re-derive them, instead of failing with a source conflict.
    pub migrate_legacy: bool,
    /// Let an explicit `PasskeyFallback` request replace a published
    /// fallback key that is no longer cached. Devices holding the old key
    /// lose access to messages encrypted to it.
    pub replace_device_local: bool,
}

impl Default for MekConfig {
    fn default() -> Self {
        Self {
            pin_iterations: DEFAULT_PIN_ITERATIONS,
            background_publish: true,
            migrate_legacy: false,
            replace_device_local: false,
        }
    }
}

impl MekConfig {
    /// Set the PBKDF2 round count.
    #[must_use]
    pub fn with_pin_iterations(mut self, iterations: u32) -> Self {
        self.pin_iterations = iterations;
        self
    }

    /// Set whether publication runs in the background.
    #[must_use]
    pub fn with_background_publish(mut self, background: bool) -> Self {
        self.background_publish = background;
        self
    }

    /// Set whether legacy identities are migrated.
    #[must_use]
    pub fn with_migrate_legacy(mut self, migrate: bool) -> Self {
        self.migrate_legacy = migrate;
        self
    }

    /// Set whether published fallback keys may be replaced.
    #[must_use]
    pub fn with_replace_device_local(mut self, replace: bool) -> Self {
        self.replace_device_local = replace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MekConfig::default();
        assert_eq!(config.pin_iterations, 600_000);
        assert!(config.background_publish);
        assert!(!config.migrate_legacy);
        assert!(!config.replace_device_local);
    }
}
