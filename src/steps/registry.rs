//! The ordered, immutable list of steps.

use std::collections::HashSet;

use crate::error::RegistryError;

use super::builtin;
use super::step::Step;

/// Fixed sequence of steps, in execution order.
///
/// Order is curated by hand. The builder only checks it: ids must be unique
/// and every prerequisite must already be registered, so registry order is
/// always a valid topological order.
pub struct StepRegistry {
    steps: Vec<Box<dyn Step>>,
}

impl StepRegistry {
    /// Start an empty registry.
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// The provisioning sequence vpsup ships with.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register(builtin::SystemUpdate)?
            .register(builtin::BasePackages)?
            .register(builtin::CreateUser)?
            .register(builtin::UserSudo)?
            .register(builtin::UserPassword)?
            .register(builtin::InstallDocker)?
            .register(builtin::DockerGroup)?
            .register(builtin::InstallTailscale)?
            .register(builtin::TailscaleUp)?
            .register(builtin::InstallFail2ban)?
            .register(builtin::ConfigureFirewall)?
            .register(builtin::InstallNode)?
            .register(builtin::InstallAiClis)?
            .register(builtin::TmuxProfile)?
            .register(builtin::CopySshKeys)?
            .register(builtin::HardenSsh)?
            .build())
    }

    /// Steps in order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Step> {
        self.steps.iter().map(|s| s.as_ref())
    }

    /// Look up a step by id.
    pub fn get(&self, id: &str) -> Option<&dyn Step> {
        self.iter().find(|s| s.id() == id)
    }

    /// Whether a step with `id` is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Position of a step in the order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id() == id)
    }

    /// Step ids in order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builder for [`StepRegistry`].
#[derive(Default)]
pub struct StepRegistryBuilder {
    steps: Vec<Box<dyn Step>>,
    ids: HashSet<&'static str>,
}

impl StepRegistryBuilder {
    /// Append a step.
    ///
    /// # Errors
    ///
    /// Rejects a duplicate id, or a prerequisite not registered earlier.
    pub fn register(mut self, step: impl Step + 'static) -> Result<Self, RegistryError> {
        let id = step.id();
        if self.ids.contains(id) {
            return Err(RegistryError::DuplicateStep { id: id.to_string() });
        }
        for prerequisite in step.prerequisites() {
            if !self.ids.contains(prerequisite) {
                return Err(RegistryError::PrerequisiteOutOfOrder {
                    step: id.to_string(),
                    prerequisite: prerequisite.to_string(),
                });
            }
        }

        self.ids.insert(id);
        self.steps.push(Box::new(step));
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> StepRegistry {
        StepRegistry { steps: self.steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSnapshot;
    use crate::error::{ProbeError, StepError};
    use crate::probe::StateProbe;
    use crate::steps::ApplyContext;

    struct Named(&'static str, &'static [&'static str]);

    impl Step for Named {
        fn id(&self) -> &'static str {
            self.0
        }
        fn title(&self) -> &'static str {
            self.0
        }
        fn prerequisites(&self) -> &'static [&'static str] {
            self.1
        }
        fn is_satisfied(&self, _: &ConfigSnapshot, _: &dyn StateProbe) -> Result<bool, ProbeError> {
            Ok(true)
        }
        fn apply(&self, _: &ConfigSnapshot, _: &mut ApplyContext<'_>) -> Result<(), StepError> {
            Ok(())
        }
    }

    #[test]
    fn preserves_registration_order() {
        let registry = StepRegistry::builder()
            .register(Named("a", &[]))
            .unwrap()
            .register(Named("b", &["a"]))
            .unwrap()
            .build();
        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.position("b"), Some(1));
        assert!(registry.contains("a"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = StepRegistry::builder()
            .register(Named("a", &[]))
            .unwrap()
            .register(Named("a", &[]));
        assert!(matches!(result, Err(RegistryError::DuplicateStep { .. })));
    }

    #[test]
    fn rejects_prerequisite_registered_later() {
        let result = StepRegistry::builder().register(Named("b", &["a"]));
        assert!(matches!(
            result,
            Err(RegistryError::PrerequisiteOutOfOrder { .. })
        ));
    }

    #[test]
    fn standard_registry_is_valid() {
        let registry = StepRegistry::standard().unwrap();
        assert_eq!(
            registry.ids(),
            vec![
                "system-update",
                "base-packages",
                "create-user",
                "user-sudo",
                "user-password",
                "install-docker",
                "docker-group",
                "install-tailscale",
                "tailscale-up",
                "install-fail2ban",
                "configure-firewall",
                "install-node",
                "install-ai-clis",
                "tmux-profile",
                "copy-ssh-keys",
                "harden-ssh",
            ]
        );
    }

    #[test]
    fn standard_prerequisites_precede_dependents() {
        let registry = StepRegistry::standard().unwrap();
        for step in registry.iter() {
            let at = registry.position(step.id()).unwrap();
            for prerequisite in step.prerequisites() {
                assert!(registry.position(prerequisite).unwrap() < at);
            }
        }
    }
}
