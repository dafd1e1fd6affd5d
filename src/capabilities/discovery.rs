//! Discovery scanning — populates the registry from search roots.
//!
//! Scanning is Tier-1 only: each immediate subdirectory of a search root
//! that contains a descriptor document contributes one metadata entry. A
//! malformed capability is logged and skipped; a same-scope name collision
//! aborts the scan with a conflict error; a cross-scope collision resolves
//! silently in favor of the higher-priority scope.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::descriptor::{CapabilityDescriptor, CapabilityScope};
use super::document;
use super::registry::CapabilityRegistry;
use super::trust::resolve_trust;
use crate::config::DiscoveryConfig;
use crate::utilities::errors::CapabilityError;

/// Walks search roots and produces Tier-1 descriptors.
#[derive(Debug, Default)]
pub struct DiscoveryScanner;

impl DiscoveryScanner {
    /// Create a scanner.
    pub fn new() -> Self {
        Self
    }

    /// Scan the given roots for one scope.
    ///
    /// Roots that do not exist are skipped. Two capabilities with the same
    /// name anywhere within the scope fail the scan with a conflict naming
    /// both source locations.
    pub fn scan(
        &self,
        roots: &[PathBuf],
        scope: CapabilityScope,
        trusted_custom_paths: &[PathBuf],
    ) -> Result<Vec<CapabilityDescriptor>, CapabilityError> {
        let mut found: Vec<CapabilityDescriptor> = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for root in roots {
            if !root.exists() {
                log::debug!("{} search root {} does not exist", scope, root.display());
                continue;
            }
            for dir in capability_dirs(root)? {
                let trust = resolve_trust(scope, &dir, trusted_custom_paths);
                let descriptor = match document::load_metadata(&dir, scope, trust) {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        log::warn!("skipping capability at {}: {e}", dir.display());
                        continue;
                    }
                };
                if let Some(first) = seen.get(&descriptor.name) {
                    return Err(CapabilityError::Conflict {
                        name: descriptor.name,
                        first: first.clone(),
                        second: dir,
                    });
                }
                seen.insert(descriptor.name.clone(), dir);
                found.push(descriptor);
            }
        }

        Ok(found)
    }

    /// Scan every configured scope in priority order and populate the
    /// registry. Returns the descriptors that were retained.
    pub async fn discover_all(
        &self,
        config: &DiscoveryConfig,
        registry: &CapabilityRegistry,
    ) -> Result<Vec<CapabilityDescriptor>, CapabilityError> {
        let mut retained = Vec::new();

        for scope in [
            CapabilityScope::Project,
            CapabilityScope::User,
            CapabilityScope::Custom,
        ] {
            let descriptors =
                self.scan(config.roots_for(scope), scope, &config.trusted_custom_paths)?;
            for descriptor in descriptors {
                if let Some(existing) = registry.descriptor(&descriptor.name).await {
                    // First-seen entry came from a higher-priority scope.
                    log::info!(
                        "capability '{}' from {} scope shadowed by {} scope entry at {}",
                        descriptor.name,
                        descriptor.scope,
                        existing.scope,
                        existing.source_location.display()
                    );
                    continue;
                }
                registry.register_descriptor(descriptor.clone()).await;
                retained.push(descriptor);
            }
        }

        log::info!("discovered {} capabilities", retained.len());
        Ok(retained)
    }
}

/// Immediate subdirectories of `root` containing a descriptor document.
fn capability_dirs(root: &Path) -> Result<Vec<PathBuf>, CapabilityError> {
    let entries = std::fs::read_dir(root).map_err(|source| CapabilityError::Io {
        location: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CapabilityError::Io {
            location: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() && path.join(document::DESCRIPTOR_FILE).is_file() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::descriptor::TrustLevel;

    fn write_capability(root: &Path, dir_name: &str, descriptor_name: &str) {
        let dir = root.join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(document::DESCRIPTOR_FILE),
            format!("---\nname: {descriptor_name}\ndescription: test capability\n---\nbody"),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_collects_valid_and_skips_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        write_capability(tmp.path(), "good-cap", "good-cap");
        // Name does not match directory: parse failure, skipped.
        write_capability(tmp.path(), "bad-cap", "mismatched");
        // No descriptor document at all: not a capability directory.
        std::fs::create_dir_all(tmp.path().join("not-a-cap")).unwrap();

        let scanner = DiscoveryScanner::new();
        let found = scanner
            .scan(
                &[tmp.path().to_path_buf()],
                CapabilityScope::Project,
                &[],
            )
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "good-cap");
        assert_eq!(found[0].trust, TrustLevel::Trusted);
    }

    #[test]
    fn test_same_scope_collision_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let root_a = tmp.path().join("a");
        let root_b = tmp.path().join("b");
        write_capability(&root_a, "dup", "dup");
        write_capability(&root_b, "dup", "dup");

        let scanner = DiscoveryScanner::new();
        let err = scanner
            .scan(&[root_a, root_b], CapabilityScope::Project, &[])
            .unwrap_err();
        match err {
            CapabilityError::Conflict { name, first, second } => {
                assert_eq!(name, "dup");
                assert_ne!(first, second);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cross_scope_priority_wins() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let tmp = tempfile::tempdir()?;
        let project = tmp.path().join("project");
        let user = tmp.path().join("user");
        write_capability(&project, "shared", "shared");
        write_capability(&user, "shared", "shared");
        write_capability(&user, "user-only", "user-only");

        let config = DiscoveryConfig::new()
            .with_project_root(&project)
            .with_user_root(&user);
        let registry = CapabilityRegistry::new();

        let retained = DiscoveryScanner::new()
            .discover_all(&config, &registry)
            .await?;

        assert_eq!(retained.len(), 2);
        let shared = registry.descriptor("shared").await.unwrap();
        assert_eq!(shared.scope, CapabilityScope::Project);
        assert!(registry.contains("user-only").await);
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_scope_trust_derivation() {
        let tmp = tempfile::tempdir().unwrap();
        let custom = tmp.path().join("custom");
        write_capability(&custom, "outside", "outside");

        let config = DiscoveryConfig::new().with_custom_root(&custom);
        let registry = CapabilityRegistry::new();
        DiscoveryScanner::new()
            .discover_all(&config, &registry)
            .await
            .unwrap();

        assert_eq!(
            registry.descriptor("outside").await.unwrap().trust,
            TrustLevel::Untrusted
        );

        // Same root, now allowlisted.
        let registry = CapabilityRegistry::new();
        let config = DiscoveryConfig::new()
            .with_custom_root(&custom)
            .with_trusted_custom_path(&custom);
        DiscoveryScanner::new()
            .discover_all(&config, &registry)
            .await
            .unwrap();
        assert_eq!(
            registry.descriptor("outside").await.unwrap().trust,
            TrustLevel::Trusted
        );
    }

    #[tokio::test]
    async fn test_discovered_bodies_stay_unloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("project");
        write_capability(&project, "lazy", "lazy");

        let config = DiscoveryConfig::new().with_project_root(&project);
        let registry = CapabilityRegistry::new();
        DiscoveryScanner::new()
            .discover_all(&config, &registry)
            .await
            .unwrap();

        // Tier 1 only until get() is called.
        assert!(!registry.is_materialized("lazy").await);
        let loaded = registry.get("lazy").await.unwrap();
        assert_eq!(loaded.body().unwrap().as_ref(), "body");
        assert!(registry.is_materialized("lazy").await);
    }
}
