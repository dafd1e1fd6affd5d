//! Descriptor document parsing — tiers 1 and 2 of progressive disclosure.
//!
//! A capability lives in a directory containing one `CAPABILITY.md`: a YAML
//! metadata block fenced by `---` lines, followed by a free-form Markdown
//! body. Tier 1 parses only the metadata block; Tier 2 also returns the
//! body. Unknown metadata keys are ignored for forward compatibility.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::descriptor::{
    CapabilityDescriptor, CapabilityScope, ExecutionMode, LifecycleHook, TrustLevel,
};
use crate::utilities::errors::CapabilityError;

/// File name of the descriptor document inside a capability directory.
pub const DESCRIPTOR_FILE: &str = "CAPABILITY.md";

/// Subdirectory holding Tier-3 reference files.
pub const REFERENCES_DIR: &str = "references";

/// Bodies above this estimated token count log a warning.
pub const BODY_TOKEN_WARN_THRESHOLD: usize = 5000;

fn default_true() -> bool {
    true
}

/// The authored metadata block. Trust and location are derived, never read
/// from the document.
#[derive(Debug, Deserialize)]
struct DescriptorFrontmatter {
    name: Option<String>,
    description: Option<String>,
    license: Option<String>,
    compatibility: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default, alias = "allowed-tools")]
    allowed_tools: Vec<String>,
    #[serde(alias = "model")]
    model_override: Option<String>,
    #[serde(default, alias = "execution-mode")]
    execution_mode: ExecutionMode,
    #[serde(alias = "delegate-blueprint")]
    delegate_blueprint: Option<String>,
    #[serde(default, alias = "disable-model-invocation")]
    disable_model_invocation: bool,
    #[serde(default = "default_true", alias = "user-invocable")]
    user_invocable: bool,
    #[serde(alias = "argument-hint")]
    argument_hint: Option<String>,
    #[serde(default, alias = "lifecycle-hooks")]
    lifecycle_hooks: Vec<LifecycleHook>,
}

/// Split a document into its metadata block and body.
fn split_document<'a>(
    text: &'a str,
    location: &Path,
) -> Result<(&'a str, &'a str), CapabilityError> {
    let trimmed = text.trim_start_matches('\u{feff}');
    let rest = trimmed.strip_prefix("---").ok_or_else(|| CapabilityError::Parse {
        location: location.to_path_buf(),
        message: "document must start with a '---' metadata fence".to_string(),
        fields: Vec::new(),
    })?;
    let end = rest.find("\n---").ok_or_else(|| CapabilityError::Parse {
        location: location.to_path_buf(),
        message: "metadata block is missing its closing '---' fence".to_string(),
        fields: Vec::new(),
    })?;
    let metadata = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
    Ok((metadata, body))
}

fn parse_frontmatter(
    yaml: &str,
    location: &Path,
) -> Result<DescriptorFrontmatter, CapabilityError> {
    serde_yaml::from_str(yaml).map_err(|e| CapabilityError::Parse {
        location: location.to_path_buf(),
        message: format!("invalid metadata block: {e}"),
        fields: Vec::new(),
    })
}

/// Validate and assemble a descriptor from its parsed frontmatter.
///
/// Validation order: required fields, then name format, then
/// name-equals-directory, then mode coherence.
fn build_descriptor(
    front: DescriptorFrontmatter,
    source_dir: &Path,
    scope: CapabilityScope,
    trust: TrustLevel,
) -> Result<CapabilityDescriptor, CapabilityError> {
    let mut missing = Vec::new();
    if front.name.as_deref().unwrap_or("").trim().is_empty() {
        missing.push("name".to_string());
    }
    if front.description.as_deref().unwrap_or("").trim().is_empty() {
        missing.push("description".to_string());
    }
    if !missing.is_empty() {
        return Err(CapabilityError::Validation {
            location: source_dir.to_path_buf(),
            message: format!("missing required fields: {}", missing.join(", ")),
            fields: missing,
        });
    }

    let name = front.name.unwrap_or_default();
    if !CapabilityDescriptor::is_valid_name(&name) {
        return Err(CapabilityError::Validation {
            location: source_dir.to_path_buf(),
            message: format!(
                "name '{name}' must be lowercase alphanumeric plus hyphens, at most 64 characters"
            ),
            fields: vec!["name".to_string()],
        });
    }

    let dir_name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if name != dir_name {
        return Err(CapabilityError::Validation {
            location: source_dir.to_path_buf(),
            message: format!("name '{name}' does not match its source directory '{dir_name}'"),
            fields: vec!["name".to_string()],
        });
    }

    if front.execution_mode == ExecutionMode::Fork && front.delegate_blueprint.is_none() {
        return Err(CapabilityError::Validation {
            location: source_dir.to_path_buf(),
            message: format!("fork-mode capability '{name}' names no delegate blueprint"),
            fields: vec!["delegate-blueprint".to_string()],
        });
    }

    Ok(CapabilityDescriptor {
        name,
        description: front.description.unwrap_or_default(),
        source_location: source_dir.to_path_buf(),
        scope,
        trust,
        license: front.license,
        compatibility: front.compatibility,
        metadata: front.metadata,
        allowed_tools: front.allowed_tools,
        model_override: front.model_override,
        execution_mode: front.execution_mode,
        delegate_blueprint: front.delegate_blueprint,
        disable_model_invocation: front.disable_model_invocation,
        user_invocable: front.user_invocable,
        argument_hint: front.argument_hint,
        lifecycle_hooks: front.lifecycle_hooks,
    })
}

/// Tier 1: parse only the metadata block.
pub fn parse_metadata_only(
    text: &str,
    source_dir: &Path,
    scope: CapabilityScope,
    trust: TrustLevel,
) -> Result<CapabilityDescriptor, CapabilityError> {
    let (metadata, _) = split_document(text, source_dir)?;
    let front = parse_frontmatter(metadata, source_dir)?;
    build_descriptor(front, source_dir, scope, trust)
}

/// Tier 2: parse metadata and return the instruction body as well.
pub fn parse_full(
    text: &str,
    source_dir: &Path,
    scope: CapabilityScope,
    trust: TrustLevel,
) -> Result<(CapabilityDescriptor, String), CapabilityError> {
    let (metadata, body) = split_document(text, source_dir)?;
    let front = parse_frontmatter(metadata, source_dir)?;
    let descriptor = build_descriptor(front, source_dir, scope, trust)?;

    let estimated = estimate_tokens(body);
    if estimated > BODY_TOKEN_WARN_THRESHOLD {
        log::warn!(
            "capability '{}' body is ~{} tokens, above the {} guideline",
            descriptor.name,
            estimated,
            BODY_TOKEN_WARN_THRESHOLD
        );
    }

    Ok((descriptor, body.to_string()))
}

/// Tier 1 from disk.
pub fn load_metadata(
    source_dir: &Path,
    scope: CapabilityScope,
    trust: TrustLevel,
) -> Result<CapabilityDescriptor, CapabilityError> {
    let path = source_dir.join(DESCRIPTOR_FILE);
    let text = std::fs::read_to_string(&path).map_err(|source| CapabilityError::Io {
        location: path.clone(),
        source,
    })?;
    parse_metadata_only(&text, source_dir, scope, trust)
}

/// Tier 2 from disk.
pub fn load_full(
    source_dir: &Path,
    scope: CapabilityScope,
    trust: TrustLevel,
) -> Result<(CapabilityDescriptor, String), CapabilityError> {
    let path = source_dir.join(DESCRIPTOR_FILE);
    let text = std::fs::read_to_string(&path).map_err(|source| CapabilityError::Io {
        location: path.clone(),
        source,
    })?;
    parse_full(&text, source_dir, scope, trust)
}

/// Rough token count: four characters per token.
fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(front: &str, body: &str) -> String {
        format!("---\n{front}\n---\n{body}")
    }

    fn source_dir(name: &str) -> PathBuf {
        PathBuf::from("/caps").join(name)
    }

    #[test]
    fn test_parse_metadata_only() {
        let text = doc(
            "name: deep-dive\n\
             description: Researches a topic in depth\n\
             allowed-tools:\n  - search\n\
             execution-mode: fork\n\
             delegate-blueprint: researcher\n\
             future-key: ignored",
            "# Instructions\nGo deep on $ARGUMENTS.",
        );
        let descriptor = parse_metadata_only(
            &text,
            &source_dir("deep-dive"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap();

        assert_eq!(descriptor.name, "deep-dive");
        assert_eq!(descriptor.execution_mode, ExecutionMode::Fork);
        assert_eq!(descriptor.delegate_blueprint.as_deref(), Some("researcher"));
        assert_eq!(descriptor.allowed_tools, vec!["search"]);
        assert!(descriptor.user_invocable);
        assert!(!descriptor.disable_model_invocation);
    }

    #[test]
    fn test_parse_full_returns_body() {
        let text = doc(
            "name: summarize\ndescription: Summarizes text",
            "Summarize: $ARGUMENTS",
        );
        let (descriptor, body) = parse_full(
            &text,
            &source_dir("summarize"),
            CapabilityScope::User,
            TrustLevel::Trusted,
        )
        .unwrap();
        assert_eq!(descriptor.name, "summarize");
        assert_eq!(body, "Summarize: $ARGUMENTS");
    }

    #[test]
    fn test_missing_fences_is_parse_error() {
        let err = parse_metadata_only(
            "name: x\ndescription: y",
            &source_dir("x"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap_err();
        assert!(matches!(err, CapabilityError::Parse { .. }));
    }

    #[test]
    fn test_missing_required_fields_lists_them() {
        let text = doc("license: MIT", "body");
        let err = parse_metadata_only(
            &text,
            &source_dir("x"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap_err();
        match err {
            CapabilityError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["name", "description"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_name_must_match_directory() {
        let text = doc("name: deep-dive\ndescription: d", "body");
        let err = parse_metadata_only(
            &text,
            &source_dir("other-dir"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap_err();
        assert!(matches!(err, CapabilityError::Validation { .. }));
    }

    #[test]
    fn test_fork_requires_blueprint_ref() {
        let text = doc("name: forky\ndescription: d\nexecution-mode: fork", "body");
        let err = parse_metadata_only(
            &text,
            &source_dir("forky"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap_err();
        match err {
            CapabilityError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["delegate-blueprint"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_lifecycle_hooks_parsed_but_inert() {
        let text = doc(
            "name: hooked\ndescription: d\nlifecycle-hooks:\n  - event: activate\n    command: echo hi",
            "body",
        );
        let descriptor = parse_metadata_only(
            &text,
            &source_dir("hooked"),
            CapabilityScope::Project,
            TrustLevel::Trusted,
        )
        .unwrap();
        assert_eq!(descriptor.lifecycle_hooks.len(), 1);
        assert_eq!(descriptor.lifecycle_hooks[0].event, "activate");
    }
}
