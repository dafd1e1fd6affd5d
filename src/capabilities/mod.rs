//! # Capability system
//!
//! A capability is a named, discoverable instruction+tool bundle living in a
//! directory with one descriptor document and an optional `references/`
//! area. Loading is progressive:
//!
//! 1. **Tier 1** — discovery parses only the metadata block and registers a
//!    descriptor; nothing else is read.
//! 2. **Tier 2** — the body is materialized on first `get` or activation and
//!    retained for reuse.
//! 3. **Tier 3** — reference files load on explicit request, never cached.
//!
//! Discovery resolves cross-scope name collisions by priority (project >
//! user > custom) and derives a trust level per entry; untrusted
//! capabilities are barred from bringing tools, forking, or declaring
//! lifecycle hooks.

pub mod capability;
pub mod descriptor;
pub mod discovery;
pub mod document;
pub mod registry;
pub mod trust;

pub use capability::{Capability, ReferenceFile};
pub use descriptor::{
    CapabilityDescriptor, CapabilityScope, ExecutionMode, LifecycleHook, TrustLevel,
};
pub use discovery::DiscoveryScanner;
pub use registry::CapabilityRegistry;
pub use trust::{check_restrictions, resolve_trust, TrustViolation};
