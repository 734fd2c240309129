//! Optional Module Loader
//!
//! Safe loading of optional feature subsystems with error boundaries and
//! graceful degradation. Each module moves through
//! `unloaded -> loading -> {loaded | failed}`; `failed` transitions back to
//! `loading` only via an explicit reload.
//!
//! # Isolation
//!
//! [`ModuleLoader::load_modules`] fires every load concurrently and
//! independently: one module's failure never prevents the others from
//! completing, and a module failure is never an application-level failure.
//! Failures are logged and optionally surfaced through a fallback callback.
//!
//! # Registry Invariant
//!
//! A module name is in at most one of the `loaded` / `failed` / `loading`
//! sets at any time. Only the loader mutates the registry.

use std::any::Any;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::{DashMap, DashSet};
use futures::future::{join_all, BoxFuture};

use crate::backend::AssistantBackend;
use crate::config::FeatureFlags;
use crate::error::ClientError;

/// Opaque payload produced by a module's `init`.
pub type ModulePayload = Arc<dyn Any + Send + Sync>;

/// Module initialization function.
pub type ModuleInit =
    Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<ModulePayload>> + Send + Sync>;

/// Fallback UI hook invoked when a module fails to load.
pub type FallbackUi = Box<dyn Fn(&anyhow::Error) + Send + Sync>;

/// Static configuration for one optional module. Read-only at runtime.
pub struct ModuleDescriptor {
    /// Module name (also its feature-flag key).
    pub name: String,
    /// Initialization function, invoked at most once per load attempt.
    pub init: ModuleInit,
    /// Backend capability endpoint that must report available before `init`
    /// runs (e.g. `/features/email/status`).
    pub requires_backend_endpoint: Option<String>,
    /// Whether a previous failure may be retried by a plain `load_module`.
    pub retry_on_error: bool,
    /// Whether a load failure should be surfaced as a user notice.
    pub show_error_to_user: bool,
    /// Optional degraded-mode UI hook.
    pub fallback_ui: Option<FallbackUi>,
}

impl ModuleDescriptor {
    /// Build a descriptor with defaults: no capability check, no retry,
    /// errors surfaced, no fallback.
    pub fn new<F, Fut>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<ModulePayload>> + Send + 'static,
    {
        let init: ModuleInit = Box::new(move || {
            Box::pin(init()) as BoxFuture<'static, anyhow::Result<ModulePayload>>
        });
        Self {
            name: name.into(),
            init,
            requires_backend_endpoint: None,
            retry_on_error: false,
            show_error_to_user: true,
            fallback_ui: None,
        }
    }

    /// Require a backend capability endpoint.
    #[must_use]
    pub fn with_backend_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.requires_backend_endpoint = Some(endpoint.into());
        self
    }

    /// Allow plain loads to retry after a failure.
    #[must_use]
    pub fn with_retry_on_error(mut self, retry: bool) -> Self {
        self.retry_on_error = retry;
        self
    }

    /// Control whether failures produce a user notice.
    #[must_use]
    pub fn with_show_error_to_user(mut self, show: bool) -> Self {
        self.show_error_to_user = show;
        self
    }

    /// Attach a fallback UI hook.
    #[must_use]
    pub fn with_fallback_ui<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&anyhow::Error) + Send + Sync + 'static,
    {
        self.fallback_ui = Some(Box::new(fallback));
        self
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("requires_backend_endpoint", &self.requires_backend_endpoint)
            .field("retry_on_error", &self.retry_on_error)
            .field("show_error_to_user", &self.show_error_to_user)
            .finish()
    }
}

/// Outcome of one `load_module` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The module is loaded. `cached` is true when it was already loaded and
    /// `init` was not invoked again.
    Loaded {
        /// Whether this was a cached success.
        cached: bool,
    },
    /// The module failed before and retries are not allowed.
    PreviousFailure,
    /// A load for this module is already in flight.
    AlreadyLoading,
    /// The module's feature flag is off.
    Disabled,
    /// The backend capability check reported unavailable.
    Unavailable,
    /// `init` returned an error.
    Failed {
        /// Why initialization failed.
        reason: String,
    },
}

impl LoadOutcome {
    /// Whether the module ended up loaded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Aggregate result of `load_modules`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Number of modules attempted.
    pub total: usize,
    /// Number that ended up loaded.
    pub loaded: usize,
    /// Number that did not (failures and skips alike).
    pub failed: usize,
}

/// Registry snapshot for one module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModuleStatus {
    /// Whether the feature flag is on.
    pub enabled: bool,
    /// Whether the module is loaded.
    pub loaded: bool,
    /// Whether the module is marked failed.
    pub failed: bool,
    /// Whether a load is in flight.
    pub loading: bool,
}

/// A successfully loaded module.
struct LoadedModule {
    payload: ModulePayload,
    #[allow(dead_code)]
    loaded_at: SystemTime,
}

/// Loader and registry for optional modules.
pub struct ModuleLoader<B: AssistantBackend> {
    backend: Arc<B>,
    features: FeatureFlags,
    loaded: DashMap<String, LoadedModule>,
    failed: DashSet<String>,
    loading: DashSet<String>,
}

impl<B: AssistantBackend> ModuleLoader<B> {
    /// Create a loader against a backend and feature flags.
    pub fn new(backend: Arc<B>, features: FeatureFlags) -> Self {
        Self {
            backend,
            features,
            loaded: DashMap::new(),
            failed: DashSet::new(),
            loading: DashSet::new(),
        }
    }

    /// Load one module through its lifecycle.
    ///
    /// Skip cases (already loaded, previous failure without retry, already
    /// loading, disabled) perform no state transition and never invoke
    /// `init`.
    pub async fn load_module(&self, descriptor: &ModuleDescriptor) -> LoadOutcome {
        let name = descriptor.name.as_str();

        if self.loaded.contains_key(name) {
            tracing::debug!(module = name, "Module already loaded");
            return LoadOutcome::Loaded { cached: true };
        }

        if self.failed.contains(name) && !descriptor.retry_on_error {
            tracing::warn!(module = name, "Module previously failed, skipping");
            return LoadOutcome::PreviousFailure;
        }

        if self.loading.contains(name) {
            tracing::debug!(module = name, "Module is currently loading");
            return LoadOutcome::AlreadyLoading;
        }

        if !self.features.is_enabled(name) {
            tracing::debug!(module = name, "Module disabled in config");
            return LoadOutcome::Disabled;
        }

        // Claim the loading slot; losing the race means another load won it.
        if !self.loading.insert(name.to_string()) {
            return LoadOutcome::AlreadyLoading;
        }
        // A retry leaves the failed set now that loading has begun, keeping
        // the one-set-at-a-time invariant.
        self.failed.remove(name);

        tracing::info!(module = name, "Loading module");

        if let Some(ref endpoint) = descriptor.requires_backend_endpoint {
            if !self.backend.feature_available(endpoint).await {
                let error = anyhow::anyhow!("backend not available for {name}");
                self.fail(descriptor, &error);
                return LoadOutcome::Unavailable;
            }
        }

        match (descriptor.init)().await {
            Ok(payload) => {
                self.loading.remove(name);
                self.loaded.insert(
                    name.to_string(),
                    LoadedModule {
                        payload,
                        loaded_at: SystemTime::now(),
                    },
                );
                tracing::info!(module = name, "Module loaded");
                LoadOutcome::Loaded { cached: false }
            }
            Err(error) => {
                let reason = error.to_string();
                self.fail(descriptor, &error);
                LoadOutcome::Failed { reason }
            }
        }
    }

    /// Record a failed load: registry transition, fallback hook, notice.
    fn fail(&self, descriptor: &ModuleDescriptor, error: &anyhow::Error) {
        let name = descriptor.name.as_str();
        self.loading.remove(name);
        self.failed.insert(name.to_string());

        tracing::error!(module = name, error = %error, "Failed to load module");

        if let Some(ref fallback) = descriptor.fallback_ui {
            fallback(error);
        }

        if descriptor.show_error_to_user {
            // Non-blocking notice only; a module failure is never an
            // application-level failure.
            tracing::warn!(module = name, "{name} is currently unavailable");
        }
    }

    /// Load several modules concurrently and independently.
    ///
    /// The summary counts every non-loaded outcome (skips included) as
    /// failed, matching what the aggregate is used for: "how many optional
    /// features are usable".
    pub async fn load_modules(&self, descriptors: &[ModuleDescriptor]) -> LoadSummary {
        let outcomes = join_all(descriptors.iter().map(|d| self.load_module(d))).await;

        let summary = LoadSummary {
            total: outcomes.len(),
            loaded: outcomes.iter().filter(|o| o.is_success()).count(),
            failed: outcomes.iter().filter(|o| !o.is_success()).count(),
        };
        tracing::info!(
            total = summary.total,
            loaded = summary.loaded,
            failed = summary.failed,
            "Module loading summary"
        );
        summary
    }

    /// Unload a module. Returns whether it was loaded.
    pub fn unload_module(&self, name: &str) -> bool {
        if self.loaded.remove(name).is_some() {
            tracing::info!(module = name, "Module unloaded");
            true
        } else {
            false
        }
    }

    /// Explicitly reload a module: clear both `loaded` and `failed`
    /// membership, then run a fresh load.
    pub async fn reload_module(&self, descriptor: &ModuleDescriptor) -> LoadOutcome {
        self.unload_module(&descriptor.name);
        self.failed.remove(&descriptor.name);
        self.load_module(descriptor).await
    }

    /// Whether a module is loaded.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Whether a module is marked failed.
    #[must_use]
    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.contains(name)
    }

    /// The stored `init` result of a loaded module.
    #[must_use]
    pub fn loaded_payload(&self, name: &str) -> Option<ModulePayload> {
        self.loaded.get(name).map(|entry| entry.payload.clone())
    }

    /// The stored `init` result of a module that must be loaded, as a typed
    /// error for dependent features.
    pub fn require_loaded(&self, name: &str) -> Result<ModulePayload, ClientError> {
        self.loaded_payload(name)
            .ok_or_else(|| ClientError::ModuleLoad {
                name: name.to_string(),
                reason: if self.failed.contains(name) {
                    "module failed to load".to_string()
                } else {
                    "module is not loaded".to_string()
                },
            })
    }

    /// Registry snapshot for one module name.
    #[must_use]
    pub fn module_status(&self, name: &str) -> ModuleStatus {
        ModuleStatus {
            enabled: self.features.is_enabled(name),
            loaded: self.loaded.contains_key(name),
            failed: self.failed.contains(name),
            loading: self.loading.contains(name),
        }
    }
}
