//! Error types for the lifecycle runtime
//!
//! Hook failures are fail-fast: they abort the running cascade and surface to
//! the host. Structural misuse is not an error; it is logged and ignored.

use thiserror::Error;

use crate::lifecycle::Hook;

/// Error returned by a user hook
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type of every [`Lifecycle`](crate::Lifecycle) hook
pub type HookResult = Result<(), HookError>;

/// A user hook failed while the hierarchy was being driven
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Hook failure annotated with the component type and hook name
    /// (builds with `debug_assertions`)
    #[error("{component}::{hook} failed")]
    Hook {
        /// Concrete type name of the component's lifecycle object
        component: &'static str,
        /// The hook that failed
        hook: Hook,
        /// The error returned by the hook
        #[source]
        source: HookError,
    },
    /// Hook failure forwarded without added context (release builds)
    #[error("{0}")]
    Raw(HookError),
}

impl LifecycleError {
    /// The hook that failed, when the error carries context
    pub fn hook(&self) -> Option<Hook> {
        match self {
            LifecycleError::Hook { hook, .. } => Some(*hook),
            LifecycleError::Raw(_) => None,
        }
    }

    /// The original error returned by the user hook
    pub fn hook_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        match self {
            LifecycleError::Hook { source, .. } => source.as_ref(),
            LifecycleError::Raw(source) => source.as_ref(),
        }
    }
}

/// Failure reported by an external collaborator (assets, physics)
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    /// Create an error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Unified error type for scene-level operations
#[derive(Debug, Error)]
pub enum SceneError {
    /// The asset-loading future failed
    #[error("asset loading failed for scene '{scene}'")]
    Assets {
        /// Scene name
        scene: String,
        /// Collaborator failure
        #[source]
        source: CollaboratorError,
    },
    /// The physics collaborator failed
    #[error("physics failed for scene '{scene}'")]
    Physics {
        /// Scene name
        scene: String,
        /// Collaborator failure
        #[source]
        source: CollaboratorError,
    },
    /// The scene was already destroyed
    #[error("scene '{0}' has been destroyed")]
    Destroyed(String),
    /// No scene is active
    #[error("no active scene")]
    NoActiveScene,
    /// A hook failed during a scene cascade
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_hook_error_display_and_source() {
        let err = LifecycleError::Hook {
            component: "game::Spinner",
            hook: Hook::Update,
            source: "boom".into(),
        };
        assert_eq!(format!("{}", err), "game::Spinner::on_update failed");
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
        assert_eq!(err.hook(), Some(Hook::Update));
        assert_eq!(err.hook_error().to_string(), "boom");
    }

    #[test]
    fn test_raw_error_forwards_message() {
        let err = LifecycleError::Raw("plain failure".into());
        assert_eq!(format!("{}", err), "plain failure");
        assert_eq!(err.hook(), None);
    }

    #[test]
    fn test_scene_error_from_lifecycle() {
        let err: SceneError = LifecycleError::Raw("x".into()).into();
        match err {
            SceneError::Lifecycle(_) => {}
            _ => panic!("Expected Lifecycle variant"),
        }
    }

    #[test]
    fn test_scene_error_display() {
        let err = SceneError::Assets {
            scene: "level".to_string(),
            source: CollaboratorError::new("missing mesh"),
        };
        assert_eq!(format!("{}", err), "asset loading failed for scene 'level'");
        assert_eq!(err.source().map(|s| s.to_string()), Some("missing mesh".to_string()));
        assert_eq!(format!("{}", SceneError::NoActiveScene), "no active scene");
    }
}
