//! Action registry: `ActionId` → executable capability.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use gestura_core::{ActionId, Error, Result};
use tracing::{debug, info, warn};

/// A zero-argument capability triggered by a recognized gesture.
pub trait Action: Send + Sync {
    fn execute(&self) -> Result<()>;
}

impl<F> Action for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn execute(&self) -> Result<()> {
        self()
    }
}

/// Runs an external program without waiting for it.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
}

impl CommandAction {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list; the first element is the program.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl Action for CommandAction {
    fn execute(&self) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::ActionFailed {
                action: self.program.clone(),
                reason: e.to_string(),
            })?;
        // Reap in the background so the session is never blocked on the program.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "<ActionId>": ["program", "arg", ...] }` from `path`.
    ///
    /// A missing file yields an empty registry. Unknown action names and
    /// empty argv lists are configuration errors.
    pub fn from_config(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "No action table at {}; gestures will not trigger anything",
                    path.display()
                );
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let table: HashMap<String, Vec<String>> = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let mut registry = Self::new();
        for (name, argv) in table {
            let id: ActionId = name
                .parse()
                .map_err(|_| Error::Config(format!("unknown action in {}: {}", path.display(), name)))?;
            let action = CommandAction::from_argv(&argv)
                .ok_or_else(|| Error::Config(format!("empty command for action {}", id)))?;
            registry.register(id, action);
        }
        info!(
            "Loaded {} action commands from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn register(&mut self, id: ActionId, action: impl Action + 'static) {
        self.actions.insert(id, Arc::new(action));
    }

    pub fn is_registered(&self, id: ActionId) -> bool {
        self.actions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run the capability for `id`. An unregistered id is an error.
    pub fn execute(&self, id: ActionId) -> Result<()> {
        let action = self
            .actions
            .get(&id)
            .ok_or_else(|| Error::UnregisteredAction(id.to_string()))?;
        debug!("Executing action {}", id);
        action.execute().map_err(|e| match e {
            Error::ActionFailed { .. } => e,
            other => Error::ActionFailed {
                action: id.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_registered_closure_runs() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = ActionRegistry::new();
        let c = count.clone();
        registry.register(ActionId::Mute, move || -> Result<()> {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        registry.execute(ActionId::Mute).unwrap();
        registry.execute(ActionId::Mute).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(registry.is_registered(ActionId::Mute));
        assert!(!registry.is_registered(ActionId::VolumeUp));
    }

    #[test]
    fn test_unregistered_fails_loudly() {
        let registry = ActionRegistry::new();
        assert!(matches!(
            registry.execute(ActionId::VolumeUp),
            Err(Error::UnregisteredAction(_))
        ));
    }

    #[test]
    fn test_failures_are_wrapped() {
        let mut registry = ActionRegistry::new();
        registry.register(ActionId::Screenshot, || -> Result<()> {
            Err(Error::Internal("no display".into()))
        });
        match registry.execute(ActionId::Screenshot) {
            Err(Error::ActionFailed { action, reason }) => {
                assert_eq!(action, "Screenshot");
                assert!(reason.contains("no display"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actions.json");
        assert!(ActionRegistry::from_config(&path).unwrap().is_empty());

        std::fs::write(
            &path,
            r#"{"Volume Up": ["amixer", "set", "Master", "5%+"], "mute": ["amixer", "set", "Master", "mute"]}"#,
        )
        .unwrap();
        let registry = ActionRegistry::from_config(&path).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_registered(ActionId::VolumeUp));
        assert!(registry.is_registered(ActionId::Mute));

        std::fs::write(&path, r#"{"Teleport": ["x"]}"#).unwrap();
        assert!(matches!(
            ActionRegistry::from_config(&path),
            Err(Error::Config(_))
        ));

        std::fs::write(&path, r#"{"Mute": []}"#).unwrap();
        assert!(ActionRegistry::from_config(&path).is_err());
    }
}
