//! Extension lifecycle
//!
//! Extensions register named hooks for two phases of every project definition:
//!
//! 1. [`Phase::BeforeDefine`] runs after the project is created and before its
//!    definition body, so hooks can seed defaults the body may override.
//! 2. [`Phase::AfterDefine`] runs after the body and after every child finished its
//!    own definition, so hooks can finalize configuration and aggregate children.
//!
//! Within a phase, hooks scoped to an ancestor run first (root first), then global
//! hooks and hooks scoped to the project itself, in registration order. A hook runs
//! only after every pending hook it names in `after`. The pending list is re-read
//! after each hook, so hooks (and extensions) registered while a phase runs still run
//! in that phase.

use crate::config::ConfigError;
use crate::error::BuildResult;
use crate::project::Project;
use crate::session::Session;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeDefine,
    AfterDefine,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeDefine => f.write_str("before_define"),
            Self::AfterDefine => f.write_str("after_define"),
        }
    }
}

/// Which projects a hook applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookScope {
    Global,
    /// The project with this id and its descendants
    Project(String),
}

pub type Hook = Arc<dyn Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync>;

/// A plugin: registers its hooks once per session
pub trait Extension: Send + Sync {
    /// Unique name; installing a second extension with the same name is a no-op
    fn name(&self) -> &'static str;

    fn register(&self, registry: &ExtensionRegistry);
}

struct Registered {
    seq: u64,
    name: String,
    phase: Phase,
    scope: HookScope,
    after: Vec<String>,
    callback: Hook,
}

/// Append-only registry of extensions and their hooks
pub struct ExtensionRegistry {
    installed: RwLock<Vec<&'static str>>,
    hooks: RwLock<Vec<Arc<Registered>>>,
    next_seq: AtomicU64,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            installed: RwLock::new(Vec::new()),
            hooks: RwLock::new(Vec::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Installs `extension` unless one with the same name is installed; returns
    /// whether it was installed now
    pub fn install(&self, extension: &dyn Extension) -> bool {
        {
            let mut installed = self.installed.write().unwrap_or_else(|e| e.into_inner());
            if installed.contains(&extension.name()) {
                return false;
            }
            installed.push(extension.name());
        }
        debug!(extension = extension.name(), "Installing extension");
        extension.register(self);
        true
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&name)
    }

    /// Names of the installed extensions, in installation order
    pub fn installed(&self) -> Vec<&'static str> {
        self.installed.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn before_define(
        &self,
        name: &str,
        after: &[&str],
        callback: impl Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync + 'static,
    ) {
        self.add(Phase::BeforeDefine, HookScope::Global, name, after, Arc::new(callback));
    }

    pub fn after_define(
        &self,
        name: &str,
        after: &[&str],
        callback: impl Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync + 'static,
    ) {
        self.add(Phase::AfterDefine, HookScope::Global, name, after, Arc::new(callback));
    }

    /// Before-define hook for `project_id` and its descendants
    pub fn before_define_for(
        &self,
        project_id: &str,
        name: &str,
        after: &[&str],
        callback: impl Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync + 'static,
    ) {
        let scope = HookScope::Project(project_id.to_string());
        self.add(Phase::BeforeDefine, scope, name, after, Arc::new(callback));
    }

    /// After-define hook for `project_id` and its descendants
    pub fn after_define_for(
        &self,
        project_id: &str,
        name: &str,
        after: &[&str],
        callback: impl Fn(&mut Project, &Session) -> BuildResult<()> + Send + Sync + 'static,
    ) {
        let scope = HookScope::Project(project_id.to_string());
        self.add(Phase::AfterDefine, scope, name, after, Arc::new(callback));
    }

    fn add(&self, phase: Phase, scope: HookScope, name: &str, after: &[&str], callback: Hook) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        debug!(hook = name, phase = %phase, scope = ?scope, "Registering hook");
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(Registered {
                seq,
                name: name.to_string(),
                phase,
                scope,
                after: after.iter().map(|a| a.to_string()).collect(),
                callback,
            }));
    }

    /// Hooks of `phase` that apply to `project` and have not run, in run order
    fn pending(&self, phase: Phase, project: &Project, done: &HashSet<u64>) -> Vec<Arc<Registered>> {
        let ancestors = project.ancestor_ids();
        let mut pending: Vec<(usize, Arc<Registered>)> = self
            .hooks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|h| h.phase == phase && !done.contains(&h.seq))
            .filter_map(|h| {
                let rank = match &h.scope {
                    HookScope::Global => ancestors.len(),
                    HookScope::Project(id) if id == project.id() => ancestors.len(),
                    HookScope::Project(id) => ancestors.iter().position(|a| a == id)?,
                };
                Some((rank, h.clone()))
            })
            .collect();
        pending.sort_by_key(|(rank, h)| (*rank, h.seq));
        pending.into_iter().map(|(_, h)| h).collect()
    }

    /// Runs every hook of `phase` for `project`; the first failing hook aborts the phase
    pub fn run_phase(&self, phase: Phase, project: &mut Project, session: &Session) -> BuildResult<()> {
        let mut done = HashSet::new();
        loop {
            let pending = self.pending(phase, project, &done);
            if pending.is_empty() {
                return Ok(());
            }
            let ready = pending
                .iter()
                .find(|h| !h.after.iter().any(|dep| pending.iter().any(|p| &p.name == dep)))
                .cloned();
            let Some(hook) = ready else {
                let names = pending.iter().map(|h| h.name.clone()).collect();
                return Err(ConfigError::CircularExtensionOrder(names).into());
            };
            done.insert(hook.seq);
            debug!(hook = %hook.name, phase = %phase, project = project.id(), "Running hook");
            (hook.callback)(project, session)?;
        }
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("ExtensionRegistry")
            .field("installed", &self.installed())
            .field("hooks", &hooks.iter().map(|h| h.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}
