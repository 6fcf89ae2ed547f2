//! Engine registry

use super::EngineSpec;
use crate::config::ConfigError;
use crate::project::{Project, Usage};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

type Predicate = dyn Fn(&Project, Usage) -> bool + Send + Sync;
type Factory<E> = dyn Fn(&Project) -> Box<E> + Send + Sync;

/// One registered engine: declarative spec, applicability predicate and factory
pub struct Registration<E: ?Sized> {
    spec: EngineSpec,
    predicate: Box<Predicate>,
    factory: Box<Factory<E>>,
}

impl<E: ?Sized> Registration<E> {
    pub fn spec(&self) -> &EngineSpec {
        &self.spec
    }

    pub fn applies_to(&self, project: &Project, usage: Usage) -> bool {
        (self.predicate)(project, usage)
    }

    pub fn instantiate(&self, project: &Project) -> Box<E> {
        (self.factory)(project)
    }
}

/// Append-only, ordered registry of one toolchain kind
///
/// Registration takes a write lock; lookups clone the entry list and release the
/// lock before predicates or factories run, so concurrent selection never blocks on
/// engine code.
pub struct EngineRegistry<E: ?Sized> {
    kind: &'static str,
    entries: RwLock<Vec<Arc<Registration<E>>>>,
}

impl<E: ?Sized> EngineRegistry<E> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn register(
        &self,
        spec: EngineSpec,
        predicate: impl Fn(&Project, Usage) -> bool + Send + Sync + 'static,
        factory: impl Fn(&Project) -> Box<E> + Send + Sync + 'static,
    ) {
        debug!(kind = self.kind, engine = spec.name, "Registering engine");
        let registration = Arc::new(Registration {
            spec,
            predicate: Box::new(predicate),
            factory: Box::new(factory),
        });
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(registration);
    }

    fn snapshot(&self) -> Vec<Arc<Registration<E>>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Engine names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.snapshot().iter().map(|r| r.spec.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Registration<E>>> {
        self.snapshot()
            .into_iter()
            .find(|r| r.spec.name.eq_ignore_ascii_case(name))
    }

    /// Instantiates the engine registered under `name`, ignoring its predicate
    pub fn create(&self, name: &str, project: &Project) -> Result<Box<E>, ConfigError> {
        let registration = self.get(name).ok_or_else(|| ConfigError::UnknownEngine {
            kind: self.kind.to_string(),
            name: name.to_string(),
        })?;
        Ok(registration.instantiate(project))
    }

    /// First engine, in registration order, whose predicate accepts the project
    pub fn select(&self, project: &Project, usage: Usage) -> Option<Box<E>> {
        let registration = self
            .snapshot()
            .into_iter()
            .find(|r| r.applies_to(project, usage))?;
        debug!(
            kind = self.kind,
            engine = registration.spec.name,
            project = project.id(),
            usage = %usage,
            "Selected engine"
        );
        Some(registration.instantiate(project))
    }

    /// Explicit name when given, otherwise auto-selection; `None` leaves the toolchain unbound
    pub fn bind(
        &self,
        project: &Project,
        usage: Usage,
        explicit: Option<&str>,
    ) -> Result<Option<Box<E>>, ConfigError> {
        match explicit {
            Some(name) => self.create(name, project).map(Some),
            None => Ok(self.select(project, usage)),
        }
    }
}

impl<E: ?Sized> fmt::Debug for EngineRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("kind", &self.kind)
            .field("engines", &self.names())
            .finish()
    }
}
