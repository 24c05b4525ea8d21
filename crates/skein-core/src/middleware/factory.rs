//! PushMiddlewareFactory - definition から middleware を解決する
//!
//! Queue の build 時に一度だけ呼ばれる。メッセージごとには呼ばれない。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::builtin::{CallbackMiddleware, DeduplicateMiddleware, StampMiddleware};
use super::PushMiddleware;
use crate::domain::Message;
use crate::error::QueueError;

/// Invocable middleware: transforms the message, then forwards it.
pub type PushCallback = Arc<dyn Fn(Message) -> Result<Message, QueueError> + Send + Sync>;

/// Builds a middleware from the params of a named definition.
pub type MiddlewareConstructor =
    Box<dyn Fn(&Value) -> Result<Arc<dyn PushMiddleware>, QueueError> + Send + Sync>;

/// The shapes a middleware can be configured with.
#[derive(Clone)]
pub enum MiddlewareDefinition {
    /// An already constructed middleware.
    Instance(Arc<dyn PushMiddleware>),

    /// A registered name plus constructor params (what config files produce).
    Named { name: String, params: Value },

    /// A plain function over the message.
    Invocable(PushCallback),
}

impl MiddlewareDefinition {
    pub fn instance(middleware: impl PushMiddleware + 'static) -> Self {
        Self::Instance(Arc::new(middleware))
    }

    pub fn named(name: impl Into<String>, params: Value) -> Self {
        Self::Named {
            name: name.into(),
            params,
        }
    }

    pub fn invocable<F>(f: F) -> Self
    where
        F: Fn(Message) -> Result<Message, QueueError> + Send + Sync + 'static,
    {
        Self::Invocable(Arc::new(f))
    }
}

impl fmt::Debug for MiddlewareDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Named { name, params } => f
                .debug_struct("Named")
                .field("name", name)
                .field("params", params)
                .finish(),
            Self::Invocable(_) => f.write_str("Invocable(..)"),
        }
    }
}

/// Resolves a definition into a concrete middleware.
pub trait PushMiddlewareFactory: Send + Sync {
    fn create_push_middleware(
        &self,
        definition: MiddlewareDefinition,
    ) -> Result<Arc<dyn PushMiddleware>, QueueError>;
}

/// Factory backed by a name -> constructor registry.
///
/// Built during initialization (mutable), used read-only afterwards.
#[derive(Default)]
pub struct DefaultPushMiddlewareFactory {
    constructors: HashMap<String, MiddlewareConstructor>,
}

impl DefaultPushMiddlewareFactory {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Factory with `stamp` and `deduplicate` already registered.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.insert(StampMiddleware::NAME, |params| {
            Ok(Arc::new(StampMiddleware::from_params(params)?) as Arc<dyn PushMiddleware>)
        });
        factory.insert(DeduplicateMiddleware::NAME, |params| {
            Ok(Arc::new(DeduplicateMiddleware::from_params(params)?) as Arc<dyn PushMiddleware>)
        });
        factory
    }

    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), QueueError>
    where
        F: Fn(&Value) -> Result<Arc<dyn PushMiddleware>, QueueError> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(QueueError::DuplicateMiddleware(name));
        }
        self.insert(name, constructor);
        Ok(())
    }

    fn insert<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn PushMiddleware>, QueueError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl PushMiddlewareFactory for DefaultPushMiddlewareFactory {
    fn create_push_middleware(
        &self,
        definition: MiddlewareDefinition,
    ) -> Result<Arc<dyn PushMiddleware>, QueueError> {
        match definition {
            MiddlewareDefinition::Instance(middleware) => Ok(middleware),
            MiddlewareDefinition::Invocable(callback) => Ok(Arc::new(CallbackMiddleware::new(callback))),
            MiddlewareDefinition::Named { name, params } => {
                let constructor = self.constructors.get(&name).ok_or_else(|| {
                    QueueError::UnresolvableDefinition(format!("no middleware registered as '{name}'"))
                })?;
                constructor(&params)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::PushNext;
    use async_trait::async_trait;
    use serde_json::json;

    struct Passthrough;

    #[async_trait]
    impl PushMiddleware for Passthrough {
        async fn process_push(&self, message: Message, next: PushNext<'_>) -> Result<Message, QueueError> {
            next.run(message).await
        }
    }

    #[test]
    fn instance_is_returned_as_is() {
        let instance: Arc<dyn PushMiddleware> = Arc::new(Passthrough);
        let factory = DefaultPushMiddlewareFactory::new();
        let resolved = factory
            .create_push_middleware(MiddlewareDefinition::Instance(Arc::clone(&instance)))
            .unwrap();
        assert!(Arc::ptr_eq(&resolved, &instance));
    }

    #[test]
    fn builtins_are_registered() {
        let factory = DefaultPushMiddlewareFactory::with_builtins();
        assert_eq!(factory.registered_names(), vec!["deduplicate", "stamp"]);
        assert!(factory
            .create_push_middleware(MiddlewareDefinition::named("stamp", json!({"source": "api"})))
            .is_ok());
        assert!(factory
            .create_push_middleware(MiddlewareDefinition::named("deduplicate", Value::Null))
            .is_ok());
    }

    #[test]
    fn unknown_name_is_unresolvable() {
        let factory = DefaultPushMiddlewareFactory::with_builtins();
        let err = factory
            .create_push_middleware(MiddlewareDefinition::named("delay", json!({"seconds": 5})))
            .err()
            .unwrap();
        assert!(matches!(err, QueueError::UnresolvableDefinition(msg) if msg.contains("delay")));
    }

    #[test]
    fn bad_params_are_unresolvable() {
        let factory = DefaultPushMiddlewareFactory::with_builtins();
        let err = factory
            .create_push_middleware(MiddlewareDefinition::named("stamp", json!([1, 2])))
            .err()
            .unwrap();
        assert!(matches!(err, QueueError::UnresolvableDefinition(_)));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut factory = DefaultPushMiddlewareFactory::new();
        factory
            .register("noop", |_| Ok(Arc::new(Passthrough) as Arc<dyn PushMiddleware>))
            .unwrap();
        let err = factory
            .register("noop", |_| Ok(Arc::new(Passthrough) as Arc<dyn PushMiddleware>))
            .unwrap_err();
        assert!(matches!(err, QueueError::DuplicateMiddleware(name) if name == "noop"));
    }

    #[test]
    fn debug_hides_closures() {
        let def = MiddlewareDefinition::invocable(|m: Message| Ok(m));
        assert_eq!(format!("{def:?}"), "Invocable(..)");
    }
}
