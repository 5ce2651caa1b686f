//! Helper functions and data types

use std::{fmt, sync::Arc};

/// Named wrapper around a shared callback, so containers holding callbacks
/// stay cloneable and debuggable.
#[derive(Clone)]
pub struct Hook<E> {
    name: String,
    func: Arc<dyn Fn(&E) + Send + Sync + 'static>,
}

impl<E> Hook<E> {
    pub fn new<N, F>(name: N, func: F) -> Self
    where
        N: Into<String>,
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self { name: name.into(), func: Arc::new(func) }
    }

    pub fn call(&self, event: &E) {
        self.func.as_ref()(event)
    }
}

impl<E> fmt::Debug for Hook<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Hook: {}>", self.name)
    }
}
