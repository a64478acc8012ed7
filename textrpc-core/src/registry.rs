//! Function registry.
//!
//! The registry maps function names to handlers and their help text. It is
//! assembled once at startup through [`RegistryBuilder`] and is read-only
//! afterwards, so it can be shared between connections without locking.
//!
//! ```
//! use textrpc_core::{CallContext, RegistryBuilder};
//!
//! fn shout(_ctx: &CallContext<'_>, args: &[String]) -> String {
//!     args.join(" ").to_uppercase()
//! }
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register_fn("shout", shout, "Return the arguments in upper case").unwrap();
//! let registry = builder.build();
//!
//! assert_eq!(registry.list_names(), vec!["shout"]);
//! ```

use crate::error::CoreError;
use std::collections::HashMap;
use std::fmt;

/// Per-call information handed to a handler.
pub struct CallContext<'a> {
    registry: &'a Registry,
    call_number: u64,
}

impl<'a> CallContext<'a> {
    pub fn new(registry: &'a Registry, call_number: u64) -> Self {
        Self {
            registry,
            call_number,
        }
    }

    /// Returns the registry the call was routed through.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Returns the call counter value recorded for this call.
    pub fn call_number(&self) -> u64 {
        self.call_number
    }
}

/// A function callable through the registry.
///
/// Handlers take the ordered string arguments of a request and always return
/// a string. Failures are rendered into that string by the handler itself.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &CallContext<'_>, args: &[String]) -> String;
}

/// Adapter turning a plain function or closure into a [`Handler`].
struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&CallContext<'_>, &[String]) -> String + Send + Sync + 'static,
{
    fn call(&self, ctx: &CallContext<'_>, args: &[String]) -> String {
        (self.0)(ctx, args)
    }
}

/// A registered function.
pub struct FunctionEntry {
    name: String,
    help: String,
    handler: Box<dyn Handler>,
}

impl FunctionEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish()
    }
}

/// Collects function registrations before the registry is frozen.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<FunctionEntry>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Handler,
        help: impl Into<String>,
    ) -> Result<&mut Self, CoreError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(CoreError::DuplicateName { name });
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(FunctionEntry {
            name,
            help: help.into(),
            handler: Box::new(handler),
        });
        Ok(self)
    }

    /// Registers a plain function or closure under `name`.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        f: F,
        help: impl Into<String>,
    ) -> Result<&mut Self, CoreError>
    where
        F: Fn(&CallContext<'_>, &[String]) -> String + Send + Sync + 'static,
    {
        self.register(name, FnHandler(f), help)
    }

    /// Freezes the registrations.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable name-to-function lookup.
pub struct Registry {
    entries: Vec<FunctionEntry>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Looks up a function by name.
    pub fn lookup(&self, name: &str) -> Result<&FunctionEntry, CoreError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CoreError::FunctionNotFound {
                name: name.to_string(),
            })
    }

    /// Returns whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns all registered names, in registration order.
    pub fn list_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Returns every entry, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns help text.
    ///
    /// Without a name this is a usage summary covering every function. With a
    /// name it is that function's help, or a not-found message.
    pub fn help(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => match self.lookup(name) {
                Ok(entry) => entry.help.clone(),
                Err(_) => format!("Unknown function {}", name),
            },
            None => {
                let mut usage = String::from(
                    "Usage: help 'function'\nThis server executes the following functions :",
                );
                for entry in &self.entries {
                    usage.push_str("\n  ");
                    usage.push_str(&entry.name);
                    usage.push_str(" : ");
                    usage.push_str(&entry.help);
                }
                usage
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("functions", &self.list_names())
            .finish()
    }
}
