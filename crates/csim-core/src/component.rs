//! Simulation components and their registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::handler::EventHandler;

/// Identifier of simulation component, assigned sequentially on registration.
pub type Id = u32;

struct Component {
    name: String,
    handler: Option<Rc<RefCell<dyn EventHandler>>>,
}

/// Maps component names to identifiers and identifiers to event handlers.
///
/// A component may exist without a handler: it can emit events (e.g. a setup context), but events sent to it
/// are dropped.
#[derive(Default)]
pub(crate) struct Registry {
    components: Vec<Component>,
    ids: HashMap<String, Id>,
}

impl Registry {
    /// Returns the Id of the component, registering it on first use.
    pub fn register(&mut self, name: &str) -> Id {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.components.len() as Id;
        self.components.push(Component {
            name: name.to_owned(),
            handler: None,
        });
        self.ids.insert(name.to_owned(), id);
        id
    }

    pub fn set_handler(&mut self, id: Id, handler: Rc<RefCell<dyn EventHandler>>) {
        self.components[id as usize].handler = Some(handler);
    }

    pub fn id(&self, name: &str) -> Option<Id> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: Id) -> &str {
        self.components
            .get(id as usize)
            .map_or("<unknown>", |component| component.name.as_str())
    }

    pub fn handler(&self, id: Id) -> Option<Rc<RefCell<dyn EventHandler>>> {
        self.components.get(id as usize)?.handler.clone()
    }
}
