//! Tree traversal for diagnostics tooling.

use serde_json::{Map, Value};

use crate::config::node::Config;

/// Callbacks fired during a depth-first walk of a config tree.
///
/// Composites report each child via `visit_child`, walk into it, then call
/// `leave_child`. Leaves report their entries through `visit_property`.
pub trait Visitor {
    fn visit_child(&mut self, name: &str, child: &dyn Config);

    fn leave_child(&mut self, _name: &str) {}

    fn visit_property(&mut self, key: &str, value: &str);
}

/// Renders a tree as nested JSON objects: one object per child, keyed by
/// child name, holding that child's entries.
///
/// Duplicate sibling names get a `#n` suffix so that shadowed layers stay
/// visible in the dump.
#[derive(Debug)]
pub struct TreeDump {
    stack: Vec<Map<String, Value>>,
}

impl TreeDump {
    pub fn new() -> Self {
        Self {
            stack: vec![Map::new()],
        }
    }

    /// Walk `config` and return its JSON rendering.
    pub fn of(config: &dyn Config) -> Value {
        let mut dump = Self::new();
        config.accept(&mut dump);
        dump.finish()
    }

    pub fn finish(mut self) -> Value {
        // Unbalanced enter/leave pairs fold into their parent
        while self.stack.len() > 1 {
            self.fold_top("?");
        }
        Value::Object(self.stack.pop().unwrap_or_default())
    }

    fn fold_top(&mut self, name: &str) {
        let Some(done) = self.stack.pop() else {
            return;
        };
        if let Some(parent) = self.stack.last_mut() {
            let mut slot = name.to_string();
            let mut n = 2;
            while parent.contains_key(&slot) {
                slot = format!("{}#{}", name, n);
                n += 1;
            }
            parent.insert(slot, Value::Object(done));
        }
    }
}

impl Default for TreeDump {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for TreeDump {
    fn visit_child(&mut self, _name: &str, _child: &dyn Config) {
        self.stack.push(Map::new());
    }

    fn leave_child(&mut self, name: &str) {
        self.fold_top(name);
    }

    fn visit_property(&mut self, key: &str, value: &str) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
}
