//! Graph - node storage plus root marking and mark-sweep collection.
//!
//! Every mutation that touches a [`Value::Ref`] goes through here rather
//! than through [`Node`] directly, because only the graph can see both
//! endpoints of an edge and keep back-references consistent. Grounded on
//! `andrewsmike/nodel`'s `graph.c` surface (`ndl_graph_alloc/salloc/set/
//! get/del/mark/unmark/clean`).

use crate::error::{GraphError, GraphResult};
use crate::node::Node;
use crate::slab::Slab;
use gvm_util::{Ref, Symbol, Value};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Owns all node storage for one program's heap.
pub struct Graph {
    nodes: Slab<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Graph { nodes: Slab::new() }
    }

    fn node(&self, n: Ref) -> GraphResult<&Node> {
        self.nodes.get(n).ok_or(GraphError::NoSuchNode(n))
    }

    fn node_mut(&mut self, n: Ref) -> GraphResult<&mut Node> {
        self.nodes.get_mut(n).ok_or(GraphError::NoSuchNode(n))
    }

    /// Allocate a node with no parent. It is implicitly a root until
    /// explicitly [`Graph::unmark`]ed, guaranteeing it survives any
    /// `clean()` that runs before it gets linked into the graph.
    pub fn alloc(&mut self) -> Ref {
        let handle = self.nodes.alloc();
        self.nodes.get_mut(handle).unwrap().set_root(true);
        handle
    }

    /// Allocate a node and atomically set `parent[key] = Ref(new)`. The
    /// new node is *not* a root; its survival depends on `parent` staying
    /// reachable.
    pub fn salloc(&mut self, parent: Ref, key: Symbol) -> GraphResult<Ref> {
        self.node(parent)?;
        let handle = self.nodes.alloc();
        self.set(parent, key, Value::Ref(handle))?;
        Ok(handle)
    }

    /// Read `src[key]`, or `Value::None` if absent.
    pub fn get(&self, src: Ref, key: Symbol) -> GraphResult<Value> {
        Ok(self.node(src)?.get(key))
    }

    /// Insert or overwrite `src[key] = value`, maintaining back-edges: if
    /// the slot held a `Ref`, that destination's back-reference is
    /// dropped first; if `value` is a non-null `Ref`, the destination
    /// gains a back-reference.
    pub fn set(&mut self, src: Ref, key: Symbol, value: Value) -> GraphResult<()> {
        self.node(src)?;
        if let Value::Ref(dst) = value {
            if !dst.is_null() {
                self.node(dst)?;
            }
        }

        let old = self.node_mut(src)?.raw_set(key, value);
        if let Some(Value::Ref(old_dst)) = old {
            if !old_dst.is_null() {
                if let Some(n) = self.nodes.get_mut(old_dst) {
                    n.remove_backref(src);
                }
            }
        }
        if let Value::Ref(dst) = value {
            if !dst.is_null() {
                self.node_mut(dst)?.add_backref(src);
            }
        }
        Ok(())
    }

    /// Delete `src[key]`, dropping the back-reference if it held a `Ref`.
    pub fn del(&mut self, src: Ref, key: Symbol) -> GraphResult<()> {
        self.node(src)?;
        let old = self.node_mut(src)?.raw_del(key);
        if let Some(Value::Ref(old_dst)) = old {
            if !old_dst.is_null() {
                if let Some(n) = self.nodes.get_mut(old_dst) {
                    n.remove_backref(src);
                }
            }
        }
        Ok(())
    }

    pub fn size(&self, src: Ref) -> GraphResult<usize> {
        Ok(self.node(src)?.size())
    }

    pub fn index(&self, src: Ref, i: usize) -> GraphResult<Option<Symbol>> {
        Ok(self.node(src)?.index(i))
    }

    pub fn backref_size(&self, n: Ref) -> GraphResult<usize> {
        Ok(self.node(n)?.backref_count())
    }

    pub fn backref_index(&self, n: Ref, i: usize) -> GraphResult<Option<Ref>> {
        Ok(self.node(n)?.backref(i))
    }

    /// Add `n` to the root set.
    pub fn mark(&mut self, n: Ref) -> GraphResult<()> {
        self.node_mut(n)?.set_root(true);
        Ok(())
    }

    /// Remove `n` from the root set. Does not free it; that only happens
    /// in [`Graph::clean`].
    pub fn unmark(&mut self, n: Ref) -> GraphResult<()> {
        self.node_mut(n)?.set_root(false);
        Ok(())
    }

    pub fn is_root(&self, n: Ref) -> GraphResult<bool> {
        Ok(self.node(n)?.is_root())
    }

    /// Mark-sweep collection: flood-fill forward from every root, then
    /// reap everything unreached. Run only at explicit safe points, never
    /// implicitly from inside `set`/`del`.
    #[tracing::instrument(skip(self))]
    pub fn clean(&mut self) {
        let mut visited: FxHashSet<Ref> = FxHashSet::default();
        let mut stack: Vec<Ref> = self
            .nodes
            .iterate()
            .filter(|&n| self.nodes.get(n).unwrap().is_root())
            .collect();
        visited.extend(stack.iter().copied());

        while let Some(n) = stack.pop() {
            let node = self.nodes.get(n).unwrap();
            for (_, value) in node.entries() {
                if let Value::Ref(dst) = value {
                    if !dst.is_null() && visited.insert(dst) {
                        stack.push(dst);
                    }
                }
            }
        }

        let dying: Vec<Ref> = self
            .nodes
            .iterate()
            .filter(|n| !visited.contains(n))
            .collect();

        for &d in &dying {
            let forward: Vec<Ref> = self
                .nodes
                .get(d)
                .unwrap()
                .entries()
                .filter_map(|(_, v)| match v {
                    Value::Ref(dst) if !dst.is_null() => Some(dst),
                    _ => None,
                })
                .collect();
            for dst in forward {
                if let Some(n) = self.nodes.get_mut(dst) {
                    n.remove_backref(d);
                }
            }
        }

        for d in &dying {
            self.nodes.free(*d);
        }

        debug!(reaped = dying.len(), live = visited.len(), "gc.clean");
    }

    /// Debug-only rendering of one node's pairs and back-references; not
    /// part of any wire format, used only by the CLI's `--dump` flag.
    pub fn describe_node(&self, n: Ref) -> Option<String> {
        let node = self.nodes.get(n)?;
        let mut out = format!("node {n}: {} pairs\n", node.size());
        for (key, value) in node.entries() {
            out.push_str(&format!("  {key} = {value}\n"));
        }
        out.push_str(&format!("  backrefs: {}\n", node.backref_count()));
        for i in 0..node.backref_count() {
            out.push_str(&format!("    {}\n", node.backref(i).unwrap()));
        }
        Some(out)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.live_count()
    }

    pub fn free_count(&self) -> usize {
        self.nodes.free_count()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
