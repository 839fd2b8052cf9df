//! Creation order of tables under foreign-key dependencies.
//!
//! An edge `A -> B` means `A` declares a foreign key referencing `B`, so `B`
//! must be created first. Self-references are not edges: the referencing
//! constraint is emitted inline with the table that owns it.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::{DesignError, Result};
use crate::schema::{Schema, Table};

/// Foreign-key graph over table slots.
#[derive(Debug, Clone)]
pub struct DependencyGraph<'a> {
    names: Vec<&'a str>,
    /// `depends_on[a]` holds every slot `a` references.
    depends_on: Vec<BTreeSet<usize>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn build(schema: &'a Schema) -> Self {
        let names: Vec<&str> = schema.tables().iter().map(|t| t.name.as_str()).collect();
        let slot_of: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

        let mut depends_on = vec![BTreeSet::new(); names.len()];
        for (i, table) in schema.tables().iter().enumerate() {
            for fk in &table.foreign_keys {
                if fk.is_self_reference() {
                    continue;
                }
                // Schema validation guarantees the target exists.
                if let Some(&target) = slot_of.get(fk.ref_table.as_str()) {
                    depends_on[i].insert(target);
                }
            }
        }
        Self { names, depends_on }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every dependency edge as `(dependent, dependency)` names, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .depends_on
            .iter()
            .enumerate()
            .flat_map(|(from, deps)| {
                deps.iter()
                    .map(move |&to| (self.names[from].to_string(), self.names[to].to_string()))
            })
            .collect();
        out.sort();
        out
    }

    /// Kahn's algorithm; ties among ready tables resolve by ascending name.
    pub fn topological_order(&self) -> Result<Vec<&'a str>> {
        let n = self.names.len();
        let mut remaining: Vec<usize> = self.depends_on.iter().map(|d| d.len()).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, deps) in self.depends_on.iter().enumerate() {
            for &to in deps {
                dependents[to].push(from);
            }
        }

        let mut ready: BTreeSet<(&str, usize)> = (0..n)
            .filter(|&i| remaining[i] == 0)
            .map(|i| (self.names[i], i))
            .collect();
        let mut order: Vec<&'a str> = Vec::with_capacity(n);

        while let Some(next) = ready.pop_first() {
            let (name, slot) = next;
            order.push(self.names[slot]);
            debug!(table = name, position = order.len(), "table ordered");
            for &dependent in &dependents[slot] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert((self.names[dependent], dependent));
                }
            }
        }

        if order.len() == n {
            return Ok(order);
        }

        let (tables, edges) = self.cycles();
        warn!(tables = ?tables, "foreign-key cycle prevents ordering");
        Err(DesignError::CyclicDependency { tables, edges })
    }

    /// Tables on a cycle (non-trivial strongly connected components) and the
    /// edges between them.
    fn cycles(&self) -> (Vec<String>, Vec<(String, String)>) {
        let components = self.strongly_connected_components();
        let mut component_of = vec![usize::MAX; self.names.len()];
        let mut tables: Vec<String> = Vec::new();
        for (c, members) in components.iter().enumerate() {
            if members.len() < 2 {
                continue;
            }
            for &m in members {
                component_of[m] = c;
                tables.push(self.names[m].to_string());
            }
        }
        tables.sort();

        let mut edges: Vec<(String, String)> = Vec::new();
        for (from, deps) in self.depends_on.iter().enumerate() {
            for &to in deps {
                if component_of[from] != usize::MAX && component_of[from] == component_of[to] {
                    edges.push((self.names[from].to_string(), self.names[to].to_string()));
                }
            }
        }
        edges.sort();
        (tables, edges)
    }

    /// Tarjan's algorithm.
    fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        struct State {
            counter: usize,
            index: Vec<Option<usize>>,
            lowlink: Vec<usize>,
            on_stack: Vec<bool>,
            stack: Vec<usize>,
            components: Vec<Vec<usize>>,
        }

        fn visit(v: usize, graph: &[BTreeSet<usize>], st: &mut State) {
            st.index[v] = Some(st.counter);
            st.lowlink[v] = st.counter;
            st.counter += 1;
            st.stack.push(v);
            st.on_stack[v] = true;

            for &w in &graph[v] {
                match st.index[w] {
                    None => {
                        visit(w, graph, st);
                        st.lowlink[v] = st.lowlink[v].min(st.lowlink[w]);
                    }
                    Some(w_index) if st.on_stack[w] => {
                        st.lowlink[v] = st.lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
            }

            if Some(st.lowlink[v]) == st.index[v] {
                let mut component = Vec::new();
                while let Some(w) = st.stack.pop() {
                    st.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                st.components.push(component);
            }
        }

        let n = self.names.len();
        let mut st = State {
            counter: 0,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            components: Vec::new(),
        };
        for v in 0..n {
            if st.index[v].is_none() {
                visit(v, &self.depends_on, &mut st);
            }
        }
        st.components
    }
}

/// Orders the schema's tables so every table follows the tables it references.
pub fn order_tables(schema: &Schema) -> Result<Vec<&Table>> {
    let graph = DependencyGraph::build(schema);
    let names = graph.topological_order()?;
    names.into_iter().map(|name| schema.table(name)).collect()
}

/// Table names in creation order.
pub fn creation_order(schema: &Schema) -> Result<Vec<String>> {
    Ok(order_tables(schema)?
        .into_iter()
        .map(|t| t.name.clone())
        .collect())
}
