//! Causal DAG over named variables.
//!
//! Nodes are variable names; a node is *observed* when the data has a column
//! of the same name. Edges are rejected if they would close a cycle, so a
//! `CausalGraph` is acyclic by construction.
//!
//! Graphs are usually written as a small DOT document:
//!
//! ```text
//! digraph {
//!     treatment[label="Program Signup in month i"];
//!     Z -> treatment;
//!     treatment -> post_spends;
//! }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use lift_core::{Error, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};

/// A variable of the causal graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalNode {
    /// Variable name (matches a data column when observed).
    pub name: String,
    /// Optional display label from the DOT `label` attribute.
    pub label: Option<String>,
}

/// Directed acyclic causal graph.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    graph: DiGraph<CausalNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl CausalGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The loyalty-program graph: a latent instrument `Z` and the pre-period
    /// spend drive signup; signup and the signup month drive post-period spend.
    pub fn loyalty_program() -> Self {
        let mut g = Self::new();
        let treatment = g.node_index("treatment");
        g.set_label("treatment", "Program Signup in month i");
        let pre_spends = g.node_index("pre_spends");
        let post_spends = g.node_index("post_spends");
        let z = g.node_index("Z");
        let signup_month = g.node_index("signup_month");
        // post_spends has no children and treatment only feeds post_spends: acyclic.
        for (from, to) in [
            (z, treatment),
            (pre_spends, treatment),
            (treatment, post_spends),
            (signup_month, post_spends),
            (signup_month, treatment),
        ] {
            g.link(from, to);
        }
        g
    }

    /// Build a graph from an edge list.
    pub fn from_edges(edges: &[(&str, &str)]) -> Result<Self> {
        let mut g = Self::new();
        for &(from, to) in edges {
            g.add_edge(from, to)?;
        }
        Ok(g)
    }

    /// Parse a DOT `digraph`. Node attributes other than `label` are ignored.
    pub fn from_dot(text: &str) -> Result<Self> {
        dot::parse(text)
    }

    /// Render as a DOT `digraph` that [`CausalGraph::from_dot`] reads back.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph {\n");
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            match &node.label {
                Some(label) => out.push_str(&format!(
                    "    {}[label=\"{}\"];\n",
                    dot::quote_if_needed(&node.name),
                    label.replace('"', "\\\"")
                )),
                None => out.push_str(&format!("    {};\n", dot::quote_if_needed(&node.name))),
            }
        }
        for e in self.graph.edge_references() {
            out.push_str(&format!(
                "    {} -> {};\n",
                dot::quote_if_needed(&self.graph[e.source()].name),
                dot::quote_if_needed(&self.graph[e.target()].name)
            ));
        }
        out.push('}');
        out
    }

    /// Add a node if absent.
    pub fn add_node(&mut self, name: &str) {
        self.node_index(name);
    }

    fn node_index(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(CausalNode { name: name.to_string(), label: None });
        self.index.insert(name.to_string(), idx);
        idx
    }

    fn set_label(&mut self, name: &str, label: &str) {
        let idx = self.node_index(name);
        self.graph[idx].label = Some(label.to_string());
    }

    /// Add `from -> to`, creating missing nodes. Duplicate edges are ignored.
    ///
    /// Fails if the edge is a self-loop or would create a cycle.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Err(Error::InvalidArgument(format!("self-loop on '{from}' in causal graph")));
        }
        let a = self.node_index(from);
        let b = self.node_index(to);
        if self.graph.contains_edge(a, b) {
            return Ok(());
        }
        if self.has_path(b, a) {
            return Err(Error::InvalidArgument(format!(
                "edge {from} -> {to} would create a cycle in causal graph"
            )));
        }
        self.link(a, b);
        Ok(())
    }

    /// Insert an edge the caller has already checked for cycles.
    fn link(&mut self, a: NodeIndex, b: NodeIndex) {
        if !self.graph.contains_edge(a, b) {
            self.graph.add_edge(a, b, ());
        }
    }

    fn has_path(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let mut dfs = Dfs::new(&self.graph, from);
        while let Some(n) = dfs.next(&self.graph) {
            if n == to {
                return true;
            }
        }
        false
    }

    /// Whether `name` is a node.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Node names in insertion order.
    pub fn node_names(&self) -> Vec<&str> {
        self.graph.node_indices().map(|i| self.graph[i].name.as_str()).collect()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the edge `from -> to` exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// DOT label of a node, if any.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.index.get(name).and_then(|&i| self.graph[i].label.as_deref())
    }

    fn node(&self, name: &str) -> Result<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("'{name}' is not a node of the causal graph")))
    }

    fn names(&self, nodes: impl IntoIterator<Item = NodeIndex>) -> Vec<String> {
        let mut v: Vec<NodeIndex> = nodes.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        v.into_iter().map(|i| self.graph[i].name.clone()).collect()
    }

    fn reachable(&self, start: NodeIndex, dir: Direction) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            for m in self.graph.neighbors_directed(n, dir) {
                if seen.insert(m) {
                    stack.push(m);
                }
            }
        }
        seen
    }

    /// Direct causes of `name`, in node order.
    pub fn parents(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.node(name)?;
        Ok(self.names(self.graph.neighbors_directed(idx, Direction::Incoming)))
    }

    /// Direct effects of `name`, in node order.
    pub fn children(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.node(name)?;
        Ok(self.names(self.graph.neighbors_directed(idx, Direction::Outgoing)))
    }

    /// All nodes with a directed path into `name` (excluding `name`).
    pub fn ancestors(&self, name: &str) -> Result<BTreeSet<String>> {
        let idx = self.node(name)?;
        Ok(self.names(self.reachable(idx, Direction::Incoming)).into_iter().collect())
    }

    /// All nodes reachable from `name` (excluding `name`).
    pub fn descendants(&self, name: &str) -> Result<BTreeSet<String>> {
        let idx = self.node(name)?;
        Ok(self.names(self.reachable(idx, Direction::Outgoing)).into_iter().collect())
    }

    /// Copy of the graph with every edge leaving `name` removed.
    pub fn without_outgoing(&self, name: &str) -> Result<CausalGraph> {
        let idx = self.node(name)?;
        let mut g = self.clone();
        g.graph.retain_edges(|frozen, e| frozen.edge_endpoints(e).is_none_or(|(s, _)| s != idx));
        Ok(g)
    }

    /// Copy of the graph with every edge entering `name` removed.
    pub fn without_incoming(&self, name: &str) -> Result<CausalGraph> {
        let idx = self.node(name)?;
        let mut g = self.clone();
        g.graph.retain_edges(|frozen, e| frozen.edge_endpoints(e).is_none_or(|(_, t)| t != idx));
        Ok(g)
    }

    /// d-separation test: are `xs` and `ys` independent given `given`?
    ///
    /// Uses the moralized ancestral graph criterion: restrict to the
    /// ancestral closure of all three sets, marry co-parents, drop edge
    /// directions, delete `given`, and check connectivity.
    pub fn is_d_separated(&self, xs: &[&str], ys: &[&str], given: &[&str]) -> Result<bool> {
        let xs: Vec<NodeIndex> = xs.iter().map(|n| self.node(n)).collect::<Result<_>>()?;
        let ys: HashSet<NodeIndex> = ys.iter().map(|n| self.node(n)).collect::<Result<_>>()?;
        let given: HashSet<NodeIndex> = given.iter().map(|n| self.node(n)).collect::<Result<_>>()?;

        if xs.iter().any(|x| ys.contains(x)) {
            return Ok(false);
        }

        let mut relevant: HashSet<NodeIndex> = HashSet::new();
        for &n in xs.iter().chain(ys.iter()).chain(given.iter()) {
            relevant.insert(n);
            relevant.extend(self.reachable(n, Direction::Incoming));
        }

        let mut adj: HashMap<NodeIndex, HashSet<NodeIndex>> = HashMap::new();
        for &v in &relevant {
            let parents: Vec<NodeIndex> =
                self.graph.neighbors_directed(v, Direction::Incoming).collect();
            for (i, &p) in parents.iter().enumerate() {
                adj.entry(p).or_default().insert(v);
                adj.entry(v).or_default().insert(p);
                for &q in &parents[i + 1..] {
                    adj.entry(p).or_default().insert(q);
                    adj.entry(q).or_default().insert(p);
                }
            }
        }

        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for &x in &xs {
            if !given.contains(&x) && seen.insert(x) {
                queue.push_back(x);
            }
        }
        while let Some(n) = queue.pop_front() {
            if ys.contains(&n) {
                return Ok(false);
            }
            if let Some(next) = adj.get(&n) {
                for &m in next {
                    if !given.contains(&m) && seen.insert(m) {
                        queue.push_back(m);
                    }
                }
            }
        }
        Ok(true)
    }
}

impl fmt::Display for CausalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot())
    }
}

mod dot {
    //! Parser for the subset of DOT used to describe causal graphs.

    use super::CausalGraph;
    use lift_core::{Error, Result};

    #[derive(Debug, Clone, PartialEq)]
    enum Tok {
        Id(String),
        Arrow,
        LBrace,
        RBrace,
        LBracket,
        RBracket,
        Semi,
        Comma,
        Eq,
    }

    fn err(msg: impl Into<String>) -> Error {
        Error::InvalidArgument(format!("invalid causal graph: {}", msg.into()))
    }

    fn is_id_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.'
    }

    pub(super) fn quote_if_needed(name: &str) -> String {
        if !name.is_empty() && name.chars().all(is_id_char) {
            name.to_string()
        } else {
            format!("\"{}\"", name.replace('"', "\\\""))
        }
    }

    fn tokenize(text: &str) -> Result<Vec<Tok>> {
        let chars: Vec<char> = text.chars().collect();
        let mut toks = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            match c {
                c if c.is_whitespace() => i += 1,
                '#' => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                '/' if chars.get(i + 1) == Some(&'/') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    i += 2;
                    while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                        i += 1;
                    }
                    if i + 1 >= chars.len() {
                        return Err(err("unterminated block comment"));
                    }
                    i += 2;
                }
                '-' if chars.get(i + 1) == Some(&'>') => {
                    toks.push(Tok::Arrow);
                    i += 2;
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    return Err(err("undirected edges ('--') are not allowed"));
                }
                '{' => {
                    toks.push(Tok::LBrace);
                    i += 1;
                }
                '}' => {
                    toks.push(Tok::RBrace);
                    i += 1;
                }
                '[' => {
                    toks.push(Tok::LBracket);
                    i += 1;
                }
                ']' => {
                    toks.push(Tok::RBracket);
                    i += 1;
                }
                ';' => {
                    toks.push(Tok::Semi);
                    i += 1;
                }
                ',' => {
                    toks.push(Tok::Comma);
                    i += 1;
                }
                '=' => {
                    toks.push(Tok::Eq);
                    i += 1;
                }
                '"' => {
                    i += 1;
                    let mut s = String::new();
                    loop {
                        match chars.get(i) {
                            None => return Err(err("unterminated string")),
                            Some('"') => {
                                i += 1;
                                break;
                            }
                            Some('\\') if chars.get(i + 1).is_some() => {
                                s.push(chars[i + 1]);
                                i += 2;
                            }
                            Some(&ch) => {
                                s.push(ch);
                                i += 1;
                            }
                        }
                    }
                    toks.push(Tok::Id(s));
                }
                c if is_id_char(c) || c == '-' => {
                    let start = i;
                    i += 1;
                    while i < chars.len() && is_id_char(chars[i]) {
                        i += 1;
                    }
                    toks.push(Tok::Id(chars[start..i].iter().collect()));
                }
                other => return Err(err(format!("unexpected character '{other}'"))),
            }
        }
        Ok(toks)
    }

    struct Parser {
        toks: Vec<Tok>,
        pos: usize,
    }

    impl Parser {
        fn peek(&self) -> Option<&Tok> {
            self.toks.get(self.pos)
        }

        fn next(&mut self) -> Option<Tok> {
            let t = self.toks.get(self.pos).cloned();
            self.pos += 1;
            t
        }

        fn expect(&mut self, want: Tok) -> Result<()> {
            match self.next() {
                Some(t) if t == want => Ok(()),
                Some(t) => Err(err(format!("expected {want:?}, found {t:?}"))),
                None => Err(err(format!("expected {want:?}, found end of input"))),
            }
        }

        fn id(&mut self) -> Result<String> {
            match self.next() {
                Some(Tok::Id(s)) => Ok(s),
                Some(t) => Err(err(format!("expected identifier, found {t:?}"))),
                None => Err(err("expected identifier, found end of input")),
            }
        }

        /// `[k=v, k=v; ...]`, returning the `label` value if present.
        fn attrs(&mut self) -> Result<Option<String>> {
            let mut label = None;
            if self.peek() != Some(&Tok::LBracket) {
                return Ok(None);
            }
            self.next();
            loop {
                match self.peek() {
                    Some(Tok::RBracket) => {
                        self.next();
                        return Ok(label);
                    }
                    Some(Tok::Comma) | Some(Tok::Semi) => {
                        self.next();
                    }
                    Some(Tok::Id(_)) => {
                        let key = self.id()?;
                        self.expect(Tok::Eq)?;
                        let value = self.id()?;
                        if key == "label" {
                            label = Some(value);
                        }
                    }
                    Some(t) => return Err(err(format!("unexpected {t:?} in attribute list"))),
                    None => return Err(err("unterminated attribute list")),
                }
            }
        }

        fn statement(&mut self, g: &mut CausalGraph) -> Result<()> {
            let first = self.id()?;
            if matches!(first.as_str(), "graph" | "node" | "edge")
                && self.peek() == Some(&Tok::LBracket)
            {
                self.attrs()?;
                return Ok(());
            }
            if self.peek() == Some(&Tok::Eq) {
                // Graph-level attribute such as `rankdir=LR`.
                self.next();
                self.id()?;
                return Ok(());
            }

            let mut chain = vec![first];
            let mut label = self.attrs()?;
            while self.peek() == Some(&Tok::Arrow) {
                self.next();
                chain.push(self.id()?);
                // Edge attributes are ignored.
                self.attrs()?;
            }

            if chain.len() == 1 {
                g.add_node(&chain[0]);
                if let Some(l) = label.take() {
                    g.set_label(&chain[0], &l);
                }
            } else {
                for pair in chain.windows(2) {
                    g.add_edge(&pair[0], &pair[1])?;
                }
            }
            Ok(())
        }
    }

    pub(super) fn parse(text: &str) -> Result<CausalGraph> {
        let mut p = Parser { toks: tokenize(text)?, pos: 0 };

        let mut kw = p.id()?;
        if kw == "strict" {
            kw = p.id()?;
        }
        if kw == "graph" {
            return Err(err("undirected 'graph' is not a causal graph; use 'digraph'"));
        }
        if kw != "digraph" {
            return Err(err(format!("expected 'digraph', found '{kw}'")));
        }
        if matches!(p.peek(), Some(Tok::Id(_))) {
            p.next();
        }
        p.expect(Tok::LBrace)?;

        let mut g = CausalGraph::new();
        loop {
            match p.peek() {
                Some(Tok::RBrace) => {
                    p.next();
                    break;
                }
                Some(Tok::Semi) => {
                    p.next();
                }
                Some(Tok::Id(_)) => p.statement(&mut g)?,
                Some(t) => return Err(err(format!("unexpected {t:?}"))),
                None => return Err(err("missing closing '}'")),
            }
        }
        if let Some(t) = p.peek() {
            return Err(err(format!("trailing input after graph: {t:?}")));
        }
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOYALTY_DOT: &str = r#"digraph {
        treatment[label="Program Signup in month i"];
        pre_spends;
        post_spends;
        Z -> treatment;
        pre_spends -> treatment;
        treatment -> post_spends;
        signup_month -> post_spends;
        signup_month -> treatment;
    }"#;

    #[test]
    fn loyalty_graph_matches_checked_construction() {
        let builtin = CausalGraph::loyalty_program();
        let checked = CausalGraph::from_edges(&[
            ("Z", "treatment"),
            ("pre_spends", "treatment"),
            ("treatment", "post_spends"),
            ("signup_month", "post_spends"),
            ("signup_month", "treatment"),
        ])
        .unwrap();
        assert_eq!(builtin.edge_count(), checked.edge_count());
        for from in checked.node_names() {
            for to in checked.node_names() {
                assert_eq!(builtin.has_edge(from, to), checked.has_edge(from, to), "{from} -> {to}");
            }
        }
        assert_eq!(
            builtin.node_names(),
            vec!["treatment", "pre_spends", "post_spends", "Z", "signup_month"]
        );
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut g = CausalGraph::new();
        g.add_node("a");
        g.add_node("a");
        g.add_edge("a", "b").unwrap();
        g.add_edge("a", "b").unwrap();
        assert_eq!(g.node_names(), vec!["a", "b"]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn loyalty_graph_structure() {
        let g = CausalGraph::loyalty_program();
        assert_eq!(g.edge_count(), 5);
        assert!(g.has_edge("Z", "treatment"));
        assert!(g.has_edge("signup_month", "treatment"));
        assert_eq!(g.parents("treatment").unwrap(), vec!["pre_spends", "Z", "signup_month"]);
        assert_eq!(g.children("treatment").unwrap(), vec!["post_spends"]);
        assert_eq!(g.label("treatment"), Some("Program Signup in month i"));
        let anc: Vec<String> = g.ancestors("post_spends").unwrap().into_iter().collect();
        assert_eq!(anc, vec!["Z", "pre_spends", "signup_month", "treatment"]);
        assert!(g.descendants("post_spends").unwrap().is_empty());
    }

    #[test]
    fn dot_parses_the_loyalty_graph() {
        let g = CausalGraph::from_dot(LOYALTY_DOT).unwrap();
        let reference = CausalGraph::loyalty_program();
        assert_eq!(g.edge_count(), reference.edge_count());
        for n in reference.node_names() {
            assert!(g.contains(n), "missing node {n}");
        }
        assert!(g.has_edge("treatment", "post_spends"));
        assert_eq!(g.label("treatment"), Some("Program Signup in month i"));
    }

    #[test]
    fn dot_round_trips() {
        let g = CausalGraph::loyalty_program();
        let back = CausalGraph::from_dot(&g.to_dot()).unwrap();
        assert_eq!(back.node_names(), g.node_names());
        assert_eq!(back.edge_count(), g.edge_count());
        assert_eq!(back.label("treatment"), g.label("treatment"));
    }

    #[test]
    fn dot_accepts_chains_comments_and_names() {
        let g = CausalGraph::from_dot(
            "strict digraph G { rankdir=LR; // layout\n a -> b -> c [color=red]; \"x y\" -> a }",
        )
        .unwrap();
        assert!(g.has_edge("a", "b"));
        assert!(g.has_edge("b", "c"));
        assert!(g.has_edge("x y", "a"));
        assert!(g.to_dot().contains("\"x y\" -> a"));
    }

    #[test]
    fn dot_rejects_malformed_input() {
        for bad in [
            "graph { a -- b }",
            "digraph { a -> }",
            "digraph { a -> b",
            "digraph { a -> b } extra",
            "digraph { a -> b; b -> a; }",
            "digraph { a -> a }",
            "digraph { a[label=\"x] }",
            "{ a -> b }",
        ] {
            assert!(
                matches!(CausalGraph::from_dot(bad), Err(Error::InvalidArgument(_))),
                "accepted: {bad}"
            );
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let mut g = CausalGraph::from_edges(&[("a", "b"), ("b", "c")]).unwrap();
        assert!(g.add_edge("c", "a").is_err());
        assert!(g.add_edge("a", "c").is_ok());
        // Duplicate edges are a no-op.
        assert!(g.add_edge("a", "b").is_ok());
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn d_separation_on_loyalty_graph() {
        let g = CausalGraph::loyalty_program();
        // Treatment is a collider between Z and pre_spends.
        assert!(g.is_d_separated(&["Z"], &["pre_spends"], &[]).unwrap());
        assert!(!g.is_d_separated(&["Z"], &["pre_spends"], &["treatment"]).unwrap());
        // Backdoor path treatment <- signup_month -> post_spends.
        let cut = g.without_outgoing("treatment").unwrap();
        assert!(!cut.is_d_separated(&["treatment"], &["post_spends"], &[]).unwrap());
        assert!(cut.is_d_separated(&["treatment"], &["post_spends"], &["signup_month"]).unwrap());
        // Z only reaches the outcome through treatment.
        assert!(cut.is_d_separated(&["Z"], &["post_spends"], &[]).unwrap());
        assert!(!g.is_d_separated(&["Z"], &["post_spends"], &[]).unwrap());
    }

    #[test]
    fn d_separation_chain_and_fork() {
        let chain = CausalGraph::from_edges(&[("a", "b"), ("b", "c")]).unwrap();
        assert!(!chain.is_d_separated(&["a"], &["c"], &[]).unwrap());
        assert!(chain.is_d_separated(&["a"], &["c"], &["b"]).unwrap());

        let fork = CausalGraph::from_edges(&[("b", "a"), ("b", "c")]).unwrap();
        assert!(!fork.is_d_separated(&["a"], &["c"], &[]).unwrap());
        assert!(fork.is_d_separated(&["a"], &["c"], &["b"]).unwrap());

        // Conditioning on a descendant of a collider opens the path.
        let collider = CausalGraph::from_edges(&[("a", "b"), ("c", "b"), ("b", "d")]).unwrap();
        assert!(collider.is_d_separated(&["a"], &["c"], &[]).unwrap());
        assert!(!collider.is_d_separated(&["a"], &["c"], &["d"]).unwrap());
    }

    #[test]
    fn surgery_removes_edges() {
        let g = CausalGraph::loyalty_program();
        let no_in = g.without_incoming("treatment").unwrap();
        assert!(no_in.parents("treatment").unwrap().is_empty());
        assert!(no_in.has_edge("treatment", "post_spends"));
        let no_out = g.without_outgoing("treatment").unwrap();
        assert!(no_out.children("treatment").unwrap().is_empty());
        assert_eq!(no_out.parents("treatment").unwrap().len(), 3);
        assert!(g.without_outgoing("nope").is_err());
    }
}
