//! Control-flow edge synthesis over a lowered graph.
//!
//! ## Passes
//!
//! Each pass handles one construct family and runs over the whole graph.
//! Specific passes run before the generic one, and a pair that already has
//! a CFG edge is never overwritten, so the first pass to claim a pair wins:
//!
//! 1. function bodies
//! 2. blocks and statement sequences
//! 3. if / if-else
//! 4. pre-tested loops
//! 5. do-while loops
//! 6. switch and case groups
//! 7. break
//! 8. continue
//! 9. try / catch / finally
//! 10. catch and finally clauses
//! 11. fluent call chains
//! 12. always-evaluated constructs
//!
//! ## Limitations
//!
//! - `return` and `throw` do not get edges to the function exit
//! - labeled break/continue target the innermost construct, not the label
//! - a construct missing an expected child is skipped, nothing else is

use tracing::trace;

use crate::graph::ast_node::is_comment_kind;
use crate::graph::cfg_rules::{rules_for, CfgRules, Construct};
use crate::graph::{CfgKind, Graph, NodeId};
use crate::ingest::detect::Language;

/// One synthesis pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgPass {
    Function,
    Block,
    If,
    Loop,
    DoWhile,
    Switch,
    Break,
    Continue,
    Try,
    Handler,
    CallChain,
    Evaluated,
}

impl CfgPass {
    pub const ORDER: [CfgPass; 12] = [
        CfgPass::Function,
        CfgPass::Block,
        CfgPass::If,
        CfgPass::Loop,
        CfgPass::DoWhile,
        CfgPass::Switch,
        CfgPass::Break,
        CfgPass::Continue,
        CfgPass::Try,
        CfgPass::Handler,
        CfgPass::CallChain,
        CfgPass::Evaluated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CfgPass::Function => "function",
            CfgPass::Block => "block",
            CfgPass::If => "if",
            CfgPass::Loop => "loop",
            CfgPass::DoWhile => "do_while",
            CfgPass::Switch => "switch",
            CfgPass::Break => "break",
            CfgPass::Continue => "continue",
            CfgPass::Try => "try",
            CfgPass::Handler => "handler",
            CfgPass::CallChain => "call_chain",
            CfgPass::Evaluated => "evaluated",
        }
    }
}

/// Add CFG edges to `graph` for `language`. Returns the number added.
///
/// Running it again on the same graph adds nothing.
pub fn synthesize(graph: &mut Graph, language: Language) -> usize {
    let Some(rules) = rules_for(language) else {
        return 0;
    };
    CfgExtractor::new(graph, rules).run()
}

/// Per-graph synthesis state.
pub struct CfgExtractor<'g> {
    graph: &'g mut Graph,
    rules: &'static CfgRules,
    constructs: Vec<Option<Construct>>,
    added: usize,
}

impl<'g> CfgExtractor<'g> {
    pub fn new(graph: &'g mut Graph, rules: &'static CfgRules) -> Self {
        let constructs = graph
            .node_ids()
            .map(|id| classify(graph, rules, id))
            .collect();
        Self {
            graph,
            rules,
            constructs,
            added: 0,
        }
    }

    pub fn run(mut self) -> usize {
        for pass in CfgPass::ORDER {
            let before = self.added;
            self.run_pass(pass);
            trace!(pass = pass.as_str(), edges = self.added - before, "cfg pass");
        }
        self.added
    }

    fn run_pass(&mut self, pass: CfgPass) {
        match pass {
            CfgPass::Function => self.for_each(Construct::Function, Self::visit_function),
            CfgPass::Block => {
                self.for_each(Construct::Block, Self::visit_block);
                self.visit_loose_statement_lists();
            }
            CfgPass::If => self.for_each(Construct::If, Self::visit_if),
            CfgPass::Loop => self.for_each(Construct::Loop, Self::visit_loop),
            CfgPass::DoWhile => self.for_each(Construct::DoWhile, Self::visit_do_while),
            CfgPass::Switch => self.for_each(Construct::Switch, Self::visit_switch),
            CfgPass::Break => self.for_each(Construct::Break, Self::visit_break),
            CfgPass::Continue => self.for_each(Construct::Continue, Self::visit_continue),
            CfgPass::Try => self.for_each(Construct::Try, Self::visit_try),
            CfgPass::Handler => self.for_each(Construct::Handler, Self::visit_handler),
            CfgPass::CallChain => self.for_each(Construct::Call, Self::visit_call),
            CfgPass::Evaluated => self.for_each(Construct::Evaluated, Self::visit_evaluated),
        }
    }

    fn for_each(&mut self, construct: Construct, mut visit: impl FnMut(&mut Self, NodeId)) {
        let ids: Vec<NodeId> = self
            .constructs
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == Some(construct))
            .map(|(i, _)| NodeId(i as u32))
            .collect();
        for id in ids {
            visit(self, id);
        }
    }

    fn add(&mut self, src: NodeId, dst: NodeId, kind: CfgKind) {
        if self.graph.add_cfg_edge(src, dst, kind) {
            self.added += 1;
        }
    }

    fn construct(&self, id: NodeId) -> Option<Construct> {
        self.constructs.get(id.index()).copied().flatten()
    }

    fn kind(&self, id: NodeId) -> &str {
        &self.graph.node(id).kind
    }

    /// Named, non-comment children.
    fn significant_children(&self, id: NodeId) -> Vec<NodeId> {
        self.graph
            .named_children(id)
            .into_iter()
            .filter(|&child| !is_comment_kind(self.kind(child)))
            .collect()
    }

    /// Look through wrapper nodes down to what they wrap.
    fn unwrap(&self, mut id: NodeId) -> NodeId {
        while self.rules.is_wrapper(self.kind(id)) {
            match self.significant_children(id).first() {
                Some(&inner) => id = inner,
                None => break,
            }
        }
        id
    }

    /// Statement under any `label:` prefixes.
    fn strip_label(&self, mut id: NodeId) -> NodeId {
        while self.rules.is_label(self.kind(id)) {
            match self.significant_children(id).last() {
                Some(&inner) => id = inner,
                None => break,
            }
        }
        id
    }

    fn field(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.graph.node(id).field(name).map(|child| self.unwrap(child))
    }

    fn is_sequence(&self, id: NodeId) -> bool {
        self.construct(id) == Some(Construct::Block) || self.rules.is_statement_list(self.kind(id))
    }

    /// Children that are blocks or statement lists, in order.
    fn block_children(&self, id: NodeId) -> Vec<NodeId> {
        self.significant_children(id)
            .into_iter()
            .filter(|&child| self.is_sequence(child))
            .collect()
    }

    /// Body of a function, loop, handler or try.
    fn body(&self, id: NodeId, last: bool) -> Option<NodeId> {
        if let Some(body) = self.field(id, "body") {
            return Some(body);
        }
        let blocks = self.block_children(id);
        if last {
            blocks.last().copied()
        } else {
            blocks.first().copied()
        }
    }

    /// Statements of a sequence container, looking into a lone nested list.
    fn statements(&self, container: NodeId) -> Vec<NodeId> {
        let mut items = self.significant_children(container);
        while let [only] = items.as_slice() {
            let only = *only;
            if !self.rules.is_statement_list(self.kind(only)) {
                break;
            }
            items = self.significant_children(only);
        }
        items.into_iter().map(|item| self.strip_label(item)).collect()
    }

    /// Statements of a case group, after the last `:` or `->`.
    fn group_statements(&self, group: NodeId) -> Vec<NodeId> {
        let children = self.graph.ast_children(group);
        let separator = children.iter().rposition(|&child| {
            let node = self.graph.node(child);
            !node.named && matches!(node.kind.as_str(), ":" | "->")
        });

        let candidates = match separator {
            Some(pos) => children[pos + 1..].to_vec(),
            None => children,
        };
        let items: Vec<NodeId> = candidates
            .into_iter()
            .filter(|&child| {
                let node = self.graph.node(child);
                node.named && !is_comment_kind(&node.kind) && !self.rules.is_case_label(&node.kind)
            })
            .collect();
        match items.as_slice() {
            [only] if self.rules.is_statement_list(self.kind(*only)) => self.statements(*only),
            _ => items.into_iter().map(|item| self.strip_label(item)).collect(),
        }
    }

    fn first_statement(&self, body: NodeId) -> NodeId {
        if self.is_sequence(body) {
            if let Some(&first) = self.statements(body).first() {
                return first;
            }
        }
        body
    }

    fn last_statement(&self, body: NodeId) -> NodeId {
        if self.is_sequence(body) {
            if let Some(&last) = self.statements(body).last() {
                return last;
            }
        }
        body
    }

    /// The statement control reaches when `id` completes normally, if it has
    /// a following sibling in its enclosing sequence.
    ///
    /// Single-child wrappers such as an expression statement around a
    /// switch expression are climbed first, and so are labels.
    fn exit_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        let (parent, siblings) = loop {
            let parent = self.graph.ast_parent(current)?;
            if self.rules.is_label(self.kind(parent)) {
                current = parent;
                continue;
            }
            if self.construct(parent) == Some(Construct::CaseGroup) {
                break (parent, self.group_statements(parent));
            }
            if self.is_sequence(parent) {
                break (parent, self.significant_children(parent));
            }
            let structural = self
                .construct(parent)
                .is_some_and(|construct| construct != Construct::Evaluated);
            if structural || self.significant_children(parent).len() != 1 {
                return None;
            }
            current = parent;
        };
        let target = self.strip_label(current);
        let pos = siblings
            .iter()
            .position(|&s| s == current || self.strip_label(s) == target)?;
        let next = siblings.get(pos + 1).map(|&s| self.strip_label(s));
        trace!(construct = %id, container = %parent, exit = ?next, "exit lookup");
        next
    }

    fn is_jump(&self, id: NodeId) -> bool {
        matches!(
            self.construct(id),
            Some(Construct::Break | Construct::Continue)
        )
    }

    fn chain(&mut self, items: &[NodeId]) {
        for pair in items.windows(2) {
            let ends = self
                .construct(pair[0])
                .is_some_and(|construct| construct.ends_sequence());
            if !ends {
                self.add(pair[0], pair[1], CfgKind::Always);
            }
        }
    }

    fn visit_function(&mut self, id: NodeId) {
        let Some(body) = self.body(id, false) else {
            return;
        };
        if self.is_sequence(body) {
            self.add(id, body, CfgKind::Always);
        }
    }

    fn visit_block(&mut self, id: NodeId) {
        let items = self.statements(id);
        if let Some(&first) = items.first() {
            self.add(id, first, CfgKind::Always);
        }
        self.chain(&items);
    }

    // Statement lists not expanded by an enclosing block (Kotlin try bodies)
    fn visit_loose_statement_lists(&mut self) {
        let lists: Vec<NodeId> = self
            .graph
            .node_ids()
            .filter(|&id| self.rules.is_statement_list(self.kind(id)))
            .filter(|&id| {
                self.graph
                    .ast_parent(id)
                    .map_or(true, |parent| self.construct(parent) != Some(Construct::Block))
            })
            .collect();
        for id in lists {
            self.visit_block(id);
        }
    }

    fn visit_if(&mut self, id: NodeId) {
        let blocks = self.block_children(id);
        let then_branch = self
            .field(id, "consequence")
            .or_else(|| blocks.first().copied());
        let else_branch = self
            .field(id, "alternative")
            .or_else(|| blocks.get(1).copied());

        if let Some(then_branch) = then_branch {
            self.add(id, then_branch, CfgKind::True);
        }
        if let Some(else_branch) = else_branch {
            self.add(id, else_branch, CfgKind::False);
        }
    }

    fn visit_loop(&mut self, id: NodeId) {
        let Some(body) = self.body(id, true) else {
            return;
        };
        let entry = self.first_statement(body);
        let last = self.last_statement(body);

        self.add(id, entry, CfgKind::True);
        if !self.is_jump(last) {
            self.add(last, id, CfgKind::Always);
        }
        if let Some(exit) = self.exit_of(id) {
            self.add(id, exit, CfgKind::False);
        }
    }

    fn visit_do_while(&mut self, id: NodeId) {
        let Some(body) = self.body(id, false) else {
            return;
        };
        let last = self.last_statement(body);

        self.add(id, body, CfgKind::Always);
        if self.is_jump(last) {
            return;
        }
        self.add(last, id, CfgKind::True);
        if let Some(exit) = self.exit_of(id) {
            self.add(last, exit, CfgKind::False);
        }
    }

    fn visit_switch(&mut self, id: NodeId) {
        let body = self
            .field(id, "body")
            .filter(|&body| self.construct(body) != Some(Construct::CaseGroup))
            .unwrap_or(id);
        if body != id {
            self.add(id, body, CfgKind::Always);
        }

        let groups: Vec<NodeId> = self
            .significant_children(body)
            .into_iter()
            .filter(|&child| self.construct(child) == Some(Construct::CaseGroup))
            .collect();
        if groups.is_empty() {
            return;
        }

        // Later cases are reached through the group chain, not fallthrough
        if body != groups[0] {
            self.add(body, groups[0], CfgKind::Always);
        }
        self.chain_groups(&groups);

        let bodies: Vec<Vec<NodeId>> = groups.iter().map(|&g| self.group_statements(g)).collect();
        if let Some(&first) = bodies[0].first() {
            self.add(body, first, CfgKind::True);
        }
        for (&group, statements) in groups.iter().zip(&bodies) {
            if let Some(&first) = statements.first() {
                self.add(group, first, CfgKind::True);
            }
            self.chain(statements);
        }

        for i in 0..groups.len().saturating_sub(1) {
            let (Some(&last), Some(&next)) = (bodies[i].last(), bodies[i + 1].first()) else {
                continue;
            };
            if self.falls_through(groups[i], last) {
                self.add(last, next, CfgKind::Always);
            }
        }
    }

    fn chain_groups(&mut self, groups: &[NodeId]) {
        for pair in groups.windows(2) {
            self.add(pair[0], pair[1], CfgKind::Always);
        }
    }

    fn falls_through(&self, group: NodeId, last: NodeId) -> bool {
        if self.rules.is_sealed_group(self.kind(group)) {
            return false;
        }
        if self.is_jump(last) {
            return false;
        }
        self.construct(last) == Some(Construct::Fallthrough) || self.rules.implicit_fallthrough()
    }

    /// Innermost enclosing construct accepted by `accept`, within the
    /// current function.
    fn enclosing(&self, id: NodeId, accept: impl Fn(Construct) -> bool) -> Option<NodeId> {
        for ancestor in self.graph.ast_ancestors(id) {
            match self.construct(ancestor) {
                Some(Construct::Function) => return None,
                Some(construct) if accept(construct) => return Some(ancestor),
                _ => {}
            }
        }
        None
    }

    fn visit_break(&mut self, id: NodeId) {
        let Some(target) = self.enclosing(id, |c| c.is_loop() || c == Construct::Switch) else {
            return;
        };
        if let Some(exit) = self.exit_of(target) {
            self.add(id, exit, CfgKind::Break);
        }
    }

    fn visit_continue(&mut self, id: NodeId) {
        if let Some(target) = self.enclosing(id, |c| c.is_loop()) {
            self.add(id, target, CfgKind::Continue);
        }
    }

    fn visit_try(&mut self, id: NodeId) {
        let Some(body) = self.body(id, false) else {
            return;
        };

        let mut previous = id;
        if let Some(resources) = self.graph.node(id).field("resources") {
            self.add(id, resources, CfgKind::Always);
            previous = resources;
        }
        self.add(previous, body, CfgKind::Always);

        let handlers: Vec<NodeId> = self
            .significant_children(id)
            .into_iter()
            .filter(|&child| self.construct(child) == Some(Construct::Handler))
            .collect();
        let (finally, catches): (Vec<NodeId>, Vec<NodeId>) = handlers
            .into_iter()
            .partition(|&handler| self.rules.is_finally(self.kind(handler)));

        for &catch in &catches {
            self.add(body, catch, CfgKind::Maybe);
        }
        if let Some(&finally) = finally.first() {
            if catches.is_empty() {
                self.add(body, finally, CfgKind::Always);
            }
            for &catch in &catches {
                self.add(catch, finally, CfgKind::Always);
            }
        }
    }

    fn visit_handler(&mut self, id: NodeId) {
        if let Some(block) = self.body(id, false) {
            self.add(id, block, CfgKind::Always);
        }
    }

    fn receiver(&self, call: NodeId) -> Option<NodeId> {
        let node = self.graph.node(call);
        let target = node
            .field("object")
            .or_else(|| node.field("function"))
            .or_else(|| self.significant_children(call).first().copied())?;

        if self.construct(target) == Some(Construct::Call) {
            return Some(target);
        }
        if !self.rules.is_member_access(self.kind(target)) {
            return None;
        }
        let member = self.graph.node(target);
        let inner = member
            .field("object")
            .or_else(|| member.field("operand"))
            .or_else(|| member.field("expression"))
            .or_else(|| self.significant_children(target).first().copied())?;
        (self.construct(inner) == Some(Construct::Call)).then_some(inner)
    }

    fn visit_call(&mut self, id: NodeId) {
        if let Some(receiver) = self.receiver(id) {
            self.add(receiver, id, CfgKind::Always);
        }
    }

    fn visit_evaluated(&mut self, id: NodeId) {
        if let Some(parent) = self.graph.ast_parent(id) {
            self.add(parent, id, CfgKind::Always);
        }
    }
}

fn classify(graph: &Graph, rules: &CfgRules, id: NodeId) -> Option<Construct> {
    let node = graph.node(id);
    if !node.named {
        return None;
    }
    match rules.construct(&node.kind)? {
        Construct::Jump => {
            let keyword = graph.ast_children(id).first().map(|&first| graph.node(first))?;
            let token = keyword.text.as_deref().unwrap_or(keyword.kind.as_str());
            if token.starts_with("break") {
                Some(Construct::Break)
            } else if token.starts_with("continue") {
                Some(Construct::Continue)
            } else {
                None
            }
        }
        construct => Some(construct),
    }
}
