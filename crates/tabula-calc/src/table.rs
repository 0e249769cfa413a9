//! The symbol table and its evaluation scheduler.
//!
//! A table holds named expression definitions plus a bidirectional
//! dependency graph derived from their free variables:
//!
//! - `reqs`: name -> names its expression references
//! - `reqd_by`: name -> names whose expressions reference it
//!
//! The two edge sets are exact mirrors, updated in lock-step by a single
//! mutator. `all` is every name currently touched by a definition or an
//! edge; a name may be referenced (and scheduled) before it is defined.
//!
//! Evaluation walks the graph in deterministic topological order: a
//! Kahn-style pass whose ready queue is sorted lexicographically at every
//! generation, so ties always break by name. Names left with positive
//! in-degree form the cycled set; they are bound to the unknown value so
//! their dependents can still make progress, and reported once.

use crate::edge_set::EdgeSet;
use crate::funcs::{self, UserFunc};
use crate::symbol_set::SymbolSet;
use indexmap::IndexMap;
use tabula_expr::{
    Context, Diagnostic, DiagnosticKind, Diagnostics, Expression, FuncDef, Value,
};
use tracing::{debug, trace};

/// One evaluated entry from [`Table::values`].
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolValue {
    pub symbol: String,
    pub value: Value,
}

/// A dependency-tracked symbol table.
#[derive(Debug, Default)]
pub struct Table {
    syms: IndexMap<String, Expression>,
    funcs: IndexMap<String, UserFunc>,
    all: SymbolSet,
    reqs: EdgeSet,
    reqd_by: EdgeSet,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Original source text of `name`'s definition, or the empty string
    /// for names that are not (or no longer) defined.
    pub fn source(&self, name: &str) -> &str {
        self.syms.get(name).map(Expression::source).unwrap_or("")
    }

    /// Register `expr` under `name`, replacing any prior definition and
    /// rebuilding its edges from the expression's free variables.
    pub fn define(&mut self, name: &str, expr: Expression) {
        // Discard any existing definition with the same name first so
        // its stale edges never coexist with the new ones.
        self.remove_symbol(name);

        for traversal in expr.variables() {
            let reqd_name = traversal.root_name();
            self.all.add(reqd_name);
            self.reqs.add(name, reqd_name);
            self.reqd_by.add(reqd_name, name);
        }
        self.syms.insert(name.to_string(), expr);
        self.all.add(name);
        debug!(symbol = name, "defined symbol");
    }

    /// Remove `name`'s definition. No-op if absent. The name stays in
    /// the graph while other definitions still reference it.
    pub fn remove(&mut self, name: &str) {
        self.remove_symbol(name);
        debug!(symbol = name, "removed symbol");
    }

    fn remove_symbol(&mut self, name: &str) {
        self.syms.swap_remove(name);

        // Drop the mirror of each outgoing edge from the names this
        // symbol referenced, then the outgoing edges themselves.
        let reqd_names: Vec<String> = self.reqs.targets(name).map(str::to_string).collect();
        for reqd_name in &reqd_names {
            self.reqd_by.remove(reqd_name, name);
            if !self.syms.contains_key(reqd_name)
                && !self.reqs.from_has_any(reqd_name)
                && !self.reqd_by.from_has_any(reqd_name)
            {
                self.all.remove(reqd_name);
            }
        }
        self.reqs.remove_from(name);

        if !self.reqs.from_has_any(name) && !self.reqd_by.from_has_any(name) {
            self.all.remove(name);
        }
    }

    /// Register a user-defined function. Overwrites any prior function
    /// of the same name. When `variadic` is set the last parameter
    /// receives all trailing arguments as one tuple.
    ///
    /// Only direct self-calls are rejected at call time; mutual
    /// recursion between functions is not guarded.
    pub fn define_func(&mut self, name: &str, params: Vec<String>, variadic: bool, body: Expression) {
        self.funcs
            .insert(name.to_string(), UserFunc::new(params, variadic, body));
        debug!(function = name, "defined function");
    }

    /// Remove a user-defined function. No-op if absent.
    pub fn remove_func(&mut self, name: &str) {
        self.funcs.swap_remove(name);
    }

    /// Defined names starting with `prefix`, in no particular order.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.syms
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Evaluate `name`'s definition against its dependencies.
    ///
    /// An undefined name yields the unknown value and a single
    /// diagnostic.
    pub fn value(&self, name: &str) -> (Value, Diagnostics) {
        let Some(expr) = self.syms.get(name) else {
            return (Value::unknown(), undefined_diagnostic(name).into());
        };
        self.eval(expr)
    }

    /// Evaluate an arbitrary expression against the transitive closure
    /// of the symbols it requires.
    pub fn eval(&self, expr: &Expression) -> (Value, Diagnostics) {
        self.eval_with(expr, IndexMap::new(), IndexMap::new())
    }

    /// Evaluate every symbol in dependency order.
    ///
    /// The returned entries follow the scheduler's visit order, with any
    /// cycled names appended afterwards in lexicographic order, bound to
    /// the unknown value. Undefined names are each reported once, sorted
    /// by name.
    pub fn values(&self) -> (Vec<SymbolValue>, Diagnostics) {
        if self.all.is_empty() {
            return (Vec::new(), Diagnostics::new());
        }

        let mut diags = Diagnostics::new();
        self.push_undefined(self.all.iter(), &mut diags);

        let mut entries = Vec::with_capacity(self.all.len());
        let mut ctx = Context::new();
        ctx.functions = self.bound_funcs();

        let cycled = self.visit_symbols(&self.all, |name, expr| {
            let (value, value_diags) = expr.value(&ctx);
            entries.push(SymbolValue {
                symbol: name.to_string(),
                value: value.clone(),
            });
            ctx.variables.insert(name.to_string(), value);
            diags.extend(value_diags);
        });

        if !cycled.is_empty() {
            let first_cycled = entries.len();
            for name in cycled.iter() {
                entries.push(SymbolValue {
                    symbol: name.to_string(),
                    value: Value::unknown(),
                });
            }
            entries[first_cycled..].sort_by(|a, b| a.symbol.cmp(&b.symbol));
            diags.push(cycle_diagnostic(&cycled));
        }

        (entries, diags)
    }

    /// Shared evaluation path for [`Table::eval`] and function bodies.
    ///
    /// `extra_vars` and `extra_funcs` are layered on a child context
    /// that only the target expression sees, not the scheduled symbols.
    pub(crate) fn eval_with<'t>(
        &'t self,
        expr: &Expression,
        extra_vars: IndexMap<String, Value>,
        extra_funcs: IndexMap<String, FuncDef<'t>>,
    ) -> (Value, Diagnostics) {
        let mut diags = Diagnostics::new();

        let mut reqd = SymbolSet::new();
        self.add_required_symbols(expr, &mut reqd);
        for name in extra_vars.keys() {
            reqd.remove(name);
        }

        self.push_undefined(reqd.iter(), &mut diags);

        let mut ctx = Context::new();
        ctx.functions = self.bound_funcs();

        let cycled = self.visit_symbols(&reqd, |name, sym_expr| {
            let (value, value_diags) = sym_expr.value(&ctx);
            diags.extend(value_diags);
            ctx.variables.insert(name.to_string(), value);
        });

        if !cycled.is_empty() {
            for name in cycled.iter() {
                ctx.variables.insert(name.to_string(), Value::unknown());
            }
            diags.push(cycle_diagnostic(&cycled));
        }

        let child;
        let target_ctx = if !extra_vars.is_empty() || !extra_funcs.is_empty() {
            child = {
                let mut c = ctx.child();
                c.variables = extra_vars;
                c.functions = extra_funcs;
                c
            };
            &child
        } else {
            &ctx
        };

        let (value, value_diags) = expr.value(target_ctx);
        diags.extend(value_diags);
        (value, diags)
    }

    /// Walk `syms` in dependency order, invoking `cb` once per
    /// schedulable name with its expression (the missing-expression
    /// sentinel for names that are not defined). Returns the names that
    /// could not be scheduled because they sit on a cycle.
    ///
    /// In-degrees count only edges inside `syms`, and the ready queue is
    /// re-sorted at each generation so the visit order is reproducible
    /// regardless of map iteration order.
    fn visit_symbols(&self, syms: &SymbolSet, mut cb: impl FnMut(&str, &Expression)) -> SymbolSet {
        let mut in_deg: IndexMap<&str, usize> = IndexMap::with_capacity(syms.len());
        let mut queue: Vec<&str> = Vec::with_capacity(syms.len());

        for name in syms.iter() {
            let deg = self
                .reqs
                .targets(name)
                .filter(|target| syms.has(target))
                .count();
            in_deg.insert(name, deg);
            if deg == 0 {
                queue.push(name);
            }
        }
        queue.sort_unstable();

        let missing = Expression::missing();
        let mut head = 0;
        while head < queue.len() {
            let name = queue[head];
            head += 1;
            trace!(symbol = name, "visiting symbol");

            let expr = self.syms.get(name).unwrap_or(&missing);
            cb(name, expr);

            let new_start = queue.len();
            for dependent in self.reqd_by.targets(name) {
                if !syms.has(dependent) {
                    continue;
                }
                let Some(deg) = in_deg.get_mut(dependent) else {
                    continue;
                };
                *deg -= 1;
                if *deg == 0 {
                    queue.push(dependent);
                }
            }
            queue[new_start..].sort_unstable();
        }

        let mut cycled = SymbolSet::new();
        for (name, deg) in in_deg {
            if deg > 0 {
                cycled.add(name);
            }
        }
        cycled
    }

    /// Collect the transitive closure of symbols `expr` requires. The
    /// walk stops at names with no definition.
    fn add_required_symbols(&self, expr: &Expression, set: &mut SymbolSet) {
        for traversal in expr.variables() {
            let name = traversal.root_name();
            if set.has(name) {
                continue;
            }
            set.add(name);
            if let Some(reqd_expr) = self.syms.get(name) {
                self.add_required_symbols(reqd_expr, set);
            }
        }
    }

    /// Report each undefined name among `names`, sorted lexicographically.
    fn push_undefined<'n>(&self, names: impl Iterator<Item = &'n str>, diags: &mut Diagnostics) {
        let mut undef: Vec<&str> = names
            .filter(|name| !self.syms.contains_key(*name))
            .collect();
        undef.sort_unstable();
        for name in undef {
            diags.push(undefined_diagnostic(name));
        }
    }

    /// The user-defined functions as context callables bound to this
    /// table.
    fn bound_funcs(&self) -> IndexMap<String, FuncDef<'_>> {
        self.funcs
            .iter()
            .map(|(name, func)| (name.clone(), funcs::bind(self, name, func)))
            .collect()
    }
}

fn undefined_diagnostic(name: &str) -> Diagnostic {
    Diagnostic::error(
        DiagnosticKind::Undefined,
        "Variable not defined",
        format!("The variable {name:?} has not yet had an expression assigned."),
    )
}

fn cycle_diagnostic(cycled: &SymbolSet) -> Diagnostic {
    let mut names = Vec::new();
    cycled.append_names(&mut names);
    Diagnostic::error(
        DiagnosticKind::DependencyCycle,
        "Dependency cycle",
        format!(
            "There is a dependency cycle between the following variables: {}.",
            names.join(", ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_expr::parse_expression;

    fn expr(src: &str, name: &str) -> Expression {
        let (parsed, diags) = parse_expression(src, name);
        assert!(!diags.has_errors(), "parse failed for {src:?}: {diags}");
        parsed
    }

    fn define(table: &mut Table, name: &str, src: &str) {
        table.define(name, expr(src, name));
    }

    /// Check that `reqs` and `reqd_by` mirror each other exactly.
    fn assert_mirrored(table: &Table) {
        for from in table.reqs.froms() {
            for to in table.reqs.targets(from) {
                assert!(
                    table.reqd_by.has(to, from),
                    "reqs has {from}->{to} but reqd_by lacks the mirror"
                );
            }
        }
        for from in table.reqd_by.froms() {
            for to in table.reqd_by.targets(from) {
                assert!(
                    table.reqs.has(to, from),
                    "reqd_by has {from}->{to} but reqs lacks the mirror"
                );
            }
        }
    }

    /// Check that `all` covers exactly the names with a definition or an
    /// incident edge.
    fn assert_all_consistent(table: &Table) {
        for name in table.syms.keys() {
            assert!(table.all.has(name), "{name} is defined but not in all");
        }
        for from in table.reqs.froms() {
            assert!(table.all.has(from));
            for to in table.reqs.targets(from) {
                assert!(table.all.has(to));
            }
        }
        for name in table.all.iter() {
            assert!(
                table.syms.contains_key(name)
                    || table.reqs.from_has_any(name)
                    || table.reqd_by.from_has_any(name),
                "{name} is in all but has no definition and no edges"
            );
        }
    }

    #[test]
    fn define_builds_both_edge_sets() {
        let mut table = Table::new();
        define(&mut table, "a", "b + c");

        assert!(table.reqs.has("a", "b"));
        assert!(table.reqs.has("a", "c"));
        assert!(table.reqd_by.has("b", "a"));
        assert!(table.reqd_by.has("c", "a"));
        assert!(table.all.has("a"));
        assert!(table.all.has("b"));
        assert_mirrored(&table);
        assert_all_consistent(&table);
    }

    #[test]
    fn redefinition_drops_old_edges() {
        let mut table = Table::new();
        define(&mut table, "a", "b + c");
        define(&mut table, "a", "5");

        assert!(!table.reqs.from_has_any("a"));
        assert!(!table.reqd_by.has("b", "a"));
        assert!(!table.reqd_by.has("c", "a"));
        // b and c had no definition and no remaining edges.
        assert!(!table.all.has("b"));
        assert!(!table.all.has("c"));
        assert_mirrored(&table);
        assert_all_consistent(&table);
    }

    #[test]
    fn redefinition_with_same_expression_is_idempotent() {
        let mut table = Table::new();
        define(&mut table, "a", "b + 1");
        define(&mut table, "b", "2");
        let (before, _) = table.values();

        define(&mut table, "a", "b + 1");
        let (after, _) = table.values();
        assert_eq!(before, after);
        assert_mirrored(&table);
        assert_all_consistent(&table);
    }

    #[test]
    fn remove_keeps_name_while_still_referenced() {
        let mut table = Table::new();
        define(&mut table, "x", "1");
        define(&mut table, "y", "x + 1");

        table.remove("x");
        // y still references x, so x stays in the graph undefined.
        assert!(table.all.has("x"));
        assert_eq!(table.source("x"), "");
        assert_mirrored(&table);
        assert_all_consistent(&table);

        table.remove("y");
        assert!(!table.all.has("x"));
        assert!(!table.all.has("y"));
    }

    #[test]
    fn remove_drops_edges_in_both_directions() {
        let mut table = Table::new();
        define(&mut table, "a", "b + c");
        define(&mut table, "b", "1");
        table.remove("a");

        assert!(!table.reqs.from_has_any("a"));
        assert!(!table.reqd_by.has("b", "a"));
        assert!(!table.reqd_by.has("c", "a"));
        assert!(!table.all.has("a"));
        // c was only alive as a's dependency target.
        assert!(!table.all.has("c"));
        // b keeps its own definition.
        assert!(table.all.has("b"));
        assert_mirrored(&table);
        assert_all_consistent(&table);
    }

    #[test]
    fn remove_of_absent_name_is_a_no_op() {
        let mut table = Table::new();
        define(&mut table, "a", "1");
        table.remove("nope");
        assert!(table.all.has("a"));
        assert_mirrored(&table);
    }

    #[test]
    fn mirror_invariant_holds_across_random_mutations() {
        let mut table = Table::new();
        let script: &[(&str, Option<&str>)] = &[
            ("a", Some("b + c")),
            ("b", Some("c * 2")),
            ("c", Some("1")),
            ("a", Some("c")),
            ("b", None),
            ("d", Some("a + b + c + d")),
            ("c", None),
            ("d", Some("2")),
            ("a", None),
        ];
        for (name, src) in script {
            match src {
                Some(src) => define(&mut table, name, src),
                None => table.remove(name),
            }
            assert_mirrored(&table);
            assert_all_consistent(&table);
        }
    }

    #[test]
    fn names_with_prefix_filters_defined_names() {
        let mut table = Table::new();
        define(&mut table, "alpha", "1");
        define(&mut table, "alien", "undefined_ref");
        define(&mut table, "beta", "1");

        let mut names = table.names_with_prefix("al");
        names.sort_unstable();
        assert_eq!(names, vec!["alien", "alpha"]);
        // Referenced-but-undefined names are not included.
        assert!(table.names_with_prefix("undefined").is_empty());
    }

    #[test]
    fn source_returns_original_text() {
        let mut table = Table::new();
        define(&mut table, "a", "1 +   2");
        assert_eq!(table.source("a"), "1 +   2");
        assert_eq!(table.source("missing"), "");
    }
}
