//! The problem file parser (spec §6): `Variables`, `Constants`, `Aliases`,
//! `Functions`, `Constraints`, and `Objective` sections, lowered onto a
//! shared [`crate::dag::Dag`] via [`crate::term::TermBuilder`].
//!
//! Parsing is two-phase. [`lexer`] and the recursive-descent grammar below
//! first build a small untyped [`Expr`] tree per declaration — aliases and
//! functions can't be lowered directly since a function's body refers to
//! its own formal parameters, not DAG variables, until it's called with
//! actual arguments. [`Lowering::lower`] then resolves names against the
//! symbol tables accumulated so far and inlines function calls by
//! substituting each parameter with its (already-parsed) actual argument
//! expression before lowering the body.

pub mod lexer;

use std::collections::HashMap;

use crate::dag::{Dag, DagFun};
use crate::domain::Domain;
use crate::error::{Location, SolverError, SolverResult};
use crate::interval::Interval;
use crate::problem::{Constraint, ConstraintKind, Objective, ObjectiveSense, Problem};
use crate::term::TermBuilder;
use crate::variable::{VarId, Variable};

use lexer::{lex, TokKind, Token};

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Interval(f64, f64),
    Ident(String),
    Call(String, Vec<Expr>),
    Neg(Box<Expr>),
    Bin(char, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelOp {
    Eq,
    Le,
    Ge,
}

struct FunctionDef {
    params: Vec<String>,
    body: Expr,
}

/// Parses a complete problem file into a [`Problem`].
pub fn parse_problem(source: &str) -> SolverResult<Problem> {
    let tokens = lex(source).map_err(|(message, line, column)| SolverError::Parse {
        location: Location { line, column },
        message,
    })?;
    let mut p = Parser { tokens, pos: 0 };
    p.parse_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn loc(&self) -> Location {
        Location { line: self.peek().line, column: self.peek().column }
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> SolverError {
        SolverError::Parse { location: self.loc(), message: message.into() }
    }

    fn expect_symbol(&mut self, c: char) -> SolverResult<()> {
        match self.peek().kind.clone() {
            TokKind::Symbol(s) if s == c => {
                self.bump();
                Ok(())
            }
            other => Err(self.err(format!("expected '{c}', found {other:?}"))),
        }
    }

    fn expect_op(&mut self, op: &'static str) -> SolverResult<()> {
        match self.peek().kind.clone() {
            TokKind::Op(o) if o == op => {
                self.bump();
                Ok(())
            }
            other => Err(self.err(format!("expected '{op}', found {other:?}"))),
        }
    }

    fn eat_symbol(&mut self, c: char) -> bool {
        if matches!(self.peek().kind, TokKind::Symbol(s) if s == c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> SolverResult<String> {
        match self.peek().kind.clone() {
            TokKind::Ident(name) => {
                self.bump();
                Ok(name)
            }
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    fn number(&mut self) -> SolverResult<f64> {
        match self.peek().kind.clone() {
            TokKind::Number(n) => {
                self.bump();
                Ok(n)
            }
            TokKind::Symbol('-') => {
                self.bump();
                Ok(-self.number()?)
            }
            other => Err(self.err(format!("expected a number, found {other:?}"))),
        }
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokKind::Eof)
    }

    fn parse_file(&mut self) -> SolverResult<Problem> {
        let mut variables: Vec<(String, bool, Domain)> = Vec::new();
        let mut constants: HashMap<String, f64> = HashMap::new();
        let mut aliases: Vec<(String, Expr)> = Vec::new();
        let mut functions: HashMap<String, FunctionDef> = HashMap::new();
        let mut raw_constraints: Vec<(Option<String>, Expr, RelOp, Expr)> = Vec::new();
        let mut raw_objective: Option<(ObjectiveSense, Expr)> = None;

        while !self.is_eof() {
            let keyword = self.ident()?;
            match keyword.as_str() {
                "Variables" => {
                    loop {
                        let name = self.ident()?;
                        self.ident_keyword("in")?;
                        let (discrete, domain) = self.parse_domain()?;
                        variables.push((name, discrete, domain));
                        if !self.eat_symbol(',') {
                            break;
                        }
                    }
                    self.expect_symbol(';')?;
                }
                "Constants" => {
                    loop {
                        let name = self.ident()?;
                        self.expect_symbol('=')?;
                        let value = self.number()?;
                        constants.insert(name, value);
                        if !self.eat_symbol(',') {
                            break;
                        }
                    }
                    self.expect_symbol(';')?;
                }
                "Aliases" => {
                    loop {
                        let name = self.ident()?;
                        self.expect_symbol('=')?;
                        let expr = self.parse_expr()?;
                        aliases.push((name, expr));
                        if !self.eat_symbol(',') {
                            break;
                        }
                    }
                    self.expect_symbol(';')?;
                }
                "Functions" => {
                    loop {
                        let name = self.ident()?;
                        self.expect_symbol('(')?;
                        let mut params = Vec::new();
                        if !matches!(self.peek().kind, TokKind::Symbol(')')) {
                            loop {
                                params.push(self.ident()?);
                                if !self.eat_symbol(',') {
                                    break;
                                }
                            }
                        }
                        self.expect_symbol(')')?;
                        self.expect_symbol('=')?;
                        let body = self.parse_expr()?;
                        functions.insert(name, FunctionDef { params, body });
                        if !self.eat_symbol(',') {
                            break;
                        }
                    }
                    self.expect_symbol(';')?;
                }
                "Constraints" => loop {
                    let lhs = self.parse_expr()?;
                    let op = self.parse_relop()?;
                    let rhs = self.parse_expr()?;
                    raw_constraints.push((None, lhs, op, rhs));
                    if self.eat_symbol(',') {
                        continue;
                    }
                    self.expect_symbol(';')?;
                    break;
                },
                "Objective" => {
                    let sense_word = self.ident()?;
                    let sense = match sense_word.as_str() {
                        "MIN" => ObjectiveSense::Min,
                        "MAX" => ObjectiveSense::Max,
                        other => return Err(self.err(format!("expected MIN or MAX, found '{other}'"))),
                    };
                    let expr = self.parse_expr()?;
                    raw_objective = Some((sense, expr));
                    self.expect_symbol(';')?;
                }
                other => return Err(self.err(format!("unknown section keyword '{other}'"))),
            }
        }

        lower_problem(variables, constants, aliases, functions, raw_constraints, raw_objective)
    }

    fn ident_keyword(&mut self, expected: &str) -> SolverResult<()> {
        let name = self.ident()?;
        if name == expected {
            Ok(())
        } else {
            Err(self.err(format!("expected '{expected}', found '{name}'")))
        }
    }

    /// `[lo, hi]`, a plain `{lo..hi}` integer range, or `{v1, v2, ...}`.
    fn parse_domain(&mut self) -> SolverResult<(bool, Domain)> {
        if self.eat_symbol('[') {
            let lo = self.number()?;
            self.expect_symbol(',')?;
            let hi = self.number()?;
            self.expect_symbol(']')?;
            return Ok((false, Domain::Interval(Interval::new(lo, hi))));
        }
        if self.eat_symbol('{') {
            let first = self.number()? as i64;
            if self.eat_op("..") {
                let last = self.number()? as i64;
                self.expect_symbol('}')?;
                return Ok((true, Domain::IntRange(first, last)));
            }
            let mut vals = vec![first];
            while self.eat_symbol(',') {
                vals.push(self.number()? as i64);
            }
            self.expect_symbol('}')?;
            return Ok((true, Domain::IntSet(vals)));
        }
        Err(self.err("expected a domain, '[lo, hi]' or '{lo..hi}'"))
    }

    fn eat_op(&mut self, op: &'static str) -> bool {
        if matches!(self.peek().kind, TokKind::Op(o) if o == op) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_relop(&mut self) -> SolverResult<RelOp> {
        match self.peek().kind.clone() {
            TokKind::Op("==") => {
                self.bump();
                Ok(RelOp::Eq)
            }
            TokKind::Op("<=") => {
                self.bump();
                Ok(RelOp::Le)
            }
            TokKind::Op(">=") => {
                self.bump();
                Ok(RelOp::Ge)
            }
            TokKind::Symbol('<') => {
                self.bump();
                Ok(RelOp::Le)
            }
            TokKind::Symbol('>') => {
                self.bump();
                Ok(RelOp::Ge)
            }
            other => Err(self.err(format!("expected a relational operator, found {other:?}"))),
        }
    }

    fn parse_expr(&mut self) -> SolverResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek().kind.clone() {
                TokKind::Symbol('+') => {
                    self.bump();
                    lhs = Expr::Bin('+', Box::new(lhs), Box::new(self.parse_term()?));
                }
                TokKind::Symbol('-') => {
                    self.bump();
                    lhs = Expr::Bin('-', Box::new(lhs), Box::new(self.parse_term()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> SolverResult<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            match self.peek().kind.clone() {
                TokKind::Symbol('*') => {
                    self.bump();
                    lhs = Expr::Bin('*', Box::new(lhs), Box::new(self.parse_factor()?));
                }
                TokKind::Symbol('/') => {
                    self.bump();
                    lhs = Expr::Bin('/', Box::new(lhs), Box::new(self.parse_factor()?));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> SolverResult<Expr> {
        if self.eat_symbol('-') {
            return Ok(Expr::Neg(Box::new(self.parse_factor()?)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> SolverResult<Expr> {
        let base = self.parse_primary()?;
        if matches!(self.peek().kind, TokKind::Symbol('^')) {
            self.bump();
            let exponent = self.number()? as i32;
            return Ok(Expr::Call("powi".to_string(), vec![base, Expr::Num(exponent as f64)]));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> SolverResult<Expr> {
        match self.peek().kind.clone() {
            TokKind::Number(n) => {
                self.bump();
                Ok(Expr::Num(n))
            }
            TokKind::Symbol('(') => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect_symbol(')')?;
                Ok(inner)
            }
            TokKind::Symbol('[') => {
                self.bump();
                let lo = self.parse_expr()?;
                self.expect_symbol(',')?;
                let hi = self.parse_expr()?;
                self.expect_symbol(']')?;
                match (lo, hi) {
                    (Expr::Num(lo), Expr::Num(hi)) => Ok(Expr::Interval(lo, hi)),
                    _ => Err(self.err("interval literal bounds must be numeric")),
                }
            }
            TokKind::Ident(name) => {
                self.bump();
                if self.eat_symbol('(') {
                    let mut args = Vec::new();
                    if !matches!(self.peek().kind, TokKind::Symbol(')')) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat_symbol(',') {
                                break;
                            }
                        }
                    }
                    self.expect_symbol(')')?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(self.err(format!("expected an expression, found {other:?}"))),
        }
    }
}

/// Resolves names against the symbol tables and inlines function calls,
/// lowering every parsed [`Expr`] straight onto the shared [`Dag`].
struct Lowering<'a> {
    dag: &'a mut Dag,
    builder: TermBuilder,
    variables: &'a HashMap<String, VarId>,
    constants: &'a HashMap<String, f64>,
    aliases: &'a HashMap<String, Expr>,
    functions: &'a HashMap<String, FunctionDef>,
    /// Function-call argument bindings currently in scope, innermost last;
    /// shadow aliases and constants of the same name.
    locals: Vec<HashMap<String, Expr>>,
}

impl<'a> Lowering<'a> {
    fn lower(&mut self, expr: &Expr) -> SolverResult<crate::term::Term> {
        match expr {
            Expr::Num(n) => Ok(self.builder.constant(self.dag, Interval::singleton(*n))),
            Expr::Interval(lo, hi) => Ok(self.builder.constant(self.dag, Interval::new(*lo, *hi))),
            Expr::Neg(inner) => {
                let t = self.lower(inner)?;
                Ok(self.builder.neg(self.dag, t))
            }
            Expr::Bin(op, a, b) => {
                let ta = self.lower(a)?;
                let tb = self.lower(b)?;
                Ok(match op {
                    '+' => self.builder.add(self.dag, ta, tb),
                    '-' => self.builder.sub(self.dag, ta, tb),
                    '*' => self.builder.mul(self.dag, ta, tb),
                    '/' => self.builder.div(self.dag, ta, tb),
                    _ => unreachable!("parser only emits +-*/"),
                })
            }
            Expr::Ident(name) => self.lower_ident(name),
            Expr::Call(name, args) => self.lower_call(name, args),
        }
    }

    fn lower_ident(&mut self, name: &str) -> SolverResult<crate::term::Term> {
        if let Some(bound) = self.locals.last().and_then(|scope| scope.get(name)).cloned() {
            return self.lower(&bound);
        }
        if let Some(v) = self.variables.get(name) {
            return Ok(self.builder.var(self.dag, *v));
        }
        if let Some(c) = self.constants.get(name) {
            return Ok(self.builder.constant(self.dag, Interval::singleton(*c)));
        }
        if let Some(alias) = self.aliases.get(name).cloned() {
            return self.lower(&alias);
        }
        Err(SolverError::UnsupportedConstraint { message: format!("undeclared name '{name}'") })
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> SolverResult<crate::term::Term> {
        if let Some(t) = self.lower_builtin(name, args)? {
            return Ok(t);
        }
        let def = self
            .functions
            .get(name)
            .ok_or_else(|| SolverError::UnsupportedConstraint { message: format!("unknown function '{name}'") })?;
        if def.params.len() != args.len() {
            return Err(SolverError::UnsupportedConstraint {
                message: format!("function '{name}' expects {} argument(s), got {}", def.params.len(), args.len()),
            });
        }
        let bindings: HashMap<String, Expr> = def.params.iter().cloned().zip(args.iter().cloned()).collect();
        let body = def.body.clone();
        self.locals.push(bindings);
        let result = self.lower(&body);
        self.locals.pop();
        result
    }

    fn lower_builtin(&mut self, name: &str, args: &[Expr]) -> SolverResult<Option<crate::term::Term>> {
        let one = |this: &mut Self, f: fn(&TermBuilder, &mut Dag, crate::term::Term) -> crate::term::Term| -> SolverResult<crate::term::Term> {
            if args.len() != 1 {
                return Err(SolverError::UnsupportedConstraint { message: format!("'{name}' takes exactly one argument") });
            }
            let a = this.lower(&args[0])?;
            Ok(f(&this.builder, this.dag, a))
        };
        let two = |this: &mut Self, f: fn(&TermBuilder, &mut Dag, crate::term::Term, crate::term::Term) -> crate::term::Term| -> SolverResult<crate::term::Term> {
            if args.len() != 2 {
                return Err(SolverError::UnsupportedConstraint { message: format!("'{name}' takes exactly two arguments") });
            }
            let a = this.lower(&args[0])?;
            let b = this.lower(&args[1])?;
            Ok(f(&this.builder, this.dag, a, b))
        };
        Ok(Some(match name {
            "abs" => one(self, TermBuilder::abs)?,
            "sign" => one(self, TermBuilder::sign)?,
            "sqr" => one(self, TermBuilder::sqr)?,
            "sqrt" => one(self, TermBuilder::sqrt)?,
            "exp" => one(self, TermBuilder::exp)?,
            "log" => one(self, TermBuilder::log)?,
            "sin" => one(self, TermBuilder::sin)?,
            "cos" => one(self, TermBuilder::cos)?,
            "tan" => one(self, TermBuilder::tan)?,
            "min" => two(self, TermBuilder::min)?,
            "max" => two(self, TermBuilder::max)?,
            "powi" => {
                if args.len() != 2 {
                    return Err(SolverError::UnsupportedConstraint { message: "'powi' takes exactly two arguments".into() });
                }
                let base = self.lower(&args[0])?;
                let n = match &args[1] {
                    Expr::Num(n) => *n as i32,
                    _ => return Err(SolverError::UnsupportedConstraint { message: "'powi' exponent must be a literal integer".into() }),
                };
                self.builder.powi(self.dag, base, n)
            }
            _ => return Ok(None),
        }))
    }
}

fn lower_problem(
    variable_decls: Vec<(String, bool, Domain)>,
    constants: HashMap<String, f64>,
    alias_decls: Vec<(String, Expr)>,
    functions: HashMap<String, FunctionDef>,
    raw_constraints: Vec<(Option<String>, Expr, RelOp, Expr)>,
    raw_objective: Option<(ObjectiveSense, Expr)>,
) -> SolverResult<Problem> {
    let mut dag = Dag::new();
    let mut variables: HashMap<String, VarId> = HashMap::new();
    let mut declared = Vec::new();
    for (idx, (name, discrete, domain)) in variable_decls.into_iter().enumerate() {
        let id = VarId(idx as u32);
        variables.insert(name.clone(), id);
        declared.push(Variable::new(id, name, discrete, domain, default_tolerance()));
    }

    let aliases: HashMap<String, Expr> = alias_decls.into_iter().collect();

    let mut constraints = Vec::new();
    for (name, lhs, op, rhs) in raw_constraints {
        let mut lowering = Lowering {
            dag: &mut dag,
            builder: TermBuilder::simplifying(),
            variables: &variables,
            constants: &constants,
            aliases: &aliases,
            functions: &functions,
            locals: Vec::new(),
        };
        let tl = lowering.lower(&lhs)?;
        let tr = lowering.lower(&rhs)?;
        let diff = lowering.builder.sub(lowering.dag, tl, tr);
        let (image, kind) = match op {
            RelOp::Eq => (Interval::ZERO, ConstraintKind::Equality),
            RelOp::Le => (Interval::new(f64::NEG_INFINITY, 0.0), ConstraintKind::Inequality),
            RelOp::Ge => (Interval::new(0.0, f64::INFINITY), ConstraintKind::Inequality),
        };
        let fun = DagFun::new(&dag, diff, image);
        constraints.push(Constraint { name, fun, kind });
    }

    let objective = match raw_objective {
        None => None,
        Some((sense, expr)) => {
            let mut lowering = Lowering {
                dag: &mut dag,
                builder: TermBuilder::simplifying(),
                variables: &variables,
                constants: &constants,
                aliases: &aliases,
                functions: &functions,
                locals: Vec::new(),
            };
            let t = lowering.lower(&expr)?;
            Some(Objective { sense, fun: DagFun::new(&dag, t, Interval::new(f64::NEG_INFINITY, f64::INFINITY)) })
        }
    };

    crate::problem::validate_nonempty_domains(&declared)?;
    Ok(Problem::new(declared, dag, constraints, objective))
}

/// The default tolerance used when the problem file doesn't set one via a
/// parameter file's `SPLIT_TOL_ABS`/`SPLIT_TOL_REL` (spec §6); callers that
/// read a parameter file should re-apply it with
/// [`crate::variable::Variable::new`] rather than rely on this default.
fn default_tolerance() -> f64 {
    1e-8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_reference_problem_file() {
        let source = "\
Variables  x in [-7, 3], y in [-6, 4], n in {0..6};
Constants  pi = 3.141592653589793;
Aliases    d = sqrt(sqr(x) + sqr(y));
Functions  f(a, b) = sqr(a) + sqr(b);
Constraints
   f(x, y) == sqr(n),
   y == sqr(x) + 1.0;
Objective  MIN f(x, y);
";
        let problem = parse_problem(source).unwrap();
        assert_eq!(problem.variables().len(), 3);
        assert_eq!(problem.constraints().len(), 2);
        assert!(problem.objective().is_some());
        assert_eq!(problem.variable(VarId(2)).name(), "n");
        assert!(problem.variable(VarId(2)).is_discrete());
    }

    #[test]
    fn reports_line_and_column_on_a_syntax_error() {
        let err = parse_problem("Variables x in [0 3];").unwrap_err();
        match err {
            SolverError::Parse { location, .. } => assert_eq!(location.line, 1),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_an_undeclared_name() {
        let err = parse_problem("Variables x in [0, 1]; Constraints x == z;").unwrap_err();
        assert!(matches!(err, SolverError::UnsupportedConstraint { .. }));
    }

    #[test]
    fn inlines_function_calls_with_distinct_actual_arguments() {
        let source = "Variables x in [0, 1], y in [0, 1]; Functions f(a, b) = a - b; Constraints f(x, y) == 0.0;";
        let problem = parse_problem(source).unwrap();
        let constraint = &problem.constraints()[0];
        assert_eq!(constraint.fun.scope().len(), 2);
    }
}
