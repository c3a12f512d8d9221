//! # Parser
//!
//! Recursive-descent parser producing the AST. The structural idea is a
//! left-to-right postfix chain:
//!
//! ```text
//! Chain := Atom PostfixOp*
//! Atom  := Identifier | '(' Chain ')'
//! ```
//!
//! Each postfix operator wraps the chain so far as its left operand, which
//! is what lets `E ? salary > 50000 # [name salary] $ salary-` parse
//! without lookahead gymnastics.
//!
//! The symbols `*` and `/` are context-dependent: natural join and
//! summarize in chain position, multiply and divide inside computation
//! expressions. The parser therefore has two entry points - the chain
//! parser and the computation parser - and extend is the only place that
//! switches from the first to the second.
//!
//! Attribute-taking operators use bracket elision: one item may be bare,
//! several must be wrapped in `[...]` and separated by whitespace.

use crate::ast::{
    AggregateFunc, ArithOp, CompareOp, CompareRhs, Literal, Predicate, RelExpr, ScalarExpr,
    SortKey,
};
use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse a complete source string as one relational chain
pub fn parse_source(source: &str) -> Result<RelExpr, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_complete_chain()
}

/// Parse a complete source string as one filter predicate
/// (used by the session's `?=` assignment sugar)
pub fn parse_predicate_source(source: &str) -> Result<Predicate, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_complete_predicate()
}

/// Token-cursor parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Parse one chain and require end of input
    pub fn parse_complete_chain(&mut self) -> Result<RelExpr, ParseError> {
        let expr = self.parse_chain()?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse one predicate and require end of input
    pub fn parse_complete_predicate(&mut self) -> Result<Predicate, ParseError> {
        let pred = self.parse_predicate()?;
        self.expect_end()?;
        Ok(pred)
    }

    // ------------------------------------------------------------------
    // cursor helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_kind_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: "end of input".to_string(),
                line: token.line,
                col: token.col,
            }),
        }
    }

    /// Error for the current token (or end of input)
    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                expected: expected.to_string(),
                line: token.line,
                col: token.col,
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(token) if token.kind == *kind => {
                Ok(self.advance().unwrap_or_else(|| unreachable!()))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => match self.advance().map(|t| t.kind) {
                Some(TokenKind::Ident(name)) => Ok(name),
                _ => unreachable!("peeked an identifier"),
            },
            _ => Err(self.unexpected(expected)),
        }
    }

    fn position(&self) -> (u32, u32) {
        self.peek().map_or((0, 0), |t| (t.line, t.col))
    }

    // ------------------------------------------------------------------
    // relational chains
    // ------------------------------------------------------------------

    fn parse_chain(&mut self) -> Result<RelExpr, ParseError> {
        let mut node = self.parse_atom()?;

        while let Some(kind) = self.peek_kind().cloned() {
            node = match kind {
                TokenKind::Question => {
                    self.advance();
                    RelExpr::Filter {
                        input: Box::new(node),
                        predicate: self.parse_predicate()?,
                        negated: false,
                    }
                }
                TokenKind::QuestionBang => {
                    self.advance();
                    RelExpr::Filter {
                        input: Box::new(node),
                        predicate: self.parse_predicate()?,
                        negated: true,
                    }
                }
                TokenKind::Hash => {
                    self.advance();
                    RelExpr::Project {
                        input: Box::new(node),
                        attrs: self.parse_attr_list("an attribute name or '['")?,
                    }
                }
                TokenKind::HashBang => {
                    self.advance();
                    RelExpr::Remove {
                        input: Box::new(node),
                        attrs: self.parse_attr_list("an attribute name or '['")?,
                    }
                }
                TokenKind::Star => {
                    let (line, col) = self.position();
                    self.advance();
                    let right = self.expect_join_operand("*", line, col)?;
                    RelExpr::Join {
                        left: Box::new(node),
                        right,
                    }
                }
                TokenKind::StarColon => {
                    let (line, col) = self.position();
                    self.advance();
                    let right = self.expect_join_operand("*:", line, col)?;
                    self.expect(&TokenKind::Gt, "'>' naming the nested attribute")?;
                    let alias = self.expect_ident("an alias for the nested relation")?;
                    RelExpr::NestJoin {
                        left: Box::new(node),
                        right,
                        alias,
                    }
                }
                TokenKind::LtColon => {
                    self.advance();
                    RelExpr::Unnest {
                        input: Box::new(node),
                        alias: self.expect_ident("the relation-valued attribute to unnest")?,
                    }
                }
                TokenKind::Plus => {
                    self.advance();
                    RelExpr::Extend {
                        input: Box::new(node),
                        items: self.parse_extend_items()?,
                    }
                }
                TokenKind::At => {
                    self.advance();
                    RelExpr::Rename {
                        input: Box::new(node),
                        renames: self.parse_rename_items()?,
                    }
                }
                TokenKind::Pipe => {
                    let (line, col) = self.position();
                    self.advance();
                    let right = self.parse_set_operand("|", line, col)?;
                    RelExpr::Union {
                        left: Box::new(node),
                        right: Box::new(right),
                    }
                }
                TokenKind::Minus => {
                    let (line, col) = self.position();
                    self.advance();
                    let right = self.parse_set_operand("-", line, col)?;
                    RelExpr::Difference {
                        left: Box::new(node),
                        right: Box::new(right),
                    }
                }
                TokenKind::Amp => {
                    let (line, col) = self.position();
                    self.advance();
                    let right = self.parse_set_operand("&", line, col)?;
                    RelExpr::Intersect {
                        left: Box::new(node),
                        right: Box::new(right),
                    }
                }
                TokenKind::Slash => {
                    self.advance();
                    let keys = self.parse_attr_list("a grouping key or '['")?;
                    let aggs = self.parse_agg_list("summarize aggregates")?;
                    RelExpr::Summarize {
                        input: Box::new(node),
                        keys,
                        aggs,
                    }
                }
                TokenKind::SlashDot => {
                    self.advance();
                    let aggs = self.parse_agg_list("summarize-all aggregates")?;
                    RelExpr::SummarizeAll {
                        input: Box::new(node),
                        aggs,
                    }
                }
                TokenKind::SlashColon => {
                    self.advance();
                    let keys = self.parse_attr_list("a grouping key or '['")?;
                    self.expect(&TokenKind::Gt, "'>' naming the nested attribute")?;
                    let alias = self.expect_ident("an alias for the nested relation")?;
                    RelExpr::NestBy {
                        input: Box::new(node),
                        keys,
                        alias,
                    }
                }
                TokenKind::Dollar => {
                    self.advance();
                    RelExpr::Sort {
                        input: Box::new(node),
                        keys: self.parse_sort_keys()?,
                    }
                }
                TokenKind::Caret => {
                    let (line, col) = self.position();
                    if !node.is_ordered() {
                        return Err(ParseError::TakeWithoutSort { line, col });
                    }
                    self.advance();
                    RelExpr::Take {
                        input: Box::new(node),
                        count: self.parse_take_count()?,
                    }
                }
                _ => break,
            };
        }

        Ok(node)
    }

    fn parse_atom(&mut self) -> Result<RelExpr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => {
                let name = self.expect_ident("a relation name")?;
                Ok(RelExpr::Relation(name))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let chain = self.parse_chain()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(chain)
            }
            _ => Err(self.unexpected("a relation name or '('")),
        }
    }

    /// Right operand of `*` / `*:` - always a bare relation name
    fn expect_join_operand(
        &mut self,
        op: &str,
        line: u32,
        col: u32,
    ) -> Result<String, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => self.expect_ident("a relation name"),
            _ => Err(ParseError::InvalidRightOperand {
                op: op.to_string(),
                line,
                col,
            }),
        }
    }

    /// Right operand of `|` / `-` / `&` - a bare name or parenthesized chain
    fn parse_set_operand(
        &mut self,
        op: &str,
        line: u32,
        col: u32,
    ) -> Result<RelExpr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Ident(_)) => {
                let name = self.expect_ident("a relation name")?;
                Ok(RelExpr::Relation(name))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let chain = self.parse_chain()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(chain)
            }
            _ => Err(ParseError::InvalidRightOperand {
                op: op.to_string(),
                line,
                col,
            }),
        }
    }

    // ------------------------------------------------------------------
    // item lists (bracket elision)
    // ------------------------------------------------------------------

    fn parse_attr_list(&mut self, expected: &str) -> Result<Vec<String>, ParseError> {
        if self.peek_kind() == Some(&TokenKind::LBracket) {
            self.advance();
            let mut attrs = vec![self.expect_ident("an attribute name")?];
            while self.peek_kind() != Some(&TokenKind::RBracket) {
                attrs.push(self.expect_ident("an attribute name or ']'")?);
            }
            self.advance(); // ]
            Ok(attrs)
        } else {
            Ok(vec![self.expect_ident(expected)?])
        }
    }

    fn parse_sort_keys(&mut self) -> Result<Vec<SortKey>, ParseError> {
        if self.peek_kind() == Some(&TokenKind::LBracket) {
            self.advance();
            let mut keys = vec![self.parse_sort_key()?];
            while self.peek_kind() != Some(&TokenKind::RBracket) {
                keys.push(self.parse_sort_key()?);
            }
            self.advance(); // ]
            Ok(keys)
        } else {
            Ok(vec![self.parse_sort_key()?])
        }
    }

    fn parse_sort_key(&mut self) -> Result<SortKey, ParseError> {
        let attr = self.expect_ident("a sort key")?;
        let descending = if self.peek_kind() == Some(&TokenKind::Minus) {
            self.advance();
            true
        } else {
            false
        };
        Ok(SortKey { attr, descending })
    }

    fn parse_extend_items(&mut self) -> Result<Vec<(String, ScalarExpr)>, ParseError> {
        if self.peek_kind() == Some(&TokenKind::LBracket) {
            self.advance();
            let mut items = vec![self.parse_extend_item()?];
            while self.peek_kind() != Some(&TokenKind::RBracket) {
                items.push(self.parse_extend_item()?);
            }
            self.advance(); // ]
            Ok(items)
        } else {
            Ok(vec![self.parse_extend_item()?])
        }
    }

    fn parse_extend_item(&mut self) -> Result<(String, ScalarExpr), ParseError> {
        let name = self.expect_ident("a new attribute name")?;
        self.expect(&TokenKind::Colon, "':' after the attribute name")?;
        let expr = self.parse_computation()?;
        Ok((name, expr))
    }

    fn parse_rename_items(&mut self) -> Result<Vec<(String, String)>, ParseError> {
        if self.peek_kind() == Some(&TokenKind::LBracket) {
            self.advance();
            let mut renames = vec![self.parse_rename_item()?];
            while self.peek_kind() != Some(&TokenKind::RBracket) {
                renames.push(self.parse_rename_item()?);
            }
            self.advance(); // ]
            Ok(renames)
        } else {
            Ok(vec![self.parse_rename_item()?])
        }
    }

    fn parse_rename_item(&mut self) -> Result<(String, String), ParseError> {
        let old = self.expect_ident("the attribute to rename")?;
        self.expect(&TokenKind::Gt, "'>' between old and new names")?;
        let new = self.expect_ident("the new attribute name")?;
        Ok((old, new))
    }

    /// Aggregate lists always require brackets
    fn parse_agg_list(
        &mut self,
        context: &str,
    ) -> Result<Vec<(String, ScalarExpr)>, ParseError> {
        if self.peek_kind() != Some(&TokenKind::LBracket) {
            let (line, col) = self.position();
            return Err(ParseError::BracketRequired {
                context: context.to_string(),
                line,
                col,
            });
        }
        self.advance();
        let mut aggs = vec![self.parse_agg_item()?];
        while self.peek_kind() != Some(&TokenKind::RBracket) {
            aggs.push(self.parse_agg_item()?);
        }
        self.advance(); // ]
        Ok(aggs)
    }

    fn parse_agg_item(&mut self) -> Result<(String, ScalarExpr), ParseError> {
        let name = self.expect_ident("an aggregate name")?;
        self.expect(&TokenKind::Colon, "':' after the aggregate name")?;
        let expr = self.parse_aggregate_call()?;
        Ok((name, expr))
    }

    fn parse_take_count(&mut self) -> Result<usize, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Int(n)) if *n >= 0 => {
                let count = usize::try_from(*n).unwrap_or(usize::MAX);
                self.advance();
                Ok(count)
            }
            _ => Err(self.unexpected("a non-negative integer count")),
        }
    }

    // ------------------------------------------------------------------
    // predicates
    // ------------------------------------------------------------------

    fn parse_predicate(&mut self) -> Result<Predicate, ParseError> {
        let mut left = self.parse_predicate_conjunction()?;
        while self.peek_kind() == Some(&TokenKind::Pipe) {
            self.advance();
            let right = self.parse_predicate_conjunction()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_predicate_conjunction(&mut self) -> Result<Predicate, ParseError> {
        let mut left = self.parse_predicate_primary()?;
        while self.peek_kind() == Some(&TokenKind::Amp) {
            self.advance();
            let right = self.parse_predicate_primary()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_predicate_primary(&mut self) -> Result<Predicate, ParseError> {
        if self.peek_kind() == Some(&TokenKind::LParen) {
            self.advance();
            let pred = self.parse_predicate()?;
            self.expect(&TokenKind::RParen, "')'")?;
            Ok(pred)
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Predicate, ParseError> {
        let left = self.parse_scalar_atom()?;
        let op = self.parse_compare_op()?;
        let rhs = self.parse_compare_rhs(op)?;
        Ok(Predicate::Compare { left, op, rhs })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Eq) => CompareOp::Equal,
            Some(TokenKind::NotEq) => CompareOp::NotEqual,
            Some(TokenKind::Lt) => CompareOp::LessThan,
            Some(TokenKind::LtEq) => CompareOp::LessOrEqual,
            Some(TokenKind::Gt) => CompareOp::GreaterThan,
            Some(TokenKind::GtEq) => CompareOp::GreaterOrEqual,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_compare_rhs(&mut self, op: CompareOp) -> Result<CompareRhs, ParseError> {
        match self.peek_kind() {
            // Membership forms are only meaningful with '='
            Some(TokenKind::LBrace) if op == CompareOp::Equal => {
                self.advance();
                let mut values = vec![self.parse_literal()?];
                while self.peek_kind() == Some(&TokenKind::Comma) {
                    self.advance();
                    values.push(self.parse_literal()?);
                }
                self.expect(&TokenKind::RBrace, "'}'")?;
                Ok(CompareRhs::Set(values))
            }
            Some(TokenKind::LParen) if op == CompareOp::Equal => {
                self.advance();
                let sub = self.parse_chain()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(CompareRhs::Subquery(Box::new(sub)))
            }
            _ => Ok(CompareRhs::Expr(self.parse_scalar_atom()?)),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let literal = match self.peek_kind() {
            Some(TokenKind::Int(v)) => Literal::Int(*v),
            Some(TokenKind::Decimal(v)) => Literal::Decimal(*v),
            Some(TokenKind::Bool(v)) => Literal::Bool(*v),
            Some(TokenKind::Str(s)) => Literal::Str(s.clone()),
            _ => return Err(self.unexpected("a literal value")),
        };
        self.advance();
        Ok(literal)
    }

    /// Scalar operand in predicate position: a literal, an attribute path,
    /// an aggregate call, or a function call. Bare arithmetic lives only
    /// in computation expressions.
    fn parse_scalar_atom(&mut self) -> Result<ScalarExpr, ParseError> {
        match self.peek_kind() {
            Some(
                TokenKind::Int(_) | TokenKind::Decimal(_) | TokenKind::Bool(_) | TokenKind::Str(_),
            ) => Ok(ScalarExpr::Literal(self.parse_literal()?)),
            Some(
                TokenKind::HashDot
                | TokenKind::PlusDot
                | TokenKind::GtDot
                | TokenKind::LtDot
                | TokenKind::PercentDot,
            ) => self.parse_aggregate_call(),
            Some(TokenKind::Ident(_)) => self.parse_call_or_attribute(),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_call_or_attribute(&mut self) -> Result<ScalarExpr, ParseError> {
        let name = self.expect_ident("an attribute or function name")?;
        if self.peek_kind() == Some(&TokenKind::LParen) {
            self.advance();
            let mut args = Vec::new();
            if self.peek_kind() != Some(&TokenKind::RParen) {
                args.push(self.parse_computation()?);
                while self.peek_kind() == Some(&TokenKind::Comma) {
                    self.advance();
                    args.push(self.parse_computation()?);
                }
            }
            self.expect(&TokenKind::RParen, "')'")?;
            Ok(ScalarExpr::Call { name, args })
        } else {
            let mut path = vec![name];
            while self.peek_kind() == Some(&TokenKind::Dot) {
                self.advance();
                path.push(self.expect_ident("an attribute name after '.'")?);
            }
            Ok(ScalarExpr::Attribute(path))
        }
    }

    // ------------------------------------------------------------------
    // computation expressions (extend right-hand sides)
    // ------------------------------------------------------------------

    /// Additive below multiplicative, both left-associative
    fn parse_computation(&mut self) -> Result<ScalarExpr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = ScalarExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<ScalarExpr, ParseError> {
        let mut left = self.parse_computation_primary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Slash) => ArithOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_computation_primary()?;
            left = ScalarExpr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_computation_primary(&mut self) -> Result<ScalarExpr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_computation()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            Some(
                TokenKind::Int(_) | TokenKind::Decimal(_) | TokenKind::Bool(_) | TokenKind::Str(_),
            ) => Ok(ScalarExpr::Literal(self.parse_literal()?)),
            Some(TokenKind::Question) => self.parse_ternary(),
            Some(
                TokenKind::HashDot
                | TokenKind::PlusDot
                | TokenKind::GtDot
                | TokenKind::LtDot
                | TokenKind::PercentDot,
            ) => self.parse_aggregate_call(),
            Some(TokenKind::Ident(_)) => self.parse_call_or_attribute(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_ternary(&mut self) -> Result<ScalarExpr, ParseError> {
        self.expect(&TokenKind::Question, "'?'")?;
        let cond = self.parse_predicate_primary()?;
        let then_branch = self.parse_ternary_branch()?;
        let else_branch = self.parse_ternary_branch()?;
        Ok(ScalarExpr::Ternary {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    /// Ternary branches accept atoms, aggregate calls, nested ternaries,
    /// and parenthesized computations - but not bare binary arithmetic,
    /// which would let a `/` in a branch be taken for a summarize.
    fn parse_ternary_branch(&mut self) -> Result<ScalarExpr, ParseError> {
        match self.peek_kind() {
            Some(
                TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash,
            ) => {
                let (line, col) = self.position();
                Err(ParseError::ArithmeticInBranch { line, col })
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_computation()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            Some(TokenKind::Question) => self.parse_ternary(),
            Some(
                TokenKind::Int(_) | TokenKind::Decimal(_) | TokenKind::Bool(_) | TokenKind::Str(_),
            ) => Ok(ScalarExpr::Literal(self.parse_literal()?)),
            Some(
                TokenKind::HashDot
                | TokenKind::PlusDot
                | TokenKind::GtDot
                | TokenKind::LtDot
                | TokenKind::PercentDot,
            ) => self.parse_aggregate_call(),
            Some(TokenKind::Ident(_)) => self.parse_call_or_attribute(),
            _ => Err(self.unexpected("a ternary branch")),
        }
    }

    // ------------------------------------------------------------------
    // aggregate calls
    // ------------------------------------------------------------------

    fn parse_aggregate_call(&mut self) -> Result<ScalarExpr, ParseError> {
        let func = match self.peek_kind() {
            Some(TokenKind::HashDot) => AggregateFunc::Count,
            Some(TokenKind::PlusDot) => AggregateFunc::Sum,
            Some(TokenKind::GtDot) => AggregateFunc::Max,
            Some(TokenKind::LtDot) => AggregateFunc::Min,
            Some(TokenKind::PercentDot) => AggregateFunc::Mean,
            _ => return Err(self.unexpected("an aggregate")),
        };
        self.advance();

        // An identifier is this aggregate's argument unless it opens the
        // next `name:` pair of the surrounding list.
        let arg = match self.peek_kind() {
            Some(TokenKind::Ident(_))
                if self.peek_kind_at(1) != Some(&TokenKind::Colon) =>
            {
                Some(Box::new(self.parse_call_or_attribute()?))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_computation()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Some(Box::new(expr))
            }
            _ => None,
        };

        if arg.is_none() && !func.allows_bare() {
            return Err(self.unexpected("an aggregate argument"));
        }

        Ok(ScalarExpr::Aggregate { func, arg })
    }
}
