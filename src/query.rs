//! Typed iTQL query builder.
//!
//! Identifiers and predicates reach the query text only through [`Term`],
//! whose bound variants hold already-validated tokens.

use std::fmt;

use crate::model::{Predicate, ResourceId};
use crate::vocab::FEDORA_URI_PREFIX;

/// Tabular result formats the resource index can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// One solution per line, `label : <uri>` / `label : "literal"`.
    Simple,
    /// Header row followed by comma-separated rows.
    Csv,
}

impl ResultFormat {
    /// Value of the `format` request parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            ResultFormat::Simple => "Simple",
            ResultFormat::Csv => "CSV",
        }
    }
}

/// One position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Resource(ResourceId),
    Uri(Predicate),
    Var(&'static str),
}

impl Term {
    /// A bound resource, or a free variable when `id` is `None`.
    pub fn resource_or_var(id: Option<&ResourceId>, var: &'static str) -> Self {
        match id {
            Some(id) => Term::Resource(id.clone()),
            None => Term::Var(var),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Resource(id) => write!(f, "<{}{}>", FEDORA_URI_PREFIX, id),
            Term::Uri(p) => write!(f, "<{}>", p),
            Term::Var(name) => write!(f, "${}", name),
        }
    }
}

/// A (subject, predicate, object) pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub subject: Term,
    pub predicate: Predicate,
    pub object: Term,
}

impl Pattern {
    pub fn new(subject: Term, predicate: &Predicate, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.clone(),
            object,
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.subject,
            Term::Uri(self.predicate.clone()),
            self.object
        )
    }
}

/// `select ... from <#ri> where ... [and ...] [minus ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    select: Vec<&'static str>,
    conjuncts: Vec<Pattern>,
    minus: Option<Pattern>,
}

impl Query {
    pub fn select(vars: &[&'static str]) -> Self {
        Self {
            select: vars.to_vec(),
            conjuncts: Vec::new(),
            minus: None,
        }
    }

    /// First `where` clause; further calls behave like [`Query::and`].
    pub fn where_(self, pattern: Pattern) -> Self {
        self.and(pattern)
    }

    pub fn and(mut self, pattern: Pattern) -> Self {
        self.conjuncts.push(pattern);
        self
    }

    /// Anti-join: drop solutions for which `pattern` also holds.
    pub fn minus(mut self, pattern: Pattern) -> Self {
        self.minus = Some(pattern);
        self
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("select")?;
        for var in &self.select {
            write!(f, " ${}", var)?;
        }
        f.write_str(" from <#ri> where")?;
        for (i, pattern) in self.conjuncts.iter().enumerate() {
            if i > 0 {
                f.write_str(" and")?;
            }
            write!(f, " {}", pattern)?;
        }
        if let Some(ref minus) = self.minus {
            write!(f, " minus {}", minus)?;
        }
        Ok(())
    }
}
