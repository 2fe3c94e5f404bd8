//! Query shapes
//!
//! A shape is the node-kind pattern of a statement, folded into a single
//! integer so it can index a fixed table of SQL statements.
//!
//! Two independent spaces exist:
//! - the exact space (12 shapes) used when every component has an id
//! - the pattern space (72 shapes) used by searches with wildcards
//!
//! Both are computed the same way: start from the number of shapes, divide
//! by each axis's arity in turn and add `choice * remaining_range`.

use crate::node::{Node, Pattern, Subject};

pub const EXACT_SHAPE_COUNT: usize = 12;
pub const PATTERN_SHAPE_COUNT: usize = 72;

/// Fold `(choice, arity)` axes into one index in `0..total`.
fn fold_axes(total: usize, axes: &[(usize, usize)]) -> usize {
    let mut range = total;
    let mut index = 0;
    for &(choice, arity) in axes {
        range /= arity;
        debug_assert!(choice < arity);
        index += choice * range;
    }
    debug_assert_eq!(range, 1, "axes do not cover the shape space");
    index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Uri,
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Uri,
    Blank,
    Literal,
}

/// Shape of a fully resolved statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactShape {
    pub subject: SubjectKind,
    pub object: ObjectKind,
    pub has_context: bool,
}

impl ExactShape {
    pub fn new(subject: SubjectKind, object: ObjectKind, has_context: bool) -> Self {
        Self {
            subject,
            object,
            has_context,
        }
    }

    pub fn index(&self) -> usize {
        let subject = match self.subject {
            SubjectKind::Uri => 0,
            SubjectKind::Blank => 1,
        };
        let object = match self.object {
            ObjectKind::Uri => 0,
            ObjectKind::Blank => 1,
            ObjectKind::Literal => 2,
        };
        let context = if self.has_context { 0 } else { 1 };
        fold_axes(EXACT_SHAPE_COUNT, &[(subject, 2), (object, 3), (context, 2)])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectSlot {
    Uri,
    Blank,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateSlot {
    Uri,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectSlot {
    Uri,
    Blank,
    Literal,
    LanguageLiteral,
    TypedLiteral,
    Any,
}

/// Shape of a search pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternShape {
    pub subject: SubjectSlot,
    pub predicate: PredicateSlot,
    pub object: ObjectSlot,
    pub has_context: bool,
}

impl PatternShape {
    pub fn of(pattern: &Pattern, has_context: bool) -> Self {
        let subject = match &pattern.subject {
            Some(Subject::Uri(_)) => SubjectSlot::Uri,
            Some(Subject::Blank(_)) => SubjectSlot::Blank,
            None => SubjectSlot::Any,
        };
        let predicate = match &pattern.predicate {
            Some(_) => PredicateSlot::Uri,
            None => PredicateSlot::Any,
        };
        let object = match &pattern.object {
            Some(Node::Uri(_)) => ObjectSlot::Uri,
            Some(Node::Blank(_)) => ObjectSlot::Blank,
            Some(Node::Literal(literal)) => {
                if literal.language().is_some() {
                    ObjectSlot::LanguageLiteral
                } else if literal.datatype().is_some() {
                    ObjectSlot::TypedLiteral
                } else {
                    ObjectSlot::Literal
                }
            }
            None => ObjectSlot::Any,
        };
        Self {
            subject,
            predicate,
            object,
            has_context,
        }
    }

    pub fn index(&self) -> usize {
        let subject = match self.subject {
            SubjectSlot::Uri => 0,
            SubjectSlot::Blank => 1,
            SubjectSlot::Any => 2,
        };
        let predicate = match self.predicate {
            PredicateSlot::Uri => 0,
            PredicateSlot::Any => 1,
        };
        let object = match self.object {
            ObjectSlot::Uri => 0,
            ObjectSlot::Blank => 1,
            ObjectSlot::Literal => 2,
            ObjectSlot::LanguageLiteral => 3,
            ObjectSlot::TypedLiteral => 4,
            ObjectSlot::Any => 5,
        };
        let context = if self.has_context { 0 } else { 1 };
        fold_axes(
            PATTERN_SHAPE_COUNT,
            &[(subject, 3), (predicate, 2), (object, 6), (context, 2)],
        )
    }
}
