//! Partial-update change-sets.
//!
//! A handler schedules "set if present" and "replace list if present"
//! operations on an [`UpdateBuilder`], the builder is finished into a
//! [`ChangeSet`], and a repository commits the whole change-set in one store
//! operation: a single `UPDATE ... RETURNING` statement on Postgres, or one
//! locked mutation in the in-memory store.

use std::collections::HashSet;

use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use time::OffsetDateTime;

/// Column written by [`UpdateOp::Touch`].
pub const UPDATED_AT: &str = "updated_at";

/// One assignable field of an entity, carrying the value to assign.
///
/// Implemented by a per-entity enum whose variants are the updatable fields,
/// so a variant constructor (`CvField::Summary`) doubles as the field selector
/// passed to the builder.
pub trait Field: Sized + Send {
    type Entity;

    /// Store column this field maps to. Two fields with the same column are
    /// the same field.
    fn column(&self) -> &'static str;

    /// Writes the carried value into an in-memory entity.
    fn apply(self, entity: &mut Self::Entity);

    /// Pushes the carried value as a bind parameter.
    fn push_value<'args>(self, qb: &mut QueryBuilder<'args, Postgres>);

    /// Stamps the modification time on an in-memory entity.
    fn touch(entity: &mut Self::Entity, at: OffsetDateTime);
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp<F> {
    Set(F),
    ReplaceList(F),
    Touch(OffsetDateTime),
}

impl<F: Field> UpdateOp<F> {
    fn column(&self) -> &'static str {
        match self {
            UpdateOp::Set(f) | UpdateOp::ReplaceList(f) => f.column(),
            UpdateOp::Touch(_) => UPDATED_AT,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangeSetError {
    #[error("no updates specified")]
    Empty,
}

#[derive(Debug)]
pub struct UpdateBuilder<F> {
    ops: Vec<UpdateOp<F>>,
}

impl<F> Default for UpdateBuilder<F> {
    fn default() -> Self {
        Self { ops: Vec::new() }
    }
}

impl<F: Field> UpdateBuilder<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `field := value` when `value` is present. Absent leaves the
    /// stored field untouched.
    pub fn set_if_present<T>(mut self, value: Option<T>, field: impl FnOnce(T) -> F) -> Self {
        if let Some(v) = value {
            self.ops.push(UpdateOp::Set(field(v)));
        }
        self
    }

    /// Schedules a whole-list replacement when `values` is present. An empty
    /// list is present and clears the stored list.
    pub fn replace_list_if_present<T>(
        mut self,
        values: Option<Vec<T>>,
        field: impl FnOnce(Vec<T>) -> F,
    ) -> Self {
        if let Some(v) = values {
            self.ops.push(UpdateOp::ReplaceList(field(v)));
        }
        self
    }

    /// Schedules `updated_at := now`.
    pub fn touch(mut self) -> Self {
        self.ops.push(UpdateOp::Touch(OffsetDateTime::now_utc()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Standard commit path: stamps the modification time and builds.
    pub fn finish(self) -> Result<ChangeSet<F>, ChangeSetError> {
        self.touch().build()
    }

    /// Builds the change-set as scheduled. Fails when nothing was scheduled.
    pub fn build(self) -> Result<ChangeSet<F>, ChangeSetError> {
        if self.ops.is_empty() {
            return Err(ChangeSetError::Empty);
        }
        Ok(ChangeSet {
            ops: last_write_wins(self.ops),
        })
    }
}

/// Keeps only the last operation per column, in the order those last
/// operations were scheduled.
fn last_write_wins<F: Field>(ops: Vec<UpdateOp<F>>) -> Vec<UpdateOp<F>> {
    let mut seen = HashSet::new();
    let mut kept: Vec<_> = ops
        .into_iter()
        .rev()
        .filter(|op| seen.insert(op.column()))
        .collect();
    kept.reverse();
    kept
}

/// A non-empty, conflict-free set of assignments against one entity.
#[derive(Debug)]
pub struct ChangeSet<F> {
    ops: Vec<UpdateOp<F>>,
}

impl<F: Field> ChangeSet<F> {
    pub fn columns(&self) -> Vec<&'static str> {
        self.ops.iter().map(UpdateOp::column).collect()
    }

    /// Applies every assignment to an in-memory entity.
    pub fn apply_to(self, entity: &mut F::Entity) {
        for op in self.ops {
            match op {
                UpdateOp::Set(f) | UpdateOp::ReplaceList(f) => f.apply(entity),
                UpdateOp::Touch(at) => F::touch(entity, at),
            }
        }
    }

    /// Pushes `col = $n, col = $m, ...` for an `UPDATE ... SET` clause.
    pub fn push_assignments<'args>(self, qb: &mut QueryBuilder<'args, Postgres>) {
        for (i, op) in self.ops.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(op.column());
            qb.push(" = ");
            match op {
                UpdateOp::Set(f) | UpdateOp::ReplaceList(f) => f.push_value(qb),
                UpdateOp::Touch(at) => {
                    qb.push_bind(at);
                }
            }
        }
    }
}
