//! The three read shapes the engine issues against a store.

use crate::{
  model::Identity,
  predicate::{Predicate, SqlFragment},
  value::Value,
};

/// Column holding identity ids in [`Statement::IdentityIds`] results.
pub const IDENTITY_ID_COLUMN: &str = "uid";
/// Column holding identity ids in [`Statement::Participants`] results.
pub const PARTICIPANT_ID_COLUMN: &str = "oier_uid";

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
  /// Ids of identities matching an identity-level predicate.
  IdentityIds(Predicate),
  /// Distinct ids of identities owning at least one participation record
  /// (joined with its contest) that matches the predicate.
  Participants(Predicate),
  /// Full identity rows, ordered by aggregate score descending then uid.
  Identities(Predicate),
}

/// A ready-to-run SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
  pub sql:    String,
  pub params: Vec<Value>,
}

impl Statement {
  pub fn predicate(&self) -> &Predicate {
    match self {
      Self::IdentityIds(p) | Self::Participants(p) | Self::Identities(p) => p,
    }
  }

  pub fn parameter_count(&self) -> usize { self.predicate().parameter_count() }

  pub fn to_sql(&self) -> SqlStatement {
    let SqlFragment { template, params } = self.predicate().to_sql();
    let sql = match self {
      Self::IdentityIds(_) => {
        format!("SELECT uid FROM OIer WHERE {template}")
      }
      Self::Participants(_) => format!(
        "SELECT DISTINCT r.oier_uid FROM Record r \
         JOIN Contest c ON r.contest_id = c.id WHERE {template}"
      ),
      Self::Identities(_) => format!(
        "SELECT {} FROM OIer WHERE {template} \
         ORDER BY oierdb_score DESC, uid ASC",
        Identity::COLUMNS.join(", ")
      ),
    };
    SqlStatement { sql, params }
  }
}
