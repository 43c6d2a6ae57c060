use crate::Entity;

/// Storage facts of a single record field, in declaration order.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name (exact case).
    pub name: &'static str,
    /// Raw DDL fragment, e.g. `varchar(255)`.
    pub column_type: &'static str,
    /// Never read nor written.
    pub ignored: bool,
    /// Left out of the insert and update value lists.
    pub passive: bool,
    /// Default ordering key.
    pub order_by: bool,
}

impl ColumnDef {
    pub fn name(&self) -> &'static str {
        self.name
    }
    /// Part of the projection of a SELECT.
    pub fn is_selected(&self) -> bool {
        !self.ignored
    }
    /// Part of the INSERT and UPDATE value lists.
    pub fn is_writable(&self) -> bool {
        !self.ignored && !self.passive
    }
}

/// Table name and columns of a record type, as registered with the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub fn of<E: Entity>() -> Self {
        Self {
            name: E::table_name(),
            columns: E::columns(),
        }
    }

    /// The last non ignored column tagged as ordering key.
    pub fn order_by(&self) -> Option<&'static ColumnDef> {
        order_by_column(self.columns)
    }
}

pub(crate) fn order_by_column(columns: &'static [ColumnDef]) -> Option<&'static ColumnDef> {
    columns.iter().rev().find(|c| c.order_by && !c.ignored)
}
