use crate::Query;

/// Statement section being written.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlCreateTable,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlInsertIntoReturning,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
}

/// Writer state shared by the fragments of one statement.
///
/// `counter` is the number of placeholders emitted so far, the next one is
/// `$counter+1`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub counter: u32,
    pub fragment: Fragment,
}

impl Context {
    pub fn new(fragment: Fragment) -> Self {
        Self {
            counter: 0,
            fragment,
        }
    }
    /// Context continuing the numbering of the values already bound to `query`.
    pub fn for_query(fragment: Fragment, query: &Query) -> Self {
        Self {
            counter: query.params.len() as u32,
            fragment,
        }
    }
    pub fn switch_fragment<'s>(&'s mut self, fragment: Fragment) -> ContextUpdater<'s> {
        ContextUpdater {
            current: Context { fragment, ..*self },
            previous: self,
        }
    }
}

/// Temporary context for a nested fragment, the placeholder counter flows back on drop.
pub struct ContextUpdater<'a> {
    pub current: Context,
    pub previous: &'a mut Context,
}

impl<'a> Drop for ContextUpdater<'a> {
    fn drop(&mut self) {
        self.previous.counter = self.current.counter;
    }
}
