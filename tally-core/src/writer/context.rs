#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlCreateTable,
    SqlDeleteFromWhere,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlSelect,
    SqlSelectWhere,
    SqlTemplate,
    SqlUpdateSet,
    SqlUpdateWhere,
    SqlUpsert,
}

/// State threaded through a statement being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Number of parameters bound so far, placeholders are numbered after it.
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

    /// Enter `fragment` keeping the parameter count. The count flows back when the returned
    /// guard is dropped.
    pub fn switch_fragment(&mut self, fragment: Fragment) -> ContextUpdater<'_> {
        ContextUpdater {
            current: Context { fragment, ..*self },
            previous: self,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None)
    }
}

pub struct ContextUpdater<'a> {
    pub current: Context,
    previous: &'a mut Context,
}

impl Drop for ContextUpdater<'_> {
    fn drop(&mut self) {
        self.previous.counter = self.current.counter;
    }
}
