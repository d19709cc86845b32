/// Sort of a declared solver variable. Every synthesized variable is an
/// unbounded mathematical integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Int,
}

impl SmtSort {
    /// SMT-LIB2 spelling of the sort.
    pub fn as_smtlib(self) -> &'static str {
        match self {
            SmtSort::Int => "Int",
        }
    }
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_smtlib())
    }
}
