use crate::transaction::IsolationLevel;

/// Decides whether a backend can be wrapped with MVCC semantics for a
/// given isolation level, per spec.md §4.4's "Relational backend...
/// Delegates transaction semantics to the native engine when MVCC is
/// asked of it" — an upstream relational source already manages its
/// own transactions, so layering a second, independent MVCC view on
/// top of it would just diverge from what it actually committed.
pub trait Downgrader: Send + Sync {
    fn supports(&self, backend: &str, isolation: IsolationLevel) -> bool;
}

/// Every backend except `"relational"` gets the generic MVCC wrapper;
/// a relational backend is assumed to already provide its own
/// transaction semantics natively.
pub struct DefaultDowngrader;

impl Downgrader for DefaultDowngrader {
    fn supports(&self, backend: &str, _isolation: IsolationLevel) -> bool {
        backend != "relational"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relational_backend_is_not_wrapped() {
        let d = DefaultDowngrader;
        assert!(!d.supports("relational", IsolationLevel::Serializable));
    }

    #[test]
    fn other_backends_are_wrapped() {
        let d = DefaultDowngrader;
        assert!(d.supports("memory", IsolationLevel::RepeatableRead));
        assert!(d.supports("csv", IsolationLevel::ReadCommitted));
    }
}
