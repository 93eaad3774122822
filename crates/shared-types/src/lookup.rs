//! # Lookup
//!
//! Result of a keyed query: the item was found or it was not.
//!
//! Lookups chain across containers (chain first, then pool) with the
//! short-circuiting combinators below.

/// Found/not-found outcome of a store query.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The item exists.
    Found(T),
    /// No item matched.
    NotFound,
}

impl<T> Lookup<T> {
    /// True if an item was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Evaluate `f` only when nothing was found.
    pub fn or_else<F>(self, f: F) -> Lookup<T>
    where
        F: FnOnce() -> Lookup<T>,
    {
        match self {
            Lookup::Found(item) => Lookup::Found(item),
            Lookup::NotFound => f(),
        }
    }

    /// Fallible `or_else`, for chaining store queries.
    pub fn or_try_else<E, F>(self, f: F) -> Result<Lookup<T>, E>
    where
        F: FnOnce() -> Result<Lookup<T>, E>,
    {
        match self {
            Lookup::Found(item) => Ok(Lookup::Found(item)),
            Lookup::NotFound => f(),
        }
    }

    /// Transform the found item.
    pub fn map<U, F>(self, f: F) -> Lookup<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Lookup::Found(item) => Lookup::Found(f(item)),
            Lookup::NotFound => Lookup::NotFound,
        }
    }

    /// Convert into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(item) => Some(item),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(item) => Lookup::Found(item),
            None => Lookup::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_else_short_circuits() {
        let mut called = false;
        let found = Lookup::Found(1).or_else(|| {
            called = true;
            Lookup::Found(2)
        });
        assert_eq!(found, Lookup::Found(1));
        assert!(!called);

        let fallback = Lookup::NotFound.or_else(|| Lookup::Found(2));
        assert_eq!(fallback, Lookup::Found(2));
    }

    #[test]
    fn test_or_try_else_propagates_error() {
        let result: Result<Lookup<u8>, &str> = Lookup::NotFound.or_try_else(|| Err("boom"));
        assert_eq!(result, Err("boom"));
    }

    #[test]
    fn test_map_and_option() {
        assert_eq!(Lookup::Found(2).map(|v| v * 2).into_option(), Some(4));
        assert_eq!(Lookup::<u8>::NotFound.into_option(), None);
        assert!(Lookup::from(Some(1)).is_found());
        assert!(!Lookup::<u8>::from(None).is_found());
    }
}
