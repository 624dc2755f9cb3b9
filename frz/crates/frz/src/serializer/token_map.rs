//! Type → token map
//!
//! Tokens are dense and handed out in first-encounter order, so the
//! insertion order of the map is the token order.

use crate::object::TypeHandle;
use indexmap::IndexMap;

/// A type descriptor and the token standing for it in one blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeToken {
    pub type_handle: TypeHandle,
    pub token: usize,
}

#[derive(Debug, Default)]
pub struct TypeTokenMap {
    tokens: IndexMap<TypeHandle, usize>,
}

impl TypeTokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of `type_handle`, assigning the next one on first sight
    pub fn token_for(&mut self, type_handle: TypeHandle) -> usize {
        let next = self.tokens.len();
        *self.tokens.entry(type_handle).or_insert(next)
    }

    pub fn get(&self, type_handle: TypeHandle) -> Option<usize> {
        self.tokens.get(&type_handle).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Side table in token order
    pub fn into_type_tokens(self) -> Vec<TypeToken> {
        self.tokens
            .into_iter()
            .map(|(type_handle, token)| TypeToken { type_handle, token })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_dense_in_first_seen_order() {
        let mut map = TypeTokenMap::new();
        let a = TypeHandle::from_addr(0x3000);
        let b = TypeHandle::from_addr(0x1000);
        let c = TypeHandle::from_addr(0x2000);

        assert_eq!(map.token_for(a), 0);
        assert_eq!(map.token_for(b), 1);
        assert_eq!(map.token_for(a), 0);
        assert_eq!(map.token_for(c), 2);
        assert_eq!(map.get(b), Some(1));

        let tokens = map.into_type_tokens();
        let handles: Vec<_> = tokens.iter().map(|t| t.type_handle).collect();
        assert_eq!(handles, vec![a, b, c]);
        assert!(tokens.iter().enumerate().all(|(i, t)| t.token == i));
    }
}
