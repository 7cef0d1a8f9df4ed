//! Deterministic object identifiers.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::domain::{Isa, ObjectId};

/// Length of an identifier in hex digits.
pub const ID_LENGTH: usize = 24;

/// Issues identifiers derived from `(kind, qualified name path)`.
///
/// Owned by a single graph build and dropped with it. The same key always
/// maps to the same id; a digest collision between different keys is broken
/// by re-hashing with an ordinal suffix, which only depends on allocation
/// order and therefore stays stable for an unchanged spec.
#[derive(Debug, Default)]
pub struct IdAllocator {
    issued: HashMap<String, ObjectId>,
    taken: HashSet<ObjectId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&mut self, isa: Isa, path: &str) -> ObjectId {
        let key = format!("{}:{path}", isa.as_str());
        if let Some(id) = self.issued.get(&key) {
            return id.clone();
        }

        let mut ordinal = 0usize;
        loop {
            let input = match ordinal {
                0 => key.clone(),
                n => format!("{key}#{n}"),
            };
            let id = digest(&input);
            if self.taken.insert(id.clone()) {
                self.issued.insert(key, id.clone());
                return id;
            }
            ordinal += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

fn digest(input: &str) -> ObjectId {
    let hash = hex::encode_upper(Sha256::digest(input.as_bytes()));
    ObjectId::new(&hash[..ID_LENGTH])
}
