use uuid::Uuid;

/// Canonical key for an unordered user pair.
///
/// The two ids are stored byte-wise sorted so `(a, b)` and `(b, a)` always
/// map to the same database row. This ordering backs the unique constraint
/// on `chat_sessions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: Uuid,
    high: Uuid,
}

impl PairKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }

    /// The other participant, from `user`'s point of view.
    pub fn counterpart_of(&self, user: Uuid) -> Uuid {
        if user == self.low {
            self.high
        } else {
            self.low
        }
    }
}

/// Reference to a resolved chat session.
#[derive(Debug, Clone, Copy)]
pub struct SessionHandle {
    pub id: Uuid,
    pub pair: PairKey,
}
