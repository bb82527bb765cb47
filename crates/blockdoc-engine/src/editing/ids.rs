use uuid::Uuid;

/// Source of fresh identifiers for blocks, table rows and table cells.
///
/// Callers check uniqueness against the ids already in use and draw again on
/// collision, so a source only has to be "probably fresh".
pub trait IdSource: Send {
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs, used for real documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `prefix1`, `prefix2`, ... for deterministic tests and fixtures.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Configurable choice of [`IdSource`], kept as plain data so session
/// configuration stays `Clone` and `Debug`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequential {
        prefix: String,
    },
}

impl IdStrategy {
    pub fn sequential(prefix: impl Into<String>) -> Self {
        IdStrategy::Sequential {
            prefix: prefix.into(),
        }
    }

    pub fn build(&self) -> Box<dyn IdSource> {
        match self {
            IdStrategy::Uuid => Box::new(UuidIds),
            IdStrategy::Sequential { prefix } => Box::new(SequentialIds::new(prefix.clone())),
        }
    }
}

/// Draw ids until one is not rejected by `taken`.
pub(crate) fn fresh_id(ids: &mut dyn IdSource, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = ids.next_id();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_count_up() {
        let mut ids = SequentialIds::new("b");
        assert_eq!(ids.next_id(), "b1");
        assert_eq!(ids.next_id(), "b2");
    }

    #[test]
    fn test_fresh_id_skips_taken() {
        let mut ids = SequentialIds::new("b");
        let id = fresh_id(&mut ids, |candidate| candidate == "b1");
        assert_eq!(id, "b2");
    }

    #[test]
    fn test_uuid_ids_are_distinct() {
        let mut ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
